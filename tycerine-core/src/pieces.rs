//! Players and piece definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Player identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    X,
    O,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Row delta when this player advances toward the opponent.
    /// X starts on row 9 and marches toward row 1.
    pub const fn forward(self) -> i8 {
        match self {
            Player::X => -1,
            Player::O => 1,
        }
    }

    /// Home rank, where the fortress starts.
    pub const fn home_row(self) -> u8 {
        match self {
            Player::X => 9,
            Player::O => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::X => write!(f, "X"),
            Player::O => write!(f, "O"),
        }
    }
}

/// Piece kind with fixed attack/defense stats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Defender,
    Hopper,
    FortressX,
    FortressO,
}

impl PieceKind {
    /// Attack power contributed when supporting or leading a battle.
    pub const fn attack(self) -> u32 {
        match self {
            PieceKind::Pawn => 1,
            PieceKind::Defender => 1,
            PieceKind::Hopper => 5,
            PieceKind::FortressX | PieceKind::FortressO => 3,
        }
    }

    /// Defense power contributed when defending or supporting defenders.
    pub const fn defense(self) -> u32 {
        match self {
            PieceKind::Pawn => 1,
            PieceKind::Defender => 3,
            PieceKind::Hopper => 3,
            PieceKind::FortressX | PieceKind::FortressO => 3,
        }
    }

    pub const fn is_fortress(self) -> bool {
        matches!(self, PieceKind::FortressX | PieceKind::FortressO)
    }

    /// The fortress kind belonging to `player`.
    pub const fn fortress_for(player: Player) -> Self {
        match player {
            Player::X => PieceKind::FortressX,
            Player::O => PieceKind::FortressO,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PieceKind::Pawn => "Pawn",
            PieceKind::Defender => "Defender",
            PieceKind::Hopper => "Hopper",
            PieceKind::FortressX => "Fortress_X",
            PieceKind::FortressO => "Fortress_O",
        }
    }
}

/// A piece on the board. Pieces are immutable value records; they are
/// destroyed by removal, never mutated in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub owner: Player,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(owner: Player, kind: PieceKind) -> Self {
        Self { owner, kind }
    }

    pub const fn is_fortress(&self) -> bool {
        self.kind.is_fortress()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_table() {
        assert_eq!(PieceKind::Pawn.attack(), 1);
        assert_eq!(PieceKind::Pawn.defense(), 1);
        assert_eq!(PieceKind::Defender.defense(), 3);
        assert_eq!(PieceKind::Hopper.attack(), 5);
        assert_eq!(PieceKind::FortressX.attack(), 3);
        assert_eq!(PieceKind::FortressO.defense(), 3);
    }

    #[test]
    fn test_fortress_ownership() {
        assert!(PieceKind::fortress_for(Player::X).is_fortress());
        assert_eq!(PieceKind::fortress_for(Player::O), PieceKind::FortressO);
        assert!(!PieceKind::Hopper.is_fortress());
    }

    #[test]
    fn test_directions() {
        assert_eq!(Player::X.forward(), -1);
        assert_eq!(Player::O.forward(), 1);
        assert_eq!(Player::X.home_row(), 9);
        assert_eq!(Player::O.opponent(), Player::X);
    }
}
