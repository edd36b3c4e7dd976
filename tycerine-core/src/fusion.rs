//! Fusion eligibility and execution
//!
//! Two compositions exist, both strictly same-owner and requiring the full
//! pattern in bounds: five pawns in a cross fuse into a defender, and a
//! defender ringed by eight pawns fuses into a hopper.

use crate::board::{Board, Coord, ORTHOGONAL, RING};
use crate::pieces::{Piece, PieceKind, Player};
use serde::{Deserialize, Serialize};

/// Which composition a fusion produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FusionKind {
    Defender,
    Hopper,
}

impl FusionKind {
    /// The piece kind placed at the center on execution.
    pub const fn product(self) -> PieceKind {
        match self {
            FusionKind::Defender => PieceKind::Defender,
            FusionKind::Hopper => PieceKind::Hopper,
        }
    }
}

fn is_own_pawn(board: &Board, at: Coord, player: Player) -> bool {
    board
        .piece_at(at)
        .map_or(false, |p| p.owner == player && p.kind == PieceKind::Pawn)
}

/// Pawn-cross check: `center` and its four orthogonal neighbors must all be
/// `player`'s pawns. Cells off the board disqualify.
pub fn defender_ready(board: &Board, center: Coord, player: Player) -> bool {
    is_own_pawn(board, center, player)
        && ORTHOGONAL.iter().all(|&(dr, dc)| {
            center
                .offset(dr, dc)
                .map_or(false, |c| is_own_pawn(board, c, player))
        })
}

/// Ringed-defender check: `center` must be `player`'s defender and all eight
/// surrounding cells `player`'s pawns. Cells off the board disqualify.
pub fn hopper_ready(board: &Board, center: Coord, player: Player) -> bool {
    let centered = board
        .piece_at(center)
        .map_or(false, |p| p.owner == player && p.kind == PieceKind::Defender);
    centered
        && RING.iter().all(|&(dr, dc)| {
            center
                .offset(dr, dc)
                .map_or(false, |c| is_own_pawn(board, c, player))
        })
}

/// The fusion executable at `center` for `player`, if any. Never mutates the
/// board.
pub fn fusion_at(board: &Board, center: Coord, player: Player) -> Option<FusionKind> {
    if defender_ready(board, center, player) {
        Some(FusionKind::Defender)
    } else if hopper_ready(board, center, player) {
        Some(FusionKind::Hopper)
    } else {
        None
    }
}

/// Execute a fusion whose eligibility the caller has already checked.
/// Removes the consumed pieces, places the product at the center, and
/// returns the removed coordinates (center included) in scan order.
pub fn execute(board: &mut Board, center: Coord, player: Player, kind: FusionKind) -> Vec<Coord> {
    debug_assert_eq!(fusion_at(board, center, player), Some(kind));

    let arms: &[(i8, i8)] = match kind {
        FusionKind::Defender => &ORTHOGONAL,
        FusionKind::Hopper => &RING,
    };

    let mut removed = Vec::with_capacity(arms.len() + 1);
    for &(dr, dc) in arms {
        if let Some(c) = center.offset(dr, dc) {
            board.remove(c);
            removed.push(c);
        }
    }
    board.remove(center);
    removed.push(center);

    board.place(center, Piece::new(player, kind.product()));
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pawn(player: Player) -> Piece {
        Piece::new(player, PieceKind::Pawn)
    }

    fn at(row: u8, col: u8) -> Coord {
        Coord::new(row, col).unwrap()
    }

    fn cross_board(player: Player) -> (Board, Coord) {
        let mut board = Board::new();
        let center = at(5, 3);
        board.place(center, pawn(player));
        for c in center.orthogonals() {
            board.place(c, pawn(player));
        }
        (board, center)
    }

    #[test]
    fn test_defender_cross() {
        let (board, center) = cross_board(Player::X);
        assert!(defender_ready(&board, center, Player::X));
        assert!(!defender_ready(&board, center, Player::O));
        assert_eq!(fusion_at(&board, center, Player::X), Some(FusionKind::Defender));
    }

    #[test]
    fn test_cross_missing_arm() {
        let (mut board, center) = cross_board(Player::X);
        board.remove(at(4, 3));
        assert!(!defender_ready(&board, center, Player::X));
    }

    #[test]
    fn test_cross_with_enemy_arm() {
        let (mut board, center) = cross_board(Player::X);
        board.place(at(4, 3), pawn(Player::O));
        assert!(!defender_ready(&board, center, Player::X));
    }

    #[test]
    fn test_edge_disqualifies() {
        // Cross centered on the home rank is missing its off-board arm.
        let mut board = Board::new();
        let center = at(1, 3);
        board.place(center, pawn(Player::O));
        for c in center.orthogonals() {
            board.place(c, pawn(Player::O));
        }
        assert!(!defender_ready(&board, center, Player::O));
    }

    #[test]
    fn test_ineligible_check_never_mutates() {
        let (board, _) = cross_board(Player::X);
        let before = board.clone();
        let empty_cell = at(2, 2);
        assert_eq!(fusion_at(&board, empty_cell, Player::X), None);
        assert_eq!(board, before);
    }

    #[test]
    fn test_execute_defender() {
        let (mut board, center) = cross_board(Player::X);
        let removed = execute(&mut board, center, Player::X, FusionKind::Defender);
        assert_eq!(removed.len(), 5);
        assert_eq!(
            board.piece_at(center),
            Some(Piece::new(Player::X, PieceKind::Defender))
        );
        for c in center.orthogonals() {
            assert!(board.is_empty(c));
        }
    }

    #[test]
    fn test_hopper_ring() {
        let mut board = Board::new();
        let center = at(5, 3);
        board.place(center, Piece::new(Player::O, PieceKind::Defender));
        for c in center.ring() {
            board.place(c, pawn(Player::O));
        }
        assert_eq!(fusion_at(&board, center, Player::O), Some(FusionKind::Hopper));

        let removed = execute(&mut board, center, Player::O, FusionKind::Hopper);
        assert_eq!(removed.len(), 9);
        assert_eq!(
            board.piece_at(center),
            Some(Piece::new(Player::O, PieceKind::Hopper))
        );
        assert!(center.ring().all(|c| board.is_empty(c)));
    }

    #[test]
    fn test_hopper_requires_defender_center() {
        let mut board = Board::new();
        let center = at(5, 3);
        board.place(center, pawn(Player::O));
        for c in center.ring() {
            board.place(c, pawn(Player::O));
        }
        assert!(!hopper_ready(&board, center, Player::O));
        // The pawn center reads as a defender cross instead.
        assert_eq!(fusion_at(&board, center, Player::O), Some(FusionKind::Defender));
    }
}
