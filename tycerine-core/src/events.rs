//! Engine-to-collaborator notifications
//!
//! The engine never renders, plays sounds, or persists anything. Every
//! observable effect of a transition is appended to an ordered feed the
//! caller drains with [`crate::game::GameSession::take_events`] and feeds to
//! its renderer / sound / logging collaborators.

use crate::battle::BattleOutcome;
use crate::board::Coord;
use crate::fusion::FusionKind;
use crate::game::{GameStats, Phase};
use crate::pieces::{PieceKind, Player};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    PiecePlaced {
        at: Coord,
        owner: Player,
        kind: PieceKind,
    },
    PieceRemoved {
        at: Coord,
    },
    FusionExecuted {
        kind: FusionKind,
        at: Coord,
        owner: Player,
    },
    BattleResolved {
        attacker: Coord,
        defenders: Vec<Coord>,
        attack: u32,
        defense: u32,
        outcome: BattleOutcome,
    },
    PhaseChanged {
        phase: Phase,
        player: Player,
    },
    GameEnded {
        winner: Player,
        stats: GameStats,
    },
    /// A request was declined; nothing changed. UIs typically map this to
    /// an error cue.
    InvalidAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_feed_is_tagged_json() {
        let at = Coord::new(5, 3).unwrap();
        let event = GameEvent::PiecePlaced {
            at,
            owner: Player::X,
            kind: PieceKind::Pawn,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "PiecePlaced");
        assert_eq!(value["owner"], "X");
        assert_eq!(value["kind"], "Pawn");

        let back: GameEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unit_variant_serializes() {
        let value = serde_json::to_value(GameEvent::InvalidAction).unwrap();
        assert_eq!(value["type"], "InvalidAction");
    }
}
