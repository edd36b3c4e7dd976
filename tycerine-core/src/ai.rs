//! Difficulty-tiered AI move selection
//!
//! The selector is a read-only client of the session's legality queries; it
//! applies its choice back through the same transition API a human caller
//! uses. Randomness comes from a seeded ChaCha8 stream so games replay
//! deterministically.

use crate::eval::{self, Heuristics};
use crate::game::{CommandKind, GameError, GameResult, GameSession, Move, Phase};
use crate::pieces::PieceKind;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// AI strength tier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    /// Uniform random over the legal moves
    Easy,
    /// Random, but fusion-enabling placements first when any exist
    #[default]
    Normal,
    /// Heuristic maximum, first found wins ties
    Hard,
}

/// Move selector for the session's AI player.
pub struct MoveSelector {
    pub heuristics: Heuristics,
    rng: ChaCha8Rng,
}

impl MoveSelector {
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            heuristics: Heuristics::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// All legal moves for the current player, in deterministic row-major
    /// enumeration order: placements, then hopper relocations (free phase
    /// only), or fusion executions when those are the commanded move.
    pub fn enumerate(&self, session: &GameSession) -> Vec<Move> {
        if session.result() != GameResult::Ongoing || session.pending_fusion().is_some() {
            return Vec::new();
        }
        let player = session.current_player();
        if session.phase() == Phase::Action
            && session.current_command() == Some(CommandKind::Fusion)
        {
            return session
                .command_cells(player, CommandKind::Fusion)
                .into_iter()
                .map(Move::Fuse)
                .collect();
        }

        let mut moves: Vec<Move> = session
            .valid_placement_cells()
            .into_iter()
            .map(Move::Place)
            .collect();

        if session.phase() == Phase::Free {
            for (from, piece) in session.board().pieces() {
                if piece.owner != player || piece.kind != PieceKind::Hopper {
                    continue;
                }
                for to in from.ring() {
                    let legal = match session.board().piece_at(to) {
                        None => true,
                        Some(p) => p.owner == player && !p.is_fortress(),
                    };
                    if legal {
                        moves.push(Move::HopperMove { from, to });
                    }
                }
            }
        }
        moves
    }

    /// Pick a move for the free or action phase per the session's
    /// difficulty. `None` when no legal move exists.
    pub fn choose(&mut self, session: &GameSession) -> Option<Move> {
        let moves = self.enumerate(session);
        if moves.is_empty() {
            return None;
        }
        let board = session.board();
        let player = session.current_player();

        match session.ai_difficulty() {
            Difficulty::Easy => moves.choose(&mut self.rng).copied(),
            Difficulty::Normal => {
                let fusing: Vec<Move> = moves
                    .iter()
                    .copied()
                    .filter(|&mv| match mv {
                        Move::Place(cell) => {
                            eval::placement_enables_fusion(board, cell, player).is_some()
                        }
                        Move::Fuse(_) => true,
                        Move::HopperMove { .. } => false,
                    })
                    .collect();
                if fusing.is_empty() {
                    moves.choose(&mut self.rng).copied()
                } else {
                    fusing.choose(&mut self.rng).copied()
                }
            }
            Difficulty::Hard => {
                let mut best = moves[0];
                let mut best_score = f32::NEG_INFINITY;
                for mv in moves {
                    let score = eval::score_move(board, player, mv, &self.heuristics);
                    if score > best_score {
                        best_score = score;
                        best = mv;
                    }
                }
                Some(best)
            }
        }
    }

    /// Pick a command to issue. Prefers commands the issuer could execute
    /// itself (it inherits them on rejection); best of all is one the
    /// target cannot execute, which threatens an immediate win on
    /// acceptance.
    pub fn choose_command(&mut self, session: &GameSession) -> CommandKind {
        const KINDS: [CommandKind; 3] = [
            CommandKind::March,
            CommandKind::Fortify,
            CommandKind::Fusion,
        ];
        let me = session.current_player();
        let opp = me.opponent();

        let mut best_tier = -1;
        let mut best: Vec<CommandKind> = Vec::new();
        for kind in KINDS {
            let mine = !session.command_cells(me, kind).is_empty();
            let theirs = !session.command_cells(opp, kind).is_empty();
            let tier = match (mine, theirs) {
                (true, false) => 2,
                (true, true) => 1,
                (false, _) => 0,
            };
            if tier > best_tier {
                best_tier = tier;
                best.clear();
            }
            if tier == best_tier {
                best.push(kind);
            }
        }
        best.choose(&mut self.rng)
            .copied()
            .unwrap_or(CommandKind::March)
    }

    /// Accept a command exactly when the responder can execute it;
    /// accepting an impossible command loses on the spot.
    pub fn respond(&self, session: &GameSession) -> bool {
        match session.current_command() {
            Some(kind) => !session
                .command_cells(session.current_player(), kind)
                .is_empty(),
            None => false,
        }
    }

    /// Perform one AI decision step against the session. Returns false
    /// when it is not the AI's turn (or the AI has no move). An offered
    /// landing-cell fusion is always taken.
    pub fn take_turn(&mut self, session: &mut GameSession) -> Result<bool, GameError> {
        if !session.ai_turn_pending() {
            return Ok(false);
        }
        if let Some((cell, _)) = session.pending_fusion() {
            session.execute_fusion(cell.row(), cell.col())?;
            return Ok(true);
        }
        match session.phase() {
            Phase::Command => {
                let kind = self.choose_command(session);
                session.choose_command(kind)?;
            }
            Phase::Response => {
                let accepted = self.respond(session);
                session.respond_to_command(accepted)?;
            }
            Phase::Free | Phase::Action => {
                let Some(mv) = self.choose(session) else {
                    return Ok(false);
                };
                session.apply_move(mv)?;
                if let Some((cell, _)) = session.pending_fusion() {
                    session.execute_fusion(cell.row(), cell.col())?;
                }
            }
        }
        Ok(true)
    }
}

impl Default for MoveSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Coord;
    use crate::pieces::{Piece, Player};

    fn at(row: u8, col: u8) -> Coord {
        Coord::new(row, col).unwrap()
    }

    fn piece(owner: Player, kind: PieceKind) -> Piece {
        Piece::new(owner, kind)
    }

    fn fortresses() -> Vec<(Coord, Piece)> {
        vec![
            (at(9, 3), piece(Player::X, PieceKind::FortressX)),
            (at(1, 3), piece(Player::O, PieceKind::FortressO)),
        ]
    }

    fn o_to_move(extra: &[(Coord, Piece)]) -> GameSession {
        let mut pieces = fortresses();
        pieces.extend_from_slice(extra);
        let mut session = GameSession::from_position(&pieces, Player::O);
        session.set_ai_enabled(true);
        session
    }

    #[test]
    fn test_easy_picks_a_legal_move() {
        let mut session = o_to_move(&[]);
        session.set_ai_difficulty(Difficulty::Easy);
        let mut selector = MoveSelector::with_seed(1);
        let legal = selector.enumerate(&session);
        let mv = selector.choose(&session).unwrap();
        assert!(legal.contains(&mv));
    }

    #[test]
    fn test_normal_prefers_fusion_enabling_placement() {
        // Four O pawns around an empty D5; completing the cross is the only
        // fusion-enabling placement.
        let mut session = o_to_move(&[
            (at(4, 3), piece(Player::O, PieceKind::Pawn)),
            (at(6, 3), piece(Player::O, PieceKind::Pawn)),
            (at(5, 2), piece(Player::O, PieceKind::Pawn)),
            (at(5, 4), piece(Player::O, PieceKind::Pawn)),
        ]);
        session.set_ai_difficulty(Difficulty::Normal);
        let mut selector = MoveSelector::with_seed(3);
        for _ in 0..8 {
            assert_eq!(selector.choose(&session), Some(Move::Place(at(5, 3))));
        }
    }

    #[test]
    fn test_hard_never_picks_below_maximum() {
        let mut session = o_to_move(&[
            (at(4, 3), piece(Player::O, PieceKind::Pawn)),
            (at(6, 3), piece(Player::O, PieceKind::Pawn)),
            (at(5, 2), piece(Player::O, PieceKind::Pawn)),
            (at(5, 4), piece(Player::O, PieceKind::Pawn)),
            (at(3, 1), piece(Player::O, PieceKind::Hopper)),
        ]);
        session.set_ai_difficulty(Difficulty::Hard);
        let mut selector = MoveSelector::with_seed(9);

        let chosen = selector.choose(&session).unwrap();
        let chosen_score = eval::score_move(
            session.board(),
            Player::O,
            chosen,
            &selector.heuristics,
        );
        for mv in selector.enumerate(&session) {
            let score = eval::score_move(session.board(), Player::O, mv, &selector.heuristics);
            assert!(
                chosen_score >= score,
                "chose {chosen:?} ({chosen_score}) but {mv:?} scores {score}"
            );
        }
    }

    #[test]
    fn test_take_turn_places_and_fuses() {
        let mut session = o_to_move(&[
            (at(4, 3), piece(Player::O, PieceKind::Pawn)),
            (at(6, 3), piece(Player::O, PieceKind::Pawn)),
            (at(5, 2), piece(Player::O, PieceKind::Pawn)),
            (at(5, 4), piece(Player::O, PieceKind::Pawn)),
        ]);
        session.set_ai_difficulty(Difficulty::Normal);
        let mut selector = MoveSelector::with_seed(5);

        assert!(selector.take_turn(&mut session).unwrap());
        // The offered fusion was taken within the same step.
        assert_eq!(
            session.board().piece_at(at(5, 3)),
            Some(piece(Player::O, PieceKind::Defender))
        );
        assert_eq!(session.stats().defender_count, 1);
        assert_eq!(session.phase(), Phase::Command);
    }

    #[test]
    fn test_enumerate_is_empty_while_fusion_pending() {
        let mut session = o_to_move(&[
            (at(4, 3), piece(Player::O, PieceKind::Pawn)),
            (at(6, 3), piece(Player::O, PieceKind::Pawn)),
            (at(5, 2), piece(Player::O, PieceKind::Pawn)),
            (at(5, 4), piece(Player::O, PieceKind::Pawn)),
            (at(3, 1), piece(Player::O, PieceKind::Hopper)),
        ]);
        session.request_placement(5, 3).unwrap();
        assert!(session.pending_fusion().is_some());
        // Even the hopper has to wait for the fusion decision.
        let selector = MoveSelector::new();
        assert!(selector.enumerate(&session).is_empty());
    }

    #[test]
    fn test_take_turn_is_a_noop_for_the_human() {
        let mut session = GameSession::new();
        session.set_ai_enabled(true);
        let mut selector = MoveSelector::new();
        // X (the human side) is to move.
        assert!(!selector.take_turn(&mut session).unwrap());
        assert_eq!(session.current_player(), Player::X);
    }

    #[test]
    fn test_respond_rejects_impossible_command() {
        let mut session = GameSession::new();
        session.set_ai_enabled(true);
        session.request_placement(8, 3).unwrap();
        session.choose_command(CommandKind::Fusion).unwrap();
        assert_eq!(session.phase(), Phase::Response);

        let mut selector = MoveSelector::new();
        assert!(!selector.respond(&session));
        assert!(selector.take_turn(&mut session).unwrap());
        // Rejection hands the impossible fusion back to X, who cannot
        // execute it either and loses.
        assert_eq!(session.result(), GameResult::Won(Player::O));
    }

    #[test]
    fn test_enumerate_covers_hopper_reach() {
        let session = o_to_move(&[(at(5, 3), piece(Player::O, PieceKind::Hopper))]);
        let selector = MoveSelector::new();
        let moves = selector.enumerate(&session);
        let hops = moves
            .iter()
            .filter(|mv| matches!(mv, Move::HopperMove { .. }))
            .count();
        assert_eq!(hops, 8);
    }

    #[test]
    fn test_commanded_fusion_enumerates_centers() {
        let mut pieces = fortresses();
        for c in [at(5, 3), at(4, 3), at(6, 3), at(5, 2), at(5, 4)] {
            pieces.push((c, piece(Player::O, PieceKind::Pawn)));
        }
        // O opens with a free placement and issues a fusion command; X's
        // rejection bounces the fusion back to O to execute.
        let mut session = GameSession::from_position(&pieces, Player::O);
        session.set_ai_enabled(true);
        session.request_placement(2, 3).unwrap();
        session.choose_command(CommandKind::Fusion).unwrap();
        session.respond_to_command(false).unwrap();
        assert_eq!(session.phase(), Phase::Action);
        assert_eq!(session.current_player(), Player::O);

        let selector = MoveSelector::new();
        let moves = selector.enumerate(&session);
        assert_eq!(moves, vec![Move::Fuse(at(5, 3))]);

        session.apply_move(moves[0]).unwrap();
        assert_eq!(
            session.board().piece_at(at(5, 3)),
            Some(piece(Player::O, PieceKind::Defender))
        );
        assert_eq!(session.stats().defender_count, 1);
    }

    #[test]
    fn test_seeded_runs_replay() {
        let position = [
            (at(4, 3), piece(Player::O, PieceKind::Pawn)),
            (at(3, 2), piece(Player::O, PieceKind::Pawn)),
        ];
        let mut first = Vec::new();
        let mut second = Vec::new();
        for out in [&mut first, &mut second] {
            let mut session = o_to_move(&position);
            session.set_ai_difficulty(Difficulty::Easy);
            let mut selector = MoveSelector::with_seed(77);
            for _ in 0..4 {
                out.push(selector.choose(&session));
            }
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_normal_falls_back_without_fusions() {
        let mut session = o_to_move(&[(at(4, 3), piece(Player::O, PieceKind::Pawn))]);
        session.set_ai_difficulty(Difficulty::Normal);
        let mut selector = MoveSelector::with_seed(11);
        let legal = selector.enumerate(&session);
        let mv = selector.choose(&session).unwrap();
        assert!(legal.contains(&mv));
        assert!(matches!(mv, Move::Place(_)));
    }
}
