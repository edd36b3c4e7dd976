//! Heuristic move scoring for the hard AI tier
//!
//! Scoring never touches live state: every speculative placement, fusion or
//! hopper relocation happens on a cloned board.

use crate::battle;
use crate::board::{Board, Coord, CENTER};
use crate::fusion::{self, FusionKind};
use crate::game::Move;
use crate::pieces::{Piece, PieceKind, Player};
use serde::{Deserialize, Serialize};

/// Heuristic weights for move scoring
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Heuristics {
    /// Base value of any pawn placement
    pub placement_base: f32,
    /// Enabling a defender fusion at the landing cell
    pub defender_fusion: f32,
    /// Enabling a hopper fusion at the landing cell
    pub hopper_fusion: f32,
    /// The enabled defender fusion would immediately start a battle
    pub defender_fusion_battle: f32,
    /// The enabled hopper fusion would immediately start a battle
    pub hopper_fusion_battle: f32,
    /// Per-cell pressure toward the enemy fortress (scaled by 9 - distance)
    pub fortress_pressure: f32,
    /// Board-center pull (scaled by 7 - distance)
    pub center_weight: f32,
    /// Contesting the central column
    pub center_column: f32,
    /// Holding a defensive rank near home
    pub home_guard: f32,
    /// Base value of any hopper relocation
    pub hopper_base: f32,
    /// The relocation lands in battle
    pub hopper_battle: f32,
    /// ...and the battle favors the attacker
    pub hopper_advantage: f32,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            placement_base: 1.0,
            defender_fusion: 5.0,
            hopper_fusion: 8.0,
            defender_fusion_battle: 3.0,
            hopper_fusion_battle: 4.0,
            fortress_pressure: 0.5,
            center_weight: 0.3,
            center_column: 0.5,
            home_guard: 0.3,
            hopper_base: 3.0,
            hopper_battle: 4.0,
            hopper_advantage: 3.0,
        }
    }
}

/// Fusion that would become executable at `at` if `player` placed a pawn
/// there. Speculates on a cloned board.
pub fn placement_enables_fusion(board: &Board, at: Coord, player: Player) -> Option<FusionKind> {
    let mut scratch = board.clone();
    scratch.place(at, Piece::new(player, PieceKind::Pawn));
    fusion::fusion_at(&scratch, at, player)
}

/// Score a candidate move for `player` on the given board.
pub fn score_move(board: &Board, player: Player, mv: Move, h: &Heuristics) -> f32 {
    match mv {
        Move::Place(at) => score_placement(board, player, at, h),
        Move::HopperMove { from, to } => score_hopper_move(board, player, from, to, h),
        Move::Fuse(at) => score_fusion(board, player, at, h),
    }
}

fn score_placement(board: &Board, player: Player, at: Coord, h: &Heuristics) -> f32 {
    let mut score = h.placement_base;

    let mut scratch = board.clone();
    scratch.place(at, Piece::new(player, PieceKind::Pawn));
    if let Some(kind) = fusion::fusion_at(&scratch, at, player) {
        score += fusion_value(kind, h);
        fusion::execute(&mut scratch, at, player, kind);
        if !battle::adjacent_enemies(&scratch, at).is_empty() {
            score += fusion_battle_value(kind, h);
        }
    }

    score += position_score(at, player, h);
    score += h.fortress_pressure * (9.0 - f32::from(fortress_distance(at, player)));
    score
}

fn score_hopper_move(board: &Board, player: Player, from: Coord, to: Coord, h: &Heuristics) -> f32 {
    let mut score = h.hopper_base;

    let mut scratch = board.clone();
    if let Some(hopper) = scratch.remove(from) {
        if let Some(bumped) = scratch.remove(to) {
            scratch.place(from, bumped);
        }
        scratch.place(to, hopper);
    }
    let defenders = battle::adjacent_enemies(&scratch, to);
    if !defenders.is_empty() {
        score += h.hopper_battle;
        if battle::attack_power(&scratch, to) > battle::defense_power(&scratch, &defenders) {
            score += h.hopper_advantage;
        }
    }

    score += position_score(to, player, h);
    score
}

fn score_fusion(board: &Board, player: Player, at: Coord, h: &Heuristics) -> f32 {
    let Some(kind) = fusion::fusion_at(board, at, player) else {
        return f32::NEG_INFINITY;
    };
    let mut score = fusion_value(kind, h);

    let mut scratch = board.clone();
    fusion::execute(&mut scratch, at, player, kind);
    if !battle::adjacent_enemies(&scratch, at).is_empty() {
        score += fusion_battle_value(kind, h);
    }

    score + position_score(at, player, h)
}

fn fusion_value(kind: FusionKind, h: &Heuristics) -> f32 {
    match kind {
        FusionKind::Defender => h.defender_fusion,
        FusionKind::Hopper => h.hopper_fusion,
    }
}

fn fusion_battle_value(kind: FusionKind, h: &Heuristics) -> f32 {
    match kind {
        FusionKind::Defender => h.defender_fusion_battle,
        FusionKind::Hopper => h.hopper_fusion_battle,
    }
}

fn position_score(at: Coord, player: Player, h: &Heuristics) -> f32 {
    let mut score = h.center_weight * (7.0 - f32::from(at.manhattan(CENTER)));
    if at.col() == CENTER.col() {
        score += h.center_column;
    }
    let near_home = match player {
        Player::X => at.row() >= 7,
        Player::O => at.row() <= 3,
    };
    if near_home {
        score += h.home_guard;
    }
    score
}

/// Manhattan distance to the enemy fortress's home square (the fortress
/// never moves while it stands).
fn fortress_distance(at: Coord, player: Player) -> u8 {
    let enemy_home = Coord::new_unchecked(player.opponent().home_row(), CENTER.col());
    at.manhattan(enemy_home)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: u8, col: u8) -> Coord {
        Coord::new(row, col).unwrap()
    }

    #[test]
    fn test_default_weights_ordering() {
        let h = Heuristics::default();
        assert!(h.hopper_fusion > h.defender_fusion);
        assert!(h.hopper_base > h.placement_base);
        assert!(h.fortress_pressure > 0.0);
    }

    #[test]
    fn test_fusion_enabling_placement_outscores_plain() {
        let mut board = Board::new();
        let center = at(5, 3);
        for c in center.orthogonals() {
            board.place(c, Piece::new(Player::O, PieceKind::Pawn));
        }
        let h = Heuristics::default();
        let fusing = score_move(&board, Player::O, Move::Place(center), &h);
        let plain = score_move(&board, Player::O, Move::Place(at(3, 3)), &h);
        assert!(fusing > plain);
    }

    #[test]
    fn test_speculation_leaves_board_untouched() {
        let mut board = Board::new();
        let center = at(5, 3);
        for c in center.orthogonals() {
            board.place(c, Piece::new(Player::O, PieceKind::Pawn));
        }
        board.place(at(5, 5), Piece::new(Player::X, PieceKind::Hopper));
        let before = board.clone();

        let h = Heuristics::default();
        score_move(&board, Player::O, Move::Place(center), &h);
        assert_eq!(placement_enables_fusion(&board, center, Player::O), Some(FusionKind::Defender));
        score_move(
            &board,
            Player::X,
            Move::HopperMove {
                from: at(5, 5),
                to: at(4, 5),
            },
            &h,
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_hopper_move_into_winning_battle_scores_highest() {
        let mut board = Board::new();
        board.place(at(5, 3), Piece::new(Player::O, PieceKind::Hopper));
        board.place(at(5, 5), Piece::new(Player::X, PieceKind::Pawn));
        let h = Heuristics::default();

        // Landing at D5->E5 puts the hopper (attack 5) against a lone pawn
        // (defense 1); retreating to C5 finds no battle.
        let aggressive = score_move(
            &board,
            Player::O,
            Move::HopperMove {
                from: at(5, 3),
                to: at(5, 4),
            },
            &h,
        );
        let passive = score_move(
            &board,
            Player::O,
            Move::HopperMove {
                from: at(5, 3),
                to: at(5, 2),
            },
            &h,
        );
        assert!(aggressive > passive + h.hopper_battle);
    }

    #[test]
    fn test_central_column_and_home_guard() {
        let h = Heuristics::default();
        let central = position_score(at(5, 3), Player::X, &h);
        let wing = position_score(at(5, 0), Player::X, &h);
        assert!(central > wing);

        // Row 8 is a home rank for X but not for O.
        let guard = position_score(at(8, 3), Player::X, &h);
        let same_for_o = position_score(at(8, 3), Player::O, &h);
        assert!(guard > same_for_o);
    }
}
