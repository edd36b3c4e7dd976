//! Battle detection and resolution
//!
//! A piece landing orthogonally adjacent to enemy pieces starts a battle
//! against all of them at once. Power is summed over each side's 3x3
//! support neighborhoods and compared without tie-breaks; the losing side's
//! pieces in those neighborhoods are removed. Destroying a fortress ends
//! the game on the spot.

use crate::board::{Board, Coord};
use crate::pieces::Player;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Outcome of a power comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Equal power: both sides' pieces are removed.
    MutualDestruction,
    AttackerWins,
    DefendersWin,
}

/// What a resolution did to the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleReport {
    pub outcome: BattleOutcome,
    pub attack: u32,
    pub defense: u32,
    /// Removed cells in scan order. Empty when a fortress hit ended the
    /// game before removals were applied.
    pub removed: Vec<Coord>,
    /// Owner of a fortress caught in the removal scan, if any.
    pub fortress_destroyed: Option<Player>,
}

/// Opposing pieces orthogonally adjacent to `cell`. Any hit means battle.
pub fn adjacent_enemies(board: &Board, cell: Coord) -> Vec<Coord> {
    let Some(piece) = board.piece_at(cell) else {
        return Vec::new();
    };
    cell.orthogonals()
        .filter(|&c| board.piece_at(c).map_or(false, |p| p.owner != piece.owner))
        .collect()
}

/// Attacker's own attack plus same-owner attack over its surrounding ring.
pub fn attack_power(board: &Board, attacker: Coord) -> u32 {
    let Some(piece) = board.piece_at(attacker) else {
        return 0;
    };
    let mut power = piece.kind.attack();
    for c in attacker.ring() {
        if let Some(p) = board.piece_at(c) {
            if p.owner == piece.owner {
                power += p.kind.attack();
            }
        }
    }
    power
}

/// Sum of the defenders' own defense plus same-owner support over the union
/// of their rings. Cells that are themselves defenders never double as
/// support, and each supporter counts at most once across all defenders.
pub fn defense_power(board: &Board, defenders: &[Coord]) -> u32 {
    let Some(side) = defenders
        .first()
        .and_then(|&c| board.piece_at(c))
        .map(|p| p.owner)
    else {
        return 0;
    };

    let defender_cells: FxHashSet<Coord> = defenders.iter().copied().collect();
    let mut counted = FxHashSet::default();
    let mut power = 0;

    for &d in defenders {
        if let Some(p) = board.piece_at(d) {
            power += p.kind.defense();
        }
        for c in d.ring() {
            if defender_cells.contains(&c) || !counted.insert(c) {
                continue;
            }
            if let Some(p) = board.piece_at(c) {
                if p.owner == side {
                    power += p.kind.defense();
                }
            }
        }
    }
    power
}

/// Resolve a detected battle. Scans the 3x3 neighborhood of every
/// participant (attacker first, then each defender) and removes pieces
/// owned by the losing side; on equal power every piece in those
/// neighborhoods goes. A fortress matching the removal filter ends the
/// game immediately: the scan stops and no removals are applied.
pub fn resolve(board: &mut Board, attacker: Coord, defenders: &[Coord]) -> BattleReport {
    let attack = attack_power(board, attacker);
    let defense = defense_power(board, defenders);
    let outcome = if attack == defense {
        BattleOutcome::MutualDestruction
    } else if attack > defense {
        BattleOutcome::AttackerWins
    } else {
        BattleOutcome::DefendersWin
    };

    let attacking = board.piece_at(attacker).map(|p| p.owner);
    let should_remove = |owner: Player| match outcome {
        BattleOutcome::MutualDestruction => true,
        BattleOutcome::AttackerWins => Some(owner) != attacking,
        BattleOutcome::DefendersWin => Some(owner) == attacking,
    };

    let mut seen = FxHashSet::default();
    let mut to_remove = Vec::new();
    let mut fortress_destroyed = None;

    'scan: for &center in std::iter::once(&attacker).chain(defenders.iter()) {
        for c in center.neighborhood() {
            if !seen.insert(c) {
                continue;
            }
            let Some(piece) = board.piece_at(c) else {
                continue;
            };
            if !should_remove(piece.owner) {
                continue;
            }
            if piece.is_fortress() {
                fortress_destroyed = Some(piece.owner);
                to_remove.clear();
                break 'scan;
            }
            to_remove.push(c);
        }
    }

    if fortress_destroyed.is_none() {
        for &c in &to_remove {
            board.remove(c);
        }
    }

    BattleReport {
        outcome,
        attack,
        defense,
        removed: to_remove,
        fortress_destroyed,
    }
}
