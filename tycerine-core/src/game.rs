//! Game session: the phase state machine, command negotiation, undo and
//! per-session stats
//!
//! All rule mutations flow through [`GameSession`]. Transitions are atomic:
//! a request either applies fully (board updated, notifications appended)
//! or is declined with no state change and an
//! [`crate::events::GameEvent::InvalidAction`] notification.

use crate::ai::Difficulty;
use crate::battle::{self, BattleOutcome};
use crate::board::{Board, Coord};
use crate::events::GameEvent;
use crate::fusion::{self, FusionKind};
use crate::pieces::{Piece, PieceKind, Player};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Column of both fortresses at game start (file D).
const FORTRESS_COL: u8 = 3;

/// Turn structure phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Current player moves freely; afterwards they issue a command.
    Free,
    /// The issuer picks a command for the opponent.
    Command,
    /// The target accepts or rejects the command.
    Response,
    /// Whoever ended up with the command executes it.
    Action,
}

/// The three commands an issuer can demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    March,
    Fortify,
    Fusion,
}

impl CommandKind {
    pub const fn name(self) -> &'static str {
        match self {
            CommandKind::March => "march",
            CommandKind::Fortify => "fortify",
            CommandKind::Fusion => "fusion",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Ongoing,
    Won(Player),
}

/// Monotonic per-session counters, cleared only by [`GameSession::reset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub defender_count: u32,
    pub hopper_count: u32,
    pub battle_wins: u32,
    pub turn_count: u32,
}

/// A turn action, as the AI enumerates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    /// Place a pawn.
    Place(Coord),
    /// Relocate a hopper within its 3x3 reach (swapping with an own piece
    /// when the destination is occupied).
    HopperMove { from: Coord, to: Coord },
    /// Execute the fusion centered at the cell.
    Fuse(Coord),
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("coordinate out of range: row {row}, column {col}")]
    InvalidCoordinate { row: u8, col: u8 },
    #[error("action not allowed in the current phase or at that cell")]
    IllegalAction,
    #[error("internal consistency fault: {0}")]
    InvariantViolation(&'static str),
}

/// Pre-move state captured for single-step undo.
#[derive(Clone, Debug)]
struct Snapshot {
    board: Board,
    current_player: Player,
    phase: Phase,
    command: Option<CommandKind>,
    command_issuer: Option<Player>,
    command_target: Option<Player>,
    command_accepted: Option<bool>,
    pending_fusion: Option<(Coord, FusionKind)>,
    result: GameResult,
}

// ============================================================================
// GAME SESSION
// ============================================================================

/// One game of Tycerine. Owns the board and all turn state exclusively;
/// collaborators observe it through accessors and the event feed.
#[derive(Debug)]
pub struct GameSession {
    board: Board,
    current_player: Player,
    phase: Phase,
    command: Option<CommandKind>,
    command_issuer: Option<Player>,
    command_target: Option<Player>,
    command_accepted: Option<bool>,
    /// A fusion offered at the landing cell of the last placement, waiting
    /// for the caller's execute/decline decision.
    pending_fusion: Option<(Coord, FusionKind)>,
    fusion_mode: bool,
    result: GameResult,
    stats: GameStats,
    history: Vec<Snapshot>,
    events: Vec<GameEvent>,
    ai_enabled: bool,
    ai_player: Player,
    ai_difficulty: Difficulty,
}

impl GameSession {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Standard game: both fortresses on file D of their home ranks, X to
    /// move in the free phase.
    pub fn new() -> Self {
        let mut session = Self::empty();
        session.setup();
        session
    }

    /// Start from an arbitrary position (test scaffolding and analysis).
    /// The caller supplies fortresses; `current_player` opens in the free
    /// phase.
    pub fn from_position(pieces: &[(Coord, Piece)], current_player: Player) -> Self {
        let mut session = Self::empty();
        for &(at, piece) in pieces {
            session.board.place(at, piece);
        }
        session.current_player = current_player;
        session.emit_phase();
        session
    }

    fn empty() -> Self {
        Self {
            board: Board::new(),
            current_player: Player::X,
            phase: Phase::Free,
            command: None,
            command_issuer: None,
            command_target: None,
            command_accepted: None,
            pending_fusion: None,
            fusion_mode: false,
            result: GameResult::Ongoing,
            stats: GameStats::default(),
            history: Vec::new(),
            events: Vec::new(),
            ai_enabled: false,
            ai_player: Player::O,
            ai_difficulty: Difficulty::default(),
        }
    }

    fn setup(&mut self) {
        for player in [Player::X, Player::O] {
            let at = Coord::new_unchecked(player.home_row(), FORTRESS_COL);
            let kind = PieceKind::fortress_for(player);
            self.board.place(at, Piece::new(player, kind));
            self.events.push(GameEvent::PiecePlaced {
                at,
                owner: player,
                kind,
            });
        }
        self.emit_phase();
    }

    /// Fresh game. Stats and history clear; AI settings survive.
    pub fn reset(&mut self) {
        let (ai_enabled, ai_player, ai_difficulty) =
            (self.ai_enabled, self.ai_player, self.ai_difficulty);
        *self = Self::empty();
        self.ai_enabled = ai_enabled;
        self.ai_player = ai_player;
        self.ai_difficulty = ai_difficulty;
        self.setup();
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_command(&self) -> Option<CommandKind> {
        self.command
    }

    pub fn command_issuer(&self) -> Option<Player> {
        self.command_issuer
    }

    pub fn command_target(&self) -> Option<Player> {
        self.command_target
    }

    pub fn command_accepted(&self) -> Option<bool> {
        self.command_accepted
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn stats(&self) -> GameStats {
        self.stats
    }

    pub fn pending_fusion(&self) -> Option<(Coord, FusionKind)> {
        self.pending_fusion
    }

    pub fn fusion_mode(&self) -> bool {
        self.fusion_mode
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled
    }

    pub fn ai_player(&self) -> Player {
        self.ai_player
    }

    pub fn ai_difficulty(&self) -> Difficulty {
        self.ai_difficulty
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Drain the notification feed in emission order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // LEGALITY
    // ========================================================================

    /// Cells the commanded move may use, independent of the current phase.
    /// March: the three forward-adjacent empty cells of each own piece.
    /// Fortify: the three backward-adjacent empty cells plus the two
    /// laterals. Fusion: every executable fusion center.
    pub fn command_cells(&self, player: Player, kind: CommandKind) -> Vec<Coord> {
        let set = self.projection(player, kind);
        Board::coords().filter(|c| set.contains(c)).collect()
    }

    /// Legal placement targets for the current player in the current
    /// phase, row-major. Empty outside the free/action phases or while a
    /// fusion decision is pending.
    pub fn valid_placement_cells(&self) -> Vec<Coord> {
        if self.result != GameResult::Ongoing || self.pending_fusion.is_some() {
            return Vec::new();
        }
        match self.phase {
            Phase::Free => {
                let mut set = self.projection(self.current_player, CommandKind::March);
                set.extend(self.projection(self.current_player, CommandKind::Fortify));
                Board::coords().filter(|c| set.contains(c)).collect()
            }
            Phase::Action => match self.command {
                Some(kind) => self.command_cells(self.current_player, kind),
                None => Vec::new(),
            },
            Phase::Command | Phase::Response => Vec::new(),
        }
    }

    /// Executable fusion centers for the current player, row-major.
    pub fn fusion_candidates(&self) -> Vec<Coord> {
        Board::coords()
            .filter(|&c| fusion::fusion_at(&self.board, c, self.current_player).is_some())
            .collect()
    }

    pub fn is_fusion_available(&self, row: u8, col: u8) -> bool {
        Coord::new(row, col)
            .map_or(false, |c| fusion::fusion_at(&self.board, c, self.current_player).is_some())
    }

    fn projection(&self, player: Player, kind: CommandKind) -> FxHashSet<Coord> {
        let mut cells = FxHashSet::default();
        match kind {
            CommandKind::March => {
                for (at, _) in self.pieces_of(player) {
                    self.project_row(at, player.forward(), &mut cells);
                }
            }
            CommandKind::Fortify => {
                for (at, _) in self.pieces_of(player) {
                    self.project_row(at, -player.forward(), &mut cells);
                    for dc in [-1, 1] {
                        if let Some(c) = at.offset(0, dc) {
                            if self.board.is_empty(c) {
                                cells.insert(c);
                            }
                        }
                    }
                }
            }
            CommandKind::Fusion => {
                for c in Board::coords() {
                    if fusion::fusion_at(&self.board, c, player).is_some() {
                        cells.insert(c);
                    }
                }
            }
        }
        cells
    }

    fn project_row(&self, from: Coord, dr: i8, cells: &mut FxHashSet<Coord>) {
        for dc in -1..=1 {
            if let Some(c) = from.offset(dr, dc) {
                if self.board.is_empty(c) {
                    cells.insert(c);
                }
            }
        }
    }

    fn pieces_of(&self, player: Player) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        self.board.pieces().filter(move |(_, p)| p.owner == player)
    }

    // ========================================================================
    // MOVES
    // ========================================================================

    /// Place a pawn for the current player. In the action phase under a
    /// fusion command this executes the fusion at the cell instead.
    pub fn request_placement(&mut self, row: u8, col: u8) -> Result<(), GameError> {
        let at = Coord::new(row, col).ok_or(GameError::InvalidCoordinate { row, col })?;
        self.place_at(at)
    }

    /// Relocate the current player's hopper. `from`/`to` are (row, col).
    pub fn request_hopper_move(&mut self, from: (u8, u8), to: (u8, u8)) -> Result<(), GameError> {
        let from = Coord::new(from.0, from.1).ok_or(GameError::InvalidCoordinate {
            row: from.0,
            col: from.1,
        })?;
        let to = Coord::new(to.0, to.1).ok_or(GameError::InvalidCoordinate {
            row: to.0,
            col: to.1,
        })?;
        self.hopper_move(from, to)
    }

    /// Apply an enumerated [`Move`].
    pub fn apply_move(&mut self, mv: Move) -> Result<(), GameError> {
        match mv {
            Move::Place(at) => self.place_at(at),
            Move::HopperMove { from, to } => self.hopper_move(from, to),
            Move::Fuse(at) => self.fuse_at(at),
        }
    }

    fn place_at(&mut self, at: Coord) -> Result<(), GameError> {
        if self.result != GameResult::Ongoing || self.pending_fusion.is_some() {
            return self.reject();
        }
        if !matches!(self.phase, Phase::Free | Phase::Action) {
            return self.reject();
        }
        if self.phase == Phase::Action && self.command == Some(CommandKind::Fusion) {
            return self.fuse_at(at);
        }
        if !self.valid_placement_cells().contains(&at) {
            return self.reject();
        }

        self.push_snapshot();
        let piece = Piece::new(self.current_player, PieceKind::Pawn);
        self.board.place(at, piece);
        self.events.push(GameEvent::PiecePlaced {
            at,
            owner: piece.owner,
            kind: piece.kind,
        });
        tracing::debug!(player = %piece.owner, cell = %at, "pawn placed");
        self.stats.turn_count += 1;

        if self.resolve_battle_at(at) {
            return Ok(());
        }
        if let Some(kind) = fusion::fusion_at(&self.board, at, self.current_player) {
            // Offer the landing-cell fusion; the caller decides via
            // execute_fusion/decline_fusion before the phase advances.
            self.pending_fusion = Some((at, kind));
            return Ok(());
        }
        self.complete_move();
        self.check_fortresses()
    }

    fn hopper_move(&mut self, from: Coord, to: Coord) -> Result<(), GameError> {
        if self.result != GameResult::Ongoing
            || self.pending_fusion.is_some()
            || self.phase != Phase::Free
        {
            return self.reject();
        }
        let Some(hopper) = self.board.piece_at(from) else {
            return self.reject();
        };
        if hopper.owner != self.current_player || hopper.kind != PieceKind::Hopper {
            return self.reject();
        }
        if from.chebyshev(to) != 1 {
            return self.reject();
        }
        let swapped = match self.board.piece_at(to) {
            None => None,
            // Fortresses are immovable; everything else of our own swaps.
            Some(p) if p.owner == self.current_player && !p.is_fortress() => Some(p),
            Some(_) => return self.reject(),
        };

        self.push_snapshot();
        self.stats.turn_count += 1;
        self.board.remove(from);
        self.events.push(GameEvent::PieceRemoved { at: from });
        if let Some(bumped) = swapped {
            self.board.remove(to);
            self.events.push(GameEvent::PieceRemoved { at: to });
            self.board.place(from, bumped);
            self.events.push(GameEvent::PiecePlaced {
                at: from,
                owner: bumped.owner,
                kind: bumped.kind,
            });
        }
        self.board.place(to, hopper);
        self.events.push(GameEvent::PiecePlaced {
            at: to,
            owner: hopper.owner,
            kind: hopper.kind,
        });
        tracing::debug!(player = %hopper.owner, from = %from, to = %to, "hopper moved");

        if self.resolve_battle_at(to) {
            return Ok(());
        }
        self.complete_move();
        self.check_fortresses()
    }

    // ========================================================================
    // FUSION DECISIONS
    // ========================================================================

    /// Execute a fusion: either the pending landing-cell offer, a
    /// standalone free-phase fusion (the turn's move), or the commanded
    /// move under a fusion command.
    pub fn execute_fusion(&mut self, row: u8, col: u8) -> Result<(), GameError> {
        let at = Coord::new(row, col).ok_or(GameError::InvalidCoordinate { row, col })?;
        self.fuse_at(at)
    }

    /// Turn down the pending landing-cell fusion and let the turn finish.
    pub fn decline_fusion(&mut self) -> Result<(), GameError> {
        if self.result != GameResult::Ongoing || self.pending_fusion.take().is_none() {
            return self.reject();
        }
        self.complete_move();
        self.check_fortresses()
    }

    fn fuse_at(&mut self, at: Coord) -> Result<(), GameError> {
        if self.result != GameResult::Ongoing {
            return self.reject();
        }
        if let Some((cell, kind)) = self.pending_fusion {
            if cell != at {
                return self.reject();
            }
            // Part of the placement move; its snapshot already covers us.
            self.pending_fusion = None;
            self.fuse(cell, kind);
            if self.resolve_battle_at(cell) {
                return Ok(());
            }
            self.complete_move();
            return self.check_fortresses();
        }

        let allowed = match self.phase {
            Phase::Free => true,
            Phase::Action => self.command == Some(CommandKind::Fusion),
            Phase::Command | Phase::Response => false,
        };
        let Some(kind) = fusion::fusion_at(&self.board, at, self.current_player) else {
            return self.reject();
        };
        if !allowed {
            return self.reject();
        }

        self.push_snapshot();
        self.stats.turn_count += 1;
        self.fuse(at, kind);
        if self.resolve_battle_at(at) {
            return Ok(());
        }
        self.complete_move();
        self.check_fortresses()
    }

    fn fuse(&mut self, center: Coord, kind: FusionKind) {
        let owner = self.current_player;
        let removed = fusion::execute(&mut self.board, center, owner, kind);
        for &c in &removed {
            self.events.push(GameEvent::PieceRemoved { at: c });
        }
        let product = kind.product();
        self.events.push(GameEvent::PiecePlaced {
            at: center,
            owner,
            kind: product,
        });
        self.events.push(GameEvent::FusionExecuted {
            kind,
            at: center,
            owner,
        });
        match kind {
            FusionKind::Defender => self.stats.defender_count += 1,
            FusionKind::Hopper => self.stats.hopper_count += 1,
        }
        tracing::info!(player = %owner, cell = %center, product = product.name(), "fusion executed");
    }

    // ========================================================================
    // COMMAND NEGOTIATION
    // ========================================================================

    /// The issuer picks a command; the target gets the response.
    pub fn choose_command(&mut self, kind: CommandKind) -> Result<(), GameError> {
        if self.result != GameResult::Ongoing || self.phase != Phase::Command {
            return self.reject();
        }
        let Some(target) = self.command_target else {
            return self.reject();
        };
        self.command = Some(kind);
        self.command_accepted = None;
        self.current_player = target;
        self.phase = Phase::Response;
        tracing::debug!(command = kind.name(), target = %target, "command issued");
        self.emit_phase();
        Ok(())
    }

    /// The target accepts (and must execute) or rejects (and the issuer
    /// must execute instead).
    pub fn respond_to_command(&mut self, accepted: bool) -> Result<(), GameError> {
        if self.result != GameResult::Ongoing || self.phase != Phase::Response {
            return self.reject();
        }
        let (Some(kind), Some(issuer)) = (self.command, self.command_issuer) else {
            return self.reject();
        };
        self.command_accepted = Some(accepted);
        if !accepted {
            self.current_player = issuer;
        }
        self.phase = Phase::Action;
        tracing::debug!(
            command = kind.name(),
            accepted,
            actor = %self.current_player,
            "command answered"
        );
        self.emit_phase();

        // A player who cannot act on the command loses outright.
        if self.command_cells(self.current_player, kind).is_empty() {
            let winner = self.current_player.opponent();
            tracing::info!(loser = %self.current_player, command = kind.name(), "commanded move impossible");
            self.finish(winner);
        }
        Ok(())
    }

    // ========================================================================
    // SESSION CONTROLS
    // ========================================================================

    /// Restore the state before the most recent move. Returns false when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snap) = self.history.pop() else {
            return false;
        };
        self.board = snap.board;
        self.current_player = snap.current_player;
        self.phase = snap.phase;
        self.command = snap.command;
        self.command_issuer = snap.command_issuer;
        self.command_target = snap.command_target;
        self.command_accepted = snap.command_accepted;
        self.pending_fusion = snap.pending_fusion;
        self.result = snap.result;
        self.emit_phase();
        true
    }

    /// Concede: the opponent wins immediately.
    pub fn forfeit(&mut self) -> Result<(), GameError> {
        if self.result != GameResult::Ongoing {
            return self.reject();
        }
        self.finish(self.current_player.opponent());
        Ok(())
    }

    /// Flip the fusion-mode UI flag. The engine accepts `execute_fusion`
    /// either way; the flag drives candidate highlighting.
    pub fn toggle_fusion_mode(&mut self) -> bool {
        self.fusion_mode = !self.fusion_mode;
        self.fusion_mode
    }

    pub fn set_ai_enabled(&mut self, enabled: bool) {
        self.ai_enabled = enabled;
    }

    pub fn set_ai_difficulty(&mut self, difficulty: Difficulty) {
        self.ai_difficulty = difficulty;
    }

    /// True when the engine expects the AI to act (the caller decides when,
    /// typically after a short UI pause).
    pub fn ai_turn_pending(&self) -> bool {
        self.ai_enabled
            && self.result == GameResult::Ongoing
            && self.current_player == self.ai_player
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn reject(&mut self) -> Result<(), GameError> {
        self.events.push(GameEvent::InvalidAction);
        Err(GameError::IllegalAction)
    }

    fn push_snapshot(&mut self) {
        self.history.push(Snapshot {
            board: self.board.clone(),
            current_player: self.current_player,
            phase: self.phase,
            command: self.command,
            command_issuer: self.command_issuer,
            command_target: self.command_target,
            command_accepted: self.command_accepted,
            pending_fusion: self.pending_fusion,
            result: self.result,
        });
    }

    /// Resolve any battle at the landing cell. A battle ends the turn on
    /// the spot: the opponent gets a free move and all command state
    /// clears, or the game ends on a fortress kill.
    fn resolve_battle_at(&mut self, at: Coord) -> bool {
        let defenders = battle::adjacent_enemies(&self.board, at);
        if defenders.is_empty() {
            return false;
        }
        let report = battle::resolve(&mut self.board, at, &defenders);
        tracing::info!(
            attacker = %at,
            attack = report.attack,
            defense = report.defense,
            outcome = ?report.outcome,
            "battle resolved"
        );
        self.events.push(GameEvent::BattleResolved {
            attacker: at,
            defenders,
            attack: report.attack,
            defense: report.defense,
            outcome: report.outcome,
        });
        for &c in &report.removed {
            self.events.push(GameEvent::PieceRemoved { at: c });
        }
        if report.outcome == BattleOutcome::AttackerWins {
            self.stats.battle_wins += 1;
        }
        match report.fortress_destroyed {
            Some(owner) => self.finish(owner.opponent()),
            None => self.pass_turn(),
        }
        true
    }

    /// Advance the phase after a completed battle-free move.
    fn complete_move(&mut self) {
        match self.phase {
            Phase::Free => self.open_command_phase(),
            Phase::Action => {
                if self.command_accepted == Some(true) {
                    // Accepted: the actor becomes the next issuer.
                    self.clear_command_state();
                    self.open_command_phase();
                } else {
                    // Rejected: back to a free turn for the original target.
                    let next = self
                        .command_target
                        .unwrap_or_else(|| self.current_player.opponent());
                    self.clear_command_state();
                    self.current_player = next;
                    self.phase = Phase::Free;
                    self.emit_phase();
                }
            }
            Phase::Command | Phase::Response => {}
        }
    }

    fn open_command_phase(&mut self) {
        self.command_issuer = Some(self.current_player);
        self.command_target = Some(self.current_player.opponent());
        self.phase = Phase::Command;
        self.emit_phase();
    }

    fn pass_turn(&mut self) {
        self.current_player = self.current_player.opponent();
        self.phase = Phase::Free;
        self.clear_command_state();
        self.pending_fusion = None;
        self.emit_phase();
    }

    fn clear_command_state(&mut self) {
        self.command = None;
        self.command_issuer = None;
        self.command_target = None;
        self.command_accepted = None;
    }

    fn emit_phase(&mut self) {
        self.events.push(GameEvent::PhaseChanged {
            phase: self.phase,
            player: self.current_player,
        });
        tracing::debug!(phase = ?self.phase, player = %self.current_player, "phase changed");
    }

    fn finish(&mut self, winner: Player) {
        self.result = GameResult::Won(winner);
        self.clear_command_state();
        self.pending_fusion = None;
        self.events.push(GameEvent::GameEnded {
            winner,
            stats: self.stats,
        });
        tracing::info!(winner = %winner, "game over");
    }

    /// Both fortresses must stand while the game is ongoing; anything else
    /// is an internal fault. The session is reset to a playable state.
    fn check_fortresses(&mut self) -> Result<(), GameError> {
        if self.result != GameResult::Ongoing {
            return Ok(());
        }
        for player in [Player::X, Player::O] {
            if self.board.fortress_of(player).is_none() {
                tracing::error!(player = %player, "fortress missing outside battle resolution; resetting session");
                self.reset();
                return Err(GameError::InvariantViolation("fortress missing"));
            }
        }
        Ok(())
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
