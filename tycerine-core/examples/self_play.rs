//! Scripted player vs the built-in AI, with the event feed printed.
//!
//! Run with: cargo run --example self_play

use tycerine_core::{CommandKind, Difficulty, GameResult, GameSession, MoveSelector, Phase};

fn main() -> Result<(), tycerine_core::GameError> {
    tracing_subscriber::fmt::init();

    let mut session = GameSession::new();
    session.set_ai_enabled(true);
    session.set_ai_difficulty(Difficulty::Hard);
    let mut selector = MoveSelector::with_seed(7);

    for step in 0..400 {
        if session.result() != GameResult::Ongoing {
            break;
        }
        if session.ai_turn_pending() {
            if !selector.take_turn(&mut session)? {
                session.forfeit()?;
            }
        } else {
            scripted_step(&mut session)?;
        }
        for event in session.take_events() {
            println!("{step:3}  {event:?}");
        }
    }

    println!("result: {:?}", session.result());
    println!("stats:  {:?}", session.stats());
    Ok(())
}

/// The scripted side takes the first legal option everywhere.
fn scripted_step(session: &mut GameSession) -> Result<(), tycerine_core::GameError> {
    if let Some((cell, _)) = session.pending_fusion() {
        return session.execute_fusion(cell.row(), cell.col());
    }
    match session.phase() {
        Phase::Free | Phase::Action => match session.valid_placement_cells().first() {
            Some(c) => session.request_placement(c.row(), c.col()),
            None => session.forfeit(),
        },
        Phase::Command => {
            let me = session.current_player();
            let kind = [CommandKind::March, CommandKind::Fortify, CommandKind::Fusion]
                .into_iter()
                .find(|&k| !session.command_cells(me, k).is_empty())
                .unwrap_or(CommandKind::March);
            session.choose_command(kind)
        }
        Phase::Response => {
            let me = session.current_player();
            let doable = session
                .current_command()
                .map(|k| !session.command_cells(me, k).is_empty())
                .unwrap_or(false);
            session.respond_to_command(doable)
        }
    }
}
