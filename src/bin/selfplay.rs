use std::process::ExitCode;

use chess_bot::engine::{choose_move, Difficulty};
use chess_bot::piece::Color;
use chess_bot::session::GameSession;
use tracing_subscriber::EnvFilter;

const MAX_PLIES: usize = 300;

fn parse_difficulty(arg: Option<String>, default: Difficulty) -> Result<Difficulty, String> {
    match arg {
        Some(text) => text.parse().map_err(|err| format!("{err}")),
        None => Ok(default),
    }
}

/// Usage: selfplay [white-difficulty] [black-difficulty]
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (white, black) = match (
        parse_difficulty(args.next(), Difficulty::Medium),
        parse_difficulty(args.next(), Difficulty::Medium),
    ) {
        (Ok(white), Ok(black)) => (white, black),
        (Err(err), _) | (_, Err(err)) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = GameSession::new();
    let mut line = String::new();

    while !session.status().over && session.history().len() < MAX_PLIES {
        let side = session.board().current_turn;
        let difficulty = if side == Color::White { white } else { black };
        let board = session.board();
        let Some(mv) = choose_move(board, difficulty, side, &board.repetition_counts) else {
            break;
        };
        let entry = match session.commit(mv.from, mv.to, mv.promotion) {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("bot produced an unplayable move {}: {err}", mv.to_uci());
                return ExitCode::FAILURE;
            }
        };

        if entry.record.mover == Color::White {
            line.push_str(&format!("{}. ", entry.record.move_number));
        }
        line.push_str(&entry.san);
        line.push(' ');
    }

    println!("{}", line.trim_end());
    let status = session.status();
    match (status.reason, status.winner) {
        (Some(reason), Some(winner)) => eprintln!("{winner:?} wins by {reason} after {} plies", session.history().len()),
        (Some(reason), None) => eprintln!("Draw by {reason} after {} plies", session.history().len()),
        _ => eprintln!("Stopped after {} plies", session.history().len()),
    }
    ExitCode::SUCCESS
}
