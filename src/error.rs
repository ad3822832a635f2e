//! Error types for the game session and the search worker.
//!
//! Rules-level operations on [`Board`](crate::board::Board) report malformed
//! input as `None`; only the orchestration layers return these errors.

use thiserror::Error;

use crate::piece::{Color, PieceType};
use crate::status::GameOverReason;

/// Errors returned by [`GameSession`](crate::session::GameSession).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No more moves can be played
    #[error("Game is over: {reason}")]
    GameOver { reason: GameOverReason },

    /// Nothing stands on the origin square
    #[error("No piece on {square}")]
    EmptySquare { square: String },

    /// The piece on the origin belongs to the side not on move
    #[error("It is {to_move:?}'s turn, the piece on {square} is {piece_color:?}")]
    WrongSide { square: String, to_move: Color, piece_color: Color },

    /// Not among the legal moves of the position
    #[error("Illegal move: {from}{to}")]
    IllegalMove { from: String, to: String },

    /// A pawn can only become a queen, rook, bishop or knight
    #[error("Invalid promotion choice: {piece:?}")]
    InvalidPromotion { piece: PieceType },

    /// The bot was asked to move while it is the human's turn
    #[error("It is not the bot's turn")]
    NotBotTurn,

    /// A human move was offered while the bot is to move
    #[error("Waiting for the bot to move")]
    BotToMove,
}

/// Errors at the delegated-search boundary.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The search thread could not be started
    #[error("Failed to spawn search worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The search thread is gone
    #[error("Search worker disconnected")]
    Disconnected,

    /// A request or response did not decode
    #[error("Malformed search message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Text that does not name a difficulty level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown difficulty '{0}' (expected easy, medium, hard or expert)")]
pub struct ParseDifficultyError(pub String);

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;
