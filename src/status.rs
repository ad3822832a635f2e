use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::piece::{Color, PieceType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameOverReason {
    Checkmate,
    Stalemate,
    Threefold,
    FiftyMove,
    InsufficientMaterial,
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GameOverReason::Checkmate => "checkmate",
            GameOverReason::Stalemate => "stalemate",
            GameOverReason::Threefold => "threefold",
            GameOverReason::FiftyMove => "fifty-move",
            GameOverReason::InsufficientMaterial => "insufficient-material",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    pub over: bool,
    pub reason: Option<GameOverReason>,
    pub winner: Option<Color>,
    pub in_check: bool,
}

impl GameStatus {
    fn in_progress(in_check: bool) -> Self {
        GameStatus { over: false, reason: None, winner: None, in_check }
    }

    fn draw(reason: GameOverReason, in_check: bool) -> Self {
        GameStatus { over: true, reason: Some(reason), winner: None, in_check }
    }
}

impl Board {
    /// Status of the game for the side to move.
    ///
    /// Checkmate and stalemate are decided first; then, in order, threefold
    /// repetition, the fifty-move rule and insufficient material.
    pub fn game_status(&mut self) -> GameStatus {
        let side = self.current_turn;
        let in_check = self.is_in_check(side);

        if !self.has_legal_move(side) {
            return if in_check {
                GameStatus {
                    over: true,
                    reason: Some(GameOverReason::Checkmate),
                    winner: Some(side.opposite()),
                    in_check: true,
                }
            } else {
                GameStatus::draw(GameOverReason::Stalemate, false)
            };
        }

        if self.repetition_count() >= 3 {
            return GameStatus::draw(GameOverReason::Threefold, in_check);
        }
        if self.halfmove_clock >= 100 {
            return GameStatus::draw(GameOverReason::FiftyMove, in_check);
        }
        if self.has_insufficient_material() {
            return GameStatus::draw(GameOverReason::InsufficientMaterial, in_check);
        }
        GameStatus::in_progress(in_check)
    }

    /// Bare kings, a single minor piece, or two bishops on same-coloured
    /// squares. Two knights and bishop + knight are still playable.
    pub fn has_insufficient_material(&self) -> bool {
        let mut pieces = Vec::new();
        for r in 0..8 {
            for c in 0..8 {
                if let Some(p) = self.squares[r][c] {
                    if !p.is_king() {
                        pieces.push((p.piece_type, r, c));
                    }
                }
            }
        }
        match pieces.as_slice() {
            [] => true,
            [(pt, _, _)] => pt.is_minor(),
            [(PieceType::Bishop, r1, c1), (PieceType::Bishop, r2, c2)] => {
                (r1 + c1) % 2 == (r2 + c2) % 2
            }
            _ => false,
        }
    }
}
