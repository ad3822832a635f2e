use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::engine::{think_time, Difficulty};
use crate::moves::Move;
use crate::piece::{Color, PieceType};
use crate::session::{BotSettings, GameSession, Proposal};
use crate::status::GameStatus;
use crate::worker::{handle_request_json, BotDispatcher};

#[derive(Serialize)]
struct SquarePiece {
    piece_type: PieceType,
    color: Color,
}

#[derive(Serialize)]
struct MoveJson {
    from: [usize; 2],
    to: [usize; 2],
    promotion: Option<PieceType>,
}

impl From<&Move> for MoveJson {
    fn from(m: &Move) -> Self {
        MoveJson {
            from: [m.from.0, m.from.1],
            to: [m.to.0, m.to.1],
            promotion: m.promotion,
        }
    }
}

#[derive(Serialize)]
struct BoardState {
    squares: Vec<Vec<Option<SquarePiece>>>,
    current_turn: Color,
    status: GameStatus,
    history: Vec<String>,
    last_move: Option<[[usize; 2]; 2]>,
    bot_to_move: bool,
}

#[derive(Serialize)]
struct MoveResult {
    #[serde(flatten)]
    board_state: Option<BoardState>,
    promotion_required: bool,
    error: Option<String>,
}

fn build_board_state(session: &GameSession) -> BoardState {
    let board = session.board();
    let squares = (0..8)
        .map(|r| {
            (0..8)
                .map(|c| {
                    board.squares[r][c].map(|p| SquarePiece { piece_type: p.piece_type, color: p.color })
                })
                .collect()
        })
        .collect();

    BoardState {
        squares,
        current_turn: board.current_turn,
        status: session.status(),
        history: session.history().iter().map(|e| e.san.clone()).collect(),
        last_move: session
            .history()
            .last()
            .map(|e| [[e.record.from.0, e.record.from.1], [e.record.to.0, e.record.to.1]]),
        bot_to_move: session.is_bot_turn(),
    }
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn error_result(message: String) -> JsValue {
    to_js(&MoveResult { board_state: None, promotion_required: false, error: Some(message) })
}

/// Worker entry point: one JSON search request in, one JSON reply out.
#[wasm_bindgen]
pub fn search_worker_message(request: &str) -> String {
    handle_request_json(request)
}

#[wasm_bindgen]
pub fn bot_think_time(difficulty: &str) -> u32 {
    let difficulty = difficulty.parse().unwrap_or(Difficulty::Easy);
    think_time(difficulty) as u32
}

#[wasm_bindgen]
pub struct Game {
    session: GameSession,
}

#[wasm_bindgen]
impl Game {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Game {
        Game { session: GameSession::with_dispatcher(BotDispatcher::synchronous(), None) }
    }

    /// `difficulty` is easy/medium/hard/expert; an empty string removes the bot.
    pub fn set_bot(&mut self, difficulty: &str, bot_is_white: bool) -> Option<String> {
        if difficulty.is_empty() {
            self.session.set_bot(None);
            return None;
        }
        match difficulty.parse::<Difficulty>() {
            Ok(difficulty) => {
                let color = if bot_is_white { Color::White } else { Color::Black };
                self.session.set_bot(Some(BotSettings { difficulty, color }));
                None
            }
            Err(err) => Some(err.to_string()),
        }
    }

    pub fn reset(&mut self) -> JsValue {
        self.session.reset();
        self.get_board_state()
    }

    pub fn get_board_state(&self) -> JsValue {
        to_js(&build_board_state(&self.session))
    }

    pub fn make_move(
        &mut self,
        from_row: usize,
        from_col: usize,
        to_row: usize,
        to_col: usize,
        promotion: Option<String>,
    ) -> JsValue {
        let from = (from_row, from_col);
        let to = (to_row, to_col);
        let promotion = promotion
            .as_deref()
            .and_then(|s| s.chars().next())
            .and_then(PieceType::from_letter);

        if promotion.is_none() {
            match self.session.propose_move(from, to) {
                Ok(Proposal::PromotionRequired { .. }) => {
                    return to_js(&MoveResult {
                        board_state: Some(build_board_state(&self.session)),
                        promotion_required: true,
                        error: None,
                    });
                }
                Ok(Proposal::Ready(_)) => {}
                Err(err) => return error_result(err.to_string()),
            }
        }

        match self.session.commit(from, to, promotion) {
            Ok(_) => to_js(&MoveResult {
                board_state: Some(build_board_state(&self.session)),
                promotion_required: false,
                error: None,
            }),
            Err(err) => error_result(err.to_string()),
        }
    }

    pub fn make_bot_move(&mut self) -> JsValue {
        match self.session.play_bot_move() {
            Ok(_) => self.get_board_state(),
            Err(err) => error_result(err.to_string()),
        }
    }

    pub fn get_legal_moves_for_square(&mut self, row: usize, col: usize) -> JsValue {
        let moves: Vec<MoveJson> = self.session.legal_moves((row, col)).iter().map(MoveJson::from).collect();
        to_js(&moves)
    }
}
