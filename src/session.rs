//! One game from the caller's point of view.
//!
//! [`GameSession`] owns the live board, the committed history and the bot
//! settings. Human moves go through [`GameSession::propose_move`] and
//! [`GameSession::commit`]; bot moves go through the dispatcher and are
//! validated against the live board before they are played.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::board::{ApplyOptions, Board};
use crate::engine::Difficulty;
use crate::error::{SessionError, SessionResult};
use crate::moves::{square_name, Move, MoveRecord, Square};
use crate::piece::{Color, PieceType};
use crate::san::move_to_san;
use crate::status::GameStatus;
use crate::worker::{BotDispatcher, SearchHandle, SearchPoll};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSettings {
    pub difficulty: Difficulty,
    pub color: Color,
}

/// A committed move with its SAN text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: MoveRecord,
    pub san: String,
}

/// Answer to [`GameSession::propose_move`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Proposal {
    /// The move can be committed as is.
    Ready(Move),
    /// A pawn reaches the last rank; call [`GameSession::commit`] with a piece.
    PromotionRequired { from: Square, to: Square, color: Color },
}

/// What happened to an outstanding bot search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotTurn {
    Thinking,
    Played(HistoryEntry),
    /// The bot found nothing to play; the status has been re-derived.
    NoMove(GameStatus),
}

pub struct GameSession {
    board: Board,
    history: Vec<HistoryEntry>,
    status: GameStatus,
    bot: Option<BotSettings>,
    dispatcher: BotDispatcher,
    search: Option<SearchHandle>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    /// Two-player game from the starting position.
    pub fn new() -> Self {
        Self::with_dispatcher(BotDispatcher::new(), None)
    }

    pub fn with_bot(difficulty: Difficulty, color: Color) -> Self {
        Self::with_dispatcher(BotDispatcher::new(), Some(BotSettings { difficulty, color }))
    }

    pub fn with_dispatcher(dispatcher: BotDispatcher, bot: Option<BotSettings>) -> Self {
        let mut board = Board::new();
        let status = board.game_status();
        GameSession { board, history: Vec::new(), status, bot, dispatcher, search: None }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn bot(&self) -> Option<BotSettings> {
        self.bot
    }

    /// Change or remove the bot. Any search in flight is voided.
    pub fn set_bot(&mut self, bot: Option<BotSettings>) {
        self.cancel_search();
        self.bot = bot;
    }

    /// Back to the starting position, keeping the bot settings.
    pub fn reset(&mut self) {
        self.cancel_search();
        self.board = Board::new();
        self.history.clear();
        self.status = self.board.game_status();
    }

    pub fn is_bot_turn(&self) -> bool {
        !self.status.over && self.bot.is_some_and(|bot| bot.color == self.board.current_turn)
    }

    /// Legal moves of the piece on `from`, for highlighting.
    pub fn legal_moves(&mut self, from: Square) -> Vec<Move> {
        self.board.legal_moves(from)
    }

    /// Check a human move. Promotions are not played until a piece is chosen.
    pub fn propose_move(&mut self, from: Square, to: Square) -> SessionResult<Proposal> {
        self.check_human_can_move(from)?;
        let candidates: Vec<Move> = self
            .board
            .legal_moves(from)
            .into_iter()
            .filter(|mv| mv.to == to)
            .collect();
        let Some(&first) = candidates.first() else {
            return Err(illegal(from, to));
        };
        if first.is_promotion() {
            Ok(Proposal::PromotionRequired { from, to, color: first.piece.color })
        } else {
            Ok(Proposal::Ready(first))
        }
    }

    /// Play a human move. `promotion` is required to be a queen, rook,
    /// bishop or knight when given; a promotion without a choice becomes a queen.
    pub fn commit(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> SessionResult<HistoryEntry> {
        self.check_human_can_move(from)?;
        if let Some(piece) = promotion {
            if !PieceType::PROMOTIONS.contains(&piece) {
                return Err(SessionError::InvalidPromotion { piece });
            }
        }
        let mv = self
            .board
            .find_legal_move(from, to, promotion)
            .ok_or_else(|| illegal(from, to))?;
        self.play(mv)
    }

    /// Ask the dispatcher for a bot move on a copy of the live position.
    pub fn request_bot_move(&mut self) -> SessionResult<SearchHandle> {
        if let Some(reason) = self.status.reason {
            return Err(SessionError::GameOver { reason });
        }
        let Some(bot) = self.bot.filter(|_| self.is_bot_turn()) else {
            return Err(SessionError::NotBotTurn);
        };
        let handle = self.dispatcher.request(self.board.snapshot(), bot.difficulty, bot.color);
        self.search = Some(handle);
        Ok(handle)
    }

    /// Collect the bot's move without blocking. `None` when no search is out.
    pub fn poll_bot(&mut self) -> Option<BotTurn> {
        let handle = self.search?;
        let poll = self.dispatcher.poll(handle);
        self.finish_search(poll)
    }

    /// Block until the bot's move arrives. `None` when no search is out.
    pub fn wait_bot(&mut self) -> Option<BotTurn> {
        let handle = self.search?;
        let poll = self.dispatcher.wait(handle);
        self.finish_search(poll)
    }

    /// Request and wait in one step.
    pub fn play_bot_move(&mut self) -> SessionResult<BotTurn> {
        self.request_bot_move()?;
        Ok(self.wait_bot().unwrap_or(BotTurn::NoMove(self.status)))
    }

    fn finish_search(&mut self, poll: SearchPoll) -> Option<BotTurn> {
        match poll {
            SearchPoll::Pending => Some(BotTurn::Thinking),
            SearchPoll::Stale => {
                self.search = None;
                None
            }
            SearchPoll::Ready(found) => {
                self.search = None;
                let legal = found.and_then(|mv| self.board.find_legal_move(mv.from, mv.to, mv.promotion));
                match legal.map(|mv| self.play(mv)) {
                    Some(Ok(entry)) => Some(BotTurn::Played(entry)),
                    Some(Err(err)) => {
                        warn!(error = %err, "bot move rejected");
                        Some(self.rederive_status())
                    }
                    None => Some(self.rederive_status()),
                }
            }
        }
    }

    fn rederive_status(&mut self) -> BotTurn {
        self.status = self.board.game_status();
        BotTurn::NoMove(self.status)
    }

    fn cancel_search(&mut self) {
        if self.search.take().is_some() {
            self.dispatcher.cancel();
        }
    }

    fn check_human_can_move(&self, from: Square) -> SessionResult<()> {
        if let Some(reason) = self.status.reason {
            return Err(SessionError::GameOver { reason });
        }
        if self.is_bot_turn() {
            return Err(SessionError::BotToMove);
        }
        let piece = self
            .board
            .piece_at(from)
            .ok_or_else(|| SessionError::EmptySquare { square: square_name(from) })?;
        if piece.color != self.board.current_turn {
            return Err(SessionError::WrongSide {
                square: square_name(from),
                to_move: self.board.current_turn,
                piece_color: piece.color,
            });
        }
        Ok(())
    }

    fn play(&mut self, mv: Move) -> SessionResult<HistoryEntry> {
        let before = self.board.clone();
        let record = self
            .board
            .apply_move(&mv, ApplyOptions::commit())
            .ok_or_else(|| illegal(mv.from, mv.to))?;
        let san = move_to_san(&before, &record, &self.board);
        let entry = HistoryEntry { record, san };
        self.history.push(entry.clone());

        self.status = self.board.game_status();
        if let Some(reason) = self.status.reason {
            info!(%reason, winner = ?self.status.winner, moves = self.history.len(), "game over");
        }
        Ok(entry)
    }
}

fn illegal(from: Square, to: Square) -> SessionError {
    SessionError::IllegalMove { from: square_name(from), to: square_name(to) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::GameOverReason;

    fn sync_session(bot: Option<BotSettings>) -> GameSession {
        GameSession::with_dispatcher(BotDispatcher::synchronous(), bot)
    }

    #[test]
    fn human_moves_build_history_with_san() {
        let mut session = sync_session(None);
        session.commit((1, 4), (3, 4), None).expect("e4");
        session.commit((6, 4), (4, 4), None).expect("e5");
        let sans: Vec<&str> = session.history().iter().map(|e| e.san.as_str()).collect();
        assert_eq!(sans, ["e4", "e5"]);
        assert_eq!(session.history()[1].record.mover, Color::Black);
        assert_eq!(session.history()[1].record.move_number, 1);
    }

    #[test]
    fn errors_for_bad_input() {
        let mut session = sync_session(None);
        assert!(matches!(session.commit((3, 3), (4, 3), None), Err(SessionError::EmptySquare { .. })));
        assert!(matches!(session.commit((6, 4), (4, 4), None), Err(SessionError::WrongSide { .. })));
        assert!(matches!(session.commit((1, 4), (4, 4), None), Err(SessionError::IllegalMove { .. })));
        assert!(session.history().is_empty());
    }

    #[test]
    fn promotion_is_two_phase() {
        let mut session = sync_session(None);
        // a-pawn marches and captures its way to b8
        for (from, to) in [
            ((1, 0), (3, 0)), ((6, 7), (5, 7)),
            ((3, 0), (4, 0)), ((5, 7), (4, 7)),
            ((4, 0), (5, 0)), ((4, 7), (3, 7)),
            ((5, 0), (6, 1)), ((6, 6), (5, 6)),
        ] {
            session.commit(from, to, None).expect("scripted move");
        }

        let proposal = session.propose_move((6, 1), (7, 0)).expect("bxa8 is legal");
        assert_eq!(proposal, Proposal::PromotionRequired { from: (6, 1), to: (7, 0), color: Color::White });
        assert!(matches!(
            session.commit((6, 1), (7, 0), Some(PieceType::King)),
            Err(SessionError::InvalidPromotion { .. })
        ));

        let entry = session.commit((6, 1), (7, 0), Some(PieceType::Knight)).expect("promotes");
        assert_eq!(entry.record.promotion, Some(PieceType::Knight));
        assert_eq!(entry.san, "bxa8=N");
        assert_eq!(
            session.board().piece_at((7, 0)).map(|p| p.piece_type),
            Some(PieceType::Knight)
        );
    }

    #[test]
    fn fools_mate_ends_the_session() {
        let mut session = sync_session(None);
        session.commit((1, 5), (2, 5), None).expect("f3");
        session.commit((6, 4), (4, 4), None).expect("e5");
        session.commit((1, 6), (3, 6), None).expect("g4");
        let mate = session.commit((7, 3), (3, 7), None).expect("Qh4#");
        assert_eq!(mate.san, "Qh4#");

        let status = session.status();
        assert!(status.over);
        assert_eq!(status.reason, Some(GameOverReason::Checkmate));
        assert_eq!(status.winner, Some(Color::Black));
        assert!(matches!(session.commit((0, 4), (1, 5), None), Err(SessionError::GameOver { .. })));
    }

    #[test]
    fn bot_replies_to_human() {
        let bot = BotSettings { difficulty: Difficulty::Easy, color: Color::Black };
        let mut session = sync_session(Some(bot));
        assert!(matches!(session.request_bot_move(), Err(SessionError::NotBotTurn)));

        session.commit((1, 4), (3, 4), None).expect("e4");
        assert!(session.is_bot_turn());
        assert!(matches!(session.commit((6, 4), (4, 4), None), Err(SessionError::BotToMove)));

        match session.play_bot_move().expect("bot may move") {
            BotTurn::Played(entry) => assert_eq!(entry.record.mover, Color::Black),
            other => panic!("expected a bot move, got {other:?}"),
        }
        assert_eq!(session.board().current_turn, Color::White);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn reset_voids_outstanding_search() {
        let bot = BotSettings { difficulty: Difficulty::Easy, color: Color::White };
        let mut session = sync_session(Some(bot));
        session.request_bot_move().expect("bot to move");
        session.reset();
        assert_eq!(session.poll_bot(), None);
        assert!(session.history().is_empty());
        assert_eq!(*session.board(), Board::new());
    }
}
