// =============================================================================
// Chess AI Engine
//
// Minimax with alpha-beta pruning from the bot's point of view: the bot's
// plies maximize, the opponent's minimize. Leaves are resolved by a short
// quiescence search over captures and promotions so that the static
// evaluation is never taken in the middle of an exchange.
//
// The search runs inside iterative deepening under a wall-clock deadline. An
// iteration that runs out of time is thrown away; the move from the last
// completed depth is kept. Every search works on a private copy of the board
// using make/unmake, so the live game is never touched.
//
// Coordinate system: row 0 = rank 1, col 0 = file a.
// =============================================================================

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;
use web_time::Instant;

use crate::board::Board;
use crate::error::ParseDifficultyError;
use crate::eval::evaluate;
use crate::moves::Move;
use crate::piece::{Color, Piece, PieceType};

/// Score of delivering mate on the next ply. Mates further away score less.
pub const MATE_SCORE: i32 = 100_000;
const INF: i32 = 1_000_000_000;

/// The clock is read once every this many nodes (mask + 1).
const NODE_CHECK_MASK: u64 = 1023;

/// Seed for the default move-choice RNG.
/// Uses js_sys::Math::random() in WASM builds, rand crate natively.
fn random_seed() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        (js_sys::Math::random() * u64::MAX as f64) as u64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        rand::random::<u64>()
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// Search settings for this level. Easy plays a random legal move and
    /// has no profile. Harder levels search deeper once the board thins out.
    pub fn profile(self, non_king_pieces: usize) -> Option<SearchProfile> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Medium => Some(SearchProfile {
                max_depth: 3,
                deadline_ms: 700,
                quiescence_depth: 1,
                repetition_penalty: 18,
                tie_margin: Some(10),
            }),
            Difficulty::Hard => Some(SearchProfile {
                max_depth: if non_king_pieces <= 12 { 5 } else { 4 },
                deadline_ms: 1700,
                quiescence_depth: 2,
                repetition_penalty: 40,
                tie_margin: None,
            }),
            Difficulty::Expert => Some(SearchProfile {
                max_depth: if non_king_pieces <= 10 { 6 } else { 5 },
                deadline_ms: 2500,
                quiescence_depth: 3,
                repetition_penalty: 85,
                tie_margin: None,
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            _ => Err(ParseDifficultyError(s.to_string())),
        }
    }
}

/// Tunable search limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProfile {
    /// Deepest iteration, in plies.
    pub max_depth: u32,
    /// Wall-clock budget for the whole iterative deepening loop.
    pub deadline_ms: u64,
    /// Extra capture/promotion plies searched past the horizon.
    pub quiescence_depth: u32,
    /// Subtracted once per earlier occurrence of the position a move leads to.
    pub repetition_penalty: i32,
    /// When set, pick uniformly among root moves scoring within this many
    /// centipawns of the best. `None` always plays the first best move.
    pub tie_margin: Option<i32>,
}

/// Suggested minimum delay before a bot move is shown, in milliseconds.
/// Purely cosmetic; the search itself is bounded by the profile deadline.
pub fn think_time(difficulty: Difficulty) -> u64 {
    match difficulty {
        Difficulty::Easy => 200,
        Difficulty::Medium => 300,
        Difficulty::Hard => 350,
        Difficulty::Expert => 450,
    }
}

/// Result of [`iterative_deepening`].
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub mv: Option<Move>,
    /// Score of `mv` at `depth_reached`; `None` if no iteration completed.
    pub score: Option<i32>,
    /// Deepest fully searched iteration (0 when even depth 1 ran out of time).
    pub depth_reached: u32,
    pub nodes: u64,
    pub timed_out: bool,
}

// =============================================================================
// Move ordering
// =============================================================================

fn promotion_bonus(pt: PieceType) -> i32 {
    match pt {
        PieceType::Queen => 9000,
        PieceType::Knight => 7800,
        PieceType::Rook => 7200,
        PieceType::Bishop => 7000,
        _ => 6800,
    }
}

/// Assign a priority score to a move for search ordering. Higher = searched
/// first.
///
/// Captures are ranked most valuable victim first, cheapest attacker first.
/// Promotions come next (queen highest) and castling and pawn advances get a
/// small nudge over other quiet moves.
pub fn ordering_score(mv: &Move, side: Color) -> i32 {
    let mut score = 0;
    if let Some(captured) = mv.captured {
        score += captured.piece_type.value() * 100 * 12 - mv.piece.piece_type.value() * 100;
    }
    if mv.castle.is_some() {
        score += 120;
    }
    if let Some(promo) = mv.promotion {
        score += promotion_bonus(promo);
    }
    if mv.piece.piece_type == PieceType::Pawn {
        let advance = (mv.to.0 as i32 - mv.from.0 as i32) * side.pawn_direction();
        score += advance * 14;
    }
    score
}

/// Sort moves so the most promising are searched first. The sort is stable:
/// equally scored moves keep their generation order.
pub fn order_moves(moves: &mut [Move], side: Color) {
    moves.sort_by_key(|mv| std::cmp::Reverse(ordering_score(mv, side)));
}

// =============================================================================
// Memo table
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Clone, Copy, Debug)]
struct MemoEntry {
    score: i32,
    bound: Bound,
}

/// The maximizing colour is fixed for a search, so the key only needs the
/// side to move, the remaining depth and the piece placement.
#[derive(Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    side: Color,
    depth: u32,
    squares: [[Option<Piece>; 8]; 8],
}

impl MemoKey {
    fn new(board: &Board, side: Color, depth: u32) -> Self {
        MemoKey { side, depth, squares: board.squares }
    }
}

fn bound_for(score: i32, alpha: i32, beta: i32) -> Bound {
    if score <= alpha {
        Bound::Upper
    } else if score >= beta {
        Bound::Lower
    } else {
        Bound::Exact
    }
}

// =============================================================================
// Search
// =============================================================================

/// State for one root search: limits, counters and the memo table.
struct Searcher<'a> {
    maximizing: Color,
    profile: &'a SearchProfile,
    repetition_counts: &'a HashMap<String, u32>,
    deadline: Option<Instant>,
    stop: Option<&'a dyn Fn() -> bool>,
    root_depth: u32,
    nodes: u64,
    timed_out: bool,
    memo: HashMap<MemoKey, MemoEntry>,
}

impl<'a> Searcher<'a> {
    fn new(
        maximizing: Color,
        profile: &'a SearchProfile,
        repetition_counts: &'a HashMap<String, u32>,
        deadline: Option<Instant>,
        stop: Option<&'a dyn Fn() -> bool>,
    ) -> Self {
        Searcher {
            maximizing,
            profile,
            repetition_counts,
            deadline,
            stop,
            root_depth: 0,
            nodes: 0,
            timed_out: false,
            memo: HashMap::new(),
        }
    }

    /// Count a node and, every 1024 nodes, check the deadline and the stop
    /// signal.
    fn should_stop(&mut self) -> bool {
        if self.timed_out {
            return true;
        }
        self.nodes += 1;
        if self.nodes & NODE_CHECK_MASK != 0 {
            return false;
        }
        self.check_limits()
    }

    fn check_limits(&mut self) -> bool {
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        let stopped = self.stop.is_some_and(|stop| stop());
        if expired || stopped {
            self.timed_out = true;
        }
        self.timed_out
    }

    /// Score every root move at `depth` and pick one. Returns `None` when the
    /// side has no legal moves or the deadline passed mid-iteration.
    fn search_root(&mut self, board: &mut Board, depth: u32, rng: &mut impl Rng) -> Option<(Move, i32)> {
        self.root_depth = depth;
        self.memo.clear();

        let side = self.maximizing;
        let opponent = side.opposite();
        let mut moves = board.all_legal_moves(side);
        order_moves(&mut moves, side);

        let mut scored: Vec<(Move, i32)> = Vec::with_capacity(moves.len());
        for mv in moves {
            let Some(undo) = board.make_move(&mv) else {
                continue;
            };
            let mut score = self.minimax(board, depth.saturating_sub(1), opponent, -INF, INF);

            if self.profile.repetition_penalty > 0 {
                let seen = self
                    .repetition_counts
                    .get(&board.board_key(opponent))
                    .copied()
                    .unwrap_or(0);
                score -= self.profile.repetition_penalty * seen as i32;
            }
            board.unmake_move(undo);

            if self.timed_out {
                return None;
            }
            scored.push((mv, score));
        }

        let best = scored.iter().map(|&(_, s)| s).max()?;
        match self.profile.tie_margin {
            Some(margin) => {
                let near: Vec<&(Move, i32)> =
                    scored.iter().filter(|&&(_, s)| s >= best - margin).collect();
                near.choose(rng).map(|&&(mv, score)| (mv, score))
            }
            None => scored.into_iter().find(|&(_, s)| s == best),
        }
    }

    fn minimax(&mut self, board: &mut Board, depth: u32, side: Color, mut alpha: i32, mut beta: i32) -> i32 {
        if self.should_stop() {
            return evaluate(board, self.maximizing);
        }

        let key = MemoKey::new(board, side, depth);
        if let Some(entry) = self.memo.get(&key) {
            match entry.bound {
                Bound::Exact => return entry.score,
                Bound::Lower if entry.score >= beta => return entry.score,
                Bound::Upper if entry.score <= alpha => return entry.score,
                _ => {}
            }
        }
        let (alpha_in, beta_in) = (alpha, beta);

        let mut moves = if depth == 0 {
            Vec::new()
        } else {
            board.all_legal_moves(side)
        };
        let no_moves = if depth == 0 { !board.has_legal_move(side) } else { moves.is_empty() };

        if no_moves {
            let score = if board.is_in_check(side) {
                let mate = MATE_SCORE - (self.root_depth - depth) as i32;
                if side == self.maximizing { -mate } else { mate }
            } else {
                0
            };
            self.memo.insert(key, MemoEntry { score, bound: Bound::Exact });
            return score;
        }

        if depth == 0 {
            let score = self.quiescence(board, self.profile.quiescence_depth, side, alpha, beta);
            if !self.timed_out {
                self.memo.insert(key, MemoEntry { score, bound: bound_for(score, alpha_in, beta_in) });
            }
            return score;
        }

        order_moves(&mut moves, side);
        let maximizing = side == self.maximizing;
        let mut best = if maximizing { -INF } else { INF };

        for mv in &moves {
            if self.timed_out {
                break;
            }
            let Some(undo) = board.make_move(mv) else {
                continue;
            };
            let score = self.minimax(board, depth - 1, side.opposite(), alpha, beta);
            board.unmake_move(undo);

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(best);
            } else {
                best = best.min(score);
                beta = beta.min(best);
            }
            if beta <= alpha {
                break;
            }
        }

        if !self.timed_out {
            self.memo.insert(key, MemoEntry { score: best, bound: bound_for(best, alpha_in, beta_in) });
        }
        best
    }

    /// Captures and promotions only, until the position is quiet or the
    /// quiescence budget runs out. The side to move may always "stand pat".
    fn quiescence(&mut self, board: &mut Board, depth: u32, side: Color, mut alpha: i32, mut beta: i32) -> i32 {
        let stand_pat = evaluate(board, self.maximizing);
        if self.should_stop() {
            return stand_pat;
        }

        let maximizing = side == self.maximizing;
        if maximizing {
            if stand_pat >= beta {
                return stand_pat;
            }
            alpha = alpha.max(stand_pat);
        } else {
            if stand_pat <= alpha {
                return stand_pat;
            }
            beta = beta.min(stand_pat);
        }
        if depth == 0 {
            return stand_pat;
        }

        let mut tactical: Vec<Move> = board
            .all_legal_moves(side)
            .into_iter()
            .filter(|mv| mv.is_capture() || mv.promotion.is_some())
            .collect();
        if tactical.is_empty() {
            return stand_pat;
        }
        order_moves(&mut tactical, side);

        let mut best = stand_pat;
        for mv in &tactical {
            if self.timed_out {
                break;
            }
            let Some(undo) = board.make_move(mv) else {
                continue;
            };
            let score = self.quiescence(board, depth - 1, side.opposite(), alpha, beta);
            board.unmake_move(undo);

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(best);
            } else {
                best = best.min(score);
                beta = beta.min(best);
            }
            if beta <= alpha {
                break;
            }
        }
        best
    }
}

// =============================================================================
// Move selection
// =============================================================================

/// Collapse full repetition keys to side + board, summing counts of keys that
/// only differed in castling or en-passant qualifiers. Keys already in that
/// form pass through.
pub fn normalized_repetition_counts(counts: &HashMap<String, u32>) -> HashMap<String, u32> {
    let mut normalized = HashMap::with_capacity(counts.len());
    for (key, &count) in counts {
        let parts: Vec<&str> = key.split('|').collect();
        let short = match parts.as_slice() {
            [side, _castling, _en_passant, rows] => format!("{side}|{rows}"),
            _ => key.clone(),
        };
        *normalized.entry(short).or_insert(0) += count;
    }
    normalized
}

/// Iterative deepening from depth 1 up to the profile's maximum.
///
/// `repetition_counts` is expected in side + board form (see
/// [`normalized_repetition_counts`]). If the very first iteration times out,
/// the top move of the ordering heuristic is returned.
pub fn iterative_deepening(
    board: &mut Board,
    color: Color,
    profile: &SearchProfile,
    repetition_counts: &HashMap<String, u32>,
    rng: &mut impl Rng,
) -> SearchOutcome {
    deepen(board, color, profile, repetition_counts, rng, None)
}

/// [`iterative_deepening`] that also gives up as soon as `stop` returns true.
/// `stop` is polled before each iteration and with the deadline inside one.
pub fn iterative_deepening_until(
    board: &mut Board,
    color: Color,
    profile: &SearchProfile,
    repetition_counts: &HashMap<String, u32>,
    rng: &mut impl Rng,
    stop: &dyn Fn() -> bool,
) -> SearchOutcome {
    deepen(board, color, profile, repetition_counts, rng, Some(stop))
}

fn deepen(
    board: &mut Board,
    color: Color,
    profile: &SearchProfile,
    repetition_counts: &HashMap<String, u32>,
    rng: &mut impl Rng,
    stop: Option<&dyn Fn() -> bool>,
) -> SearchOutcome {
    let deadline = Instant::now() + Duration::from_millis(profile.deadline_ms);
    let mut searcher = Searcher::new(color, profile, repetition_counts, Some(deadline), stop);

    let mut moves = board.all_legal_moves(color);
    order_moves(&mut moves, color);
    let mut outcome = SearchOutcome {
        mv: moves.first().copied(),
        score: None,
        depth_reached: 0,
        nodes: 0,
        timed_out: false,
    };
    if moves.is_empty() {
        return outcome;
    }

    for depth in 1..=profile.max_depth.max(1) {
        let result = if searcher.check_limits() {
            None
        } else {
            searcher.search_root(board, depth, rng)
        };
        if searcher.timed_out {
            debug!(depth, nodes = searcher.nodes, "search iteration timed out");
            outcome.timed_out = true;
            break;
        }
        if let Some((mv, score)) = result {
            debug!(depth, score, nodes = searcher.nodes, best = %mv.to_uci(), "search iteration complete");
            outcome.mv = Some(mv);
            outcome.score = Some(score);
            outcome.depth_reached = depth;
        }
    }
    outcome.nodes = searcher.nodes;
    outcome
}

/// One root search at exactly `depth` with no deadline.
pub fn search_fixed_depth(
    board: &mut Board,
    color: Color,
    depth: u32,
    profile: &SearchProfile,
    repetition_counts: &HashMap<String, u32>,
    rng: &mut impl Rng,
) -> Option<(Move, i32)> {
    let mut searcher = Searcher::new(color, profile, repetition_counts, None, None);
    searcher.search_root(board, depth.max(1), rng)
}

/// Pick a move for `bot_color` at the given difficulty.
///
/// `repetition_counts` is the game's repetition table as recorded by the
/// board. The position is copied, so `board` is never modified.
pub fn choose_move(
    board: &Board,
    difficulty: Difficulty,
    bot_color: Color,
    repetition_counts: &HashMap<String, u32>,
) -> Option<Move> {
    let mut rng = StdRng::seed_from_u64(random_seed());
    choose_move_with_rng(board, difficulty, bot_color, repetition_counts, &mut rng)
}

pub fn choose_move_with_rng(
    board: &Board,
    difficulty: Difficulty,
    bot_color: Color,
    repetition_counts: &HashMap<String, u32>,
    rng: &mut impl Rng,
) -> Option<Move> {
    select_move(board, difficulty, bot_color, repetition_counts, rng, None)
}

/// [`choose_move`] for a search another thread may abandon. Once `stop`
/// returns true the best move found so far is returned.
pub fn choose_move_until(
    board: &Board,
    difficulty: Difficulty,
    bot_color: Color,
    repetition_counts: &HashMap<String, u32>,
    stop: &dyn Fn() -> bool,
) -> Option<Move> {
    let mut rng = StdRng::seed_from_u64(random_seed());
    select_move(board, difficulty, bot_color, repetition_counts, &mut rng, Some(stop))
}

fn select_move(
    board: &Board,
    difficulty: Difficulty,
    bot_color: Color,
    repetition_counts: &HashMap<String, u32>,
    rng: &mut impl Rng,
    stop: Option<&dyn Fn() -> bool>,
) -> Option<Move> {
    let mut work = board.clone();
    work.current_turn = bot_color;

    let Some(profile) = difficulty.profile(work.non_king_piece_count()) else {
        return work.all_legal_moves(bot_color).choose(rng).copied();
    };

    let counts = normalized_repetition_counts(repetition_counts);
    deepen(&mut work, bot_color, &profile, &counts, rng, stop).mv
}
