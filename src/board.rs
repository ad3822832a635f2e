use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::moves::{CastleSide, Move, MoveRecord, Square};
use crate::piece::{Color, Piece, PieceType};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub fn all() -> Self {
        CastlingRights {
            white_kingside: true,
            white_queenside: true,
            black_kingside: true,
            black_queenside: true,
        }
    }

    pub fn none() -> Self {
        CastlingRights {
            white_kingside: false,
            white_queenside: false,
            black_kingside: false,
            black_queenside: false,
        }
    }

    pub fn allows(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_kingside,
            (Color::White, CastleSide::Queen) => self.white_queenside,
            (Color::Black, CastleSide::King) => self.black_kingside,
            (Color::Black, CastleSide::Queen) => self.black_queenside,
        }
    }

    pub fn revoke(&mut self, color: Color, side: CastleSide) {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_kingside = false,
            (Color::White, CastleSide::Queen) => self.white_queenside = false,
            (Color::Black, CastleSide::King) => self.black_kingside = false,
            (Color::Black, CastleSide::Queen) => self.black_queenside = false,
        }
    }

    pub fn revoke_all(&mut self, color: Color) {
        self.revoke(color, CastleSide::King);
        self.revoke(color, CastleSide::Queen);
    }

    fn key(&self) -> String {
        let mut key = String::new();
        if self.white_kingside {
            key.push('K');
        }
        if self.white_queenside {
            key.push('Q');
        }
        if self.black_kingside {
            key.push('k');
        }
        if self.black_queenside {
            key.push('q');
        }
        if key.is_empty() {
            key.push('-');
        }
        key
    }
}

/// How [`Board::apply_move`] treats turn order and repetition bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyOptions {
    pub switch_turn: bool,
    /// Count the resulting position toward repetition. Only committed moves do this.
    pub record_position: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        ApplyOptions {
            switch_turn: true,
            record_position: false,
        }
    }
}

impl ApplyOptions {
    /// Options for a move that becomes part of the game history.
    pub fn commit() -> Self {
        ApplyOptions {
            switch_turn: true,
            record_position: true,
        }
    }
}

/// Exactly the fields a move changed, so [`Board::unmake_move`] can reverse it
/// without copying the whole position.
#[derive(Clone, Copy, Debug)]
pub struct Undo {
    from: Square,
    to: Square,
    moved: Piece,
    captured: Option<(Square, Piece)>,
    rook: Option<(Square, Square)>,
    en_passant: bool,
    castle: Option<CastleSide>,
    promotion: Option<PieceType>,
    castling_rights: CastlingRights,
    en_passant_target: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
    current_turn: Color,
    king_squares: [Option<Square>; 2],
}

impl Undo {
    fn record(&self) -> MoveRecord {
        MoveRecord {
            from: self.from,
            to: self.to,
            piece: self.moved,
            captured: self.captured.map(|(_, p)| p),
            en_passant: self.en_passant,
            castle: self.castle,
            promotion: self.promotion,
            move_number: self.fullmove_number,
            mover: self.moved.color,
        }
    }
}

/// The canonical game position.
///
/// The king location cache is maintained by [`Board::put`], [`Board::make_move`]
/// and [`Board::unmake_move`]; writing to `squares` directly bypasses it.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Board {
    pub squares: [[Option<Piece>; 8]; 8],
    pub current_turn: Color,
    king_squares: [Option<Square>; 2],
    pub castling_rights: CastlingRights,
    pub en_passant_target: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub repetition_counts: HashMap<String, u32>,
}

/// A deep, independent copy of a [`Board`].
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Snapshot(Board);

impl Snapshot {
    pub fn board(&self) -> &Board {
        &self.0
    }

    pub fn into_board(self) -> Board {
        self.0
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board with no pieces. Useful for setting up test positions.
    pub fn empty() -> Self {
        Board {
            squares: [[None; 8]; 8],
            current_turn: Color::White,
            king_squares: [None; 2],
            castling_rights: CastlingRights::none(),
            en_passant_target: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            repetition_counts: HashMap::new(),
        }
    }

    /// The standard starting position, with its first occurrence recorded.
    pub fn new() -> Self {
        const BACK_RANK: [PieceType; 8] = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];

        let mut board = Board::empty();
        for (col, &pt) in BACK_RANK.iter().enumerate() {
            board.put((0, col), Some(Piece::new(pt, Color::White)));
            board.put((1, col), Some(Piece::new(PieceType::Pawn, Color::White)));
            board.put((6, col), Some(Piece::new(PieceType::Pawn, Color::Black)));
            board.put((7, col), Some(Piece::new(pt, Color::Black)));
        }
        board.castling_rights = CastlingRights::all();
        board.record_position();
        board
    }

    pub(crate) fn in_bounds(row: i32, col: i32) -> bool {
        (0..8).contains(&row) && (0..8).contains(&col)
    }

    pub fn on_board(square: Square) -> bool {
        square.0 < 8 && square.1 < 8
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        if !Self::on_board(square) {
            return None;
        }
        self.squares[square.0][square.1]
    }

    /// Place (or clear) a square, keeping the king cache in sync.
    pub fn put(&mut self, square: Square, piece: Option<Piece>) {
        if !Self::on_board(square) {
            return;
        }
        let (row, col) = square;
        if let Some(old) = self.squares[row][col] {
            if old.is_king() && self.king_squares[old.color.index()] == Some(square) {
                self.king_squares[old.color.index()] = None;
            }
        }
        if let Some(p) = piece {
            if p.is_king() {
                self.king_squares[p.color.index()] = Some(square);
            }
        }
        self.squares[row][col] = piece;
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.king_squares[color.index()]
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.clone())
    }

    /// Reset this board to `snapshot` in place, reusing existing allocations.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.clone_from(&snapshot.0);
    }

    pub fn non_king_piece_count(&self) -> usize {
        self.squares
            .iter()
            .flatten()
            .flatten()
            .filter(|p| !p.is_king())
            .count()
    }

    pub fn is_square_attacked_by(&self, square: Square, attacker: Color) -> bool {
        let (row, col) = square;

        // Check knight attacks
        let knight_offsets: [(i32, i32); 8] = [
            (-2, -1), (-2, 1), (-1, -2), (-1, 2),
            (1, -2), (1, 2), (2, -1), (2, 1),
        ];
        for (dr, dc) in &knight_offsets {
            let r = row as i32 + dr;
            let c = col as i32 + dc;
            if Self::in_bounds(r, c) {
                if let Some(p) = self.squares[r as usize][c as usize] {
                    if p.color == attacker && p.piece_type == PieceType::Knight {
                        return true;
                    }
                }
            }
        }

        // Check king attacks
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = row as i32 + dr;
                let c = col as i32 + dc;
                if Self::in_bounds(r, c) {
                    if let Some(p) = self.squares[r as usize][c as usize] {
                        if p.color == attacker && p.piece_type == PieceType::King {
                            return true;
                        }
                    }
                }
            }
        }

        // A pawn on (row - dir, col ± 1) attacks (row, col), whatever stands there
        let pawn_row = row as i32 - attacker.pawn_direction();
        for dc in &[-1i32, 1] {
            let pc = col as i32 + dc;
            if Self::in_bounds(pawn_row, pc) {
                if let Some(p) = self.squares[pawn_row as usize][pc as usize] {
                    if p.color == attacker && p.piece_type == PieceType::Pawn {
                        return true;
                    }
                }
            }
        }

        // Sliding pieces (rook/queen on straights, bishop/queen on diagonals)
        let straight_dirs: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
        let diag_dirs: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
        let rays = straight_dirs
            .iter()
            .map(|d| (d, PieceType::Rook))
            .chain(diag_dirs.iter().map(|d| (d, PieceType::Bishop)));
        for (&(dr, dc), slider) in rays {
            let mut r = row as i32 + dr;
            let mut c = col as i32 + dc;
            while Self::in_bounds(r, c) {
                if let Some(p) = self.squares[r as usize][c as usize] {
                    if p.color == attacker
                        && (p.piece_type == slider || p.piece_type == PieceType::Queen)
                    {
                        return true;
                    }
                    break;
                }
                r += dr;
                c += dc;
            }
        }

        false
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(square) => self.is_square_attacked_by(square, color.opposite()),
            None => false,
        }
    }

    /// Whether a pawn of `side` stands next to the en-passant target, ready to take it.
    pub fn can_capture_en_passant(&self, side: Color) -> bool {
        let Some((row, col)) = self.en_passant_target else {
            return false;
        };
        let pawn_row = row as i32 - side.pawn_direction();
        let pawn = Some(Piece::new(PieceType::Pawn, side));
        [-1i32, 1].iter().any(|dc| {
            let c = col as i32 + dc;
            Self::in_bounds(pawn_row, c) && self.squares[pawn_row as usize][c as usize] == pawn
        })
    }

    fn rows_key(&self) -> String {
        let mut key = String::with_capacity(72);
        for row in (0..8).rev() {
            if row != 7 {
                key.push('/');
            }
            for col in 0..8 {
                key.push(self.squares[row][col].map(Piece::symbol).unwrap_or('.'));
            }
        }
        key
    }

    /// Canonical repetition key: side, castling rights, capturable en-passant
    /// square, board rank 8 to rank 1.
    pub fn position_key(&self, side: Color) -> String {
        let en_passant = match self.en_passant_target {
            Some(target) if self.can_capture_en_passant(side) => crate::moves::square_name(target),
            _ => "-".to_string(),
        };
        format!(
            "{}|{}|{}|{}",
            side.symbol(),
            self.castling_rights.key(),
            en_passant,
            self.rows_key()
        )
    }

    /// Side to move and board only, as used by the search's repetition penalty.
    pub fn board_key(&self, side: Color) -> String {
        format!("{}|{}", side.symbol(), self.rows_key())
    }

    /// Count the current position toward repetition and return its key.
    pub fn record_position(&mut self) -> String {
        let key = self.position_key(self.current_turn);
        *self.repetition_counts.entry(key.clone()).or_insert(0) += 1;
        key
    }

    /// How many times the current position has been recorded.
    pub fn repetition_count(&self) -> u32 {
        self.repetition_counts
            .get(&self.position_key(self.current_turn))
            .copied()
            .unwrap_or(0)
    }

    /// Play `mv` and return what is needed to take it back.
    ///
    /// Only `from`, `to` and `promotion` are read from the move; the moving
    /// piece, capture, en passant and castling are derived from the board.
    /// Returns `None` for off-board coordinates or an empty origin square.
    pub fn make_move(&mut self, mv: &Move) -> Option<Undo> {
        if !Self::on_board(mv.from) || !Self::on_board(mv.to) {
            return None;
        }
        let (fr, fc) = mv.from;
        let (tr, tc) = mv.to;
        let piece = self.squares[fr][fc]?;

        let mut undo = Undo {
            from: mv.from,
            to: mv.to,
            moved: piece,
            captured: self.squares[tr][tc].map(|p| (mv.to, p)),
            rook: None,
            en_passant: false,
            castle: None,
            promotion: None,
            castling_rights: self.castling_rights,
            en_passant_target: self.en_passant_target,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
            current_turn: self.current_turn,
            king_squares: self.king_squares,
        };

        let is_pawn_move = piece.piece_type == PieceType::Pawn;

        // En passant: the captured pawn sits beside the origin, not on the destination
        if is_pawn_move
            && fc != tc
            && undo.captured.is_none()
            && self.en_passant_target == Some(mv.to)
        {
            undo.en_passant = true;
            undo.captured = self.squares[fr][tc].take().map(|p| ((fr, tc), p));
        }

        if let Some((_, captured)) = undo.captured {
            if captured.is_king() {
                self.king_squares[captured.color.index()] = None;
            }
        }

        // Move the piece
        self.squares[fr][fc] = None;
        self.squares[tr][tc] = Some(piece);

        // Castling moves the rook as part of the same move
        if piece.is_king() && (tc as i32 - fc as i32).abs() == 2 {
            let side = if tc == CastleSide::King.king_col() {
                CastleSide::King
            } else {
                CastleSide::Queen
            };
            let (rook_from, rook_to) = side.rook_cols();
            self.squares[tr][rook_to] = self.squares[tr][rook_from].take();
            undo.rook = Some(((tr, rook_from), (tr, rook_to)));
            undo.castle = Some(side);
        }

        if is_pawn_move && (tr == 0 || tr == 7) {
            let choice = mv
                .promotion
                .filter(|pt| PieceType::PROMOTIONS.contains(pt))
                .unwrap_or(PieceType::Queen);
            self.squares[tr][tc] = Some(Piece::new(choice, piece.color));
            undo.promotion = Some(choice);
        }

        if piece.is_king() {
            self.king_squares[piece.color.index()] = Some(mv.to);
        }

        self.update_castling_rights(piece, mv.from, undo.captured);

        if is_pawn_move && (fr as i32 - tr as i32).abs() == 2 {
            self.en_passant_target = Some(((fr + tr) / 2, fc));
        } else {
            self.en_passant_target = None;
        }

        if is_pawn_move || undo.captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if piece.color == Color::Black {
            self.fullmove_number += 1;
        }
        self.current_turn = piece.color.opposite();

        Some(undo)
    }

    fn update_castling_rights(&mut self, mover: Piece, from: Square, captured: Option<(Square, Piece)>) {
        if mover.is_king() {
            self.castling_rights.revoke_all(mover.color);
        }
        if mover.piece_type == PieceType::Rook {
            self.revoke_for_rook_square(mover.color, from);
        }
        if let Some((square, p)) = captured {
            if p.piece_type == PieceType::Rook {
                self.revoke_for_rook_square(p.color, square);
            }
        }
    }

    fn revoke_for_rook_square(&mut self, color: Color, square: Square) {
        if square.0 != color.home_row() {
            return;
        }
        match square.1 {
            0 => self.castling_rights.revoke(color, CastleSide::Queen),
            7 => self.castling_rights.revoke(color, CastleSide::King),
            _ => {}
        }
    }

    /// Reverse a move played by [`Board::make_move`].
    pub fn unmake_move(&mut self, undo: Undo) {
        if let Some(((rr, rf), (_, rt))) = undo.rook {
            self.squares[rr][rf] = self.squares[rr][rt].take();
        }
        self.squares[undo.to.0][undo.to.1] = None;
        self.squares[undo.from.0][undo.from.1] = Some(undo.moved);
        if let Some(((r, c), p)) = undo.captured {
            self.squares[r][c] = Some(p);
        }
        self.castling_rights = undo.castling_rights;
        self.en_passant_target = undo.en_passant_target;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;
        self.current_turn = undo.current_turn;
        self.king_squares = undo.king_squares;
    }

    /// Apply a move permanently and describe what happened.
    ///
    /// Returns `None` when the move is malformed (off-board squares or an
    /// empty origin); the board is left untouched in that case.
    pub fn apply_move(&mut self, mv: &Move, options: ApplyOptions) -> Option<MoveRecord> {
        let undo = self.make_move(mv)?;
        if !options.switch_turn {
            self.current_turn = undo.current_turn;
            self.fullmove_number = undo.fullmove_number;
        }
        if options.record_position {
            self.record_position();
        }
        Some(undo.record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(board: &Board, from: Square, to: Square) -> Move {
        let piece = board.piece_at(from).expect("piece on origin");
        Move::new(from, to, piece)
    }

    fn kings_only() -> Board {
        let mut board = Board::empty();
        board.put((0, 4), Some(Piece::new(PieceType::King, Color::White)));
        board.put((7, 4), Some(Piece::new(PieceType::King, Color::Black)));
        board
    }

    #[test]
    fn snapshot_restore_is_deep_equal() {
        let mut board = Board::new();
        let snapshot = board.snapshot();

        let e4 = mv(&board, (1, 4), (3, 4));
        board.apply_move(&e4, ApplyOptions::commit()).expect("legal move");
        assert_ne!(board, *snapshot.board());

        board.restore(&snapshot);
        assert_eq!(board, *snapshot.board());
        assert_eq!(board.repetition_counts.len(), 1);
        assert_eq!(board.king_square(Color::White), Some((0, 4)));
    }

    #[test]
    fn snapshot_does_not_alias_live_board() {
        let mut board = Board::new();
        let snapshot = board.snapshot();
        board.record_position();
        board.castling_rights.revoke_all(Color::White);
        assert_eq!(snapshot.board().repetition_count(), 1);
        assert!(snapshot.board().castling_rights.white_kingside);
    }

    #[test]
    fn malformed_moves_are_rejected() {
        let mut board = Board::new();
        let before = board.clone();
        let pawn = Piece::new(PieceType::Pawn, Color::White);

        assert!(board.apply_move(&Move::new((3, 3), (4, 3), pawn), ApplyOptions::default()).is_none());
        assert!(board.apply_move(&Move::new((1, 3), (8, 3), pawn), ApplyOptions::default()).is_none());
        assert_eq!(board, before);
    }

    #[test]
    fn double_push_sets_and_next_move_clears_en_passant() {
        let mut board = Board::new();
        let e4 = mv(&board, (1, 4), (3, 4));
        board.apply_move(&e4, ApplyOptions::default());
        assert_eq!(board.en_passant_target, Some((2, 4)));
        assert_eq!(board.halfmove_clock, 0);

        let nf6 = mv(&board, (7, 6), (5, 5));
        board.apply_move(&nf6, ApplyOptions::default());
        assert_eq!(board.en_passant_target, None);
        assert_eq!(board.halfmove_clock, 1);
        assert_eq!(board.fullmove_number, 2);
    }

    #[test]
    fn capturing_home_rook_revokes_castling() {
        let mut board = kings_only();
        board.put((0, 7), Some(Piece::new(PieceType::Rook, Color::White)));
        board.put((7, 7), Some(Piece::new(PieceType::Rook, Color::Black)));
        board.castling_rights = CastlingRights::all();

        let take = mv(&board, (0, 7), (7, 7));
        let record = board.apply_move(&take, ApplyOptions::default()).expect("capture");
        assert_eq!(record.captured, Some(Piece::new(PieceType::Rook, Color::Black)));
        assert!(!board.castling_rights.white_kingside);
        assert!(!board.castling_rights.black_kingside);
        assert!(board.castling_rights.white_queenside);
        assert!(board.castling_rights.black_queenside);
    }

    #[test]
    fn castling_moves_rook_and_tracks_king() {
        let mut board = kings_only();
        board.put((0, 7), Some(Piece::new(PieceType::Rook, Color::White)));
        board.castling_rights.white_kingside = true;

        let castle = mv(&board, (0, 4), (0, 6));
        let record = board.apply_move(&castle, ApplyOptions::default()).expect("castle");
        assert_eq!(record.castle, Some(CastleSide::King));
        assert_eq!(board.piece_at((0, 5)), Some(Piece::new(PieceType::Rook, Color::White)));
        assert_eq!(board.piece_at((0, 7)), None);
        assert_eq!(board.king_square(Color::White), Some((0, 6)));
        assert!(!board.castling_rights.white_kingside);
    }

    #[test]
    fn unmake_restores_every_field() {
        let mut board = kings_only();
        board.put((4, 4), Some(Piece::new(PieceType::Pawn, Color::White)));
        board.put((4, 3), Some(Piece::new(PieceType::Pawn, Color::Black)));
        board.en_passant_target = Some((5, 3));
        board.halfmove_clock = 7;
        let before = board.clone();

        let exd6 = mv(&board, (4, 4), (5, 3));
        let undo = board.make_move(&exd6).expect("en passant");
        assert_eq!(board.piece_at((4, 3)), None);
        board.unmake_move(undo);
        assert_eq!(board, before);
    }

    #[test]
    fn apply_without_switching_turn_keeps_side_to_move() {
        let mut board = Board::new();
        let e6 = Move::new((6, 4), (5, 4), Piece::new(PieceType::Pawn, Color::Black));
        let options = ApplyOptions { switch_turn: false, record_position: false };
        board.apply_move(&e6, options).expect("pawn move");
        assert_eq!(board.current_turn, Color::White);
        assert_eq!(board.fullmove_number, 1);
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let mut board = kings_only();
        board.put((6, 0), Some(Piece::new(PieceType::Pawn, Color::White)));
        let push = mv(&board, (6, 0), (7, 0));
        let record = board.apply_move(&push, ApplyOptions::default()).expect("promotion");
        assert_eq!(record.promotion, Some(PieceType::Queen));
        assert_eq!(board.piece_at((7, 0)), Some(Piece::new(PieceType::Queen, Color::White)));
    }

    #[test]
    fn castling_key_lists_remaining_rights() {
        let mut rights = CastlingRights::all();
        assert_eq!(rights.key(), "KQkq");
        rights.revoke(Color::White, CastleSide::Queen);
        rights.revoke_all(Color::Black);
        assert_eq!(rights.key(), "K");
        assert_eq!(CastlingRights::none().key(), "-");
    }

    #[test]
    fn en_passant_qualifier_only_when_capturable() {
        let mut board = kings_only();
        board.put((1, 4), Some(Piece::new(PieceType::Pawn, Color::White)));
        let e4 = mv(&board, (1, 4), (3, 4));
        board.apply_move(&e4, ApplyOptions::default());
        assert_eq!(board.position_key(Color::Black).split('|').nth(2), Some("-"));

        let mut board = kings_only();
        board.put((1, 4), Some(Piece::new(PieceType::Pawn, Color::White)));
        board.put((3, 3), Some(Piece::new(PieceType::Pawn, Color::Black)));
        let e4 = mv(&board, (1, 4), (3, 4));
        board.apply_move(&e4, ApplyOptions::default());
        assert_eq!(board.position_key(Color::Black).split('|').nth(2), Some("e3"));
    }
}
