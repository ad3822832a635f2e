//! Pseudo-legal and legal move generation.
//!
//! Legality is decided by playing each candidate with [`Board::make_move`],
//! testing whether the mover's king is attacked and taking it back again.
//! Kings are never generated as capture targets.

use crate::board::Board;
use crate::moves::{CastleSide, Move, Square};
use crate::piece::{Color, Piece, PieceType};

const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];

const KING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1), (0, -1),
    (0, 1), (1, -1), (1, 0), (1, 1),
];

const STRAIGHT_DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const QUEEN_DIRS: [(i32, i32); 8] = [
    (0, 1), (0, -1), (1, 0), (-1, 0),
    (1, 1), (1, -1), (-1, 1), (-1, -1),
];

impl Board {
    /// Every move the piece on `square` could make, ignoring whether its own
    /// king is left in check. Empty or off-board squares yield no moves.
    pub fn pseudo_legal_moves(&self, square: Square) -> Vec<Move> {
        let mut moves = Vec::new();
        let Some(piece) = self.piece_at(square) else {
            return moves;
        };
        match piece.piece_type {
            PieceType::Pawn => self.generate_pawn_moves(square, piece, &mut moves),
            PieceType::Knight => self.generate_step_moves(square, piece, &KNIGHT_OFFSETS, &mut moves),
            PieceType::Bishop => self.generate_sliding_moves(square, piece, &DIAGONAL_DIRS, &mut moves),
            PieceType::Rook => self.generate_sliding_moves(square, piece, &STRAIGHT_DIRS, &mut moves),
            PieceType::Queen => self.generate_sliding_moves(square, piece, &QUEEN_DIRS, &mut moves),
            PieceType::King => {
                self.generate_step_moves(square, piece, &KING_OFFSETS, &mut moves);
                self.generate_castling_moves(square, piece, &mut moves);
            }
        }
        moves
    }

    /// Pseudo-legal moves of the piece on `square` that do not leave its king attacked.
    pub fn legal_moves(&mut self, square: Square) -> Vec<Move> {
        let mut moves = self.pseudo_legal_moves(square);
        moves.retain(|mv| self.leaves_king_safe(mv));
        moves
    }

    /// Legal moves of every piece of `color`, promotions expanded one per piece type.
    pub fn all_legal_moves(&mut self, color: Color) -> Vec<Move> {
        let mut moves = Vec::new();
        for square in self.squares_of(color) {
            moves.extend(self.legal_moves(square));
        }
        moves
    }

    /// Same answer as `!all_legal_moves(color).is_empty()`, stopping at the first hit.
    pub fn has_legal_move(&mut self, color: Color) -> bool {
        for square in self.squares_of(color) {
            let candidates = self.pseudo_legal_moves(square);
            if candidates.iter().any(|mv| self.leaves_king_safe(mv)) {
                return true;
            }
        }
        false
    }

    /// The legal move matching the given coordinates and promotion choice.
    /// A promotion without an explicit choice resolves to a queen; a choice on
    /// a move that does not promote matches nothing.
    pub fn find_legal_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Option<Move> {
        let candidates = self.legal_moves(from);
        candidates.into_iter().find(|mv| {
            mv.to == to
                && match (mv.promotion, promotion) {
                    (None, None) => true,
                    (None, Some(_)) => false,
                    (Some(p), None) => p == PieceType::Queen,
                    (Some(p), Some(choice)) => p == choice,
                }
        })
    }

    /// Parse a UCI move ("e2e4", "e7e8n") against the legal moves of this position.
    pub fn parse_uci(&mut self, text: &str) -> Option<Move> {
        let text = text.trim();
        if text.len() < 4 || !text.is_ascii() {
            return None;
        }
        let from = crate::moves::parse_square(&text[0..2])?;
        let to = crate::moves::parse_square(&text[2..4])?;
        let promotion = match text[4..].chars().next() {
            Some(c) => Some(PieceType::from_letter(c).filter(|pt| PieceType::PROMOTIONS.contains(pt))?),
            None => None,
        };
        self.find_legal_move(from, to, promotion)
    }

    /// Number of legal move sequences of length `depth` from this position.
    pub fn perft(&mut self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.all_legal_moves(self.current_turn);
        if depth == 1 {
            return moves.len() as u64;
        }
        let mut total = 0;
        for mv in &moves {
            if let Some(undo) = self.make_move(mv) {
                total += self.perft(depth - 1);
                self.unmake_move(undo);
            }
        }
        total
    }

    fn squares_of(&self, color: Color) -> Vec<Square> {
        let mut squares = Vec::with_capacity(16);
        for row in 0..8 {
            for col in 0..8 {
                if self.squares[row][col].map(|p| p.color == color).unwrap_or(false) {
                    squares.push((row, col));
                }
            }
        }
        squares
    }

    fn leaves_king_safe(&mut self, mv: &Move) -> bool {
        match self.make_move(mv) {
            Some(undo) => {
                let safe = !self.is_in_check(mv.piece.color);
                self.unmake_move(undo);
                safe
            }
            None => false,
        }
    }

    /// A destination a non-pawn may land on: empty, or an enemy piece other than the king.
    fn landing(&self, square: Square, color: Color) -> Option<Option<Piece>> {
        match self.squares[square.0][square.1] {
            None => Some(None),
            Some(p) if p.color != color && !p.is_king() => Some(Some(p)),
            Some(_) => None,
        }
    }

    fn push_pawn_move(mv: Move, moves: &mut Vec<Move>) {
        if mv.is_promotion() {
            moves.extend(PieceType::PROMOTIONS.iter().map(|&pt| mv.with_promotion(pt)));
        } else {
            moves.push(mv);
        }
    }

    fn generate_pawn_moves(&self, from: Square, piece: Piece, moves: &mut Vec<Move>) {
        let (row, col) = from;
        let dir = piece.color.pawn_direction();
        let start_row = match piece.color {
            Color::White => 1,
            Color::Black => 6,
        };

        let forward = row as i32 + dir;
        if !Self::in_bounds(forward, col as i32) {
            return;
        }
        let forward = forward as usize;

        // Single push, then double push from the starting rank
        if self.squares[forward][col].is_none() {
            Self::push_pawn_move(Move::new(from, (forward, col), piece), moves);

            let double = row as i32 + 2 * dir;
            if row == start_row
                && Self::in_bounds(double, col as i32)
                && self.squares[double as usize][col].is_none()
            {
                moves.push(Move::new(from, (double as usize, col), piece));
            }
        }

        for dc in [-1i32, 1] {
            let c = col as i32 + dc;
            if !Self::in_bounds(forward as i32, c) {
                continue;
            }
            let to = (forward, c as usize);

            if let Some(target) = self.squares[to.0][to.1] {
                if target.color != piece.color && !target.is_king() {
                    let mut mv = Move::new(from, to, piece);
                    mv.captured = Some(target);
                    Self::push_pawn_move(mv, moves);
                }
                continue;
            }

            // En passant: the enemy pawn that just double-pushed stands beside us
            if self.en_passant_target == Some(to) {
                let beside = self.squares[row][to.1];
                if let Some(victim) = beside {
                    if victim.color != piece.color && victim.piece_type == PieceType::Pawn {
                        let mut mv = Move::new(from, to, piece);
                        mv.captured = Some(victim);
                        mv.en_passant = true;
                        moves.push(mv);
                    }
                }
            }
        }
    }

    fn generate_step_moves(
        &self,
        from: Square,
        piece: Piece,
        offsets: &[(i32, i32)],
        moves: &mut Vec<Move>,
    ) {
        for (dr, dc) in offsets {
            let r = from.0 as i32 + dr;
            let c = from.1 as i32 + dc;
            if !Self::in_bounds(r, c) {
                continue;
            }
            let to = (r as usize, c as usize);
            if let Some(captured) = self.landing(to, piece.color) {
                let mut mv = Move::new(from, to, piece);
                mv.captured = captured;
                moves.push(mv);
            }
        }
    }

    fn generate_sliding_moves(
        &self,
        from: Square,
        piece: Piece,
        directions: &[(i32, i32)],
        moves: &mut Vec<Move>,
    ) {
        for (dr, dc) in directions {
            let mut r = from.0 as i32 + dr;
            let mut c = from.1 as i32 + dc;
            while Self::in_bounds(r, c) {
                let to = (r as usize, c as usize);
                match self.squares[to.0][to.1] {
                    None => moves.push(Move::new(from, to, piece)),
                    Some(target) => {
                        if target.color != piece.color && !target.is_king() {
                            let mut mv = Move::new(from, to, piece);
                            mv.captured = Some(target);
                            moves.push(mv);
                        }
                        break;
                    }
                }
                r += dr;
                c += dc;
            }
        }
    }

    fn generate_castling_moves(&self, from: Square, king: Piece, moves: &mut Vec<Move>) {
        let color = king.color;
        let home = color.home_row();
        if from != (home, 4) {
            return;
        }

        let enemy = color.opposite();
        let mut in_check = None;
        for side in [CastleSide::King, CastleSide::Queen] {
            if !self.castling_rights.allows(color, side) {
                continue;
            }
            let (rook_col, _) = side.rook_cols();
            if self.squares[home][rook_col] != Some(Piece::new(PieceType::Rook, color)) {
                continue;
            }
            let between: &[usize] = match side {
                CastleSide::King => &[5, 6],
                CastleSide::Queen => &[1, 2, 3],
            };
            if between.iter().any(|&c| self.squares[home][c].is_some()) {
                continue;
            }
            if *in_check.get_or_insert_with(|| self.is_in_check(color)) {
                return;
            }
            let transit = match side {
                CastleSide::King => 5,
                CastleSide::Queen => 3,
            };
            let dest = side.king_col();
            if self.is_square_attacked_by((home, transit), enemy)
                || self.is_square_attacked_by((home, dest), enemy)
            {
                continue;
            }
            let mut mv = Move::new(from, (home, dest), king);
            mv.castle = Some(side);
            moves.push(mv);
        }
    }
}
