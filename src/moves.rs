use serde::{Deserialize, Serialize};

use crate::piece::{Color, Piece, PieceType};

/// `(row, col)`; row 0 = rank 1, col 0 = file a.
pub type Square = (usize, usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    /// Destination column of the king.
    pub fn king_col(self) -> usize {
        match self {
            CastleSide::King => 6,
            CastleSide::Queen => 2,
        }
    }

    /// Rook `(from_col, to_col)`.
    pub fn rook_cols(self) -> (usize, usize) {
        match self {
            CastleSide::King => (7, 5),
            CastleSide::Queen => (0, 3),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    /// For en passant this is the displaced pawn, not the destination contents.
    #[serde(default)]
    pub captured: Option<Piece>,
    #[serde(default)]
    pub en_passant: bool,
    #[serde(default)]
    pub castle: Option<CastleSide>,
    #[serde(default)]
    pub promotion: Option<PieceType>,
}

impl Move {
    pub fn new(from: Square, to: Square, piece: Piece) -> Self {
        Move {
            from,
            to,
            piece,
            captured: None,
            en_passant: false,
            castle: None,
            promotion: None,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    /// A pawn move onto the far rank.
    pub fn is_promotion(&self) -> bool {
        self.piece.piece_type == PieceType::Pawn && (self.to.0 == 0 || self.to.0 == 7)
    }

    pub fn with_promotion(mut self, promotion: PieceType) -> Self {
        self.promotion = Some(promotion);
        self
    }

    /// Same origin, destination and promotion choice.
    pub fn same_action(&self, other: &Move) -> bool {
        self.from == other.from && self.to == other.to && self.promotion == other.promotion
    }

    /// Convert to UCI notation, e.g. "e2e4", "a7a8q"
    pub fn to_uci(&self) -> String {
        let promo = match self.promotion {
            Some(PieceType::Queen) => "q",
            Some(PieceType::Rook) => "r",
            Some(PieceType::Bishop) => "b",
            Some(PieceType::Knight) => "n",
            _ => "",
        };
        format!("{}{}{promo}", square_name(self.from), square_name(self.to))
    }
}

/// A move as it was committed to a position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub en_passant: bool,
    pub castle: Option<CastleSide>,
    pub promotion: Option<PieceType>,
    /// Fullmove number before the move was applied.
    pub move_number: u32,
    pub mover: Color,
}

/// Algebraic name of a square, e.g. `(3, 4)` -> "e4". Off-board squares print as "??".
pub fn square_name(square: Square) -> String {
    let (row, col) = square;
    if row > 7 || col > 7 {
        return "??".to_string();
    }
    let file = (b'a' + col as u8) as char;
    let rank = (b'1' + row as u8) as char;
    format!("{file}{rank}")
}

/// Parse "e4" into `(3, 4)`.
pub fn parse_square(s: &str) -> Option<Square> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].checked_sub(b'a')?;
    let rank = bytes[1].checked_sub(b'1')?;
    if file > 7 || rank > 7 {
        return None;
    }
    Some((rank as usize, file as usize))
}
