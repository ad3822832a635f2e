// =============================================================================
// Static evaluation
//
// Material (piece value × 100) plus a piece-square bonus per piece, own total
// minus the opponent's. The tables below are laid out as a board diagram,
// rank 8 on the first line, from White's point of view; Black reads the same
// table mirrored top-to-bottom.
//
// Coordinate system: row 0 = rank 1, col 0 = file a.
// =============================================================================

use crate::board::Board;
use crate::moves::Square;
use crate::piece::{Color, Piece, PieceType};

/// Non-king piece count at or below which the king switches to its endgame table.
pub const ENDGAME_PIECE_THRESHOLD: usize = 10;

/// Centipawn lead required before the mating-technique bonus kicks in.
const MATING_LEAD: i32 = 300;
/// The defender must be down to this much material (pieces + squares).
const MATING_DEFENDER_MAX: i32 = 700;

#[rustfmt::skip]
const PAWN_TABLE: [i32; 64] = [
     0,  0,   0,   0,   0,   0,  0,  0,
    50, 50,  50,  50,  50,  50, 50, 50,
    10, 10,  20,  30,  30,  20, 10, 10,
     5,  5,  10,  25,  25,  10,  5,  5,
     0,  0,   0,  20,  20,   0,  0,  0,
     5, -5, -10,   0,   0, -10, -5,  5,
     5, 10,  10, -20, -20,  10, 10,  5,
     0,  0,   0,   0,   0,   0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_TABLE: [i32; 64] = [
    -50, -40, -30, -30, -30, -30, -40, -50,
    -40, -20,   0,   5,   5,   0, -20, -40,
    -30,   5,  10,  15,  15,  10,   5, -30,
    -30,   0,  15,  20,  20,  15,   0, -30,
    -30,   5,  15,  20,  20,  15,   5, -30,
    -30,   0,  10,  15,  15,  10,   0, -30,
    -40, -20,   0,   0,   0,   0, -20, -40,
    -50, -40, -30, -30, -30, -30, -40, -50,
];

#[rustfmt::skip]
const BISHOP_TABLE: [i32; 64] = [
    -20, -10, -10, -10, -10, -10, -10, -20,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -10,   0,   5,  10,  10,   5,   0, -10,
    -10,   5,   5,  10,  10,   5,   5, -10,
    -10,   0,  10,  10,  10,  10,   0, -10,
    -10,  10,  10,  10,  10,  10,  10, -10,
    -10,   5,   0,   0,   0,   0,   5, -10,
    -20, -10, -10, -10, -10, -10, -10, -20,
];

#[rustfmt::skip]
const ROOK_TABLE: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_TABLE: [i32; 64] = [
    -20, -10, -10, -5, -5, -10, -10, -20,
    -10,   0,   0,  0,  0,   0,   0, -10,
    -10,   0,   5,  5,  5,   5,   0, -10,
     -5,   0,   5,  5,  5,   5,   0,  -5,
      0,   0,   5,  5,  5,   5,   0,  -5,
    -10,   5,   5,  5,  5,   5,   0, -10,
    -10,   0,   5,  0,  0,   0,   0, -10,
    -20, -10, -10, -5, -5, -10, -10, -20,
];

#[rustfmt::skip]
const KING_MIDGAME_TABLE: [i32; 64] = [
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -30, -40, -40, -50, -50, -40, -40, -30,
    -20, -30, -30, -40, -40, -30, -30, -20,
    -10, -20, -20, -20, -20, -20, -20, -10,
     20,  20,   0,   0,   0,   0,  20,  20,
     20,  30,  10,   0,   0,  10,  30,  20,
];

#[rustfmt::skip]
const KING_ENDGAME_TABLE: [i32; 64] = [
    -50, -40, -30, -20, -20, -30, -40, -50,
    -30, -20, -10,   0,   0, -10, -20, -30,
    -30, -10,  20,  30,  30,  20, -10, -30,
    -30, -10,  30,  40,  40,  30, -10, -30,
    -30, -10,  30,  40,  40,  30, -10, -30,
    -30, -10,  20,  30,  30,  20, -10, -30,
    -30, -30,   0,   0,   0,   0, -30, -30,
    -50, -30, -30, -30, -30, -30, -30, -50,
];

/// Table index for a piece standing on `square`. The diagrams put rank 8
/// first, so White flips the row and Black reads it directly.
fn table_index(color: Color, (row, col): Square) -> usize {
    match color {
        Color::White => (7 - row) * 8 + col,
        Color::Black => row * 8 + col,
    }
}

/// Piece-square bonus in centipawns.
pub fn square_bonus(piece: Piece, square: Square, non_king_pieces: usize) -> i32 {
    let table = match piece.piece_type {
        PieceType::Pawn => &PAWN_TABLE,
        PieceType::Knight => &KNIGHT_TABLE,
        PieceType::Bishop => &BISHOP_TABLE,
        PieceType::Rook => &ROOK_TABLE,
        PieceType::Queen => &QUEEN_TABLE,
        PieceType::King if non_king_pieces <= ENDGAME_PIECE_THRESHOLD => &KING_ENDGAME_TABLE,
        PieceType::King => &KING_MIDGAME_TABLE,
    };
    table[table_index(piece.color, square)]
}

/// Score of the position from `color`'s point of view, in centipawns.
///
/// When `color` is well ahead against a nearly bare opponent, a bonus rewards
/// driving the enemy king to the edge and bringing the own king closer, so
/// the search can make progress towards mate instead of shuffling.
pub fn evaluate(board: &Board, color: Color) -> i32 {
    let non_king_pieces = board.non_king_piece_count();
    let mut totals = [0i32; 2];

    for row in 0..8 {
        for col in 0..8 {
            if let Some(piece) = board.squares[row][col] {
                let material = piece.piece_type.value() * 100;
                let bonus = square_bonus(piece, (row, col), non_king_pieces);
                totals[piece.color.index()] += material + bonus;
            }
        }
    }

    let own = totals[color.index()];
    let opponent = totals[color.opposite().index()];
    let mut score = own - opponent;

    if own - opponent > MATING_LEAD && opponent <= MATING_DEFENDER_MAX {
        score += mating_bonus(board, color);
    }
    score
}

fn mating_bonus(board: &Board, color: Color) -> i32 {
    let (Some(own_king), Some(enemy_king)) =
        (board.king_square(color), board.king_square(color.opposite()))
    else {
        return 0;
    };
    let (er, ec) = (enemy_king.0 as i32, enemy_king.1 as i32);
    let edge_distance = er.min(7 - er).min(ec).min(7 - ec);
    let king_distance = (own_king.0 as i32 - er).abs() + (own_king.1 as i32 - ec).abs();
    (3 - edge_distance) * 20 + (14 - king_distance) * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kings(white: Square, black: Square) -> Board {
        let mut board = Board::empty();
        board.put(white, Some(Piece::new(PieceType::King, Color::White)));
        board.put(black, Some(Piece::new(PieceType::King, Color::Black)));
        board
    }

    #[test]
    fn starting_position_is_balanced() {
        let board = Board::new();
        assert_eq!(evaluate(&board, Color::White), 0);
        assert_eq!(evaluate(&board, Color::Black), 0);
    }

    #[test]
    fn tables_mirror_between_colours() {
        let white_pawn = Piece::new(PieceType::Pawn, Color::White);
        let black_pawn = Piece::new(PieceType::Pawn, Color::Black);
        // e7 for White is the 50-point rank; e2 for Black is the same rank
        assert_eq!(square_bonus(white_pawn, (6, 4), 20), 50);
        assert_eq!(square_bonus(black_pawn, (1, 4), 20), 50);
        // e2 for White sits behind the centre
        assert_eq!(square_bonus(white_pawn, (1, 4), 20), -20);
    }

    #[test]
    fn king_table_depends_on_material() {
        let king = Piece::new(PieceType::King, Color::White);
        // g1: castled king is good in the middlegame, poor in the endgame
        assert_eq!(square_bonus(king, (0, 6), 20), 30);
        assert_eq!(square_bonus(king, (0, 6), 4), -30);
        // e4 is the reverse
        assert_eq!(square_bonus(king, (3, 4), 20), -40);
        assert_eq!(square_bonus(king, (3, 4), 4), 40);
    }

    #[test]
    fn extra_queen_is_positive_for_owner_only() {
        let mut board = kings((0, 4), (7, 4));
        board.put((0, 3), Some(Piece::new(PieceType::Queen, Color::White)));
        let white = evaluate(&board, Color::White);
        let black = evaluate(&board, Color::Black);
        assert!(white > 800, "white should be up a queen: {white}");
        assert!(black < -800, "black should be down a queen: {black}");
    }

    #[test]
    fn mating_bonus_prefers_cornered_enemy_king() {
        let mut cornered = kings((2, 2), (0, 0));
        cornered.put((5, 5), Some(Piece::new(PieceType::Rook, Color::White)));
        let mut central = kings((2, 2), (4, 4));
        central.put((5, 5), Some(Piece::new(PieceType::Rook, Color::White)));

        // Same material and rook square; only the king placement differs
        let cornered_bonus = mating_bonus(&cornered, Color::White);
        let central_bonus = mating_bonus(&central, Color::White);
        assert_eq!(cornered_bonus, 3 * 20 + (14 - 4) * 3);
        assert_eq!(central_bonus, (14 - 4) * 3);

        // Both positions qualify: White leads by a rook, Black has only a king
        let with_bonus = evaluate(&cornered, Color::White);
        let rook = Piece::new(PieceType::Rook, Color::White);
        let white_king = Piece::new(PieceType::King, Color::White);
        let black_king = Piece::new(PieceType::King, Color::Black);
        let plain = 500 + square_bonus(rook, (5, 5), 1) + square_bonus(white_king, (2, 2), 1)
            - square_bonus(black_king, (0, 0), 1);
        assert_eq!(with_bonus, plain + cornered_bonus);
    }

    #[test]
    fn no_mating_bonus_without_lead() {
        let mut board = kings((2, 2), (0, 0));
        board.put((5, 5), Some(Piece::new(PieceType::Rook, Color::White)));
        board.put((6, 6), Some(Piece::new(PieceType::Rook, Color::Black)));
        let own: i32 = 500 + square_bonus(Piece::new(PieceType::Rook, Color::White), (5, 5), 2)
            + square_bonus(Piece::new(PieceType::King, Color::White), (2, 2), 2);
        let opp: i32 = 500 + square_bonus(Piece::new(PieceType::Rook, Color::Black), (6, 6), 2)
            + square_bonus(Piece::new(PieceType::King, Color::Black), (0, 0), 2);
        assert_eq!(evaluate(&board, Color::White), own - opp);
    }
}
