//! Standard Algebraic Notation for committed moves.

use crate::board::Board;
use crate::moves::{square_name, CastleSide, MoveRecord};
use crate::piece::PieceType;
use crate::status::GameOverReason;

/// SAN text for `record`, which was played on `before` and produced `after`.
pub fn move_to_san(before: &Board, record: &MoveRecord, after: &Board) -> String {
    let mut san = match record.castle {
        Some(CastleSide::King) => "O-O".to_string(),
        Some(CastleSide::Queen) => "O-O-O".to_string(),
        None => piece_move_text(before, record),
    };

    let status = after.clone().game_status();
    if status.reason == Some(GameOverReason::Checkmate) {
        san.push('#');
    } else if status.in_check {
        san.push('+');
    }
    san
}

fn piece_move_text(before: &Board, record: &MoveRecord) -> String {
    let is_capture = record.captured.is_some() || record.en_passant;
    let destination = square_name(record.to);
    let mut san = String::new();

    if record.piece.piece_type == PieceType::Pawn {
        if is_capture {
            san.push(file_char(record.from.1));
            san.push('x');
        }
        san.push_str(&destination);
        if let Some(promo) = record.promotion {
            san.push('=');
            san.push(promo.letter());
        }
        return san;
    }

    san.push(record.piece.piece_type.letter());
    san.push_str(&disambiguation(before, record));
    if is_capture {
        san.push('x');
    }
    san.push_str(&destination);
    san
}

fn file_char(col: usize) -> char {
    (b'a' + col as u8) as char
}

fn rank_char(row: usize) -> char {
    (b'1' + row as u8) as char
}

/// Origin file, rank or both, when another piece of the same kind could
/// also legally reach the destination. Prefers the file, then the rank.
fn disambiguation(before: &Board, record: &MoveRecord) -> String {
    let piece = record.piece;
    if piece.piece_type == PieceType::King {
        return String::new();
    }

    let mut board = before.clone();
    let mut rivals = Vec::new();
    for row in 0..8 {
        for col in 0..8 {
            if (row, col) == record.from || board.squares[row][col] != Some(piece) {
                continue;
            }
            if board.legal_moves((row, col)).iter().any(|m| m.to == record.to) {
                rivals.push((row, col));
            }
        }
    }
    if rivals.is_empty() {
        return String::new();
    }

    let (from_row, from_col) = record.from;
    let same_file = rivals.iter().any(|&(_, c)| c == from_col);
    let same_rank = rivals.iter().any(|&(r, _)| r == from_row);
    match (same_file, same_rank) {
        (false, _) => file_char(from_col).to_string(),
        (true, false) => rank_char(from_row).to_string(),
        (true, true) => format!("{}{}", file_char(from_col), rank_char(from_row)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ApplyOptions;
    use crate::moves::{Move, Square};
    use crate::piece::{Color, Piece};

    fn play(board: &mut Board, from: Square, to: Square, promotion: Option<PieceType>) -> String {
        let before = board.clone();
        let piece = board.piece_at(from).expect("piece on origin");
        let mut mv = Move::new(from, to, piece);
        mv.promotion = promotion;
        let record = board.apply_move(&mv, ApplyOptions::commit()).expect("move applies");
        move_to_san(&before, &record, board)
    }

    fn place(board: &mut Board, square: Square, pt: PieceType, color: Color) {
        board.put(square, Some(Piece::new(pt, color)));
    }

    #[test]
    fn opening_moves() {
        let mut board = Board::new();
        assert_eq!(play(&mut board, (1, 4), (3, 4), None), "e4");
        assert_eq!(play(&mut board, (6, 3), (4, 3), None), "d5");
        assert_eq!(play(&mut board, (3, 4), (4, 3), None), "exd5");
        assert_eq!(play(&mut board, (7, 3), (4, 3), None), "Qxd5");
        assert_eq!(play(&mut board, (0, 1), (2, 2), None), "Nc3");
    }

    #[test]
    fn fools_mate_ends_with_hash() {
        let mut board = Board::new();
        play(&mut board, (1, 5), (2, 5), None);
        play(&mut board, (6, 4), (4, 4), None);
        play(&mut board, (1, 6), (3, 6), None);
        assert_eq!(play(&mut board, (7, 3), (3, 7), None), "Qh4#");
    }

    #[test]
    fn castling_and_check() {
        let mut board = Board::empty();
        board.castling_rights = crate::board::CastlingRights::all();
        place(&mut board, (0, 4), PieceType::King, Color::White);
        place(&mut board, (0, 7), PieceType::Rook, Color::White);
        place(&mut board, (7, 5), PieceType::King, Color::Black);
        // The rook lands on f1 and checks the king on f8
        assert_eq!(play(&mut board, (0, 4), (0, 6), None), "O-O+");
    }

    #[test]
    fn promotion_suffix() {
        let mut board = Board::empty();
        place(&mut board, (0, 0), PieceType::King, Color::White);
        place(&mut board, (7, 7), PieceType::King, Color::Black);
        place(&mut board, (6, 2), PieceType::Pawn, Color::White);
        assert_eq!(play(&mut board, (6, 2), (7, 2), Some(PieceType::Knight)), "c8=N");
    }

    #[test]
    fn disambiguates_by_file_then_rank() {
        // Rooks on a1 and h1 can both reach d1: file wins
        let mut board = Board::empty();
        place(&mut board, (7, 4), PieceType::King, Color::White);
        place(&mut board, (6, 6), PieceType::King, Color::Black);
        place(&mut board, (0, 0), PieceType::Rook, Color::White);
        place(&mut board, (0, 7), PieceType::Rook, Color::White);
        assert_eq!(play(&mut board, (0, 0), (0, 3), None), "Rad1");

        // Rooks on a1 and a5 can both reach a3: rank wins
        let mut board = Board::empty();
        place(&mut board, (7, 4), PieceType::King, Color::White);
        place(&mut board, (6, 6), PieceType::King, Color::Black);
        place(&mut board, (0, 0), PieceType::Rook, Color::White);
        place(&mut board, (4, 0), PieceType::Rook, Color::White);
        assert_eq!(play(&mut board, (0, 0), (2, 0), None), "R1a3");
    }

    #[test]
    fn disambiguates_by_both() {
        // Queens on a1, a3 and c1 can all reach b2
        let mut board = Board::empty();
        place(&mut board, (7, 4), PieceType::King, Color::White);
        place(&mut board, (7, 6), PieceType::King, Color::Black);
        place(&mut board, (0, 0), PieceType::Queen, Color::White);
        place(&mut board, (2, 0), PieceType::Queen, Color::White);
        place(&mut board, (0, 2), PieceType::Queen, Color::White);
        assert_eq!(play(&mut board, (0, 0), (1, 1), None), "Qa1b2");
    }

    #[test]
    fn en_passant_reads_as_pawn_capture() {
        let mut board = Board::new();
        play(&mut board, (1, 4), (3, 4), None);
        play(&mut board, (6, 0), (5, 0), None);
        play(&mut board, (3, 4), (4, 4), None);
        play(&mut board, (6, 3), (4, 3), None);
        assert_eq!(play(&mut board, (4, 4), (5, 3), None), "exd6");
    }
}
