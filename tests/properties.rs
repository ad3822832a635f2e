//! Property-based tests over random legal games.

use chess_bot::board::{ApplyOptions, Board};
use chess_bot::piece::{Color, PieceType};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn seed_strategy() -> impl Strategy<Value = u64> {
    any::<u64>()
}

fn ply_strategy() -> impl Strategy<Value = usize> {
    1..=40usize
}

fn find_king(board: &Board, color: Color) -> Option<(usize, usize)> {
    (0..8)
        .flat_map(|r| (0..8).map(move |c| (r, c)))
        .find(|&(r, c)| {
            board.squares[r][c].is_some_and(|p| p.piece_type == PieceType::King && p.color == color)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// No generated move leaves the mover in check or lands on a king.
    #[test]
    fn prop_legal_moves_are_safe(seed in seed_strategy(), plies in ply_strategy()) {
        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..plies {
            let side = board.current_turn;
            let moves = board.all_legal_moves(side);
            for mv in &moves {
                prop_assert!(mv.captured.map_or(true, |p| p.piece_type != PieceType::King));
                let undo = board.make_move(mv);
                prop_assert!(undo.is_some());
                prop_assert!(!board.is_in_check(side), "{} leaves the king in check", mv.to_uci());
                if let Some(undo) = undo {
                    board.unmake_move(undo);
                }
            }
            let Some(mv) = moves.choose(&mut rng).copied() else {
                break;
            };
            board.apply_move(&mv, ApplyOptions::commit());
        }
    }

    /// Taking back every move returns the exact starting board.
    #[test]
    fn prop_make_unmake_restores_board(seed in seed_strategy(), plies in ply_strategy()) {
        let mut board = Board::new();
        let initial = board.clone();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut undos = Vec::new();

        for _ in 0..plies {
            let moves = board.all_legal_moves(board.current_turn);
            let Some(mv) = moves.choose(&mut rng).copied() else {
                break;
            };
            if let Some(undo) = board.make_move(&mv) {
                undos.push(undo);
            }
        }
        while let Some(undo) = undos.pop() {
            board.unmake_move(undo);
        }

        prop_assert_eq!(board, initial);
    }

    /// A snapshot is independent of later play and restores the position fully.
    #[test]
    fn prop_snapshot_restore(seed in seed_strategy(), plies in ply_strategy()) {
        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..plies / 2 {
            let moves = board.all_legal_moves(board.current_turn);
            let Some(mv) = moves.choose(&mut rng).copied() else {
                break;
            };
            board.apply_move(&mv, ApplyOptions::commit());
        }

        let snapshot = board.snapshot();
        let before = board.clone();
        for _ in 0..plies {
            let moves = board.all_legal_moves(board.current_turn);
            let Some(mv) = moves.choose(&mut rng).copied() else {
                break;
            };
            board.apply_move(&mv, ApplyOptions::commit());
        }
        prop_assert_eq!(snapshot.board(), &before);

        board.restore(&snapshot);
        prop_assert_eq!(board, before);
    }

    /// The cached king squares agree with a scan of the board.
    #[test]
    fn prop_king_cache_in_sync(seed in seed_strategy(), plies in ply_strategy()) {
        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..plies {
            let moves = board.all_legal_moves(board.current_turn);
            let Some(mv) = moves.choose(&mut rng).copied() else {
                break;
            };
            board.apply_move(&mv, ApplyOptions::commit());
            for color in [Color::White, Color::Black] {
                prop_assert_eq!(board.king_square(color), find_king(&board, color));
            }
        }
    }
}
