//! Chess960 castling integration tests, driven through the public API.

use chess_position::{CastlingSide, Color, Move, Piece, Position, Square};

fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

#[test]
fn test_shredder_fen_round_trip() {
    let fen = "r3k2r/8/8/8/8/8/8/R3K2R w HAha - 0 1";
    let pos = Position::from_fen(fen, true).unwrap();
    assert!(pos.is_chess960());
    assert_eq!(pos.to_fen(), fen);
}

#[test]
fn test_castle_when_king_lands_on_rook_square() {
    // King f1, rook g1: after O-O the king occupies the rook's old square.
    let mut pos = Position::from_fen("7k/8/8/8/8/8/8/5KR1 w G - 0 1", true).unwrap();

    let castle = Move::castle(sq("f1"), sq("g1"));
    assert!(pos.legal_moves().contains(castle));

    let before_fen = pos.to_fen();
    let before_key = pos.key();

    pos.do_move_unchecked(castle);
    assert_eq!(pos.piece_at(sq("g1")), Some((Color::White, Piece::King)));
    assert_eq!(pos.piece_at(sq("f1")), Some((Color::White, Piece::Rook)));
    assert!(!pos.can_castle(Color::White, CastlingSide::King));
    assert_eq!(pos.audit(), Ok(()));

    pos.undo_move(castle);
    assert_eq!(pos.to_fen(), before_fen);
    assert_eq!(pos.key(), before_key);
    assert_eq!(pos.audit(), Ok(()));
}

#[test]
fn test_queenside_castle_with_adjacent_king_and_rook() {
    // King b1, rook a1: both pieces jump over squares neither started on.
    let mut pos = Position::from_fen("rk6/8/8/8/8/8/8/RK6 w Aa - 0 1", true).unwrap();

    let castle = Move::castle(sq("b1"), sq("a1"));
    assert!(pos.legal_moves().contains(castle));

    pos.do_move_unchecked(castle);
    assert_eq!(pos.piece_at(sq("c1")), Some((Color::White, Piece::King)));
    assert_eq!(pos.piece_at(sq("d1")), Some((Color::White, Piece::Rook)));
    assert_eq!(pos.audit(), Ok(()));

    pos.undo_move(castle);
    assert_eq!(pos.piece_at(sq("b1")), Some((Color::White, Piece::King)));
    assert_eq!(pos.piece_at(sq("a1")), Some((Color::White, Piece::Rook)));
}

#[test]
fn test_castle_rejected_when_transit_attacked() {
    // King e1, own rook f1, enemy rook h1 covering the f1/g1 transit squares
    let pos = Position::from_fen("7k/8/8/8/8/8/8/4KR1r w F - 0 1", true).unwrap();
    let castles: Vec<Move> = pos
        .legal_moves()
        .iter()
        .copied()
        .filter(|m| m.is_castle())
        .collect();
    assert!(castles.is_empty());
}

#[test]
fn test_chess960_discovered_rank_attack_rejected() {
    // King c1 already stands on its castling destination; the b1 rook's
    // departure to d1 would unmask the enemy rook on a1. Only Chess960
    // shapes can produce this, and the generator must reject it.
    let pos = Position::from_fen("2k5/8/8/8/8/8/8/rRK5 w B - 0 1", true).unwrap();
    let castles: Vec<Move> = pos
        .legal_moves()
        .iter()
        .copied()
        .filter(|m| m.is_castle())
        .collect();
    assert!(castles.is_empty());
}

#[test]
fn test_black_mirror_castle() {
    let mut pos = Position::from_fen("5kr1/8/8/8/8/8/8/7K b g - 0 1", true).unwrap();
    let castle = Move::castle(sq("f8"), sq("g8"));
    assert!(pos.legal_moves().contains(castle));

    pos.do_move_unchecked(castle);
    assert_eq!(pos.piece_at(sq("g8")), Some((Color::Black, Piece::King)));
    assert_eq!(pos.piece_at(sq("f8")), Some((Color::Black, Piece::Rook)));
    assert_eq!(pos.audit(), Ok(()));
}
