//! Chess position core.
//!
//! Provides the in-memory representation of a chess position together with:
//! - Mailbox + bitboard + piece-list board state, kept mutually consistent
//! - Make/unmake with incrementally maintained Zobrist keys, piece-square
//!   score, and non-pawn material
//! - Chess960-capable castling (king-captures-own-rook move encoding)
//! - FEN parsing and emission, including Shredder-FEN and X-FEN castling
//! - Static exchange evaluation (SEE)
//! - A legal move generator and perft driver
//!
//! # Quick Start
//!
//! ```
//! use chess_position::Position;
//!
//! let mut pos = Position::startpos();
//! assert_eq!(pos.legal_moves().len(), 20);
//!
//! let mv = pos.parse_uci_move("e2e4").unwrap();
//! pos.do_move_unchecked(mv);
//! pos.undo_move(mv);
//! assert_eq!(pos.to_fen(), chess_position::START_FEN);
//! ```
//!
//! # Building Positions
//!
//! ```
//! use chess_position::Position;
//!
//! // From FEN notation
//! let pos = Position::from_fen(
//!     "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
//!     false,
//! ).unwrap();
//! assert!(!pos.in_check());
//!
//! // Chess960 positions use Shredder-FEN rook-file castling letters
//! let pos960 = Position::from_fen("5kr1/8/8/8/8/8/8/5KR1 w Gg - 0 1", true).unwrap();
//! assert!(pos960.is_chess960());
//! ```
//!
//! # Features
//!
//! - `serde` - Enable serialization for `Piece`, `Color`, `Square`, `Move`,
//!   and `CastlingRights`

// Enable pedantic lints with sensible domain-specific exceptions
#![warn(clippy::pedantic)]
// Bitboard hex literals are clearer without separators (bit patterns visible)
#![allow(clippy::unreadable_literal)]
// Chess engines have intentionally similar names (pawn_key/material_key, etc.)
#![allow(clippy::similar_names)]
// Index casts are ubiquitous and safe in chess (board indices, square indices)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
// Large arrays are needed for move lists and attack tables
#![allow(clippy::large_stack_arrays)]
// Module-level documentation is sufficient for this codebase
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod position;
pub mod zobrist;

pub use position::{
    Bitboard, CastlingRights, CastlingSide, CheckInfo, Color, FenError, Move, MoveKind, MoveList,
    MoveParseError, Piece, Position, PrefetchHooks, Score, Square, StateInfo, MAX_PLY, START_FEN,
};
