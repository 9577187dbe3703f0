//! The position core: board state, make/unmake, legality, SEE.

mod attack_tables;
mod audit;
mod error;
mod fen;
mod legality;
mod make_unmake;
mod movegen;
mod psqt;
mod see;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use error::{FenError, MoveParseError};
pub use fen::START_FEN;
pub use legality::CheckInfo;
pub use state::{Position, PrefetchHooks, StateInfo};
pub use types::{
    Bitboard, CastlingRights, CastlingSide, Color, Move, MoveKind, MoveList, Piece, Score, Square,
    MAX_PLY,
};
