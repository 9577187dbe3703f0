//! Castling rights type.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::piece::Color;

pub(crate) const CASTLE_WHITE_K: u8 = 1 << 0;
pub(crate) const CASTLE_WHITE_Q: u8 = 1 << 1;
pub(crate) const CASTLE_BLACK_K: u8 = 1 << 2;
pub(crate) const CASTLE_BLACK_Q: u8 = 1 << 3;

/// Which wing a castle goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastlingSide {
    King,
    Queen,
}

impl CastlingSide {
    pub const BOTH: [CastlingSide; 2] = [CastlingSide::King, CastlingSide::Queen];

    #[inline]
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        match self {
            CastlingSide::King => 0,
            CastlingSide::Queen => 1,
        }
    }
}

/// Castling rights represented as a 4-bit mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CastlingRights(u8);

impl CastlingRights {
    /// No castling rights
    #[inline]
    #[must_use]
    pub const fn none() -> Self {
        CastlingRights(0)
    }

    /// The single right for a (color, side) pair
    #[inline]
    #[must_use]
    pub(crate) const fn single(color: Color, side: CastlingSide) -> Self {
        CastlingRights(Self::bit_for(color, side))
    }

    /// Check if a specific castling right is set
    #[inline]
    #[must_use]
    pub const fn has(self, color: Color, side: CastlingSide) -> bool {
        self.0 & Self::bit_for(color, side) != 0
    }

    /// Check if either castling right for a color is set
    #[inline]
    #[must_use]
    pub const fn has_any(self, color: Color) -> bool {
        match color {
            Color::White => self.0 & (CASTLE_WHITE_K | CASTLE_WHITE_Q) != 0,
            Color::Black => self.0 & (CASTLE_BLACK_K | CASTLE_BLACK_Q) != 0,
        }
    }

    /// Returns true if no right is set
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set all rights in `other`
    #[inline]
    pub(crate) fn add(&mut self, other: CastlingRights) {
        self.0 |= other.0;
    }

    /// Clear all rights in `other`
    #[inline]
    pub(crate) fn clear(&mut self, other: CastlingRights) {
        self.0 &= !other.0;
    }

    /// The rights present in both masks
    #[inline]
    #[must_use]
    pub(crate) const fn intersection(self, other: CastlingRights) -> CastlingRights {
        CastlingRights(self.0 & other.0)
    }

    /// The rights present in either mask
    #[inline]
    #[must_use]
    pub(crate) const fn union(self, other: CastlingRights) -> CastlingRights {
        CastlingRights(self.0 | other.0)
    }

    /// Get the raw bitmask value (for Zobrist hashing)
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[inline]
    const fn bit_for(color: Color, side: CastlingSide) -> u8 {
        match (color, side) {
            (Color::White, CastlingSide::King) => CASTLE_WHITE_K,
            (Color::White, CastlingSide::Queen) => CASTLE_WHITE_Q,
            (Color::Black, CastlingSide::King) => CASTLE_BLACK_K,
            (Color::Black, CastlingSide::Queen) => CASTLE_BLACK_Q,
        }
    }
}
