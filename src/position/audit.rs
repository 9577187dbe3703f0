//! Consistency auditor.
//!
//! The position keeps four redundant views of the board plus incrementally
//! maintained keys and scores; this module cross-checks all of them against
//! each other and against from-scratch recomputation. Wired into the
//! mutation paths behind `debug_assert!`, so release builds never pay for it.

use super::types::{CastlingSide, Color, Piece, Square};
use super::Position;

impl Position {
    /// The cheap subset of [`Position::audit`]: king bookkeeping, check
    /// state, and bitboard partitioning. Asserted on the make/unmake hot
    /// path in debug builds; the full cross-recomputation checks would slow
    /// debug perft runs by orders of magnitude, so those run only where
    /// tests invoke `audit` directly.
    pub(crate) fn audit_fast(&self) -> Result<(), usize> {
        let mut step = 1;

        for color in Color::BOTH {
            if self.piece_count(color, Piece::King) != 1
                || self.piece_at(self.king_square(color)) != Some((color, Piece::King))
            {
                return Err(step);
            }
        }

        step += 1;
        let us = self.side_to_move;
        let them = us.opponent();
        if (self.attackers_to(self.king_square(them)) & self.pieces_by_color(us)).any() {
            return Err(step);
        }

        step += 1;
        let checkers = self.attackers_to(self.king_square(us)) & self.pieces_by_color(them);
        if self.checkers() != checkers || checkers.popcount() > 2 {
            return Err(step);
        }

        step += 1;
        if (self.pieces_by_color(Color::White) & self.pieces_by_color(Color::Black)).any()
            || (self.pieces_by_color(Color::White) | self.pieces_by_color(Color::Black))
                != self.pieces()
        {
            return Err(step);
        }

        step += 1;
        if let Some(ep) = self.ep_square() {
            if ep.relative_rank(us) != 5 {
                return Err(step);
            }
        }

        Ok(())
    }

    /// Verify every structural invariant of the position.
    ///
    /// Returns `Err(step)` identifying the first failing check, which is
    /// usually enough to localize the incremental-update bug that caused it.
    pub fn audit(&self) -> Result<(), usize> {
        let mut step = 1;

        // 1: exactly one king per color, and the king squares resolve
        for color in Color::BOTH {
            if self.piece_count(color, Piece::King) != 1 {
                return Err(step);
            }
            if self.piece_at(self.king_square(color)) != Some((color, Piece::King)) {
                return Err(step);
            }
        }

        // 2: the side not to move is not in check
        step += 1;
        let us = self.side_to_move;
        let them = us.opponent();
        if (self.attackers_to(self.king_square(them)) & self.pieces_by_color(us)).any() {
            return Err(step);
        }

        // 3: the checker set is correct and never exceeds a double check
        step += 1;
        let checkers = self.attackers_to(self.king_square(us)) & self.pieces_by_color(them);
        if self.checkers() != checkers || checkers.popcount() > 2 {
            return Err(step);
        }

        // 4: color bitboards partition the occupancy
        step += 1;
        if (self.pieces_by_color(Color::White) & self.pieces_by_color(Color::Black)).any()
            || (self.pieces_by_color(Color::White) | self.pieces_by_color(Color::Black))
                != self.pieces()
        {
            return Err(step);
        }

        // 5: type bitboards are pairwise disjoint and union to the occupancy
        step += 1;
        let mut union = crate::position::Bitboard::EMPTY;
        for p1 in Piece::ALL {
            union |= self.pieces_by_type(p1);
            for p2 in Piece::ALL {
                if p1 != p2 && (self.pieces_by_type(p1) & self.pieces_by_type(p2)).any() {
                    return Err(step);
                }
            }
        }
        if union != self.pieces() {
            return Err(step);
        }

        // 6: the mailbox and the bitboards tell the same story
        step += 1;
        for idx in 0..64 {
            let sq = Square::from_index(idx);
            match self.board[idx] {
                Some((color, piece)) => {
                    if !self.pieces_of(color, piece).contains(sq) {
                        return Err(step);
                    }
                }
                None => {
                    if self.pieces().contains(sq) {
                        return Err(step);
                    }
                }
            }
        }

        // 7: the ep square sits on the mover's relative rank 6
        step += 1;
        if let Some(ep) = self.ep_square() {
            if ep.relative_rank(us) != 5 {
                return Err(step);
            }
        }

        // 8-12: incremental quantities equal their from-scratch counterparts
        step += 1;
        if self.key() != self.compute_key() {
            return Err(step);
        }
        step += 1;
        if self.pawn_key() != self.compute_pawn_key() {
            return Err(step);
        }
        step += 1;
        if self.material_key() != self.compute_material_key() {
            return Err(step);
        }
        step += 1;
        if self.psq_score() != self.compute_psq_score() {
            return Err(step);
        }
        step += 1;
        for color in Color::BOTH {
            if self.non_pawn_material(color) != self.compute_non_pawn_material(color) {
                return Err(step);
            }
        }

        // 13: counts match popcounts
        step += 1;
        for color in Color::BOTH {
            for piece in Piece::ALL {
                if self.piece_count(color, piece)
                    != self.pieces_of(color, piece).popcount() as usize
                {
                    return Err(step);
                }
            }
        }

        // 14: piece lists and the index array round-trip
        step += 1;
        for color in Color::BOTH {
            for piece in Piece::ALL {
                for (i, &sq) in self.piece_squares(color, piece).iter().enumerate() {
                    if self.piece_at(sq) != Some((color, piece)) {
                        return Err(step);
                    }
                    if self.index[sq.index()] as usize != i {
                        return Err(step);
                    }
                }
                for slot in self.piece_count(color, piece)..16 {
                    if self.piece_list[color.index()][piece.index()][slot] != Square::NONE {
                        return Err(step);
                    }
                }
            }
        }

        // 15: castling bookkeeping agrees with the rights in force
        step += 1;
        for color in Color::BOTH {
            for side in CastlingSide::BOTH {
                if !self.can_castle(color, side) {
                    continue;
                }
                let cr = super::types::CastlingRights::single(color, side);
                let Some(rook) = self.castle_rook_square(color, side) else {
                    return Err(step);
                };
                if self.piece_at(rook) != Some((color, Piece::Rook)) {
                    return Err(step);
                }
                if self.castling_mask[rook.index()] != cr {
                    return Err(step);
                }
                if self.castling_mask[self.king_square(color).index()]
                    .intersection(cr)
                    != cr
                {
                    return Err(step);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Bitboard;

    #[test]
    fn test_audit_accepts_valid_positions() {
        assert_eq!(Position::startpos().audit(), Ok(()));
        let kiwipete: Position =
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
                .parse()
                .unwrap();
        assert_eq!(kiwipete.audit(), Ok(()));
    }

    #[test]
    fn test_audit_detects_bitboard_drift() {
        let mut pos = Position::startpos();
        pos.by_color[0] ^= Bitboard::from_square(Square::new(3, 3));
        assert!(pos.audit().is_err());
    }

    #[test]
    fn test_audit_detects_stale_key() {
        let mut pos = Position::startpos();
        pos.st_mut().key ^= 1;
        assert!(pos.audit().is_err());
    }

    #[test]
    fn test_audit_detects_piece_list_corruption() {
        let mut pos = Position::startpos();
        // Swap two pawns in the list without fixing the index array
        pos.piece_list[0][0].swap(0, 1);
        assert!(pos.audit().is_err());
    }
}
