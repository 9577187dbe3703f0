//! Static exchange evaluation (SEE).
//!
//! Estimates the material outcome of the capture sequence a move starts on
//! its destination square, assuming both sides always recapture with their
//! least valuable attacker and may stand pat at any point.

use super::attack_tables::{bishop_attacks, rook_attacks};
use super::psqt;
use super::types::{Bitboard, Move, MoveKind, Piece, Square};
use super::Position;

/// Hard cap on the exchange depth; 32 captures on one square cannot be
/// exceeded on a board of 32 pieces.
const MAX_SWAPS: usize = 32;

#[inline]
fn value_of(piece: Option<Piece>) -> i32 {
    piece.map_or(0, psqt::value_mg)
}

impl Position {
    /// The sign of [`Position::see`], skipping the swap computation when the
    /// captured piece is worth at least the capturer: such an exchange can
    /// never lose material. King moves always take the fast path because
    /// the king's midgame value is zero.
    #[must_use]
    pub fn see_sign(&self, m: Move) -> i32 {
        debug_assert!(!m.is_null());

        if value_of(self.piece_on(m.to())) >= value_of(self.piece_on(m.from())) {
            return 1;
        }
        self.see(m)
    }

    /// Static exchange evaluation of `m` in centipawns, from the point of
    /// view of the side making the move.
    #[must_use]
    pub fn see(&self, m: Move) -> i32 {
        debug_assert!(!m.is_null());

        let from = m.from();
        let to = m.to();
        let us = self.color_on(from).expect("see: from square empty");

        let mut occupied = self.pieces() ^ from;
        let mut captured = self.piece_on(to);

        match m.kind() {
            MoveKind::EnPassant => {
                // Remove the captured pawn, which is not on the target square
                let capsq = to.offset(us.opponent().pawn_push());
                debug_assert!(captured.is_none());
                debug_assert_eq!(self.piece_on(capsq), Some(Piece::Pawn));
                occupied ^= capsq;
                captured = Some(Piece::Pawn);
            }
            // A castle is king-captures-own-rook; no exchange can start on a
            // friendly square, and the answer is always 0.
            MoveKind::Castle => return 0,
            _ => {}
        }

        // All attackers of the target square once the mover has left,
        // including any x-ray attacker its departure unmasks.
        let mut attackers = self.attackers_to_occ(to, occupied);

        let mut stm = us.opponent();
        let mut stm_attackers = attackers & self.pieces_by_color(stm);
        if stm_attackers.is_empty() {
            return value_of(captured);
        }

        // The square is defended: build the swap list of running material
        // deltas, the sides alternately capturing with their least valuable
        // attacker, then negamax it backwards.
        let mut swap_list = [0i32; MAX_SWAPS];
        let mut sl_index = 1;

        swap_list[0] = value_of(captured);
        let mut capturer = self.piece_on(from).expect("see: from square empty");

        loop {
            debug_assert!(sl_index < MAX_SWAPS);

            swap_list[sl_index] = -swap_list[sl_index - 1] + psqt::value_mg(capturer);
            sl_index += 1;

            capturer = self.min_attacker(to, stm_attackers, &mut occupied, &mut attackers);

            attackers &= occupied;
            stm = stm.opponent();
            stm_attackers = attackers & self.pieces_by_color(stm);

            if capturer == Piece::King {
                // A king may not step into a defended square; if defenders
                // remain, the side trying the king capture forfeits the
                // exchange, represented by a sentinel no minimax can prefer.
                if stm_attackers.any() {
                    swap_list[sl_index] = psqt::QUEEN_VALUE_MG * 16;
                    sl_index += 1;
                }
                break;
            }

            if stm_attackers.is_empty() {
                break;
            }
        }

        while sl_index > 1 {
            sl_index -= 1;
            swap_list[sl_index - 1] = swap_list[sl_index - 1].min(-swap_list[sl_index]);
        }
        swap_list[0]
    }

    /// Locate the least valuable piece in `stm_attackers`, remove it from
    /// `occupied`, and rescan for x-ray attackers its departure unmasks:
    /// diagonal sliders behind a pawn, bishop, or queen; orthogonal sliders
    /// behind a rook or queen. The king is terminal and removes nothing.
    fn min_attacker(
        &self,
        to: Square,
        stm_attackers: Bitboard,
        occupied: &mut Bitboard,
        attackers: &mut Bitboard,
    ) -> Piece {
        for piece in [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
        ] {
            let candidates = stm_attackers & self.pieces_by_type(piece);
            if candidates.any() {
                *occupied ^= candidates.lsb();

                if matches!(piece, Piece::Pawn | Piece::Bishop | Piece::Queen) {
                    *attackers |= bishop_attacks(to, *occupied)
                        & self.pieces_by_types(Piece::Bishop, Piece::Queen);
                }
                if matches!(piece, Piece::Rook | Piece::Queen) {
                    *attackers |= rook_attacks(to, *occupied)
                        & self.pieces_by_types(Piece::Rook, Piece::Queen);
                }

                return piece;
            }
        }
        Piece::King
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Square;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    const PAWN: i32 = psqt::PIECE_VALUE_MG[0];
    const KNIGHT: i32 = psqt::PIECE_VALUE_MG[1];
    const ROOK: i32 = psqt::PIECE_VALUE_MG[3];
    const QUEEN: i32 = psqt::PIECE_VALUE_MG[4];

    #[test]
    fn test_see_undefended_capture() {
        let pos: Position = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::normal(sq("e4"), sq("d5"))), PAWN);
    }

    #[test]
    fn test_see_equal_exchange() {
        // Pawn takes pawn, pawn recaptures: net zero
        let pos: Position = "4k3/8/2p5/3p4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::normal(sq("e4"), sq("d5"))), 0);
    }

    #[test]
    fn test_see_losing_capture() {
        // Knight takes a pawn defended by a pawn
        let pos: Position = "4k3/8/2p5/3p4/4N3/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::normal(sq("e4"), sq("d5"))), PAWN - KNIGHT);
    }

    #[test]
    fn test_see_rook_takes_queen_no_defender() {
        // Battery position: Re4xe6 wins the queen outright, since the king
        // on e8 does not reach e6 and nothing else defends it.
        let pos: Position = "4k3/8/4q3/8/4R3/8/4Q3/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::normal(sq("e4"), sq("e6"))), QUEEN);
    }

    #[test]
    fn test_see_rook_takes_defended_queen() {
        // Same exchange with the queen defended by a pawn: the rook is lost
        // to the recapture and White has no follow-up, netting queen - rook.
        let pos: Position = "4k3/5p2/4q3/8/4R3/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::normal(sq("e4"), sq("e6"))), QUEEN - ROOK);
    }

    #[test]
    fn test_see_xray_recapture() {
        const BISHOP: i32 = psqt::PIECE_VALUE_MG[2];
        // Bxd5 cxd5 Qxd5: the queen recaptures through the square the
        // bishop vacated. Two pawns for a bishop.
        let pos: Position = "7k/8/2p5/3p4/4B3/5Q2/8/7K w - - 0 1".parse().unwrap();
        assert_eq!(
            pos.see(Move::normal(sq("e4"), sq("d5"))),
            2 * PAWN - BISHOP
        );

        // Without the queen behind it, the exchange stops a pawn earlier
        let pos: Position = "7k/8/2p5/3p4/4B3/8/8/7K w - - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::normal(sq("e4"), sq("d5"))), PAWN - BISHOP);
    }

    #[test]
    fn test_see_king_cannot_recapture_defended() {
        // Rook grabs the queen next to the enemy king, but the rook is
        // protected by its own queen, so Kxe6 is forfeit and SEE keeps the
        // full queen.
        let pos: Position = "8/4k3/4q3/8/4R3/8/4Q3/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::normal(sq("e4"), sq("e6"))), QUEEN);
    }

    #[test]
    fn test_see_king_recaptures_undefended() {
        // Without the backing queen the king simply recaptures the rook
        let pos: Position = "8/4k3/4q3/8/4R3/8/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::normal(sq("e4"), sq("e6"))), QUEEN - ROOK);
    }

    #[test]
    fn test_see_en_passant() {
        // The captured pawn is off the target square; undefended, wins a pawn
        let pos: Position = "4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::en_passant(sq("d5"), sq("e6"))), PAWN);
    }

    #[test]
    fn test_see_castle_is_zero() {
        let pos: Position = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        assert_eq!(pos.see(Move::castle(sq("e1"), sq("h1"))), 0);
    }

    #[test]
    fn test_see_sign_fast_path() {
        // Queen takes a defended queen: equal-or-better victim, sign is +1
        // without running the swap list
        let pos: Position = "3qk3/3r4/8/8/8/8/3Q4/3RK3 w - - 0 1".parse().unwrap();
        assert_eq!(pos.see_sign(Move::normal(sq("d2"), sq("d8"))), 1);

        // Queen takes a defended pawn: must fall through to the swap list
        let pos: Position = "4k3/2p5/3p4/8/8/8/3Q4/4K3 w - - 0 1".parse().unwrap();
        assert!(pos.see_sign(Move::normal(sq("d2"), sq("d6"))) < 0);
    }
}
