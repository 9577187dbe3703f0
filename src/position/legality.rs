//! Attack queries, pins, and move legality.

use super::attack_tables::{
    aligned, between, bishop_attacks, king_attacks, knight_attacks, pawn_attacks, piece_attacks,
    pseudo_bishop_attacks, pseudo_rook_attacks, queen_attacks, rook_attacks,
};
use super::types::{Bitboard, Color, Move, MoveKind, Piece, Square};
use super::Position;

/// Precomputed check-detection data for the side to move, built once per
/// node so `gives_check` and `do_move` need no recomputation per move.
pub struct CheckInfo {
    /// The enemy king's square.
    pub(crate) king_square: Square,
    /// Friendly pieces pinned to our own king.
    pub(crate) pinned: Bitboard,
    /// Friendly pieces whose removal would reveal check on the enemy king.
    pub(crate) dc_candidates: Bitboard,
    /// For each piece type, the squares from which it would check the
    /// enemy king directly.
    pub(crate) check_squares: [Bitboard; 6],
}

impl CheckInfo {
    /// Build check info for `pos`'s side to move.
    #[must_use]
    pub fn new(pos: &Position) -> Self {
        let us = pos.side_to_move();
        let them = us.opponent();
        let ksq = pos.king_square(them);
        let occ = pos.pieces();

        let bishop_checks = bishop_attacks(ksq, occ);
        let rook_checks = rook_attacks(ksq, occ);

        CheckInfo {
            king_square: ksq,
            pinned: pos.pinned_pieces(),
            dc_candidates: pos.discovered_check_candidates(),
            check_squares: [
                pawn_attacks(them, ksq),
                knight_attacks(ksq),
                bishop_checks,
                rook_checks,
                bishop_checks | rook_checks,
                Bitboard::EMPTY,
            ],
        }
    }
}

impl Position {
    /// All pieces of either color attacking `sq` on the current occupancy.
    #[inline]
    #[must_use]
    pub fn attackers_to(&self, sq: Square) -> Bitboard {
        self.attackers_to_occ(sq, self.pieces())
    }

    /// All pieces of either color attacking `sq`, with sliders traced
    /// through the given occupancy.
    #[must_use]
    pub fn attackers_to_occ(&self, sq: Square, occ: Bitboard) -> Bitboard {
        (pawn_attacks(Color::Black, sq) & self.pieces_of(Color::White, Piece::Pawn))
            | (pawn_attacks(Color::White, sq) & self.pieces_of(Color::Black, Piece::Pawn))
            | (knight_attacks(sq) & self.pieces_by_type(Piece::Knight))
            | (rook_attacks(sq, occ) & self.pieces_by_types(Piece::Rook, Piece::Queen))
            | (bishop_attacks(sq, occ) & self.pieces_by_types(Piece::Bishop, Piece::Queen))
            | (king_attacks(sq) & self.pieces_by_type(Piece::King))
    }

    /// Sliders of `pinner_color` that align with the `king_color` king
    /// through exactly one intervening piece of the side to move; that
    /// intervening piece is returned. With `pinner_color` the opponent this
    /// finds pins, with `pinner_color` the side to move it finds discovered
    /// check candidates.
    fn hidden_checkers(&self, king_color: Color, pinner_color: Color) -> Bitboard {
        let ksq = self.king_square(king_color);
        let mut result = Bitboard::EMPTY;

        let mut pinners = (self.pieces_of2(pinner_color, Piece::Rook, Piece::Queen)
            & pseudo_rook_attacks(ksq))
            | (self.pieces_of2(pinner_color, Piece::Bishop, Piece::Queen)
                & pseudo_bishop_attacks(ksq));

        while pinners.any() {
            let pinner = pinners.pop_lsb();
            let blockers = between(ksq, pinner) & self.pieces();

            if blockers.any()
                && !blockers.more_than_one()
                && (blockers & self.pieces_by_color(self.side_to_move())).any()
            {
                result |= blockers;
            }
        }
        result
    }

    /// Friendly pieces pinned against the side to move's own king.
    #[inline]
    #[must_use]
    pub fn pinned_pieces(&self) -> Bitboard {
        self.hidden_checkers(self.side_to_move(), self.side_to_move().opponent())
    }

    /// Friendly pieces whose removal would expose the enemy king to a
    /// friendly slider.
    #[inline]
    #[must_use]
    pub fn discovered_check_candidates(&self) -> Bitboard {
        self.hidden_checkers(self.side_to_move().opponent(), self.side_to_move())
    }

    /// Whether making `m` would leave the moved piece, or a slider newly
    /// unmasked behind its vacated square, attacking `sq`.
    #[must_use]
    pub fn move_attacks_square(&self, m: Move, sq: Square) -> bool {
        let from = m.from();
        let to = m.to();
        let (color, piece) =
            self.piece_at(from).expect("move_attacks_square: from square empty");

        // Occupancy as if the piece had moved
        let occ = self.pieces() ^ from ^ to;

        if (piece_attacks(color, piece, to, occ) & Bitboard::from_square(sq)).any() {
            return true;
        }

        // X-ray attackers unmasked behind the vacated square
        let xray = (rook_attacks(sq, occ) & self.pieces_of2(color, Piece::Rook, Piece::Queen))
            | (bishop_attacks(sq, occ) & self.pieces_of2(color, Piece::Bishop, Piece::Queen));

        // Only count attackers triggered by the move, not pre-existing ones
        let existing = xray & queen_attacks(sq, self.pieces());
        (xray ^ existing).any()
    }

    /// Whether `m` is pseudo-legal in this position. Used to validate moves
    /// from external sources (e.g. a transposition table) that may be
    /// corrupted or stale.
    #[must_use]
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        let us = self.side_to_move();
        let them = us.opponent();
        let from = m.from();
        let to = m.to();

        // Uncommon kinds go through the generator instead
        if m.kind() != MoveKind::Normal {
            return self.legal_moves().contains(m);
        }

        // A normal move must not carry promotion bits
        if m.promotion_bits() != 0 {
            return false;
        }

        // The origin must hold a friendly piece
        let Some((color, piece)) = self.piece_at(from) else {
            return false;
        };
        if color != us {
            return false;
        }

        // The destination cannot hold a friendly piece
        if self.pieces_by_color(us).contains(to) {
            return false;
        }

        if piece == Piece::Pawn {
            // Promotions were handled as non-normal moves, so the
            // destination cannot be the last rank
            if Bitboard::from_square(to) & (Bitboard::RANK_1 | Bitboard::RANK_8) != Bitboard::EMPTY
            {
                return false;
            }

            let push = us.pawn_push();
            let delta = to.delta_from(from);

            if delta == push - 1 || delta == push + 1 {
                // Capture: an enemy piece must be taken, one file away
                if self.color_on(to) != Some(them) {
                    return false;
                }
                if from.file().abs_diff(to.file()) != 1 {
                    return false;
                }
            } else if delta == push {
                if !self.is_empty_square(to) {
                    return false;
                }
            } else if delta == 2 * push {
                // Double push from the pawn's home rank, both squares empty
                if to.relative_rank(us) != 3
                    || !self.is_empty_square(to)
                    || !self.is_empty_square(from.offset(push))
                {
                    return false;
                }
            } else {
                return false;
            }
        } else if !piece_attacks(us, piece, from, self.pieces()).contains(to) {
            return false;
        }

        // When in check the move must resolve it; the evasion generator
        // guarantees this for generated moves, so mirror its constraints.
        if self.in_check() {
            if piece == Piece::King {
                // Test the destination with the king removed, else stepping
                // away along the checking ray would look safe
                if (self.attackers_to_occ(to, self.pieces() ^ from)
                    & self.pieces_by_color(them))
                .any()
                {
                    return false;
                }
            } else {
                let checkers = self.checkers();
                if checkers.more_than_one() {
                    return false;
                }
                let checksq = checkers.lsb();
                if !((between(checksq, self.king_square(us)) | checkers).contains(to)) {
                    return false;
                }
            }
        }

        true
    }

    /// Whether the pseudo-legal `m` is legal, given the pinned pieces of
    /// the side to move. Castle legality is the move generator's duty.
    #[must_use]
    pub fn is_legal(&self, m: Move, pinned: Bitboard) -> bool {
        let us = self.side_to_move();
        let from = m.from();

        debug_assert_eq!(self.color_on(from), Some(us));
        debug_assert_eq!(pinned, self.pinned_pieces());

        // En passant: the capture empties two squares on the king's rank,
        // so simulate the resulting occupancy and look for slider attacks.
        if m.kind() == MoveKind::EnPassant {
            let them = us.opponent();
            let to = m.to();
            let capsq = to.offset(them.pawn_push());
            let ksq = self.king_square(us);
            let occ = (self.pieces() ^ from ^ capsq) | to;

            debug_assert_eq!(Some(to), self.ep_square());
            debug_assert_eq!(self.piece_at(capsq), Some((them, Piece::Pawn)));

            return (rook_attacks(ksq, occ) & self.pieces_of2(them, Piece::Rook, Piece::Queen))
                .is_empty()
                && (bishop_attacks(ksq, occ)
                    & self.pieces_of2(them, Piece::Bishop, Piece::Queen))
                .is_empty();
        }

        // A king move is legal iff the destination is not attacked; castles
        // were fully validated during generation.
        if self.piece_on(from) == Some(Piece::King) {
            return m.kind() == MoveKind::Castle
                || (self.attackers_to(m.to()) & self.pieces_by_color(us.opponent())).is_empty();
        }

        // Everything else: not pinned, or moving along the pin ray
        !pinned.contains(from) || aligned(from, m.to(), self.king_square(us))
    }

    /// Whether the pseudo-legal `m` gives check, using precomputed
    /// [`CheckInfo`].
    #[must_use]
    pub fn gives_check(&self, m: Move, ci: &CheckInfo) -> bool {
        let us = self.side_to_move();
        let from = m.from();
        let to = m.to();
        let piece = self.piece_on(from).expect("gives_check: from square empty");

        debug_assert_eq!(self.color_on(from), Some(us));

        // Direct check?
        if ci.check_squares[piece.index()].contains(to) {
            return true;
        }

        // Discovered check?
        if ci.dc_candidates.contains(from) {
            // Pawn and king moves along the king ray reveal nothing
            if (piece != Piece::Pawn && piece != Piece::King)
                || !aligned(from, to, ci.king_square)
            {
                return true;
            }
        }

        let ksq = ci.king_square;

        match m.kind() {
            MoveKind::Normal => false,

            // Does the promoted piece attack the king over the vacated from?
            MoveKind::Promotion => piece_attacks(
                us,
                m.promotion_piece(),
                to,
                self.pieces() ^ from,
            )
            .contains(ksq),

            // Direct and ordinary discovered checks are done; what remains
            // is the rare discovery through the captured pawn's square.
            MoveKind::EnPassant => {
                let capsq = Square::new(from.rank(), to.file());
                let occ = (self.pieces() ^ from ^ capsq) | to;

                ((rook_attacks(ksq, occ) & self.pieces_of2(us, Piece::Rook, Piece::Queen))
                    | (bishop_attacks(ksq, occ)
                        & self.pieces_of2(us, Piece::Bishop, Piece::Queen)))
                .any()
            }

            // Only the rook's arrival square can give check.
            MoveKind::Castle => {
                let king_from = from;
                let rook_from = to;
                let (king_to, rook_to) = if rook_from > king_from {
                    (Square::G1, Square::F1)
                } else {
                    (Square::C1, Square::D1)
                };
                let king_to = king_to.relative_to(us);
                let rook_to = rook_to.relative_to(us);
                let occ = ((self.pieces() ^ king_from ^ rook_from) | rook_to) | king_to;

                rook_attacks(rook_to, occ).contains(ksq)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn test_attackers_to_mixed_pieces() {
        let pos: Position = "4k3/8/8/3n4/8/4R3/3P4/4K3 w - - 0 1".parse().unwrap();

        // e3 is covered by the d2 pawn and the d5 knight, not the king
        let e3 = pos.attackers_to(sq("e3"));
        assert!(e3.contains(sq("d2")));
        assert!(e3.contains(sq("d5")));
        assert!(!e3.contains(sq("e1")));

        // The rook sees f3 along its rank, the king sees f1 and e2
        assert!(pos.attackers_to(sq("f3")).contains(sq("e3")));
        assert!(pos.attackers_to(sq("f1")).contains(sq("e1")));
        assert!(pos.attackers_to(sq("e2")).contains(sq("e1")));
    }

    #[test]
    fn test_attackers_to_respects_occupancy() {
        let pos: Position = "4k3/8/8/8/2b5/8/3P4/4K3 w - - 0 1".parse().unwrap();
        // Bishop c4 reaches e2 through the empty d3
        assert!(pos.attackers_to(sq("e2")).contains(sq("c4")));
        // Blocking d3 cuts the diagonal
        let blocked: Position = "4k3/8/8/8/2b5/3P4/8/4K3 w - - 0 1".parse().unwrap();
        assert!(!blocked.attackers_to(sq("e2")).contains(sq("c4")));
    }

    #[test]
    fn test_pinned_pieces() {
        // White knight on e3 pinned by the rook on e8 against the king on e1
        let pos: Position = "4r1k1/8/8/8/8/4N3/8/4K3 w - - 0 1".parse().unwrap();
        assert_eq!(
            pos.pinned_pieces(),
            Bitboard::from_square(sq("e3"))
        );

        // Two interposers means no pin
        let pos: Position = "4r1k1/8/8/4P3/8/4N3/8/4K3 w - - 0 1".parse().unwrap();
        assert!(pos.pinned_pieces().is_empty());
    }

    #[test]
    fn test_discovered_check_candidates() {
        // White bishop on e4 screens the rook on e1 from the black king on e8
        let pos: Position = "4k3/8/8/8/4B3/8/8/2K1R3 w - - 0 1".parse().unwrap();
        assert_eq!(
            pos.discovered_check_candidates(),
            Bitboard::from_square(sq("e4"))
        );
    }

    #[test]
    fn test_gives_check_direct_and_discovered() {
        let pos: Position = "4k3/8/8/8/4B3/8/8/2K1R3 w - - 0 1".parse().unwrap();
        let ci = CheckInfo::new(&pos);

        // Any bishop retreat off the e-file discovers the rook's check
        assert!(pos.gives_check(Move::normal(sq("e4"), sq("d5")), &ci));
        // A bishop move staying on the e-file cannot happen; a direct check:
        assert!(pos.gives_check(Move::normal(sq("e4"), sq("c6")), &ci));
        // Rook lift sideways: no check
        let pos2: Position = "4k3/8/8/8/8/8/8/2K1R3 w - - 0 1".parse().unwrap();
        let ci2 = CheckInfo::new(&pos2);
        assert!(!pos2.gives_check(Move::normal(sq("e1"), sq("d1")), &ci2));
        assert!(pos2.gives_check(Move::normal(sq("e1"), sq("e2")), &ci2));
    }

    #[test]
    fn test_gives_check_promotion() {
        let pos: Position = "3k4/4P3/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let ci = CheckInfo::new(&pos);
        // e8=Q checks the king on d8; e8=N does not
        assert!(pos.gives_check(
            Move::promotion(sq("e7"), sq("e8"), Piece::Queen),
            &ci
        ));
        assert!(!pos.gives_check(
            Move::promotion(sq("e7"), sq("e8"), Piece::Knight),
            &ci
        ));
    }

    #[test]
    fn test_is_legal_rejects_pin_breaking() {
        // The e3 knight is pinned and may not move; the d2 pawn may push
        let pos: Position = "4r1k1/8/8/8/8/4N3/3P4/4K3 w - - 0 1".parse().unwrap();
        let pinned = pos.pinned_pieces();
        assert!(!pos.is_legal(Move::normal(sq("e3"), sq("c4")), pinned));
        assert!(pos.is_legal(Move::normal(sq("d2"), sq("d3")), pinned));
    }

    #[test]
    fn test_is_legal_pinned_slide_along_ray() {
        // A rook pinned on a file may still slide along it
        let pos: Position = "4r1k1/8/8/8/8/4R3/8/4K3 w - - 0 1".parse().unwrap();
        let pinned = pos.pinned_pieces();
        assert_eq!(pinned, Bitboard::from_square(sq("e3")));
        assert!(pos.is_legal(Move::normal(sq("e3"), sq("e5")), pinned));
        assert!(!pos.is_legal(Move::normal(sq("e3"), sq("d3")), pinned));
    }

    #[test]
    fn test_is_legal_ep_horizontal_pin() {
        // The infamous horizontal-pin en passant: both pawns vanish from the
        // 5th rank, exposing the king to the rook.
        // Black's king sits on the pin rank here, so White's capture is fine
        let pos: Position = "8/8/8/k2Pp2R/8/8/8/4K3 w - e6 0 1".parse().unwrap();
        assert_eq!(pos.ep_square(), Some(sq("e6")));
        let pinned = pos.pinned_pieces();
        assert!(pos.is_legal(Move::en_passant(sq("d5"), sq("e6")), pinned));

        // Mirror it so the capturing side's own king is exposed
        let pos: Position = "4k3/8/8/K2pP2r/8/8/8/8 w - d6 0 1".parse().unwrap();
        assert_eq!(pos.ep_square(), Some(sq("d6")));
        let pinned = pos.pinned_pieces();
        assert!(!pos.is_legal(Move::en_passant(sq("e5"), sq("d6")), pinned));
    }

    #[test]
    fn test_is_pseudo_legal_validates_stored_moves() {
        let pos = Position::startpos();
        assert!(pos.is_pseudo_legal(Move::normal(sq("e2"), sq("e4"))));
        assert!(pos.is_pseudo_legal(Move::normal(sq("g1"), sq("f3"))));
        // Wrong mover color
        assert!(!pos.is_pseudo_legal(Move::normal(sq("e7"), sq("e5"))));
        // Blocked double push
        let pos2: Position =
            "rnbqkbnr/pppppppp/8/8/8/4n3/PPPPPPPP/RNBQKBNR w KQkq - 0 1".parse().unwrap();
        assert!(!pos2.is_pseudo_legal(Move::normal(sq("e2"), sq("e4"))));
        // A pawn cannot wrap files (a2 -> h3 style corruption)
        assert!(!pos.is_pseudo_legal(Move::normal(sq("a2"), sq("h3"))));
        // Promotion bits on a normal move are rejected
        let corrupted = Move::from_u16(
            Move::normal(sq("e2"), sq("e4")).as_u16() | (0b01 << 14),
        );
        assert!(!pos.is_pseudo_legal(corrupted));
    }

    #[test]
    fn test_is_pseudo_legal_in_check_constraints() {
        // White king checked by the rook on e8; non-king moves must block
        // or capture the checker.
        let pos: Position = "4r2k/8/8/8/8/8/3N4/4K3 w - - 0 1".parse().unwrap();
        assert!(pos.in_check());
        // Knight can block on e4
        assert!(pos.is_pseudo_legal(Move::normal(sq("d2"), sq("e4"))));
        // Knight move that ignores the check
        assert!(!pos.is_pseudo_legal(Move::normal(sq("d2"), sq("b3"))));
        assert!(pos.is_pseudo_legal(Move::normal(sq("e1"), sq("f2"))));

        // Fleeing along the checking ray only looks safe if the king stays
        // in the occupancy; it must be rejected.
        let pos: Position = "7k/8/8/8/8/8/8/r3K3 w - - 0 1".parse().unwrap();
        assert!(pos.in_check());
        assert!(!pos.is_pseudo_legal(Move::normal(sq("e1"), sq("f1"))));
        assert!(pos.is_pseudo_legal(Move::normal(sq("e1"), sq("e2"))));
    }

    #[test]
    fn test_move_attacks_square_xray() {
        // Rook on e3 moving away from the e-file keeps e8 covered through
        // the unmasked queen on e1.
        let pos: Position = "4k3/8/8/8/8/4R3/8/3QK3 w - - 0 1".parse().unwrap();
        // Queen d1 does not see e8 yet; rook move d3 unmasks nothing
        assert!(!pos.move_attacks_square(Move::normal(sq("e3"), sq("d3")), sq("e8")));
        // Rook slides to e7: still attacks e8 from destination
        assert!(pos.move_attacks_square(Move::normal(sq("e3"), sq("e7")), sq("e8")));

        let pos2: Position = "4k3/8/8/8/8/4R3/8/3KQ3 w - - 0 1".parse().unwrap();
        // Queen on e1 behind the rook: moving the rook aside unmasks e8
        assert!(pos2.move_attacks_square(Move::normal(sq("e3"), sq("d3")), sq("e8")));
    }
}
