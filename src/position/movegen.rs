//! Legal move generation and perft.
//!
//! The generator is the reference consumer of the legality queries: it
//! produces fully legal moves, including Chess960 castling and check
//! evasions, and drives the perft cross-validation of the whole
//! make/unmake machinery.

use std::cmp::{max, min};

use super::attack_tables::{between, king_attacks, pawn_attacks, piece_attacks, rook_attacks};
use super::types::{CastlingSide, Move, MoveList, Piece, Square};
use super::Position;

impl Position {
    /// Generate all legal moves for the side to move.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        let mut pseudo = MoveList::new();
        self.generate_pawn_moves(&mut pseudo);
        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
            self.generate_piece_moves(piece, &mut pseudo);
        }
        self.generate_king_moves(&mut pseudo);

        let pinned = self.pinned_pieces();
        let mut legal = MoveList::new();
        for &m in &pseudo {
            if self.evades_check(m) && self.is_legal(m, pinned) {
                legal.push(m);
            }
        }
        legal
    }

    /// When in check, a candidate must capture the checker, block the ray,
    /// or be a king move; in double check only king moves survive. King
    /// moves are constrained by `is_legal` afterwards.
    fn evades_check(&self, m: Move) -> bool {
        let checkers = self.checkers();
        if checkers.is_empty() {
            return true;
        }

        let us = self.side_to_move();
        let from = m.from();

        if self.piece_on(from) == Some(Piece::King) {
            // The destination test in is_legal keeps the king in the
            // occupancy, which would let it retreat along the checking
            // ray; retest with the king removed.
            return !m.is_castle()
                && (self.attackers_to_occ(m.to(), self.pieces() ^ from)
                    & self.pieces_by_color(us.opponent()))
                .is_empty();
        }

        if checkers.more_than_one() {
            return false;
        }

        let checksq = checkers.lsb();
        let target = between(checksq, self.king_square(us)) | checkers;

        if m.is_en_passant() {
            // The ep capture takes a pawn that is not on the destination
            let capsq = m.to().offset(us.opponent().pawn_push());
            return capsq == checksq || target.contains(m.to());
        }
        target.contains(m.to())
    }

    fn generate_pawn_moves(&self, list: &mut MoveList) {
        let us = self.side_to_move();
        let them = us.opponent();
        let enemies = self.pieces_by_color(them);
        let push = us.pawn_push();

        for from in self.pieces_of(us, Piece::Pawn) {
            let promoting = from.relative_rank(us) == 6;

            for to in pawn_attacks(us, from) & enemies {
                if promoting {
                    for piece in Piece::PROMOTIONS {
                        list.push(Move::promotion(from, to, piece));
                    }
                } else {
                    list.push(Move::normal(from, to));
                }
            }

            let one = from.offset(push);
            if self.is_empty_square(one) {
                if promoting {
                    for piece in Piece::PROMOTIONS {
                        list.push(Move::promotion(from, one, piece));
                    }
                } else {
                    list.push(Move::normal(from, one));
                    if from.relative_rank(us) == 1 {
                        let two = one.offset(push);
                        if self.is_empty_square(two) {
                            list.push(Move::normal(from, two));
                        }
                    }
                }
            }

            if let Some(ep) = self.ep_square() {
                if pawn_attacks(us, from).contains(ep) {
                    list.push(Move::en_passant(from, ep));
                }
            }
        }
    }

    fn generate_piece_moves(&self, piece: Piece, list: &mut MoveList) {
        let us = self.side_to_move();
        let occ = self.pieces();
        let targets = !self.pieces_by_color(us);

        for from in self.pieces_of(us, piece) {
            for to in piece_attacks(us, piece, from, occ) & targets {
                list.push(Move::normal(from, to));
            }
        }
    }

    fn generate_king_moves(&self, list: &mut MoveList) {
        let us = self.side_to_move();
        let them = us.opponent();
        let from = self.king_square(us);

        for to in king_attacks(from) & !self.pieces_by_color(us) {
            list.push(Move::normal(from, to));
        }

        // Castling; never available while in check
        if self.in_check() {
            return;
        }

        for side in CastlingSide::BOTH {
            if !self.can_castle(us, side) {
                continue;
            }
            let Some(rook_from) = self.castle_rook_square(us, side) else {
                continue;
            };

            // Both pieces' travel squares must be empty
            if (self.castle_path(us, side) & self.pieces()).any() {
                continue;
            }

            // The king may not travel through an attacked square
            let (king_to, _) = Self::castle_destinations(us, from, rook_from);
            let lo = min(from, king_to);
            let hi = max(from, king_to);
            let mut safe = true;
            for idx in lo.index()..=hi.index() {
                let sq = Square::from_index(idx);
                if sq != from
                    && (self.attackers_to(sq) & self.pieces_by_color(them)).any()
                {
                    safe = false;
                    break;
                }
            }
            if !safe {
                continue;
            }

            // Chess960: the departing rook may have shielded the king's
            // destination from an enemy rook or queen along the rank
            if self.chess960
                && (rook_attacks(king_to, self.pieces() ^ rook_from)
                    & self.pieces_of2(them, Piece::Rook, Piece::Queen))
                .any()
            {
                continue;
            }

            list.push(Move::castle(from, rook_from));
        }
    }

    /// Count leaf nodes of the legal move tree to the given depth.
    /// Cross-validates the generator and the make/unmake machinery.
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }

        let mut nodes = 0;
        for &m in &moves {
            self.do_move_unchecked(m);
            nodes += self.perft(depth - 1);
            self.undo_move(m);
        }
        nodes
    }
}
