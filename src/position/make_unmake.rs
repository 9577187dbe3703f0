//! Making and unmaking moves.
//!
//! `do_move` maintains every derived quantity incrementally: the four hash
//! keys, the piece-square score, and the non-pawn material counts are never
//! recomputed from scratch on this path. `undo_move` restores the board by
//! reversing the piece shuffles and popping the state stack; the derived
//! quantities come back for free from the previous state record.

use crate::zobrist;

use super::attack_tables::{bishop_attacks, pawn_attacks, rook_attacks};
use super::legality::CheckInfo;
use super::psqt;
use super::types::{Bitboard, Color, Move, MoveKind, Piece, Square};
use super::Position;

impl Position {
    /// Play `m`, which must be legal. Computes check information on the
    /// spot; prefer [`Position::do_move`] when the caller already has a
    /// [`CheckInfo`] for this node.
    pub fn do_move_unchecked(&mut self, m: Move) {
        let ci = CheckInfo::new(self);
        let gives_check = self.gives_check(m, &ci);
        self.do_move(m, gives_check, &ci);
    }

    /// Play `m`, which must be legal. `gives_check` and `ci` must come from
    /// this position (see [`Position::gives_check`] and [`CheckInfo::new`]).
    pub fn do_move(&mut self, m: Move, gives_check: bool, ci: &CheckInfo) {
        debug_assert!(!m.is_null());

        self.nodes += 1;
        let zob = zobrist::keys();

        let us = self.side_to_move;
        let them = us.opponent();

        // Copy the previous state; every "recomputed" field is overwritten
        // below before the record is pushed.
        let mut next = self.st().clone();
        next.rule50 += 1;
        next.plies_from_null += 1;

        let mut key = next.key ^ zob.side;

        if m.is_castle() {
            next.key = key;
            next.captured = None;
            self.states.push(next);
            self.do_castle(m);
            return;
        }

        let from = m.from();
        let to = m.to();
        let piece = self.piece_on(from).expect("do_move: from square empty");
        let captured = if m.is_en_passant() {
            Some(Piece::Pawn)
        } else {
            self.piece_on(to)
        };

        debug_assert_eq!(self.color_on(from), Some(us));
        debug_assert_ne!(self.color_on(to), Some(us));
        debug_assert_ne!(captured, Some(Piece::King));

        if let Some(capture) = captured {
            let mut capsq = to;

            // A captured pawn changes the pawn key; anything else changes
            // the opponent's non-pawn material.
            if capture == Piece::Pawn {
                if m.is_en_passant() {
                    capsq = to.offset(them.pawn_push());

                    debug_assert_eq!(piece, Piece::Pawn);
                    debug_assert_eq!(Some(to), next.ep_square);
                    debug_assert_eq!(to.relative_rank(us), 5);
                    debug_assert!(self.is_empty_square(to));
                    debug_assert_eq!(self.piece_at(capsq), Some((them, Piece::Pawn)));

                    self.board[capsq.index()] = None;
                }
                next.pawn_key ^= zob.psq[them.index()][Piece::Pawn.index()][capsq.index()];
            } else {
                next.np_material[them.index()] -= psqt::value_mg(capture);
            }

            // Remove the captured piece from the bitboards
            self.all ^= capsq;
            self.by_type[capture.index()] ^= capsq;
            self.by_color[them.index()] ^= capsq;

            // Swap-remove from the piece list: the last entry moves into the
            // freed slot. Not reversible - undo reinserts at the tail, so
            // list order is opaque across a do/undo pair.
            let c = them.index();
            let p = capture.index();
            self.piece_count[c][p] -= 1;
            let new_count = self.piece_count[c][p] as usize;
            let last = self.piece_list[c][p][new_count];
            self.index[last.index()] = self.index[capsq.index()];
            self.piece_list[c][p][self.index[last.index()] as usize] = last;
            self.piece_list[c][p][new_count] = Square::NONE;

            key ^= zob.psq[c][p][capsq.index()];
            next.material_key ^= zob.psq[c][p][new_count];
            next.psq_score -= psqt::psq(them, capture, capsq);

            next.rule50 = 0;
        }

        key ^= zob.psq[us.index()][piece.index()][from.index()]
            ^ zob.psq[us.index()][piece.index()][to.index()];

        // A stale en passant square dies with any move
        if let Some(ep) = next.ep_square.take() {
            key ^= zob.enpassant[ep.file()];
        }

        // Castle rights touched by either endpoint of the move
        let cr = self.castling_mask[from.index()].union(self.castling_mask[to.index()]);
        if !next.castling_rights.is_empty() && !cr.is_empty() {
            key ^= zob.castling[next.castling_rights.intersection(cr).as_u8() as usize];
            next.castling_rights.clear(cr);
        }

        // The key is final except for a possible new ep square; good enough
        // to start the transposition lookup early.
        if let Some(hook) = self.prefetch.transposition {
            hook(key);
        }

        // Move the piece
        let from_to = Bitboard::from_square(from) ^ Bitboard::from_square(to);
        self.all ^= from_to;
        self.by_type[piece.index()] ^= from_to;
        self.by_color[us.index()] ^= from_to;

        self.board[to.index()] = self.board[from.index()];
        self.board[from.index()] = None;

        // index[from] is left stale; lookups only happen through occupied
        // squares, so it is never read until overwritten.
        self.index[to.index()] = self.index[from.index()];
        self.piece_list[us.index()][piece.index()][self.index[to.index()] as usize] = to;

        if piece == Piece::Pawn {
            // A double push sets the en passant square, but only when an
            // enemy pawn is placed to use it.
            if to.delta_from(from).abs() == 16
                && (pawn_attacks(us, from.offset(us.pawn_push()))
                    & self.pieces_of(them, Piece::Pawn))
                .any()
            {
                let ep = from.offset(us.pawn_push());
                next.ep_square = Some(ep);
                key ^= zob.enpassant[ep.file()];
            }

            if m.is_promotion() {
                let promotion = m.promotion_piece();

                debug_assert_eq!(to.relative_rank(us), 7);

                // Replace the pawn with the promoted piece
                self.by_type[Piece::Pawn.index()] ^= to;
                self.by_type[promotion.index()] |= to;
                self.board[to.index()] = Some((us, promotion));

                // Swap-remove the pawn from its list, append the new piece
                let c = us.index();
                let pawn = Piece::Pawn.index();
                self.piece_count[c][pawn] -= 1;
                let pawn_count = self.piece_count[c][pawn] as usize;
                let last = self.piece_list[c][pawn][pawn_count];
                self.index[last.index()] = self.index[to.index()];
                self.piece_list[c][pawn][self.index[last.index()] as usize] = last;
                self.piece_list[c][pawn][pawn_count] = Square::NONE;

                let promo_count = self.piece_count[c][promotion.index()] as usize;
                self.index[to.index()] = promo_count as u8;
                self.piece_list[c][promotion.index()][promo_count] = to;
                self.piece_count[c][promotion.index()] += 1;

                key ^= zob.psq[c][pawn][to.index()] ^ zob.psq[c][promotion.index()][to.index()];
                next.pawn_key ^= zob.psq[c][pawn][to.index()];
                next.material_key ^=
                    zob.psq[c][promotion.index()][promo_count] ^ zob.psq[c][pawn][pawn_count];

                next.psq_score += psqt::psq(us, promotion, to) - psqt::psq(us, Piece::Pawn, to);
                next.np_material[c] += psqt::value_mg(promotion);
            }

            next.pawn_key ^= zob.psq[us.index()][Piece::Pawn.index()][from.index()]
                ^ zob.psq[us.index()][Piece::Pawn.index()][to.index()];

            next.rule50 = 0;
        }

        if let Some(hook) = self.prefetch.pawn {
            hook(next.pawn_key);
        }
        if let Some(hook) = self.prefetch.material {
            hook(next.material_key);
        }

        next.psq_score += psqt::psq_delta(us, piece, from, to);
        next.captured = captured;
        next.key = key;

        // Rebuild the checker set. For normal moves the precomputed check
        // squares make this O(1); special moves rescan the king's attackers.
        next.checkers = Bitboard::EMPTY;
        if gives_check {
            if m.kind() != MoveKind::Normal {
                next.checkers =
                    self.attackers_to(self.king_square(them)) & self.pieces_by_color(us);
            } else {
                if ci.check_squares[piece.index()].contains(to) {
                    next.checkers |= to;
                }

                // A discovered check comes from the slider family behind the
                // vacated square; skip the mover's own family to avoid
                // double-counting its direct check.
                if ci.dc_candidates.contains(from) {
                    let ksq = self.king_square(them);
                    if piece != Piece::Rook {
                        next.checkers |= rook_attacks(ksq, self.pieces())
                            & self.pieces_of2(us, Piece::Rook, Piece::Queen);
                    }
                    if piece != Piece::Bishop {
                        next.checkers |= bishop_attacks(ksq, self.pieces())
                            & self.pieces_of2(us, Piece::Bishop, Piece::Queen);
                    }
                }
            }
        }

        self.side_to_move = them;
        self.states.push(next);

        debug_assert!(self.audit_fast().is_ok(), "audit failed after do_move {m}");
    }

    /// Take back `m`, which must be the move that produced the current ply.
    pub fn undo_move(&mut self, m: Move) {
        debug_assert!(!m.is_null());
        debug_assert!(self.states.len() >= 2, "undo_move without prior do_move");

        self.side_to_move = self.side_to_move.opponent();
        let us = self.side_to_move;
        let them = us.opponent();

        if m.is_castle() {
            self.undo_castle(m);
            self.states.pop();
            debug_assert!(self.audit_fast().is_ok(), "audit failed after undo_move {m}");
            return;
        }

        let from = m.from();
        let to = m.to();
        let mut piece = self.piece_on(to).expect("undo_move: to square empty");
        let captured = self.st().captured;

        debug_assert!(self.is_empty_square(from));
        debug_assert_eq!(self.color_on(to), Some(us));
        debug_assert_ne!(captured, Some(Piece::King));

        if m.is_promotion() {
            let promotion = m.promotion_piece();

            debug_assert_eq!(piece, promotion);
            debug_assert_eq!(to.relative_rank(us), 7);

            // Turn the promoted piece back into a pawn
            self.by_type[promotion.index()] ^= to;
            self.by_type[Piece::Pawn.index()] |= to;
            self.board[to.index()] = Some((us, Piece::Pawn));

            let c = us.index();
            self.piece_count[c][promotion.index()] -= 1;
            let promo_count = self.piece_count[c][promotion.index()] as usize;
            let last = self.piece_list[c][promotion.index()][promo_count];
            self.index[last.index()] = self.index[to.index()];
            self.piece_list[c][promotion.index()][self.index[last.index()] as usize] = last;
            self.piece_list[c][promotion.index()][promo_count] = Square::NONE;

            let pawn_count = self.piece_count[c][Piece::Pawn.index()] as usize;
            self.index[to.index()] = pawn_count as u8;
            self.piece_list[c][Piece::Pawn.index()][pawn_count] = to;
            self.piece_count[c][Piece::Pawn.index()] += 1;

            piece = Piece::Pawn;
        }

        // Put the piece back on its source square
        let from_to = Bitboard::from_square(from) ^ Bitboard::from_square(to);
        self.all ^= from_to;
        self.by_type[piece.index()] ^= from_to;
        self.by_color[us.index()] ^= from_to;

        self.board[from.index()] = self.board[to.index()];
        self.board[to.index()] = None;

        self.index[from.index()] = self.index[to.index()];
        self.piece_list[us.index()][piece.index()][self.index[from.index()] as usize] = from;

        if let Some(capture) = captured {
            let mut capsq = to;

            if m.is_en_passant() {
                capsq = to.offset(them.pawn_push());

                debug_assert_eq!(piece, Piece::Pawn);
                debug_assert_eq!(to.relative_rank(us), 5);
                debug_assert!(self.is_empty_square(capsq));
            }

            // Reinsert the captured piece at the tail of its list
            self.all |= capsq;
            self.by_type[capture.index()] |= capsq;
            self.by_color[them.index()] |= capsq;
            self.board[capsq.index()] = Some((them, capture));

            let c = them.index();
            let p = capture.index();
            let count = self.piece_count[c][p] as usize;
            self.index[capsq.index()] = count as u8;
            self.piece_list[c][p][count] = capsq;
            self.piece_count[c][p] += 1;
        }

        self.states.pop();

        debug_assert!(self.audit_fast().is_ok(), "audit failed after undo_move {m}");
    }

    /// King and rook destinations for a castle, selected by which side of
    /// the king the rook starts on.
    pub(crate) fn castle_destinations(
        us: Color,
        king_from: Square,
        rook_from: Square,
    ) -> (Square, Square) {
        if rook_from > king_from {
            (Square::G1.relative_to(us), Square::F1.relative_to(us))
        } else {
            (Square::C1.relative_to(us), Square::D1.relative_to(us))
        }
    }

    /// Move king and rook for a castle in either direction. In Chess960 the
    /// king's destination may be the rook's origin (and vice versa), so the
    /// rook's list index is saved before the king's overwrites it.
    fn castle_shuffle(
        &mut self,
        us: Color,
        king_from: Square,
        king_to: Square,
        rook_from: Square,
        rook_to: Square,
    ) {
        let king_bb = Bitboard::from_square(king_from) ^ Bitboard::from_square(king_to);
        let rook_bb = Bitboard::from_square(rook_from) ^ Bitboard::from_square(rook_to);
        self.by_type[Piece::King.index()] ^= king_bb;
        self.by_type[Piece::Rook.index()] ^= rook_bb;
        self.all ^= king_bb ^ rook_bb;
        self.by_color[us.index()] ^= king_bb ^ rook_bb;

        self.board[king_from.index()] = None;
        self.board[rook_from.index()] = None;
        self.board[king_to.index()] = Some((us, Piece::King));
        self.board[rook_to.index()] = Some((us, Piece::Rook));

        self.piece_list[us.index()][Piece::King.index()][self.index[king_from.index()] as usize] =
            king_to;
        self.piece_list[us.index()][Piece::Rook.index()][self.index[rook_from.index()] as usize] =
            rook_to;
        let rook_index = self.index[rook_from.index()];
        self.index[king_to.index()] = self.index[king_from.index()];
        self.index[rook_to.index()] = rook_index;
    }

    /// Forward half of a castle; the new state record is already pushed
    /// with the side-to-move key flipped in.
    fn do_castle(&mut self, m: Move) {
        let us = self.side_to_move;
        let king_from = m.from();
        let rook_from = m.to();
        let (king_to, rook_to) = Self::castle_destinations(us, king_from, rook_from);

        debug_assert_eq!(self.piece_at(king_from), Some((us, Piece::King)));
        debug_assert_eq!(self.piece_at(rook_from), Some((us, Piece::Rook)));

        self.castle_shuffle(us, king_from, king_to, rook_from, rook_to);

        let zob = zobrist::keys();
        let c = us.index();
        let key_delta = zob.psq[c][Piece::King.index()][king_from.index()]
            ^ zob.psq[c][Piece::King.index()][king_to.index()]
            ^ zob.psq[c][Piece::Rook.index()][rook_from.index()]
            ^ zob.psq[c][Piece::Rook.index()][rook_to.index()];
        let psq_delta = psqt::psq_delta(us, Piece::King, king_from, king_to)
            + psqt::psq_delta(us, Piece::Rook, rook_from, rook_to);
        // The king's home square masks both of this color's rights
        let cr = self.castling_mask[king_from.index()];

        let st = self.st_mut();
        st.psq_score += psq_delta;
        st.key ^= key_delta;

        if let Some(ep) = st.ep_square.take() {
            st.key ^= zob.enpassant[ep.file()];
        }

        st.key ^= zob.castling[st.castling_rights.intersection(cr).as_u8() as usize];
        st.castling_rights.clear(cr);

        let checkers =
            self.attackers_to(self.king_square(us.opponent())) & self.pieces_by_color(us);
        self.st_mut().checkers = checkers;

        self.side_to_move = us.opponent();

        debug_assert!(self.audit_fast().is_ok(), "audit failed after castle {m}");
    }

    /// Reverse half of a castle; `undo_move` pops the state afterwards.
    fn undo_castle(&mut self, m: Move) {
        let us = self.side_to_move;
        let king_from = m.from();
        let rook_from = m.to();
        let (king_to, rook_to) = Self::castle_destinations(us, king_from, rook_from);

        debug_assert_eq!(self.piece_at(king_to), Some((us, Piece::King)));
        debug_assert_eq!(self.piece_at(rook_to), Some((us, Piece::Rook)));

        self.castle_shuffle(us, king_to, king_from, rook_to, rook_from);
    }

    /// Flip the side to move without touching the board. The mover must not
    /// be in check. Used by null-move search heuristics.
    pub fn do_null_move(&mut self) {
        debug_assert!(!self.in_check());

        let zob = zobrist::keys();
        let mut next = self.st().clone();

        next.key ^= zob.side;
        if let Some(ep) = next.ep_square.take() {
            next.key ^= zob.enpassant[ep.file()];
        }
        next.rule50 += 1;
        next.plies_from_null = 0;
        next.captured = None;

        if let Some(hook) = self.prefetch.transposition {
            hook(next.key);
        }

        self.side_to_move = self.side_to_move.opponent();
        self.states.push(next);

        debug_assert!(self.audit_fast().is_ok(), "audit failed after do_null_move");
    }

    /// Take back a null move.
    pub fn undo_null_move(&mut self) {
        debug_assert!(!self.in_check());
        debug_assert!(self.states.len() >= 2, "undo_null_move without prior do_null_move");

        self.states.pop();
        self.side_to_move = self.side_to_move.opponent();

        debug_assert!(self.audit_fast().is_ok(), "audit failed after undo_null_move");
    }
}
