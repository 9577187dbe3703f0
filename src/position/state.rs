//! Position state: the board itself plus the per-ply state stack.

use std::fmt;

use crate::zobrist;

use super::psqt;
use super::types::{
    Bitboard, CastlingRights, CastlingSide, Color, Piece, Score, Square, MAX_MOVES, MAX_PLY,
};

/// Per-ply state record.
///
/// The first group of fields is copied forward on every `do_move`; the
/// second group is recomputed for the new ply. The records form a stack that
/// mirrors the game line, one entry per ply, which is what makes
/// `undo_move` a pop with no arithmetic.
#[derive(Clone, Debug, Default)]
pub struct StateInfo {
    // Copied to the next ply
    pub(crate) pawn_key: u64,
    pub(crate) material_key: u64,
    pub(crate) np_material: [i32; 2],
    pub(crate) castling_rights: CastlingRights,
    pub(crate) rule50: u32,
    pub(crate) plies_from_null: u32,
    pub(crate) psq_score: Score,
    pub(crate) ep_square: Option<Square>,

    // Recomputed on each ply
    pub(crate) key: u64,
    pub(crate) captured: Option<Piece>,
    pub(crate) checkers: Bitboard,
}

/// Optional memory-prefetch hooks, called with freshly updated hash keys
/// during `do_move` so an external table lookup can hide its latency.
///
/// Each hook must be safe to call with any 64-bit value.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrefetchHooks {
    /// Called with the full position key.
    pub transposition: Option<fn(u64)>,
    /// Called with the pawn-structure key.
    pub pawn: Option<fn(u64)>,
    /// Called with the material key.
    pub material: Option<fn(u64)>,
}

/// A chess position.
///
/// Keeps four redundant views of the same occupancy (mailbox, per-type
/// bitboards, per-color bitboards, per-(color, type) piece lists), each
/// optimal for a different class of query, plus the stack of per-ply
/// [`StateInfo`] records. The redundancy is audited in debug builds after
/// every mutation.
pub struct Position {
    pub(crate) board: [Option<(Color, Piece)>; 64],
    pub(crate) by_type: [Bitboard; 6],
    pub(crate) by_color: [Bitboard; 2],
    pub(crate) all: Bitboard,
    pub(crate) piece_count: [[u8; 6]; 2],
    pub(crate) piece_list: [[[Square; 16]; 6]; 2],
    pub(crate) index: [u8; 64],
    pub(crate) castling_mask: [CastlingRights; 64],
    pub(crate) castle_rook_square: [[Option<Square>; 2]; 2],
    pub(crate) castle_path: [[Bitboard; 2]; 2],
    pub(crate) side_to_move: Color,
    pub(crate) chess960: bool,
    pub(crate) nodes: u64,
    pub(crate) start_pos_ply: i32,
    pub(crate) prefetch: PrefetchHooks,
    pub(crate) states: Vec<StateInfo>,
}

impl Position {
    /// Create an empty position: no pieces, White to move, no castling
    /// rights, one pristine state record.
    #[must_use]
    pub fn new() -> Self {
        Position {
            board: [None; 64],
            by_type: [Bitboard::EMPTY; 6],
            by_color: [Bitboard::EMPTY; 2],
            all: Bitboard::EMPTY,
            piece_count: [[0; 6]; 2],
            piece_list: [[[Square::NONE; 16]; 6]; 2],
            index: [0; 64],
            castling_mask: [CastlingRights::none(); 64],
            castle_rook_square: [[None; 2]; 2],
            castle_path: [[Bitboard::EMPTY; 2]; 2],
            side_to_move: Color::White,
            chess960: false,
            nodes: 0,
            start_pos_ply: 0,
            prefetch: PrefetchHooks::default(),
            states: {
                let mut states = Vec::with_capacity(MAX_PLY + MAX_MOVES);
                states.push(StateInfo::default());
                states
            },
        }
    }

    // --- State stack access -------------------------------------------------

    #[inline]
    pub(crate) fn st(&self) -> &StateInfo {
        self.states.last().expect("state stack is never empty")
    }

    #[inline]
    pub(crate) fn st_mut(&mut self) -> &mut StateInfo {
        self.states.last_mut().expect("state stack is never empty")
    }

    // --- Accessors ----------------------------------------------------------

    /// The side to move.
    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// The full position hash key.
    #[inline]
    #[must_use]
    pub fn key(&self) -> u64 {
        self.st().key
    }

    /// The pawn-structure hash key.
    #[inline]
    #[must_use]
    pub fn pawn_key(&self) -> u64 {
        self.st().pawn_key
    }

    /// The material-configuration hash key.
    #[inline]
    #[must_use]
    pub fn material_key(&self) -> u64 {
        self.st().material_key
    }

    /// The incrementally maintained piece-square score.
    #[inline]
    #[must_use]
    pub fn psq_score(&self) -> Score {
        self.st().psq_score
    }

    /// Midgame material of `color`'s non-pawn pieces.
    #[inline]
    #[must_use]
    pub fn non_pawn_material(&self, color: Color) -> i32 {
        self.st().np_material[color.index()]
    }

    /// Halfmoves since the last capture or pawn move.
    #[inline]
    #[must_use]
    pub fn rule50(&self) -> u32 {
        self.st().rule50
    }

    /// The en passant target square, if a capture there is possible.
    #[inline]
    #[must_use]
    pub fn ep_square(&self) -> Option<Square> {
        self.st().ep_square
    }

    /// Current castling rights.
    #[inline]
    #[must_use]
    pub fn castling_rights(&self) -> CastlingRights {
        self.st().castling_rights
    }

    /// Whether `color` may still castle to `side`.
    #[inline]
    #[must_use]
    pub fn can_castle(&self, color: Color, side: CastlingSide) -> bool {
        self.st().castling_rights.has(color, side)
    }

    /// Origin square of the rook for `color`'s castle to `side`.
    #[inline]
    #[must_use]
    pub fn castle_rook_square(&self, color: Color, side: CastlingSide) -> Option<Square> {
        self.castle_rook_square[color.index()][side.index()]
    }

    /// Squares that must be empty for `color`'s castle to `side` (the king's
    /// and rook's own squares excluded).
    #[inline]
    pub(crate) fn castle_path(&self, color: Color, side: CastlingSide) -> Bitboard {
        self.castle_path[color.index()][side.index()]
    }

    /// Opposing pieces currently giving check.
    #[inline]
    #[must_use]
    pub fn checkers(&self) -> Bitboard {
        self.st().checkers
    }

    /// Whether the side to move is in check.
    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.st().checkers.any()
    }

    /// The piece type captured by the move that produced the current ply.
    #[inline]
    #[must_use]
    pub fn captured_piece(&self) -> Option<Piece> {
        self.st().captured
    }

    /// Number of `do_move` calls since creation or last clone.
    #[inline]
    #[must_use]
    pub fn nodes_searched(&self) -> u64 {
        self.nodes
    }

    /// Whether this position uses Chess960 castling conventions.
    #[inline]
    #[must_use]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    /// Game ply of the parsed start position (0 for move 1, White to move).
    #[inline]
    #[must_use]
    pub fn startpos_ply(&self) -> i32 {
        self.start_pos_ply
    }

    /// Install memory-prefetch hooks invoked during `do_move`.
    pub fn set_prefetch_hooks(&mut self, hooks: PrefetchHooks) {
        self.prefetch = hooks;
    }

    // --- Occupancy queries --------------------------------------------------

    /// All occupied squares.
    #[inline]
    #[must_use]
    pub fn pieces(&self) -> Bitboard {
        self.all
    }

    /// Squares occupied by `color`.
    #[inline]
    #[must_use]
    pub fn pieces_by_color(&self, color: Color) -> Bitboard {
        self.by_color[color.index()]
    }

    /// Squares occupied by pieces of type `piece`, either color.
    #[inline]
    #[must_use]
    pub fn pieces_by_type(&self, piece: Piece) -> Bitboard {
        self.by_type[piece.index()]
    }

    /// Squares occupied by pieces of type `p1` or `p2`, either color.
    #[inline]
    #[must_use]
    pub fn pieces_by_types(&self, p1: Piece, p2: Piece) -> Bitboard {
        self.by_type[p1.index()] | self.by_type[p2.index()]
    }

    /// Squares occupied by `color`'s pieces of type `piece`.
    #[inline]
    #[must_use]
    pub fn pieces_of(&self, color: Color, piece: Piece) -> Bitboard {
        self.by_color[color.index()] & self.by_type[piece.index()]
    }

    /// Squares occupied by `color`'s pieces of type `p1` or `p2`.
    #[inline]
    #[must_use]
    pub fn pieces_of2(&self, color: Color, p1: Piece, p2: Piece) -> Bitboard {
        self.by_color[color.index()] & (self.by_type[p1.index()] | self.by_type[p2.index()])
    }

    /// The (color, piece) pair on `sq`, if occupied.
    #[inline]
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        self.board[sq.index()]
    }

    /// Just the piece type on `sq`.
    #[inline]
    #[must_use]
    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.piece_at(sq).map(|(_, piece)| piece)
    }

    /// Just the color of the piece on `sq`.
    #[inline]
    #[must_use]
    pub fn color_on(&self, sq: Square) -> Option<Color> {
        self.piece_at(sq).map(|(color, _)| color)
    }

    /// Whether `sq` is unoccupied.
    #[inline]
    #[must_use]
    pub fn is_empty_square(&self, sq: Square) -> bool {
        self.board[sq.index()].is_none()
    }

    /// Number of `color`'s pieces of type `piece`.
    #[inline]
    #[must_use]
    pub fn piece_count(&self, color: Color, piece: Piece) -> usize {
        self.piece_count[color.index()][piece.index()] as usize
    }

    /// The squares of `color`'s pieces of type `piece`, in list order.
    ///
    /// The order is not stable across a `do_move`/`undo_move` pair; only
    /// the set of squares is.
    #[inline]
    #[must_use]
    pub fn piece_squares(&self, color: Color, piece: Piece) -> &[Square] {
        let count = self.piece_count[color.index()][piece.index()] as usize;
        &self.piece_list[color.index()][piece.index()][..count]
    }

    /// The square of `color`'s king.
    #[inline]
    #[must_use]
    pub fn king_square(&self, color: Color) -> Square {
        self.piece_list[color.index()][Piece::King.index()][0]
    }

    // --- Board surgery ------------------------------------------------------

    /// Place a piece on an empty square, updating the mailbox, bitboards,
    /// count, list, and index in lock-step.
    pub(crate) fn put_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        debug_assert!(self.is_empty_square(sq));
        let c = color.index();
        let p = piece.index();

        self.board[sq.index()] = Some((color, piece));
        self.index[sq.index()] = self.piece_count[c][p];
        self.piece_list[c][p][self.index[sq.index()] as usize] = sq;
        self.piece_count[c][p] += 1;

        self.all |= sq;
        self.by_type[p] |= sq;
        self.by_color[c] |= sq;
    }

    // --- From-scratch computation of incremental state ----------------------

    /// The position hash, computed from scratch. Used at setup time and by
    /// the auditor; the hot path maintains it incrementally.
    #[must_use]
    pub(crate) fn compute_key(&self) -> u64 {
        let zob = zobrist::keys();
        let mut key = zob.castling[self.st().castling_rights.as_u8() as usize];

        for sq in self.pieces() {
            let (color, piece) = self.board[sq.index()].expect("occupied square");
            key ^= zob.psq[color.index()][piece.index()][sq.index()];
        }

        if let Some(ep) = self.ep_square() {
            key ^= zob.enpassant[ep.file()];
        }

        if self.side_to_move == Color::Black {
            key ^= zob.side;
        }

        key
    }

    /// The pawn-structure hash, computed from scratch.
    #[must_use]
    pub(crate) fn compute_pawn_key(&self) -> u64 {
        let zob = zobrist::keys();
        let mut key = 0;

        for sq in self.pieces_by_type(Piece::Pawn) {
            let (color, _) = self.board[sq.index()].expect("occupied square");
            key ^= zob.psq[color.index()][Piece::Pawn.index()][sq.index()];
        }

        key
    }

    /// The material hash, computed from scratch. Indexes the piece-square
    /// keys by piece count, so it identifies material configurations.
    #[must_use]
    pub(crate) fn compute_material_key(&self) -> u64 {
        let zob = zobrist::keys();
        let mut key = 0;

        for color in Color::BOTH {
            for piece in Piece::ALL {
                if piece == Piece::King {
                    continue;
                }
                for cnt in 0..self.piece_count(color, piece) {
                    key ^= zob.psq[color.index()][piece.index()][cnt];
                }
            }
        }

        key
    }

    /// The piece-square score, computed from scratch.
    #[must_use]
    pub(crate) fn compute_psq_score(&self) -> Score {
        self.pieces()
            .iter()
            .map(|sq| {
                let (color, piece) = self.board[sq.index()].expect("occupied square");
                psqt::psq(color, piece, sq)
            })
            .sum()
    }

    /// `color`'s non-pawn midgame material, computed from scratch.
    #[must_use]
    pub(crate) fn compute_non_pawn_material(&self, color: Color) -> i32 {
        Piece::ALL[1..5]
            .iter()
            .map(|&piece| self.piece_count(color, piece) as i32 * psqt::value_mg(piece))
            .sum()
    }

    /// Recompute every incremental quantity of the current state from
    /// scratch. Called after setup (FEN parse, flip), never on the move path.
    pub(crate) fn init_state_from_scratch(&mut self) {
        let key = self.compute_key();
        let pawn_key = self.compute_pawn_key();
        let material_key = self.compute_material_key();
        let psq_score = self.compute_psq_score();
        let np_white = self.compute_non_pawn_material(Color::White);
        let np_black = self.compute_non_pawn_material(Color::Black);
        let checkers = self.attackers_to(self.king_square(self.side_to_move))
            & self.pieces_by_color(self.side_to_move.opponent());

        let st = self.st_mut();
        st.key = key;
        st.pawn_key = pawn_key;
        st.material_key = material_key;
        st.psq_score = psq_score;
        st.np_material = [np_white, np_black];
        st.checkers = checkers;
    }

    // --- Draw detection -----------------------------------------------------

    /// Whether the position is drawn by insufficient material, the 50-move
    /// rule, or repetition.
    ///
    /// The repetition test returns true on the first earlier state with the
    /// same key (a 2-fold, not 3-fold, test): inside a search, steering into
    /// any repeated position is already as good as a draw.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.is_draw_impl(false)
    }

    /// [`Position::is_draw`] without the repetition scan.
    #[must_use]
    pub fn is_draw_ignoring_repetition(&self) -> bool {
        self.is_draw_impl(true)
    }

    fn is_draw_impl(&self, skip_repetition: bool) -> bool {
        // Draw by material?
        if self.pieces_by_type(Piece::Pawn).is_empty()
            && self.non_pawn_material(Color::White) + self.non_pawn_material(Color::Black)
                <= psqt::BISHOP_VALUE_MG
        {
            return true;
        }

        // Draw by the 50 moves rule? When in check the side to move may be
        // checkmated instead, so confirm a legal move exists.
        if self.st().rule50 > 99 && (!self.in_check() || !self.legal_moves().is_empty()) {
            return true;
        }

        // Draw by repetition?
        if !skip_repetition {
            let st = self.st();
            let horizon = st.rule50.min(st.plies_from_null) as usize;
            let top = self.states.len() - 1;
            let mut back = 4;
            while back <= horizon && back <= top {
                if self.states[top - back].key == st.key {
                    return true;
                }
                back += 2;
            }
        }

        false
    }

    // --- Debug helpers ------------------------------------------------------

    /// Mirror the position: colors swapped, board flipped vertically. Useful
    /// for hunting evaluation symmetry bugs.
    pub fn flip(&mut self) {
        let pos = self.clone();

        let mut flipped = Position::new();
        flipped.side_to_move = pos.side_to_move.opponent();
        flipped.chess960 = pos.chess960;
        flipped.nodes = pos.nodes;
        flipped.start_pos_ply = pos.start_pos_ply;
        flipped.prefetch = pos.prefetch;

        for idx in 0..64 {
            if let Some((color, piece)) = pos.board[idx] {
                flipped.put_piece(
                    color.opponent(),
                    piece,
                    Square::from_index(idx).flip_vertical(),
                );
            }
        }

        for color in Color::BOTH {
            for side in CastlingSide::BOTH {
                if pos.can_castle(color, side) {
                    if let Some(rook) = pos.castle_rook_square(color, side) {
                        flipped.set_castling_right(color.opponent(), rook.flip_vertical());
                    }
                }
            }
        }

        if let Some(ep) = pos.ep_square() {
            flipped.st_mut().ep_square = Some(ep.flip_vertical());
        }
        flipped.st_mut().rule50 = pos.st().rule50;
        flipped.st_mut().plies_from_null = pos.st().plies_from_null;

        flipped.init_state_from_scratch();
        debug_assert!(flipped.audit().is_ok());

        *self = flipped;
    }
}

impl Clone for Position {
    /// Cloning detaches the copy from the source's history: the clone keeps
    /// only the current state record and resets its node counter.
    fn clone(&self) -> Self {
        Position {
            board: self.board,
            by_type: self.by_type,
            by_color: self.by_color,
            all: self.all,
            piece_count: self.piece_count,
            piece_list: self.piece_list,
            index: self.index,
            castling_mask: self.castling_mask,
            castle_rook_square: self.castle_rook_square,
            castle_path: self.castle_path,
            side_to_move: self.side_to_move,
            chess960: self.chess960,
            nodes: 0,
            start_pos_ply: self.start_pos_ply,
            prefetch: self.prefetch,
            states: {
                let mut states = Vec::with_capacity(MAX_PLY + MAX_MOVES);
                states.push(self.st().clone());
                states
            },
        }
    }
}

impl Default for Position {
    /// The standard chess starting position.
    fn default() -> Self {
        Position::startpos()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  +---+---+---+---+---+---+---+---+")?;
        for rank in (0..8).rev() {
            write!(f, "{} |", rank + 1)?;
            for file in 0..8 {
                let ch = match self.piece_at(Square::new(rank, file)) {
                    Some((color, piece)) => piece.to_fen_char(color),
                    None => ' ',
                };
                write!(f, " {ch} |")?;
            }
            writeln!(f, "\n  +---+---+---+---+---+---+---+---+")?;
        }
        writeln!(f, "    a   b   c   d   e   f   g   h")?;
        writeln!(f, "Fen: {}", self.to_fen())?;
        write!(f, "Key: {:016X}", self.key())
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({} key={:016X})", self.to_fen(), self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::START_FEN;

    #[test]
    fn test_new_position_is_empty() {
        let pos = Position::new();
        assert!(pos.pieces().is_empty());
        assert_eq!(pos.side_to_move(), Color::White);
        assert!(pos.castling_rights().is_empty());
        assert!(pos.ep_square().is_none());
    }

    #[test]
    fn test_put_piece_updates_all_views() {
        let mut pos = Position::new();
        let e4 = Square::new(3, 4);
        pos.put_piece(Color::White, Piece::Knight, e4);

        assert_eq!(pos.piece_at(e4), Some((Color::White, Piece::Knight)));
        assert!(pos.pieces_of(Color::White, Piece::Knight).contains(e4));
        assert_eq!(pos.piece_count(Color::White, Piece::Knight), 1);
        assert_eq!(pos.piece_squares(Color::White, Piece::Knight), &[e4]);
        assert!(pos.pieces().contains(e4));
    }

    #[test]
    fn test_clone_detaches_history_and_nodes() {
        let mut pos = Position::startpos();
        let mv = pos.parse_uci_move("e2e4").unwrap();
        pos.do_move_unchecked(mv);
        assert_eq!(pos.nodes_searched(), 1);

        let copy = pos.clone();
        assert_eq!(copy.nodes_searched(), 0);
        assert_eq!(copy.states.len(), 1);
        assert_eq!(copy.key(), pos.key());
        assert_eq!(copy.to_fen(), pos.to_fen());
    }

    #[test]
    fn test_flip_round_trip() {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            false,
        )
        .unwrap();
        let original_fen = pos.to_fen();
        let original_psq = pos.psq_score();

        pos.flip();
        assert_eq!(pos.side_to_move(), Color::Black);
        // The score mirrors exactly
        assert_eq!(pos.psq_score(), -original_psq);

        pos.flip();
        assert_eq!(pos.to_fen(), original_fen);
    }

    #[test]
    fn test_startpos_matches_start_fen() {
        let pos = Position::startpos();
        assert_eq!(pos.to_fen(), START_FEN);
    }
}
