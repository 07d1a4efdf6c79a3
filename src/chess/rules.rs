//! Move generation and check detection for the explosion-capture variant.
//!
//! Everything here is a pure function over a [`Board`]. Legality probes run
//! on scratch copies (the board is `Copy`), so callers can test a move
//! without touching the live position.
//!
//! The variant's special rules, all of which live in this module:
//!
//! - A capture removes the captured piece *and* the capturing piece, plus
//!   every non-pawn piece on the 8 squares around the destination. The
//!   destination ends up empty.
//! - Pawns are immune to the blast (but not to being captured or to being
//!   the consumed mover).
//! - Two kings standing on adjacent squares can never check each other.
//! - A side whose king has been blown up counts as "in check", which makes
//!   the safety filter reject any move that explodes one's own king.

use arrayvec::ArrayVec;

use crate::chess::board::Board;
use crate::chess::core::{Move, Piece, PieceKind, Player, Rank, Square, BOARD_WIDTH};

/// Destination set of a single piece. A queen in the open tops out at 27
/// squares, so the list always fits on the stack.
pub type Destinations = ArrayVec<Square, 27>;

const ROOK_RAYS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_RAYS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (1, -2),
    (2, 1),
    (2, -1),
    (-1, 2),
    (-1, -2),
    (-2, 1),
    (-2, -1),
];

/// Computes where the piece standing on `from` could move. Returns an empty
/// set when `from` is unoccupied.
///
/// With `filter_check` set, a candidate survives only if playing it on a
/// scratch board does not leave the mover's own king in check. The inner
/// check detection always runs unfiltered, so the probe never recurses more
/// than one level.
#[must_use]
pub fn destinations(board: &Board, from: Square, filter_check: bool) -> Destinations {
    let Some(piece) = board.at(from) else {
        return Destinations::new();
    };
    let mut moves = raw_destinations(board, piece, from);
    if filter_check {
        moves.retain(|&mut to| is_safe(board, piece.owner, Move::new(from, to)));
    }
    moves
}

/// Applies `mv` to the board, explosions included.
///
/// A quiet move relocates the piece. A capture consumes both the captured
/// piece and the mover and clears every non-pawn piece around the
/// destination; the destination square ends up empty.
pub fn apply_move(board: &mut Board, mv: Move) {
    if board.at(mv.to).is_some() {
        board.clear(mv.to);
        for square in mv.to.neighbors() {
            if let Some(piece) = board.at(square) {
                if piece.kind != PieceKind::Pawn {
                    board.clear(square);
                }
            }
        }
        // The mover is consumed even if it stood outside the blast radius
        // (a knight) or was a blast-immune pawn.
        board.clear(mv.from);
    } else if let Some(piece) = board.at(mv.from) {
        board.set(mv.to, piece);
        board.clear(mv.from);
    }
}

/// Whether `player`'s king is attacked.
///
/// A missing king (already exploded) counts as "in check": the safety filter
/// relies on this to rule out self-destructive captures. Mutually adjacent
/// kings never check each other, regardless of any other attacker.
#[must_use]
pub fn in_check(board: &Board, player: Player) -> bool {
    let Some(king) = board.king(player) else {
        return true;
    };
    if let Some(enemy_king) = board.king(player.opponent()) {
        if king.touches(enemy_king) {
            return false;
        }
    }
    board
        .pieces()
        .filter(|(_, piece)| piece.owner == player.opponent())
        .any(|(from, piece)| raw_destinations(board, piece, from).contains(&king))
}

/// Probes `mv` on a scratch copy: true if the mover's king survives and is
/// not left in check.
fn is_safe(board: &Board, mover: Player, mv: Move) -> bool {
    let mut probe = *board;
    apply_move(&mut probe, mv);
    !in_check(&probe, mover)
}

fn raw_destinations(board: &Board, piece: Piece, from: Square) -> Destinations {
    let mut moves = Destinations::new();
    match piece.kind {
        PieceKind::Pawn => pawn_destinations(board, piece.owner, from, &mut moves),
        PieceKind::Knight => {
            for (df, dr) in KNIGHT_JUMPS {
                if let Some(to) = offset(from, df, dr) {
                    if !is_friendly(board, piece.owner, to) {
                        moves.push(to);
                    }
                }
            }
        },
        PieceKind::King => {
            for to in from.neighbors() {
                if !is_friendly(board, piece.owner, to) {
                    moves.push(to);
                }
            }
        },
        PieceKind::Rook => walk_rays(board, piece.owner, from, &ROOK_RAYS, &mut moves),
        PieceKind::Bishop => walk_rays(board, piece.owner, from, &BISHOP_RAYS, &mut moves),
        PieceKind::Queen => {
            walk_rays(board, piece.owner, from, &ROOK_RAYS, &mut moves);
            walk_rays(board, piece.owner, from, &BISHOP_RAYS, &mut moves);
        },
    }
    moves
}

fn pawn_destinations(board: &Board, owner: Player, from: Square, moves: &mut Destinations) {
    let direction = owner.pawn_direction();
    // Single push, and the double push from the starting rank. Both require
    // every square along the way to be empty.
    if let Some(push) = offset(from, 0, direction) {
        if board.at(push).is_none() {
            moves.push(push);
            if from.rank() == Rank::pawns_starting(owner) {
                if let Some(jump) = offset(from, 0, 2 * direction) {
                    if board.at(jump).is_none() {
                        moves.push(jump);
                    }
                }
            }
        }
    }
    // Diagonal moves are captures only.
    for df in [-1, 1] {
        if let Some(to) = offset(from, df, direction) {
            if board.at(to).is_some_and(|piece| piece.owner != owner) {
                moves.push(to);
            }
        }
    }
}

fn walk_rays(
    board: &Board,
    owner: Player,
    from: Square,
    rays: &[(i8, i8)],
    moves: &mut Destinations,
) {
    for &(df, dr) in rays {
        let mut step = 1;
        while let Some(to) = offset(from, df * step, dr * step) {
            match board.at(to) {
                None => moves.push(to),
                Some(piece) => {
                    if piece.owner != owner {
                        moves.push(to);
                    }
                    break;
                },
            }
            step += 1;
        }
    }
}

fn offset(from: Square, df: i8, dr: i8) -> Option<Square> {
    let file = from.file() as i8 + df;
    let rank = from.rank() as i8 + dr;
    if (0..BOARD_WIDTH as i8).contains(&file) && (0..BOARD_WIDTH as i8).contains(&rank) {
        Some(Square::try_from((file * BOARD_WIDTH as i8 + rank) as u8).expect("on-board square"))
    } else {
        None
    }
}

fn is_friendly(board: &Board, owner: Player, square: Square) -> bool {
    board.at(square).is_some_and(|piece| piece.owner == owner)
}
