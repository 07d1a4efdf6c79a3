//! Couples the live board to a cursor in the opening tree and an undo stack.
//! This is the only place where the board and the tree are mutated together,
//! and the surface the UI layer drives.
//!
//! Invariant maintained throughout: the number of undo snapshots equals the
//! cursor's depth in the tree, and their parity determines the side to move.

use thiserror::Error;

use crate::chess::board::Board;
use crate::chess::core::{Move, Player, Square};
use crate::chess::rules::{self, Destinations};
use crate::repertoire::codec::{self, StoreError};
use crate::repertoire::store::Store;
use crate::repertoire::{NodeIndex, Repertoire, ROOT};

/// Failures surfaced to the UI layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The move is not in the legal-destination set of the current position.
    #[error("illegal move {0}")]
    IllegalMove(Move),
    /// Loading or saving the repertoire failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Invalid input, e.g. an annotation with embedded NUL bytes.
    #[error(transparent)]
    Invalid(#[from] anyhow::Error),
}

/// A live study session: board, tree cursor, undo history and the store the
/// tree is persisted to. Single-threaded by construction; every operation
/// runs to completion before returning.
pub struct Session<S> {
    board: Board,
    tree: Repertoire,
    cursor: NodeIndex,
    /// One full board snapshot per applied move, popped on undo.
    history: Vec<Board>,
    store: S,
    /// Whether the side to move is currently in check. Display-only: the
    /// legality filter already prevented moves into check.
    check: bool,
}

impl<S: Store> Session<S> {
    /// Starts a session at the initial position, loading the repertoire from
    /// `store` (an absent store yields a bare root).
    ///
    /// # Errors
    ///
    /// [`StoreError`] when the store exists but cannot be read or parsed.
    pub fn new(mut store: S) -> Result<Self, StoreError> {
        let tree = match store.load()? {
            Some(bytes) => codec::parse(&bytes)?,
            None => Repertoire::new(),
        };
        Ok(Self {
            board: Board::starting(),
            tree,
            cursor: ROOT,
            history: Vec::new(),
            store,
            check: false,
        })
    }

    /// The live board, for rendering.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Read-only view of the whole opening tree.
    #[must_use]
    pub const fn repertoire(&self) -> &Repertoire {
        &self.tree
    }

    /// The node the session is currently at; [`ROOT`] at the start of a line.
    #[must_use]
    pub const fn cursor(&self) -> NodeIndex {
        self.cursor
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn side_to_move(&self) -> Player {
        Player::on_move(self.history.len())
    }

    /// Whether the side to move stands in check, for display.
    #[must_use]
    pub const fn in_check(&self) -> bool {
        self.check
    }

    /// Legal destinations of the piece on `from`, used on drag-start. Empty
    /// unless the square holds a piece of the side to move.
    #[must_use]
    pub fn destinations(&self, from: Square) -> Destinations {
        match self.board.at(from) {
            Some(piece) if piece.owner == self.side_to_move() => {
                rules::destinations(&self.board, from, true)
            },
            _ => Destinations::new(),
        }
    }

    /// Plays `mv` on the live board and records it in the tree at the
    /// cursor, reusing an existing child on an exact (from, to) match and
    /// persisting the tree when a new node was created. Returns whether the
    /// side now to move is in check.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalMove`] when `mv` is not among
    /// [`Self::destinations`] of its origin square; [`Error::Store`] when
    /// persisting fails (the in-memory state is updated regardless).
    pub fn apply_move(&mut self, mv: Move) -> Result<bool, Error> {
        if !self.destinations(mv.from).contains(&mv.to) {
            return Err(Error::IllegalMove(mv));
        }
        self.history.push(self.board);
        rules::apply_move(&mut self.board, mv);
        let (node, created) = self.tree.record(self.cursor, mv);
        self.cursor = node;
        self.check = rules::in_check(&self.board, self.side_to_move());
        if created {
            self.persist()?;
        }
        Ok(self.check)
    }

    /// Steps back one ply: restores the previous board snapshot and moves
    /// the cursor to its parent. Returns `false` (and does nothing) when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        self.board = previous;
        self.cursor = self
            .tree
            .parent(self.cursor)
            .expect("cursor depth always matches history depth");
        self.check = rules::in_check(&self.board, self.side_to_move());
        true
    }

    /// The cursor's children, in insertion order, for the move-list sidebar.
    pub fn lines(&self) -> impl Iterator<Item = (NodeIndex, Move, &str)> + '_ {
        self.tree.children(self.cursor).map(|child| {
            (
                child,
                self.tree.mv(child).expect("only the root carries no move"),
                self.tree.description(child),
            )
        })
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn description(&self, node: NodeIndex) -> &str {
        self.tree.description(node)
    }

    /// Replaces a node's annotation and persists the tree immediately.
    ///
    /// # Errors
    ///
    /// [`Error::Invalid`] for text with embedded NUL bytes, [`Error::Store`]
    /// when persisting fails.
    pub fn annotate(&mut self, node: NodeIndex, text: &str) -> Result<(), Error> {
        self.tree.set_description(node, text)?;
        self.persist()?;
        Ok(())
    }

    // Blocking full-tree rewrite; cost grows with repertoire size, which is
    // an accepted trade-off for a single-user tool.
    fn persist(&mut self) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        codec::encode(&self.tree, &mut bytes)?;
        self.store.save(&bytes)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::core::{Piece, PieceKind};
    use crate::repertoire::store::MemoryStore;

    fn session() -> Session<MemoryStore> {
        Session::new(MemoryStore::new()).unwrap()
    }

    #[test]
    fn starts_at_root_with_starting_board() {
        let session = session();
        assert_eq!(session.cursor(), ROOT);
        assert_eq!(session.side_to_move(), Player::White);
        assert!(!session.in_check());
        assert_eq!(session.lines().count(), 0);
        assert_eq!(session.board().pieces().count(), 32);
    }

    #[test]
    fn first_move_scenario() {
        // From the initial position: e2 (file 4, rank 6) -> e4 (file 4,
        // rank 4). The pawn relocates and the tree gains one child of root.
        let mut session = session();
        let check = session
            .apply_move(Move::new(Square::E2, Square::E4))
            .unwrap();
        assert!(!check);
        assert_eq!(
            session.board().at(Square::E4),
            Some(Piece::new(Player::White, PieceKind::Pawn))
        );
        assert_eq!(session.board().at(Square::E2), None);
        assert_eq!(session.side_to_move(), Player::Black);

        let children: Vec<_> = session.repertoire().children(ROOT).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(session.cursor(), children[0]);
        assert_eq!(
            session.repertoire().mv(children[0]),
            Some(Move::new(Square::E2, Square::E4))
        );
        assert_eq!(session.description(children[0]), "");
    }

    #[test]
    fn rejects_illegal_and_wrong_side_moves() {
        let mut session = session();
        // e2e5 is not a pawn move.
        assert!(matches!(
            session.apply_move(Move::new(Square::E2, Square::E5)),
            Err(Error::IllegalMove(_))
        ));
        // Black cannot move first.
        assert!(matches!(
            session.apply_move(Move::new(Square::E7, Square::E5)),
            Err(Error::IllegalMove(_))
        ));
        // Neither attempt touched the board or the tree.
        assert_eq!(session.board().at(Square::E2), Some(Piece::new(Player::White, PieceKind::Pawn)));
        assert!(session.repertoire().is_empty());
        assert_eq!(session.history.len(), 0);
    }

    #[test]
    fn destinations_gated_by_side_to_move() {
        let session = session();
        assert_eq!(session.destinations(Square::E2).len(), 2);
        assert!(session.destinations(Square::E7).is_empty());
        assert!(session.destinations(Square::E4).is_empty());
    }

    #[test]
    fn undo_on_empty_history_is_a_noop() {
        let mut session = session();
        assert!(!session.undo());
        assert_eq!(session.cursor(), ROOT);
        assert_eq!(session.side_to_move(), Player::White);
    }

    #[test]
    fn persists_only_when_a_node_is_created() {
        let mut session = session();
        session.apply_move(Move::new(Square::E2, Square::E4)).unwrap();
        let after_first = session.store.bytes().unwrap().to_vec();

        // Walking the same edge again after undo reuses the node and does
        // not rewrite the store.
        assert!(session.undo());
        session.store.save(&[0xAB]).unwrap();
        session.apply_move(Move::new(Square::E2, Square::E4)).unwrap();
        assert_eq!(session.store.bytes(), Some(&[0xAB][..]));

        // A novel edge triggers a full rewrite again.
        session.apply_move(Move::new(Square::E7, Square::E5)).unwrap();
        let after_novel = session.store.bytes().unwrap();
        assert_ne!(after_novel, &[0xAB][..]);
        assert!(after_novel.len() > after_first.len());
    }

    #[test]
    fn annotate_persists_immediately() {
        let mut session = session();
        session.apply_move(Move::new(Square::E2, Square::E4)).unwrap();
        let node = session.cursor();
        session.annotate(node, "the king pawn line").unwrap();
        assert_eq!(session.description(node), "the king pawn line");

        let reloaded = codec::parse(session.store.bytes().unwrap()).unwrap();
        let children: Vec<_> = reloaded.children(ROOT).collect();
        assert_eq!(reloaded.description(children[0]), "the king pawn line");
    }

    #[test]
    fn annotate_rejects_nul() {
        let mut session = session();
        session.apply_move(Move::new(Square::E2, Square::E4)).unwrap();
        let node = session.cursor();
        assert!(matches!(
            session.annotate(node, "bad\0text"),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn reload_resumes_saved_repertoire() {
        let mut session = session();
        session.apply_move(Move::new(Square::E2, Square::E4)).unwrap();
        session.apply_move(Move::new(Square::E7, Square::E5)).unwrap();
        let bytes = session.store.bytes().unwrap().to_vec();

        let resumed = Session::new(MemoryStore::with_bytes(bytes)).unwrap();
        assert_eq!(resumed.repertoire().len(), 3);
        assert_eq!(resumed.cursor(), ROOT);
        assert_eq!(resumed.lines().count(), 1);
    }
}
