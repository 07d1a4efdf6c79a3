//! Square-centric board: 64 piece-or-empty cells and nothing else. The board
//! stores no history and does not know whose turn it is; both live in
//! [`crate::Session`].

use std::fmt;

use anyhow::bail;
use strum::IntoEnumIterator;

use crate::chess::core::{File, Piece, PieceKind, Player, Rank, Square, BOARD_SIZE, BOARD_WIDTH};

/// 8x8 grid of cells. `Copy` on purpose: undo snapshots are whole-board
/// copies and the check filter probes moves on scratch copies.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Piece>; BOARD_SIZE as usize],
}

impl Board {
    /// Creates a board with no pieces on it.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cells: [None; BOARD_SIZE as usize],
        }
    }

    /// Creates the starting position of the variant: the standard chess array.
    #[must_use]
    pub fn starting() -> Self {
        const BACKRANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        let mut board = Self::empty();
        for (file, kind) in File::iter().zip(BACKRANK) {
            board.set(Square::new(file, Rank::Eight), Piece::new(Player::Black, kind));
            board.set(
                Square::new(file, Rank::Seven),
                Piece::new(Player::Black, PieceKind::Pawn),
            );
            board.set(
                Square::new(file, Rank::Two),
                Piece::new(Player::White, PieceKind::Pawn),
            );
            board.set(Square::new(file, Rank::One), Piece::new(Player::White, kind));
        }
        board
    }

    /// Returns the piece standing on `square`, if any.
    #[must_use]
    pub const fn at(&self, square: Square) -> Option<Piece> {
        self.cells[square.index() as usize]
    }

    pub(crate) fn set(&mut self, square: Square, piece: Piece) {
        self.cells[square.index() as usize] = Some(piece);
    }

    pub(crate) fn clear(&mut self, square: Square) {
        self.cells[square.index() as usize] = None;
    }

    /// Iterates over all occupied squares and the pieces standing on them.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::iter().filter_map(|square| self.at(square).map(|piece| (square, piece)))
    }

    /// Locates the king of `player`. `None` once it has been blown up.
    #[must_use]
    pub fn king(&self, player: Player) -> Option<Square> {
        self.pieces()
            .find(|(_, piece)| piece.kind == PieceKind::King && piece.owner == player)
            .map(|(square, _)| square)
    }
}

impl TryFrom<&str> for Board {
    type Error = anyhow::Error;

    /// Parses the piece-placement field of FEN: eight '/'-separated ranks
    /// from the top of the board, algebraic piece symbols, digits for runs of
    /// empty squares. Only the placement field: the board stores neither the
    /// side to move nor any of the state this variant does not have.
    fn try_from(input: &str) -> anyhow::Result<Self> {
        let mut board = Self::empty();
        let ranks: Vec<&str> = input.trim().split('/').collect();
        if ranks.len() != BOARD_WIDTH as usize {
            bail!("expected 8 ranks, got {}", ranks.len());
        }
        for (row, symbols) in ranks.iter().enumerate() {
            let rank = Rank::try_from(row as u8)?;
            let mut column = 0u8;
            for symbol in symbols.chars() {
                if let Some(skip) = symbol.to_digit(10) {
                    column += skip as u8;
                    continue;
                }
                board.set(
                    Square::new(File::try_from(column)?, rank),
                    Piece::try_from(symbol)?,
                );
                column += 1;
            }
            if column != BOARD_WIDTH {
                bail!("rank {rank} covers {column} files instead of 8");
            }
        }
        Ok(board)
    }
}

impl fmt::Debug for Board {
    /// Dumps the board in a simple format: '.' for an empty square, algebraic
    /// piece symbols otherwise, one row per rank from the top of the board.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::iter() {
            for file in File::iter() {
                match self.at(Square::new(file, rank)) {
                    Some(piece) => write!(f, "{piece}")?,
                    None => f.write_str(".")?,
                }
                if file != File::H {
                    f.write_str(" ")?;
                }
            }
            if rank != Rank::One {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starting_board() {
        let board = Board::starting();
        assert_eq!(
            format!("{board:?}"),
            "r n b q k b n r\n\
             p p p p p p p p\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             P P P P P P P P\n\
             R N B Q K B N R"
        );
        assert_eq!(board.at(Square::E1), Some(Piece::new(Player::White, PieceKind::King)));
        assert_eq!(board.king(Player::Black), Some(Square::E8));
        assert_eq!(board.pieces().count(), 32);
    }

    #[test]
    fn parse_placement() {
        let board =
            Board::try_from("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").unwrap();
        assert_eq!(board, Board::starting());
        assert_eq!(format!("{:?}", Board::try_from("8/8/8/8/8/8/8/8").unwrap()).matches('.').count(), 64);
        assert!(Board::try_from("8/8/8/8").is_err());
        assert!(Board::try_from("9/8/8/8/8/8/8/8").is_err());
        assert!(Board::try_from("x7/8/8/8/8/8/8/8").is_err());
    }

    #[test]
    fn set_and_clear() {
        let mut board = Board::empty();
        assert_eq!(board.pieces().count(), 0);
        board.set(Square::D5, Piece::new(Player::White, PieceKind::Queen));
        assert_eq!(board.at(Square::D5), Some(Piece::new(Player::White, PieceKind::Queen)));
        board.clear(Square::D5);
        assert_eq!(board.at(Square::D5), None);
    }
}
