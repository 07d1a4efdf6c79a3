//! Board primitives shared by the rest of [`crate::chess`].
//!
//! The coordinate system follows the on-disk repertoire format: a square is a
//! single byte `file * 8 + rank`, where rank index 0 is the board's top row
//! (the one rendered as rank 8). White starts on rank indices 6 and 7 and its
//! pawns advance toward lower indices. Keeping this layout means square bytes
//! written by [`crate::repertoire`] are identical to the ones produced by
//! earlier versions of the tool.

use std::fmt::{self, Write};
use std::mem;

use anyhow::bail;
use itertools::Itertools;

#[allow(missing_docs)]
pub const BOARD_WIDTH: u8 = 8;
#[allow(missing_docs)]
pub const BOARD_SIZE: u8 = BOARD_WIDTH * BOARD_WIDTH;

/// A (from, to) pair: the only kind of move this variant's repertoire tracks.
/// There is no castling, en passant or promotion in the supported rules, so
/// two squares fully describe a move.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Move {
    #[allow(missing_docs)]
    pub from: Square,
    #[allow(missing_docs)]
    pub to: Square,
}

impl Move {
    #[must_use]
    pub const fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Move {
    /// Serializes a move in coordinate notation, e.g. `e2e4`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// Board squares, file-major from the top-left corner:
///
/// ```
/// use fission::chess::core::Square;
///
/// assert_eq!(Square::A8 as u8, 0);
/// assert_eq!(Square::A1 as u8, 7);
/// assert_eq!(Square::E4 as u8, 8 * 4 + 4);
/// assert_eq!(Square::H1 as u8, 63);
/// ```
///
/// Square is a compact representation using only one byte, which is exactly
/// the byte stored for it by the repertoire codec.
///
/// ```
/// use fission::chess::core::Square;
///
/// assert_eq!(std::mem::size_of::<Square>(), 1);
/// ```
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
#[rustfmt::skip]
#[allow(missing_docs)]
pub enum Square {
    A8, A7, A6, A5, A4, A3, A2, A1,
    B8, B7, B6, B5, B4, B3, B2, B1,
    C8, C7, C6, C5, C4, C3, C2, C1,
    D8, D7, D6, D5, D4, D3, D2, D1,
    E8, E7, E6, E5, E4, E3, E2, E1,
    F8, F7, F6, F5, F4, F3, F2, F1,
    G8, G7, G6, G5, G4, G3, G2, G1,
    H8, H7, H6, H5, H4, H3, H2, H1,
}

impl Square {
    /// Connects file (column) and rank (row) to form a full square.
    #[must_use]
    pub const fn new(file: File, rank: Rank) -> Self {
        unsafe { mem::transmute((file as u8) * BOARD_WIDTH + rank as u8) }
    }

    /// Returns file (column) on which the square is located.
    #[must_use]
    pub const fn file(self) -> File {
        unsafe { mem::transmute(self as u8 / BOARD_WIDTH) }
    }

    /// Returns rank (row) on which the square is located.
    #[must_use]
    pub const fn rank(self) -> Rank {
        unsafe { mem::transmute(self as u8 % BOARD_WIDTH) }
    }

    /// The single byte this square occupies in the persisted store.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Constructs a square from explicit zero-based coordinates.
    ///
    /// # Errors
    ///
    /// If either coordinate is outside `0..BOARD_WIDTH`.
    pub fn from_coords(file: u8, rank: u8) -> anyhow::Result<Self> {
        Ok(Self::new(File::try_from(file)?, Rank::try_from(rank)?))
    }

    /// The up-to-8 squares surrounding this one: the blast radius of a
    /// capture landing here, and also the king's reach.
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        const OFFSETS: [(i8, i8); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        let (file, rank) = (self.file() as i8, self.rank() as i8);
        OFFSETS.iter().filter_map(move |&(df, dr)| {
            let (file, rank) = (file + df, rank + dr);
            if (0..BOARD_WIDTH as i8).contains(&file) && (0..BOARD_WIDTH as i8).contains(&rank) {
                Some(unsafe {
                    mem::transmute::<u8, Self>((file * BOARD_WIDTH as i8 + rank) as u8)
                })
            } else {
                None
            }
        })
    }

    /// Whether `other` is within this square's 8-neighborhood.
    #[must_use]
    pub fn touches(self, other: Self) -> bool {
        self != other
            && (self.file() as i8 - other.file() as i8).abs() <= 1
            && (self.rank() as i8 - other.rank() as i8).abs() <= 1
    }
}

impl TryFrom<u8> for Square {
    type Error = anyhow::Error;

    /// Creates a square given its index on the board.
    ///
    /// # Errors
    ///
    /// If given square index is outside 0..[`BOARD_SIZE`] range.
    fn try_from(square_index: u8) -> anyhow::Result<Self> {
        // Exclusive range patterns are not allowed:
        // https://github.com/rust-lang/rust/issues/37854
        const MAX_INDEX: u8 = BOARD_SIZE - 1;
        match square_index {
            0..=MAX_INDEX => Ok(unsafe { mem::transmute::<u8, Self>(square_index) }),
            _ => bail!("square index should be in 0..BOARD_SIZE, got {square_index}"),
        }
    }
}

impl TryFrom<&str> for Square {
    type Error = anyhow::Error;

    fn try_from(square: &str) -> anyhow::Result<Self> {
        let (file, rank) = match square.chars().collect_tuple() {
            Some((file, rank)) => (file, rank),
            None => bail!(
                "square should be two-char, got {square} with {} chars",
                square.bytes().len()
            ),
        };
        Ok(Self::new(file.try_into()?, rank.try_into()?))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

/// Represents a column (vertical row) of the chessboard. In chess notation, it
/// is normally represented with a lowercase letter.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
#[allow(missing_docs)]
pub enum File {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
    F = 5,
    G = 6,
    H = 7,
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", (b'a' + *self as u8) as char)
    }
}

impl TryFrom<char> for File {
    type Error = anyhow::Error;

    fn try_from(file: char) -> anyhow::Result<Self> {
        match file {
            'a'..='h' => Ok(unsafe { mem::transmute::<u8, Self>(file as u8 - b'a') }),
            _ => bail!("file should be within 'a'..='h', got '{file}'"),
        }
    }
}

impl TryFrom<u8> for File {
    type Error = anyhow::Error;

    fn try_from(column: u8) -> anyhow::Result<Self> {
        match column {
            0..=7 => Ok(unsafe { mem::transmute::<u8, Self>(column) }),
            _ => bail!("file should be within 0..BOARD_WIDTH, got {column}"),
        }
    }
}

/// Represents a horizontal row of the chessboard. Rank indices count from the
/// top of the stored board, so [`Rank::Eight`] is index 0 and [`Rank::One`]
/// is index 7. This mirrors the byte layout of the persisted repertoire.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, strum::EnumIter)]
#[allow(missing_docs)]
pub enum Rank {
    Eight = 0,
    Seven = 1,
    Six = 2,
    Five = 3,
    Four = 4,
    Three = 5,
    Two = 6,
    One = 7,
}

impl Rank {
    /// The rank a player's pawns start on (and may double-push from).
    #[must_use]
    pub const fn pawns_starting(player: Player) -> Self {
        match player {
            Player::White => Self::Two,
            Player::Black => Self::Seven,
        }
    }
}

impl TryFrom<char> for Rank {
    type Error = anyhow::Error;

    fn try_from(rank: char) -> anyhow::Result<Self> {
        match rank {
            '1'..='8' => Ok(unsafe { mem::transmute::<u8, Self>(b'8' - rank as u8) }),
            _ => bail!("rank should be within '1'..='8', got '{rank}'"),
        }
    }
}

impl TryFrom<u8> for Rank {
    type Error = anyhow::Error;

    fn try_from(row: u8) -> anyhow::Result<Self> {
        match row {
            0..=7 => Ok(unsafe { mem::transmute::<u8, Self>(row) }),
            _ => bail!("rank should be within 0..BOARD_WIDTH, got {row}"),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", 8 - *self as u8)
    }
}

/// The two players. White moves on even ply counts and owns the pieces that
/// start on ranks One and Two of the stored board.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Player {
    White,
    Black,
}

impl Player {
    /// "Flips" the color.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// The side to move after `ply` half-moves from the starting position.
    #[must_use]
    pub const fn on_move(ply: usize) -> Self {
        if ply % 2 == 0 {
            Self::White
        } else {
            Self::Black
        }
    }

    /// Rank-index delta of this player's pawn advance: White pawns climb
    /// toward rank index 0 (the top of the stored board).
    #[must_use]
    pub(crate) const fn pawn_direction(self) -> i8 {
        match self {
            Self::White => -1,
            Self::Black => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::White => 'w',
                Self::Black => 'b',
            }
        )
    }
}

/// Standard chess piece kinds. The discriminants match the piece codes of the
/// original database tool; nothing depends on them today, but keeping them
/// stable costs nothing.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
pub enum PieceKind {
    Pawn = 1,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// Represents a specific piece owned by a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    #[allow(missing_docs)]
    pub owner: Player,
    #[allow(missing_docs)]
    pub kind: PieceKind,
}

impl Piece {
    #[must_use]
    pub const fn new(owner: Player, kind: PieceKind) -> Self {
        Self { owner, kind }
    }
}

impl TryFrom<char> for Piece {
    type Error = anyhow::Error;

    fn try_from(symbol: char) -> anyhow::Result<Self> {
        let owner = if symbol.is_ascii_uppercase() {
            Player::White
        } else {
            Player::Black
        };
        let kind = match symbol.to_ascii_lowercase() {
            'k' => PieceKind::King,
            'q' => PieceKind::Queen,
            'r' => PieceKind::Rook,
            'b' => PieceKind::Bishop,
            'n' => PieceKind::Knight,
            'p' => PieceKind::Pawn,
            _ => bail!("piece symbol should be within \"KQRBNPkqrbnp\", got '{symbol}'"),
        };
        Ok(Self { owner, kind })
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char(match (&self.owner, &self.kind) {
            // White player: uppercase symbols.
            (Player::White, PieceKind::King) => 'K',
            (Player::White, PieceKind::Queen) => 'Q',
            (Player::White, PieceKind::Rook) => 'R',
            (Player::White, PieceKind::Bishop) => 'B',
            (Player::White, PieceKind::Knight) => 'N',
            (Player::White, PieceKind::Pawn) => 'P',
            // Black player: lowercase symbols.
            (Player::Black, PieceKind::King) => 'k',
            (Player::Black, PieceKind::Queen) => 'q',
            (Player::Black, PieceKind::Rook) => 'r',
            (Player::Black, PieceKind::Bishop) => 'b',
            (Player::Black, PieceKind::Knight) => 'n',
            (Player::Black, PieceKind::Pawn) => 'p',
        })
    }
}
