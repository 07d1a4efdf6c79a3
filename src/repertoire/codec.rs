//! Binary encoding of the opening tree.
//!
//! The grammar is byte-oriented and recursive:
//!
//! ```text
//! List := Node* TERMINATOR
//! Node := from to description NUL List
//! ```
//!
//! where `from` and `to` are square indices in `0..=63`, `description` is a
//! NUL-free byte run closed by a single `0x00`, and `TERMINATOR` is `0xFF`
//! (never a valid square, so the two cannot collide). The serialized stream
//! is the root's child list; there is no header, version tag or checksum.
//!
//! Earlier versions of the tool silently misread stray bytes. Decoding here
//! rejects malformed input instead, reporting the byte offset of the first
//! violation.

use std::io::{self, Write};

use thiserror::Error;

use crate::chess::core::{Move, Square, BOARD_SIZE};
use crate::repertoire::{NodeIndex, Repertoire, ROOT};

/// Closes a sibling list. Doubles as the end-of-stream marker when the list
/// being closed is the root's.
pub const TERMINATOR: u8 = 0xFF;

const DESCRIPTION_END: u8 = 0x00;

/// Failures of the persistence layer, distinguishable by the caller: I/O
/// trouble is recoverable (retry, pick another path), corrupt input is not.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store contents do not follow the grammar. `offset` is the first
    /// byte that cannot be part of a valid tree.
    #[error("corrupt store at byte {offset}: {reason}")]
    Corrupt {
        #[allow(missing_docs)]
        offset: usize,
        #[allow(missing_docs)]
        reason: String,
    },
    /// The underlying byte stream failed.
    #[error("storage error: {0}")]
    Storage(#[from] io::Error),
}

fn corrupt(offset: usize, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        offset,
        reason: reason.into(),
    }
}

/// Serializes the whole tree. Always a full rewrite: the format has no
/// incremental form.
///
/// # Errors
///
/// Propagates writer failures as [`StoreError::Storage`].
pub fn encode(tree: &Repertoire, writer: &mut impl Write) -> Result<(), StoreError> {
    encode_list(tree, ROOT, writer)?;
    Ok(())
}

fn encode_list(tree: &Repertoire, node: NodeIndex, writer: &mut impl Write) -> io::Result<()> {
    for child in tree.children(node) {
        let mv = tree.mv(child).expect("only the root carries no move");
        let description = tree.description(child);
        debug_assert!(!description.as_bytes().contains(&DESCRIPTION_END));
        writer.write_all(&[mv.from.index(), mv.to.index()])?;
        writer.write_all(description.as_bytes())?;
        writer.write_all(&[DESCRIPTION_END])?;
        encode_list(tree, child, writer)?;
    }
    writer.write_all(&[TERMINATOR])
}

/// Reconstructs a tree from its serialized form.
///
/// Parsing keeps an explicit stack of open nodes (the live parent chain)
/// instead of recursing: a new record attaches under the top of the stack, a
/// terminator pops it, and the terminator that pops the root must be the last
/// byte of the stream.
///
/// # Errors
///
/// [`StoreError::Corrupt`] with the offending byte offset on any grammar
/// violation, including truncation and trailing garbage.
pub fn parse(bytes: &[u8]) -> Result<Repertoire, StoreError> {
    let mut tree = Repertoire::new();
    let mut stack: Vec<NodeIndex> = vec![ROOT];
    let mut offset = 0;
    while let Some(&byte) = bytes.get(offset) {
        if byte == TERMINATOR {
            offset += 1;
            let _ = stack.pop();
            if stack.is_empty() {
                // The root's list just closed; nothing may follow it.
                if offset != bytes.len() {
                    return Err(corrupt(offset, "trailing bytes after the final terminator"));
                }
                return Ok(tree);
            }
            continue;
        }
        let from = read_square(bytes, offset)?;
        let to = read_square(bytes, offset + 1)?;
        let description_start = offset + 2;
        let description_len = bytes[description_start..]
            .iter()
            .position(|&byte| byte == DESCRIPTION_END)
            .ok_or_else(|| corrupt(bytes.len(), "unterminated description"))?;
        let description = std::str::from_utf8(
            &bytes[description_start..description_start + description_len],
        )
        .map_err(|error| {
            corrupt(
                description_start + error.valid_up_to(),
                "description is not valid UTF-8",
            )
        })?;
        let parent = *stack.last().expect("stack holds at least the root");
        let node = tree.add_child(parent, Move::new(from, to), description.to_owned());
        stack.push(node);
        offset = description_start + description_len + 1;
    }
    // Every list, the root's included, must be closed by a terminator.
    Err(corrupt(bytes.len(), "unexpected end of stream"))
}

fn read_square(bytes: &[u8], offset: usize) -> Result<Square, StoreError> {
    let byte = *bytes
        .get(offset)
        .ok_or_else(|| corrupt(bytes.len(), "unexpected end of stream"))?;
    if byte == TERMINATOR {
        return Err(corrupt(
            offset,
            "terminator where a destination square was expected",
        ));
    }
    if byte >= BOARD_SIZE {
        return Err(corrupt(
            offset,
            format!("square byte {byte:#04x} out of range"),
        ));
    }
    Square::try_from(byte).map_err(|error| corrupt(offset, error.to_string()))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::core::Square;

    fn encoded(tree: &Repertoire) -> Vec<u8> {
        let mut bytes = Vec::new();
        encode(tree, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn empty_tree_is_a_lone_terminator() {
        assert_eq!(encoded(&Repertoire::new()), vec![TERMINATOR]);
    }

    #[test]
    fn golden_encoding() {
        // root
        // └── e2e4 "king pawn"
        //     ├── e7e5 ""
        //     └── c7c5 "sicilian"
        let mut tree = Repertoire::new();
        let (e4, _) = tree.record(ROOT, Move::new(Square::E2, Square::E4));
        tree.set_description(e4, "king pawn").unwrap();
        let (_, _) = tree.record(e4, Move::new(Square::E7, Square::E5));
        let (c5, _) = tree.record(e4, Move::new(Square::C7, Square::C5));
        tree.set_description(c5, "sicilian").unwrap();

        let mut expected = vec![Square::E2.index(), Square::E4.index()];
        expected.extend(b"king pawn");
        expected.push(0x00);
        expected.extend([Square::E7.index(), Square::E5.index(), 0x00, TERMINATOR]);
        expected.extend([Square::C7.index(), Square::C5.index()]);
        expected.extend(b"sicilian");
        expected.extend([0x00, TERMINATOR, TERMINATOR, TERMINATOR]);
        assert_eq!(encoded(&tree), expected);
    }

    #[test]
    fn round_trip_preserves_structure_and_order() {
        let mut tree = Repertoire::new();
        let (e4, _) = tree.record(ROOT, Move::new(Square::E2, Square::E4));
        let (d4, _) = tree.record(ROOT, Move::new(Square::D2, Square::D4));
        let (e5, _) = tree.record(e4, Move::new(Square::E7, Square::E5));
        let (_, _) = tree.record(e5, Move::new(Square::G1, Square::F3));
        let (_, _) = tree.record(d4, Move::new(Square::D7, Square::D5));
        tree.set_description(e4, "open games").unwrap();
        tree.set_description(e5, "symmetric").unwrap();

        let restored = parse(&encoded(&tree)).unwrap();
        assert_eq!(restored.len(), tree.len());
        // Structural equality: same moves, descriptions and child order at
        // every node, checked through the debug dump and field accessors.
        assert_eq!(format!("{restored}"), format!("{tree}"));
        let top: Vec<_> = restored.children(ROOT).collect();
        assert_eq!(top.len(), 2);
        assert_eq!(restored.mv(top[0]), Some(Move::new(Square::E2, Square::E4)));
        assert_eq!(restored.description(top[0]), "open games");
        assert_eq!(restored.mv(top[1]), Some(Move::new(Square::D2, Square::D4)));
        let line: Vec<_> = restored.children(top[0]).collect();
        assert_eq!(line.len(), 1);
        assert_eq!(restored.description(line[0]), "symmetric");
    }

    #[test]
    fn parse_empty_root_list() {
        let tree = parse(&[TERMINATOR]).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn truncated_stream_is_rejected() {
        // Node opened, child list never closed and root list never closed.
        let bytes = [12u8, 28, b'h', b'i', 0x00];
        match parse(&bytes) {
            Err(StoreError::Corrupt { offset, .. }) => assert_eq!(offset, bytes.len()),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            parse(&[]),
            Err(StoreError::Corrupt { offset: 0, .. })
        ));
    }

    #[test]
    fn square_byte_out_of_range() {
        let bytes = [200u8, 28, 0x00, TERMINATOR, TERMINATOR];
        match parse(&bytes) {
            Err(StoreError::Corrupt { offset, reason }) => {
                assert_eq!(offset, 0);
                assert!(reason.contains("out of range"), "{reason}");
            },
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn terminator_in_place_of_destination() {
        let bytes = [12u8, TERMINATOR, 0x00, TERMINATOR];
        match parse(&bytes) {
            Err(StoreError::Corrupt { offset, .. }) => assert_eq!(offset, 1),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let bytes = [TERMINATOR, 12u8];
        match parse(&bytes) {
            Err(StoreError::Corrupt { offset, .. }) => assert_eq!(offset, 1),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_description() {
        let bytes = [12u8, 28, b'h', b'i'];
        match parse(&bytes) {
            Err(StoreError::Corrupt { offset, reason }) => {
                assert_eq!(offset, bytes.len());
                assert!(reason.contains("unterminated"), "{reason}");
            },
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_description() {
        let bytes = [12u8, 28, 0xC3, 0x28, 0x00, TERMINATOR, TERMINATOR];
        match parse(&bytes) {
            Err(StoreError::Corrupt { offset, reason }) => {
                assert_eq!(offset, 2);
                assert!(reason.contains("UTF-8"), "{reason}");
            },
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }
}
