//! Where the serialized repertoire lives. The session only needs a way to
//! read back the last saved byte stream and to replace it wholesale, so the
//! seam is exactly that narrow.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::repertoire::codec::StoreError;

/// Byte-stream home of a serialized repertoire.
pub trait Store {
    /// Returns the previously saved stream, or `None` when nothing has been
    /// saved yet (a missing store is an empty repertoire, not an error).
    ///
    /// # Errors
    ///
    /// [`StoreError::Storage`] when the stream exists but cannot be read.
    fn load(&mut self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the stream with `bytes`. Full rewrite, no atomicity.
    ///
    /// # Errors
    ///
    /// [`StoreError::Storage`] when the stream cannot be written.
    fn save(&mut self, bytes: &[u8]) -> Result<(), StoreError>;
}

/// The usual backing: a single file at a caller-chosen path.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Store for FileStore {
    fn load(&mut self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn save(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        fs::write(&self.path, bytes).map_err(StoreError::from)
    }
}

/// In-memory store, used by tests and by callers that manage persistence
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bytes: Option<Vec<u8>>,
}

impl MemoryStore {
    /// An empty store: loading it yields an empty repertoire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with an already serialized repertoire.
    #[must_use]
    pub const fn with_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes: Some(bytes) }
    }

    /// The last saved stream, if any.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }
}

impl Store for MemoryStore {
    fn load(&mut self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.bytes.clone())
    }

    fn save(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.bytes = Some(bytes.to_owned());
        Ok(())
    }
}
