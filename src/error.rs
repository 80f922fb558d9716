use std::path::PathBuf;

use crate::hash::ContentHash;

/// error type for satchel operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not map contents into memory: {0}")]
    Mmap(#[source] std::io::Error),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),

    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),

    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("invalid compressed frame")]
    BadFrame,

    #[error("compressed frame does not declare an uncompressed size")]
    UnknownFrameSize,

    #[error("decompressed {actual} bytes, frame header declared {expected}")]
    DecompressedSizeMismatch { expected: u64, actual: u64 },

    #[error("path does not exist: {0}")]
    PathMissing(PathBuf),

    #[error("path has no file name: {0}")]
    NoFileName(PathBuf),

    #[error("cannot register special file: {0}")]
    UnsupportedPathKind(PathBuf),

    #[error("entry '{0}' is marked as both a file and a symlink")]
    AmbiguousEntry(String),

    #[error("entry '{0}' has neither a content hash nor a symlink target")]
    EmptyEntry(String),

    #[error("entry '{name}' has a content hash of width {width}")]
    BadHashWidth { name: String, width: usize },

    #[error("no stored contents for hash {0}")]
    BlobMissing(ContentHash),

    #[error("stored contents for hash {0} have an unexpected column type")]
    CorruptBlob(ContentHash),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
