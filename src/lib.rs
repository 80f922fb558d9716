//! satchel - content-addressed file packager
//!
//! captures files, directory trees, and symlinks into a single package
//! file and reconstructs them at an arbitrary destination. the package is
//! an embedded SQLite database with two tables: one mapping relative
//! names to either a content hash or a symlink target, and one mapping
//! content hashes to zstd-compressed bytes.
//!
//! # Core concepts
//!
//! - **Entry**: one captured path, either file contents by hash or a
//!   symlink by its literal target text
//! - **Blob**: the compressed bytes of one unique content hash; identical
//!   files share a blob
//! - **Content hash**: SHA-256 over a file's uncompressed bytes
//!
//! extraction writes every file through a temp-and-rename sequence, so a
//! partially written file is never observable at its final name and
//! repeated installs over the same destination succeed.
//!
//! # Example usage
//!
//! ```no_run
//! use satchel::Package;
//! use std::path::Path;
//!
//! // open or create a package
//! let mut package = Package::open(Path::new("bundle.satchel")).unwrap();
//!
//! // capture a directory tree
//! package.register_path(Path::new("/source/assets"), None).unwrap();
//!
//! // reconstruct it elsewhere
//! package.install(Path::new("/destination"), None).unwrap();
//! ```

mod compress;
mod error;
mod hash;
mod mapping;
mod package;
mod store;

pub mod fs;

pub use compress::{compress, decompress_to_path, CompressedData};
pub use error::{Error, Result};
pub use hash::{ContentHash, HASH_LEN};
pub use mapping::Mapping;
pub use package::Package;
pub use store::Entry;
