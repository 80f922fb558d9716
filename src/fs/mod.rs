//! descriptor-relative filesystem primitives
//!
//! every operation takes a `(path, optional base directory handle)` pair
//! so traversal, extraction, and cleanup can run relative to an open
//! descriptor instead of re-resolving absolute paths.

pub mod handle;
pub mod walk;
pub mod write;

pub use handle::{
    make_directories, make_symlink, open_file, path_exists, read_link, remove_dir_recursive,
    remove_path, rename, stat_path, Dir, FileInfo, FileKind, OpenFlags, OpenMode,
};
pub use walk::walk_tree;
pub use write::write_file_atomically;
