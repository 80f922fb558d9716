use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compress::{compress, decompress_to_path};
use crate::error::{Error, Result};
use crate::fs::{
    make_directories, make_symlink, open_file, path_exists, read_link, stat_path, walk_tree, Dir,
    FileKind, OpenFlags, OpenMode,
};
use crate::hash::ContentHash;
use crate::mapping::Mapping;
use crate::store::{Entry, Store};

/// a content-addressed package backed by a single database file
///
/// the package file is created on first open and updated incrementally;
/// each registered file is committed in its own transaction. a package
/// exclusively owns its store and is not safe to share across threads.
pub struct Package {
    store: Store,
}

impl Package {
    /// open or create the package at `path`
    pub fn open(path: &Path) -> Result<Package> {
        Ok(Package {
            store: Store::open(path)?,
        })
    }

    /// capture a file, directory tree, or symlink into the package
    ///
    /// directories are walked recursively and their entries stored under
    /// walker-relative names (the directory's own name is elided). a plain
    /// file or symlink is stored under its basename.
    pub fn register_path(&mut self, path: &Path, base: Option<&Dir>) -> Result<()> {
        if !path_exists(path, base) {
            return Err(Error::PathMissing(path.to_path_buf()));
        }
        match stat_path(path, base, false)?.kind {
            FileKind::Directory => self.register_directory(path, base),
            FileKind::Regular => self.register_file_path(path, base),
            FileKind::Symlink => self.register_symlink_path(path, base),
            FileKind::Other => Err(Error::UnsupportedPathKind(path.to_path_buf())),
        }
    }

    /// capture several paths, validating that all exist before any mutation
    pub fn register_paths(&mut self, paths: &[PathBuf], base: Option<&Dir>) -> Result<()> {
        for path in paths {
            if !path_exists(path, base) {
                return Err(Error::PathMissing(path.clone()));
            }
        }
        for path in paths {
            self.register_path(path, base)?;
        }
        Ok(())
    }

    fn register_directory(&mut self, path: &Path, base: Option<&Dir>) -> Result<()> {
        let store = &self.store;
        walk_tree(
            path,
            base,
            |name, file| register_named_file(store, name, file),
            |name, target| store.register_symlink(name, target),
        )
    }

    fn register_file_path(&mut self, path: &Path, base: Option<&Dir>) -> Result<()> {
        let name = basename(path)?;
        let file = open_file(path, OpenMode::ReadOnly, OpenFlags::NONE, base)?;
        register_named_file(&self.store, &name, &file)
    }

    fn register_symlink_path(&mut self, path: &Path, base: Option<&Dir>) -> Result<()> {
        let name = basename(path)?;
        let target = read_link(path, base)?;
        self.store.register_symlink(&name, &target)
    }

    /// reconstruct every captured entry under `root`
    ///
    /// parent directories are created as needed; files are written
    /// atomically and symlinks recreated, so re-installing over the same
    /// root succeeds. the first failing entry aborts the loop, leaving
    /// already-extracted entries in place.
    pub fn install(&self, root: &Path, base: Option<&Dir>) -> Result<()> {
        for (name, entry) in self.store.entries()? {
            let dest = root.join(&name);
            if let Some(parent) = dest.parent() {
                if !parent.as_os_str().is_empty() {
                    make_directories(parent, base)?;
                }
            }
            match entry {
                Entry::File(hash) => {
                    self.store
                        .read_blob(&hash, |frame| decompress_to_path(frame, &dest, base))?;
                }
                Entry::Symlink(target) => make_symlink(&dest, &target, base)?,
            }
            debug!(name = %name, "installed entry");
        }
        Ok(())
    }

    /// file entries with their hashes rendered as lowercase hex
    ///
    /// symlink entries are not part of this listing.
    pub fn list_files(&self) -> Result<Vec<(String, String)>> {
        let mut files = Vec::new();
        for (name, entry) in self.store.entries()? {
            if let Entry::File(hash) = entry {
                files.push((name, hash.to_hex()));
            }
        }
        Ok(files)
    }

    /// every entry in the package, in listing order
    pub fn entries(&self) -> Result<Vec<(String, Entry)>> {
        self.store.entries()
    }
}

fn basename(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::NoFileName(path.to_path_buf()))
}

/// hash, compress, and store one open regular file
fn register_named_file(store: &Store, name: &str, file: &File) -> Result<()> {
    let mapping = Mapping::of_file(file)?;
    let hash = ContentHash::compute(mapping.as_bytes());
    let compressed = compress(&mapping)?;
    debug!(name, hash = %hash, "registering file");
    store.register_file(name, &hash, compressed.as_bytes())
}
