use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::fs::handle::{open_file, read_link, Dir, DirStream, FileKind, OpenFlags, OpenMode};

/// recursively visit a directory tree
///
/// `on_file` receives each regular file as an open read-only handle,
/// `on_symlink` each symlink with its literal target. relative names are
/// forward-slash separated and rooted below `path`; the walk target's own
/// name is not part of them. sockets, devices, and other special files
/// are skipped. empty directories produce no callbacks at all.
pub fn walk_tree<F, S>(
    path: &Path,
    base: Option<&Dir>,
    mut on_file: F,
    mut on_symlink: S,
) -> Result<()>
where
    F: FnMut(&str, &File) -> Result<()>,
    S: FnMut(&str, &str) -> Result<()>,
{
    let root = Dir::open(path, base)?;
    walk_dir(&root, "", &mut on_file, &mut on_symlink)
}

fn walk_dir<F, S>(dir: &Dir, prefix: &str, on_file: &mut F, on_symlink: &mut S) -> Result<()>
where
    F: FnMut(&str, &File) -> Result<()>,
    S: FnMut(&str, &str) -> Result<()>,
{
    let mut stream = DirStream::new(dir)?;
    while let Some(entry) = stream.next_entry() {
        let name = entry.name.to_string_lossy();
        let relative = if prefix.is_empty() {
            name.into_owned()
        } else {
            format!("{}/{}", prefix, name)
        };
        let entry_path = Path::new(&entry.name);

        match entry.kind(dir)? {
            FileKind::Directory => {
                let subdir = Dir::open(entry_path, Some(dir))?;
                walk_dir(&subdir, &relative, on_file, on_symlink)?;
            }
            FileKind::Regular => {
                let file = open_file(entry_path, OpenMode::ReadOnly, OpenFlags::NONE, Some(dir))?;
                on_file(&relative, &file)?;
            }
            FileKind::Symlink => {
                let target = read_link(entry_path, Some(dir))?;
                on_symlink(&relative, &target)?;
            }
            FileKind::Other => {
                debug!(path = %relative, "skipping special file during walk");
            }
        }
    }
    Ok(())
}
