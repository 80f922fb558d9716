use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{Error, IoResultExt, Result};
use crate::fs::handle::{open_file, rename, Dir, OpenFlags, OpenMode};

/// sibling temp path used during atomic writes
///
/// staying inside the destination's own directory keeps the final rename
/// atomic even when that directory sits on a different filesystem than
/// the system temp dir.
fn temp_sibling(path: &Path) -> Result<PathBuf> {
    let Some(name) = path.file_name() else {
        return Err(Error::NoFileName(path.to_path_buf()));
    };
    let mut temp_name = name.to_os_string();
    temp_name.push(format!(".tmp-{}", std::process::id()));
    Ok(path.with_file_name(temp_name))
}

/// write a file without its partial contents ever being observable
///
/// the writer runs exactly once against a shared read-write mapping of
/// `content_size` bytes over a sibling temp file; the mapping is synced
/// and the temp file renamed into place afterwards. a zero byte write
/// just creates (or truncates) the final path directly. when the writer
/// fails, the temp file is left behind and the final path is untouched.
pub fn write_file_atomically<W>(
    path: &Path,
    base: Option<&Dir>,
    content_size: usize,
    writer: W,
) -> Result<()>
where
    W: FnOnce(&mut [u8]) -> Result<()>,
{
    if content_size == 0 {
        open_file(path, OpenMode::WriteOnly, OpenFlags::CREATE_TRUNCATE, base)?;
        return Ok(());
    }

    let temp_path = temp_sibling(path)?;
    let file = open_file(
        &temp_path,
        OpenMode::ReadWrite,
        OpenFlags::CREATE_TRUNCATE,
        base,
    )?;
    file.set_len(content_size as u64).with_path(&temp_path)?;

    let mut mapping = unsafe { MmapMut::map_mut(&file) }.map_err(Error::Mmap)?;
    writer(&mut mapping[..])?;
    mapping.flush().with_path(&temp_path)?;
    drop(mapping);
    drop(file);

    rename(&temp_path, base, path, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_contents_atomically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        write_file_atomically(&path, None, 9, |bytes| {
            bytes.copy_from_slice(b"nine byte");
            Ok(())
        })
        .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"nine byte");
    }

    #[test]
    fn test_zero_size_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");

        write_file_atomically(&path, None, 0, |_| {
            panic!("writer must not run for empty content")
        })
        .unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_zero_size_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shrunk");
        std::fs::write(&path, "previous contents").unwrap();

        write_file_atomically(&path, None, 0, |_| unreachable!()).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_overwrites_existing_destination() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out");
        std::fs::write(&path, "old").unwrap();

        write_file_atomically(&path, None, 3, |bytes| {
            bytes.copy_from_slice(b"new");
            Ok(())
        })
        .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_failed_writer_leaves_no_final_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never");

        let result = write_file_atomically(&path, None, 4, |_| {
            Err(Error::PathMissing("writer failure".into()))
        });

        assert!(result.is_err());
        assert!(!path.exists());
        // the temp sibling stays behind after a failed write
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(leftovers.iter().any(|n| n.starts_with("never.tmp-")));
    }

    #[test]
    fn test_write_relative_to_base_handle() {
        let dir = tempdir().unwrap();
        let base = Dir::open(dir.path(), None).unwrap();

        write_file_atomically(Path::new("rel.bin"), Some(&base), 5, |bytes| {
            bytes.copy_from_slice(b"12345");
            Ok(())
        })
        .unwrap();

        assert_eq!(std::fs::read(dir.path().join("rel.bin")).unwrap(), b"12345");
    }
}
