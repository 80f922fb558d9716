use std::fs::File;

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::error::{Error, Result};

/// a contiguous read-only byte range backed by memory
///
/// zero-length ranges are represented without an underlying mmap.
/// dropping a mapping releases its region.
pub enum Mapping {
    Empty,
    File(Mmap),
    Anonymous(MmapMut),
}

impl Mapping {
    /// map the full contents of an open file, read-only and private
    pub fn of_file(file: &File) -> Result<Mapping> {
        let size = file.metadata().map_err(Error::Mmap)?.len();
        if size == 0 {
            return Ok(Mapping::Empty);
        }
        let mapping = unsafe { Mmap::map(file) }.map_err(Error::Mmap)?;
        Ok(Mapping::File(mapping))
    }

    /// allocate an anonymous read-write region, used as compression scratch
    pub fn anonymous(len: usize) -> Result<Mapping> {
        if len == 0 {
            return Ok(Mapping::Empty);
        }
        let mapping = MmapOptions::new().len(len).map_anon().map_err(Error::Mmap)?;
        Ok(Mapping::Anonymous(mapping))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Mapping::Empty => &[],
            Mapping::File(mapping) => mapping,
            Mapping::Anonymous(mapping) => mapping,
        }
    }

    /// mutable view of an anonymous region; empty for the other variants
    pub(crate) fn scratch_mut(&mut self) -> &mut [u8] {
        match self {
            Mapping::Anonymous(mapping) => mapping,
            _ => &mut [],
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_file_mapping_exposes_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"mapped bytes").unwrap();

        let file = File::open(&path).unwrap();
        let mapping = Mapping::of_file(&file).unwrap();

        assert_eq!(mapping.len(), 12);
        assert_eq!(mapping.as_bytes(), b"mapped bytes");
    }

    #[test]
    fn test_empty_file_maps_without_mmap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        File::create(&path).unwrap();

        let file = File::open(&path).unwrap();
        let mapping = Mapping::of_file(&file).unwrap();

        assert!(mapping.is_empty());
        assert!(matches!(mapping, Mapping::Empty));
    }

    #[test]
    fn test_anonymous_mapping_is_writable() {
        let mut mapping = Mapping::anonymous(64).unwrap();
        mapping.scratch_mut()[..5].copy_from_slice(b"hello");
        assert_eq!(&mapping.as_bytes()[..5], b"hello");
        assert_eq!(mapping.len(), 64);
    }

    #[test]
    fn test_zero_length_anonymous_mapping() {
        let mapping = Mapping::anonymous(0).unwrap();
        assert!(mapping.is_empty());
        assert!(matches!(mapping, Mapping::Empty));
    }

    #[test]
    fn test_mapping_tracks_file_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grown");
        let mut f = File::create(&path).unwrap();
        f.write_all(&[0xab; 4096]).unwrap();
        f.write_all(&[0xcd; 100]).unwrap();
        drop(f);

        let file = File::open(&path).unwrap();
        let mapping = Mapping::of_file(&file).unwrap();
        assert_eq!(mapping.len(), 4196);
        assert_eq!(mapping.as_bytes()[4095], 0xab);
        assert_eq!(mapping.as_bytes()[4100], 0xcd);
    }
}
