use std::path::Path;

use zstd::zstd_safe;

use crate::error::{Error, Result};
use crate::fs::{write_file_atomically, Dir};
use crate::mapping::Mapping;

/// a zstd frame held in an anonymous mapping
///
/// the mapping is sized for the worst-case bound; only the first `len`
/// bytes are the frame.
pub struct CompressedData {
    mapping: Mapping,
    len: usize,
}

impl CompressedData {
    pub fn as_bytes(&self) -> &[u8] {
        &self.mapping.as_bytes()[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// one-shot compress a mapping into fresh anonymous scratch
///
/// the produced frame records the uncompressed length in its header, so
/// extraction can size its output before decompressing. empty input
/// yields a valid frame declaring zero content bytes.
pub fn compress(input: &Mapping) -> Result<CompressedData> {
    let source = input.as_bytes();
    let mut scratch = Mapping::anonymous(zstd_safe::compress_bound(source.len()))?;
    let len = zstd::bulk::compress_to_buffer(
        source,
        scratch.scratch_mut(),
        zstd::DEFAULT_COMPRESSION_LEVEL,
    )
    .map_err(Error::Compress)?;
    Ok(CompressedData {
        mapping: scratch,
        len,
    })
}

/// decompress a frame directly into an atomically written file
///
/// the output size comes from the frame header; frames that do not
/// declare one are rejected. the writer decompresses straight into the
/// destination mapping and checks that the produced byte count matches
/// the header.
pub fn decompress_to_path(frame: &[u8], path: &Path, base: Option<&Dir>) -> Result<()> {
    let expected = zstd_safe::get_frame_content_size(frame)
        .map_err(|_| Error::BadFrame)?
        .ok_or(Error::UnknownFrameSize)?;

    write_file_atomically(path, base, expected as usize, |output| {
        let actual = zstd::bulk::decompress_to_buffer(frame, output).map_err(Error::Decompress)?;
        if actual as u64 != expected {
            return Err(Error::DecompressedSizeMismatch {
                expected,
                actual: actual as u64,
            });
        }
        Ok(())
    })
}
