//! Archive frame decoding.
//!
//! An archive file is a concatenation of independently compressed LZ4 frames.
//! Each frame, once decompressed, is a concatenation of raw measurement
//! records addressed by `(intra_off, intra_size)`.

use crate::error::{Error, Result};
use lz4_flex::frame::FrameDecoder;
use std::io::Read;

/// Decompress a single LZ4 frame fully into memory.
pub fn decompress_frame(frame: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = FrameDecoder::new(frame);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::FrameDecode(e.to_string()))?;
    Ok(out)
}

/// Slice `[offset, offset + size)` out of a decompressed frame.
pub fn slice_record(frame: &[u8], offset: i64, size: i64) -> Result<&[u8]> {
    let out_of_bounds = || Error::RecordOutOfBounds {
        offset,
        size,
        available: frame.len(),
    };

    let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    let len = usize::try_from(size).map_err(|_| out_of_bounds())?;
    let end = start.checked_add(len).ok_or_else(out_of_bounds)?;

    frame.get(start..end).ok_or_else(out_of_bounds)
}

/// Decompress `frame` and return the record at `[offset, offset + size)`.
pub fn extract_record(frame: &[u8], offset: i64, size: i64) -> Result<Vec<u8>> {
    let decompressed = decompress_frame(frame)?;
    slice_record(&decompressed, offset, size).map(<[u8]>::to_vec)
}
