//! 64-bit content hash used by subtitle providers to match exact releases.
//!
//! File size plus the little-endian u64 words of the first and last 64 KiB,
//! with wrapping addition.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const CHUNK: u64 = 64 * 1024;

/// Hash a video file. Files smaller than two chunks have no hash.
pub fn video_hash(path: &Path) -> std::io::Result<Option<String>> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    if size < CHUNK * 2 {
        return Ok(None);
    }

    let mut hash = size;
    let mut buf = vec![0u8; CHUNK as usize];

    file.read_exact(&mut buf)?;
    hash = add_words(hash, &buf);

    file.seek(SeekFrom::Start(size - CHUNK))?;
    file.read_exact(&mut buf)?;
    hash = add_words(hash, &buf);

    Ok(Some(format!("{hash:016x}")))
}

fn add_words(mut hash: u64, buf: &[u8]) -> u64 {
    for word in buf.chunks_exact(8) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(word);
        hash = hash.wrapping_add(u64::from_le_bytes(bytes));
    }
    hash
}
