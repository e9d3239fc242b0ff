//! Bounded-memory payload extraction
//!
//! Copies one `[offset, offset + size)` range of an archive into a
//! destination file, one chunk at a time, so peak memory stays at a single
//! chunk regardless of entry size. Both files are opened per call.

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::{Result, UnpackError};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::trace;

/// Extract a payload range using the default chunk size
pub fn extract(archive_path: &Path, destination: &Path, offset: i64, size: i64) -> Result<u64> {
    extract_with_chunk_size(archive_path, destination, offset, size, DEFAULT_CHUNK_SIZE)
}

/// Extract a payload range, copying at most `chunk_size` bytes at a time
///
/// Parent directories of `destination` are created as needed and an existing
/// destination is overwritten. An entry with `size <= 0` yields an empty
/// destination file. Returns the number of bytes written.
pub fn extract_with_chunk_size(
    archive_path: &Path,
    destination: &Path,
    offset: i64,
    size: i64,
    chunk_size: usize,
) -> Result<u64> {
    if !archive_path.exists() {
        return Err(UnpackError::ArchiveNotFound(archive_path.to_path_buf()));
    }

    copy_range(archive_path, destination, offset, size, chunk_size.max(1)).map_err(|source| {
        UnpackError::Extraction {
            path: destination.to_path_buf(),
            source,
        }
    })
}

fn copy_range(
    archive_path: &Path,
    destination: &Path,
    offset: i64,
    size: i64,
    chunk_size: usize,
) -> io::Result<u64> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut output = File::create(destination)?;
    if size <= 0 {
        return Ok(0);
    }

    let start = u64::try_from(offset).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("negative payload offset {offset}"),
        )
    })?;
    let size = size as u64;

    let mut archive = File::open(archive_path)?;
    let archive_len = archive.metadata()?.len();
    if start.saturating_add(size) > archive_len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("payload range {start}+{size} exceeds archive size {archive_len}"),
        ));
    }
    archive.seek(SeekFrom::Start(start))?;

    let mut buffer = vec![0u8; chunk_size.min(usize::try_from(size).unwrap_or(usize::MAX))];
    let mut remaining = size;

    while remaining > 0 {
        let step = buffer.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        archive.read_exact(&mut buffer[..step])?;
        output.write_all(&buffer[..step])?;
        remaining -= step as u64;
    }
    output.flush()?;

    trace!("Wrote {size} bytes to {}", destination.display());
    Ok(size)
}
