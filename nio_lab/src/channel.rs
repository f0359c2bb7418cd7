//! File reads and copies driven through a single [`ByteBuffer`].

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, Instant};

use metrics::counter;

use crate::buffer::ByteBuffer;
use crate::error::{Error, Result};
use crate::telemetry;

/// Outcome of [`copy_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    /// Bytes written to the destination.
    pub bytes: u64,
    /// Number of buffer fills that carried data.
    pub chunks: u64,
    pub elapsed: Duration,
}

/// Reads at most `capacity` bytes from the start of `path` as ISO-8859-1 text.
pub fn read_head(path: impl AsRef<Path>, capacity: usize) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let mut buffer = ByteBuffer::allocate(capacity);
    let n = buffer.fill_from(&mut file)?;
    buffer.flip();
    log::debug!("read {n} bytes from {}", path.display());

    Ok(buffer.drain_latin1())
}

/// Copies `src` to `dst` one `chunk_size` buffer at a time.
///
/// `dst` is created or truncated. Copying a file onto itself is rejected.
pub fn copy_file(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<CopyReport> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if chunk_size == 0 {
        return Err(Error::Config("chunk size must be non-zero".into()));
    }
    if dst.exists() && fs::canonicalize(src)? == fs::canonicalize(dst)? {
        return Err(Error::Config(format!(
            "source and destination are the same file: {}",
            src.display()
        )));
    }

    let started = Instant::now();
    let mut input = File::open(src)?;
    let mut output = File::create(dst)?;

    let mut buffer = ByteBuffer::allocate(chunk_size);
    let mut bytes = 0u64;
    let mut chunks = 0u64;

    while let Some(n) = buffer.read_from(&mut input)? {
        buffer.flip();
        let written = buffer.write_all_to(&mut output)?;
        // Clear, not compact: the whole chunk has been written out.
        buffer.clear();

        debug_assert_eq!(n, written);
        bytes += written as u64;
        chunks += 1;
    }
    output.sync_all()?;

    counter!(telemetry::FILE_BYTES_COPIED).increment(bytes);
    let report = CopyReport {
        bytes,
        chunks,
        elapsed: started.elapsed(),
    };
    log::info!(
        "copied {} -> {}: {} bytes in {} chunks ({:?})",
        src.display(),
        dst.display(),
        report.bytes,
        report.chunks,
        report.elapsed
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn temp_file_with(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn read_head_truncates_to_capacity() {
        let content: Vec<u8> = b"<project>".iter().copied().cycle().take(3000).collect();
        let file = temp_file_with(&content);

        let head = read_head(file.path(), 1024).unwrap();
        assert_eq!(head.len(), 1024);
        assert_eq!(head.as_bytes(), &content[..1024]);
    }

    #[test]
    fn read_head_of_short_file() {
        let file = temp_file_with(b"<project/>\n");
        assert_eq!(read_head(file.path(), 1024).unwrap(), "<project/>\n");
    }

    #[test]
    fn read_head_of_empty_file() {
        let file = temp_file_with(b"");
        assert_eq!(read_head(file.path(), 1024).unwrap(), "");
    }

    #[test]
    fn read_head_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_head(dir.path().join("pom.xml"), 1024).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn copy_is_byte_identical() {
        let content: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        let src = temp_file_with(&content);
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("pom_new.xml");

        let report = copy_file(src.path(), &dst, 1024).unwrap();
        assert_eq!(report.bytes, 2500);
        assert_eq!(report.chunks, 3);
        assert_eq!(fs::read(&dst).unwrap(), content);
    }

    #[test]
    fn copy_truncates_existing_destination() {
        let src = temp_file_with(b"short");
        let dst = temp_file_with(b"a much longer previous content");

        let report = copy_file(src.path(), dst.path(), 1024).unwrap();
        assert_eq!(report.bytes, 5);
        assert_eq!(fs::read(dst.path()).unwrap(), b"short");
    }

    #[test]
    fn copy_of_empty_file_has_no_chunks() {
        let src = temp_file_with(b"");
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("empty");

        let report = copy_file(src.path(), &dst, 1024).unwrap();
        assert_eq!(report.chunks, 0);
        assert!(dst.exists());
    }

    #[test]
    fn copy_rejects_bad_arguments() {
        let src = temp_file_with(b"data");
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            copy_file(src.path(), dir.path().join("out"), 0),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            copy_file(src.path(), src.path(), 1024),
            Err(Error::Config(_))
        ));
        assert_eq!(fs::read(src.path()).unwrap(), b"data");
    }
}
