//! The opaque file handle converters read from.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

/// A named byte source with a size and an optional modification time.
///
/// Reads are scoped to the call and fail with `io::Error`; how the bytes were
/// obtained is up to the implementation.
pub trait SourceFile {
    /// File name including its extension, without any directory part.
    fn name(&self) -> &str;

    /// Size in bytes.
    fn size(&self) -> u64;

    fn last_modified(&self) -> Option<DateTime<Utc>>;

    /// Read the whole content as bytes.
    fn read_bytes(&self) -> io::Result<Vec<u8>>;

    /// Read the whole content as UTF-8 text.
    ///
    /// A leading byte-order mark is dropped and invalid sequences are replaced
    /// with U+FFFD.
    fn read_text(&self) -> io::Result<String> {
        Ok(decode_text(&self.read_bytes()?))
    }

    /// Lower-cased extension of the file name, empty if there is none.
    fn extension(&self) -> String {
        extension_of(self.name())
    }
}

/// Lower-cased text after the last `.` of a file name.
pub fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Decode bytes as UTF-8, dropping a BOM and replacing invalid sequences.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// A file held in memory.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    data: Vec<u8>,
    last_modified: Option<DateTime<Utc>>,
}

impl MemoryFile {
    /// Create an in-memory file with the given name and content.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            last_modified: None,
        }
    }

    /// Set the modification time.
    pub fn with_last_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(modified);
        self
    }
}

impl SourceFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(self.data.clone())
    }
}

/// A file on disk. Content is read lazily on each `read_*` call.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    size: u64,
    last_modified: Option<DateTime<Utc>>,
}

impl DiskFile {
    /// Stat a file on disk.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            name,
            size: meta.len(),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.PDF"), "pdf");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn test_decode_text_drops_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhello"), "hello");
    }

    #[test]
    fn test_decode_text_replaces_invalid_bytes() {
        assert_eq!(decode_text(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_memory_file_reports_size_and_text() {
        let file = MemoryFile::new("notes.txt", "你好");
        assert_eq!(file.size(), 6);
        assert_eq!(file.read_text().unwrap(), "你好");
        assert_eq!(file.extension(), "txt");
    }
}
