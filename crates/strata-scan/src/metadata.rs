//! Per-file metadata extraction and streaming content hashing.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use blake3::Hasher;

use strata_core::{
    ContentHash, DEFAULT_CHUNK_SIZE, FileRecord, Permissions, Timestamps, extension_of,
};

use crate::mime::{self, SNIFF_LEN};

/// Builds a [`FileRecord`] for one file.
///
/// The file is opened once. Size, timestamps and permissions come from a
/// single `metadata()` call on that handle, and the same handle is streamed
/// through BLAKE3 in `chunk_size` pieces, so memory use does not depend on
/// file size. A file changed by someone else between the two steps can end
/// up with a size and hash that disagree; that is not guarded against.
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    chunk_size: usize,
}

impl MetadataExtractor {
    /// Create an extractor with the default 64 KiB chunk size.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Create an extractor reading `chunk_size` bytes at a time.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Read buffer size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Extract the full record for the file at `path`.
    pub fn extract(&self, path: &Path) -> io::Result<FileRecord> {
        let mut file = File::open(path)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let extension = extension_of(&name);

        let (hash, head) = hash_reader(&mut file, self.chunk_size)?;

        Ok(FileRecord {
            mime_type: mime::detect(&extension, &head).to_string(),
            name: name.into(),
            extension,
            size_in_bytes: metadata.len(),
            timestamps: Timestamps::from_metadata(&metadata),
            permissions: Permissions::from_metadata(&metadata),
            hash,
        })
    }

    /// Hash a file's contents without collecting other metadata.
    pub fn hash_file(&self, path: &Path) -> io::Result<ContentHash> {
        let file = File::open(path)?;
        hash_reader(file, self.chunk_size).map(|(hash, _)| hash)
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream a reader through BLAKE3 in fixed-size chunks.
///
/// Returns the digest and up to [`SNIFF_LEN`] leading bytes for MIME sniffing.
pub fn hash_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<(ContentHash, Vec<u8>)> {
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut head = Vec::with_capacity(SNIFF_LEN);

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let chunk = &buffer[..bytes_read];
        if head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - head.len()).min(chunk.len());
            head.extend_from_slice(&chunk[..take]);
        }
        hasher.update(chunk);
    }

    Ok((ContentHash::new(*hasher.finalize().as_bytes()), head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_basic_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Notes.TXT");
        fs::write(&path, "hello world").unwrap();

        let record = MetadataExtractor::new().extract(&path).unwrap();
        assert_eq!(record.name, "Notes.TXT");
        assert_eq!(record.extension, ".txt");
        assert_eq!(record.size_in_bytes, 11);
        assert_eq!(record.mime_type, "text/plain");
        assert_eq!(record.hash, ContentHash::new(*blake3::hash(b"hello world").as_bytes()));
    }

    #[test]
    fn test_chunked_hash_matches_one_shot() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        // Odd chunk sizes force many partial reads
        for chunk_size in [1usize, 7, 4096, 1 << 20] {
            let (hash, head) = hash_reader(data.as_slice(), chunk_size).unwrap();
            assert_eq!(hash, ContentHash::new(*blake3::hash(&data).as_bytes()));
            assert_eq!(head.as_slice(), &data[..SNIFF_LEN]);
        }
    }

    #[test]
    fn test_identical_content_same_hash() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.bin"), "same bytes").unwrap();
        fs::write(temp.path().join("b.dat"), "same bytes").unwrap();
        fs::write(temp.path().join("c.bin"), "other bytes").unwrap();

        let extractor = MetadataExtractor::with_chunk_size(3);
        let a = extractor.hash_file(&temp.path().join("a.bin")).unwrap();
        let b = extractor.hash_file(&temp.path().join("b.dat")).unwrap();
        let c = extractor.hash_file(&temp.path().join("c.bin")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_mime_sniffed_without_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("document");
        fs::write(&path, b"%PDF-1.4\n...").unwrap();

        let record = MetadataExtractor::new().extract(&path).unwrap();
        assert_eq!(record.extension, "");
        assert_eq!(record.mime_type, "application/pdf");
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = MetadataExtractor::new()
            .extract(&temp.path().join("missing.txt"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        assert!(MetadataExtractor::new().extract(temp.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_recorded() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.sh");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o750)).unwrap();

        let record = MetadataExtractor::new().extract(&path).unwrap();
        assert_eq!(record.permissions.mode, 0o750);
        assert!(record.permissions.executable);
    }
}
