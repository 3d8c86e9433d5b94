use std::io::Write;
use std::path::Path;
use xxhash_rust::xxh3::xxh3_64;

/// xxh3 digest of file bytes, taken at read time and checked before write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Fingerprint(xxh3_64(bytes))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Atomic file write: tempfile + fsync + rename, then an mtime bump.
///
/// Either the full write succeeds or the file is untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // same directory keeps the rename on one filesystem
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    // watchers keyed on mtime must see the change even within one tick
    filetime::set_file_mtime(path, filetime::FileTime::now())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.txt");
        fs::write(&file, "before").unwrap();

        atomic_write(&file, b"after").unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "after");
        // no stray temp files
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_atomic_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("new.txt");
        atomic_write(&file, b"fresh").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "fresh");
    }

    #[test]
    fn test_fingerprint_detects_change() {
        assert_eq!(Fingerprint::of(b"abc"), Fingerprint::of(b"abc"));
        assert_ne!(Fingerprint::of(b"abc"), Fingerprint::of(b"abd"));
    }
}
