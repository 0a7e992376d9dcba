use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::registers::Baseline;
use crate::{Error, Result};

/// Two-byte file holding the lowest baseline seen so far, so a restarted process can put the
/// sensor back on its clean-air reference.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Baseline::UNKNOWN` if nothing has been stored yet.
    pub fn load(&self) -> Result<Baseline> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Baseline::UNKNOWN),
            Err(e) => return Err(Error::baseline(&self.path, e)),
        };
        let raw: [u8; 2] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::CorruptBaseline {
                path: self.path.clone(),
                len: bytes.len(),
            })?;
        Ok(Baseline(raw))
    }

    /// Replaces the file contents with exactly the two baseline bytes.
    pub fn save(&self, baseline: Baseline) -> Result<()> {
        std::fs::write(&self.path, baseline.0).map_err(|e| Error::baseline(&self.path, e))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Path in the system temp dir that is unique per test and removed again on drop.
    pub(crate) struct TempPath(pub PathBuf);

    impl TempPath {
        pub(crate) fn new(name: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("ccs811-{}-{}", std::process::id(), name));
            let _ = std::fs::remove_file(&path);
            Self(path)
        }
    }

    impl Drop for TempPath {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn test_missing_file_is_unknown() {
        let tmp = TempPath::new("missing");
        let store = BaselineStore::new(&tmp.0);
        assert_eq!(store.load().unwrap(), Baseline([0xff, 0xff]));
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempPath::new("roundtrip");
        let store = BaselineStore::new(&tmp.0);
        for raw in [[0x00, 0x00], [0x2c, 0x01], [0xff, 0x7f], [0xff, 0xff]] {
            store.save(Baseline(raw)).unwrap();
            assert_eq!(std::fs::read(&tmp.0).unwrap(), raw);
            assert_eq!(store.load().unwrap(), Baseline(raw));
        }
    }

    #[test]
    fn test_wrong_length_is_corrupt() {
        let tmp = TempPath::new("corrupt");
        std::fs::write(&tmp.0, [1u8, 2, 3]).unwrap();
        let store = BaselineStore::new(&tmp.0);
        assert!(matches!(
            store.load(),
            Err(Error::CorruptBaseline { len: 3, .. })
        ));
    }

    #[test]
    fn test_unwritable_path() {
        let store = BaselineStore::new(std::env::temp_dir().join("no-such-dir").join("BASELINE"));
        assert!(matches!(
            store.save(Baseline::UNKNOWN),
            Err(Error::Baseline { .. })
        ));
    }
}
