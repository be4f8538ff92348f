use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove a directory tree if present. Missing directories are not an error.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/config.yaml");
        atomic_write(&path, b"git: {}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "git: {}");
    }

    #[test]
    fn remove_dir_if_exists_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        remove_dir_if_exists(&dir.path().join("nope")).unwrap();

        let stale = dir.path().join("stale");
        std::fs::create_dir_all(stale.join("nested")).unwrap();
        remove_dir_if_exists(&stale).unwrap();
        assert!(!stale.exists());
    }
}
