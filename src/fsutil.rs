//! File system helpers for the local source tree.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// Remove a file or directory tree. A missing path is not an error.
pub async fn remove_tree(path: &Path) -> Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    debug!(path = %path.display(), "Removing");
    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match removed {
        Err(e) if e.kind() != IoErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Write `data` to `path`, creating missing parent directories.
pub async fn write_file(path: &Path, data: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await?;
    Ok(())
}

/// Read a file, or `None` when it does not exist.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("src/classes/Foo.cls");

        write_file(&path, b"class").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"class");
    }

    #[tokio::test]
    async fn test_remove_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("src");
        write_file(&root.join("a/b/c.txt"), b"x").await.unwrap();
        write_file(&root.join("d.txt"), b"y").await.unwrap();

        remove_tree(&root).await.unwrap();
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_tree() {
        let dir = TempDir::new().unwrap();
        remove_tree(&dir.path().join("nothing")).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        write_file(&path, b"{}").await.unwrap();

        remove_tree(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_optional() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x");
        assert_eq!(read_optional(&path).await.unwrap(), None);

        write_file(&path, b"data").await.unwrap();
        assert_eq!(read_optional(&path).await.unwrap(), Some(b"data".to_vec()));
    }
}
