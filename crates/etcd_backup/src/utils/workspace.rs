//! Job-scoped temporary paths
//!
//! Every job owns `<root>/<job_id>/` for the raw snapshot and the sibling
//! `<root>/<job_id>.zip` for the archive.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct JobWorkspace {
    root: PathBuf,
    job_id: Uuid,
}

impl JobWorkspace {
    pub fn new(root: PathBuf, job_id: Uuid) -> Self {
        Self { root, job_id }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.join(self.job_id.to_string())
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join(format!("{}.zip", self.job_id))
    }

    pub async fn create(&self) -> io::Result<PathBuf> {
        let path = self.snapshot_dir();
        fs::create_dir_all(&path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            fs::set_permissions(&path, perms).await?;
        }

        info!("Created snapshot directory at {}", path.display());
        Ok(path)
    }

    /// Removes the snapshot directory. Failures are logged, never returned.
    pub async fn remove_snapshot_dir(&self) -> bool {
        let path = self.snapshot_dir();
        if !path.exists() {
            return true;
        }

        info!("Cleaning {} ...", path.display());
        match fs::remove_dir_all(&path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove snapshot directory");
                false
            }
        }
    }

    /// Removes the archive file. Failures are logged, never returned.
    pub async fn remove_archive(&self) -> bool {
        let path = self.archive_path();
        if !path.exists() {
            return true;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("{} file deleted", path.display());
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove archive file");
                false
            }
        }
    }

    pub async fn remove_all(&self) -> bool {
        let dir = self.remove_snapshot_dir().await;
        let archive = self.remove_archive().await;
        dir && archive
    }
}

/// Returns (files, bytes) under `path`, walking iteratively.
pub async fn directory_usage(path: &Path) -> io::Result<(usize, u64)> {
    let mut files = 0usize;
    let mut total = 0u64;

    if !path.exists() {
        return Ok((0, 0));
    }

    let mut stack = vec![path.to_path_buf()];

    while let Some(current) = stack.pop() {
        let metadata = fs::metadata(&current).await?;

        if metadata.is_file() {
            files += 1;
            total += metadata.len();
        } else if metadata.is_dir() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                stack.push(entry.path());
            }
        }
    }

    Ok((files, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn paths_share_the_job_id() {
        let id = Uuid::new_v4();
        let ws = JobWorkspace::new(PathBuf::from("/tmp"), id);

        assert_eq!(ws.snapshot_dir(), PathBuf::from(format!("/tmp/{}", id)));
        assert_eq!(ws.archive_path(), PathBuf::from(format!("/tmp/{}.zip", id)));
    }

    #[tokio::test]
    async fn create_and_remove() {
        let temp = TempDir::new().unwrap();
        let ws = JobWorkspace::new(temp.path().to_path_buf(), Uuid::new_v4());

        let dir = ws.create().await.unwrap();
        std::fs::write(dir.join("member.wal"), b"wal").unwrap();
        std::fs::write(ws.archive_path(), b"zip").unwrap();

        assert!(ws.remove_all().await);
        assert!(!dir.exists());
        assert!(!ws.archive_path().exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn removing_missing_paths_is_fine() {
        let temp = TempDir::new().unwrap();
        let ws = JobWorkspace::new(temp.path().to_path_buf(), Uuid::new_v4());

        assert!(ws.remove_all().await);
    }

    #[tokio::test]
    async fn usage_counts_nested_files() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("member").join("snap");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("db"), vec![0u8; 10]).unwrap();
        std::fs::write(temp.path().join("top"), vec![0u8; 5]).unwrap();

        let (files, bytes) = directory_usage(temp.path()).await.unwrap();
        assert_eq!(files, 2);
        assert_eq!(bytes, 15);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn snapshot_dir_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let ws = JobWorkspace::new(temp.path().to_path_buf(), Uuid::new_v4());
        let dir = ws.create().await.unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
