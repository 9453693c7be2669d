//! Zip packaging of a snapshot directory

use crate::error::ArchiveError;
use crate::models::types::ArchiveInfo;
use async_trait::async_trait;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use zip::write::{SimpleFileOptions, ZipWriter};

/// Packs a finished snapshot directory into a single file.
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn create_archive(
        &self,
        source_dir: &Path,
        output_path: &Path,
    ) -> Result<ArchiveInfo, ArchiveError>;
}

pub struct SnapshotArchiver;

#[async_trait]
impl Archiver for SnapshotArchiver {
    async fn create_archive(
        &self,
        source_dir: &Path,
        output_path: &Path,
    ) -> Result<ArchiveInfo, ArchiveError> {
        Self::archive(source_dir, output_path).await
    }
}

impl SnapshotArchiver {
    /// Compresses everything under `source_dir` into a single zip at
    /// `output_path`. Entry names are relative to `source_dir` and written in
    /// sorted order so the same tree always yields the same entry list.
    #[instrument(skip_all, fields(source = %source_dir.display(), output = %output_path.display()))]
    pub async fn archive(source_dir: &Path, output_path: &Path) -> Result<ArchiveInfo, ArchiveError> {
        info!("Compressing backup files...");

        let source_dir = source_dir.to_path_buf();
        let output_path = output_path.to_path_buf();

        let entries = tokio::task::spawn_blocking({
            let output_path = output_path.clone();
            move || Self::create_zip(&source_dir, &output_path)
        })
        .await
        .map_err(|e| io::Error::other(format!("Task join error: {}", e)))??;

        let size = tokio::fs::metadata(&output_path).await?.len();
        info!(entries = entries, size = size, "Created archive {}", output_path.display());

        Ok(ArchiveInfo {
            path: output_path,
            size,
            entries,
        })
    }

    fn create_zip(source_dir: &Path, output_path: &Path) -> Result<usize, ArchiveError> {
        let mut paths = Vec::new();
        Self::collect(source_dir, &mut paths)?;
        paths.sort();

        let file = File::create(output_path)?;
        let mut zip = ZipWriter::new(file);

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o600);

        for path in &paths {
            let relative = path
                .strip_prefix(source_dir)
                .map_err(|_| ArchiveError::StrayPath(path.clone()))?;
            let name = relative.to_string_lossy().replace('\\', "/");

            if path.is_dir() {
                zip.add_directory(name, options)?;
            } else {
                zip.start_file(name, options)?;
                let mut file = File::open(path)?;
                io::copy(&mut file, &mut zip)?;
            }
        }

        zip.finish()?;
        Ok(paths.len())
    }

    fn collect(current: &Path, paths: &mut Vec<PathBuf>) -> io::Result<()> {
        for entry in fs::read_dir(current)? {
            let path = entry?.path();
            let file_type = fs::symlink_metadata(&path)?.file_type();

            if file_type.is_dir() {
                paths.push(path.clone());
                Self::collect(&path, paths)?;
            } else if file_type.is_file() {
                paths.push(path);
            }
        }
        Ok(())
    }
}
