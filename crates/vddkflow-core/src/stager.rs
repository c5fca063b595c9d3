//! Artifact staging
//!
//! Keeps exactly one artifact at a fixed path. New content is written to a
//! temporary file next to the destination and renamed over it only after a
//! complete, synced write, so a failed upload leaves the previous artifact
//! in place.

use crate::error::{CoreError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Writes uploads to `<dir>/<file_name>` and reads them back.
#[derive(Debug, Clone)]
pub struct ArtifactStager {
    dir: PathBuf,
    file_name: String,
}

impl ArtifactStager {
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Destination of the staged artifact.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Start a new staging write.
    pub async fn begin(&self) -> Result<StagingFile> {
        self.ensure_dir().await?;

        let temp = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(|e| CoreError::storage("Could not save file on disk:", &self.dir, e))?;
        let (file, temp) = temp.into_parts();

        Ok(StagingFile {
            file: File::from_std(file),
            temp,
            dest: self.path(),
            written: 0,
        })
    }

    /// Copy `reader` to the destination, replacing any previous artifact.
    ///
    /// Returns the number of bytes staged.
    pub async fn stage<R>(&self, reader: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut staging = self.begin().await?;
        staging.copy_from(reader).await?;
        staging.commit().await
    }

    /// Open the staged artifact for reading, `None` if nothing was staged.
    pub async fn open(&self) -> Result<Option<StagedArtifact>> {
        let path = self.path();
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::storage("Failed to open file", path, e)),
        };

        let metadata = file
            .metadata()
            .await
            .map_err(|e| CoreError::storage("Failed to stat file", &path, e))?;

        Ok(Some(StagedArtifact {
            file,
            len: metadata.len(),
            file_name: self.file_name.clone(),
        }))
    }

    async fn ensure_dir(&self) -> Result<()> {
        if fs::try_exists(&self.dir).await.unwrap_or(false) {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);

        builder
            .create(&self.dir)
            .await
            .map_err(|e| CoreError::storage("Could not prepare upload directory", &self.dir, e))?;
        tracing::debug!("Created upload directory: {}", self.dir.display());
        Ok(())
    }
}

/// An in-progress staging write.
///
/// Dropping it without [`StagingFile::commit`] discards the temporary file.
#[derive(Debug)]
pub struct StagingFile {
    file: File,
    temp: TempPath,
    dest: PathBuf,
    written: u64,
}

impl StagingFile {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| CoreError::storage("error copy to the local file", &self.dest, e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Drain `reader` into the temporary file.
    ///
    /// Read failures are upload errors; write failures are storage errors.
    pub async fn copy_from<R>(&mut self, reader: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut copied = 0u64;
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(CoreError::Upload)?;
            if n == 0 {
                return Ok(copied);
            }
            self.write(&buf[..n]).await?;
            copied += n as u64;
        }
    }

    /// Make the written content the staged artifact.
    pub async fn commit(mut self) -> Result<u64> {
        self.file
            .flush()
            .await
            .map_err(|e| CoreError::storage("error copy to the local file", &self.dest, e))?;
        self.file
            .sync_all()
            .await
            .map_err(|e| CoreError::storage("error copy to the local file", &self.dest, e))?;

        let StagingFile {
            file,
            temp,
            dest,
            written,
        } = self;
        drop(file);

        temp.persist(&dest)
            .map_err(|e| CoreError::storage("Could not save file on disk:", &dest, e.error))?;

        tracing::info!("Staged {} bytes at {}", written, dest.display());
        Ok(written)
    }
}

/// The staged artifact opened for reading.
#[derive(Debug)]
pub struct StagedArtifact {
    pub file: File,
    pub len: u64,
    pub file_name: String,
}
