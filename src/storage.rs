//! On-disk artifact storage
//!
//! Every pipeline run gets a [`RunPaths`] naming where its upload, reply text and
//! synthesized speech live. With request isolation on, each run writes below its
//! own `<run_id>/` directory; with it off, all runs share one slot per artifact and
//! overwrite each other.

use std::path::{Component, Path, PathBuf};

use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::{Error, Result};

/// Buffer size used when copying uploads to disk
pub const COPY_CHUNK_SIZE: usize = 1024 * 1024;

/// File stem of stored uploads
pub const UPLOAD_STEM: &str = "uploaded_audio";

/// File name of the persisted reply
pub const RESPONSE_FILE: &str = "response.txt";

/// File name of the synthesized speech
pub const SPEECH_FILE: &str = "answer.mp3";

/// Artifact locations for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    /// Identifier of the run
    pub run_id: Uuid,
    /// Where the reply text is written
    pub response: PathBuf,
    /// Where the synthesized speech is written
    pub speech: PathBuf,
}

/// Filesystem-backed artifact store
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    config: StorageConfig,
    max_upload_bytes: u64,
}

impl ArtifactStore {
    /// Create a store rooted at `config.root`
    #[must_use]
    pub const fn new(config: StorageConfig, max_upload_bytes: u64) -> Self {
        Self {
            config,
            max_upload_bytes,
        }
    }

    /// Create the uploads, responses and output directories
    ///
    /// # Errors
    ///
    /// Returns error if a directory cannot be created
    pub async fn init(&self) -> Result<()> {
        for dir in [
            self.config.uploads_dir(),
            self.config.responses_dir(),
            self.config.output_dir(),
        ] {
            fs::create_dir_all(&dir).await?;
            tracing::debug!(path = %dir.display(), "storage directory ready");
        }
        Ok(())
    }

    /// Directory holding uploaded audio
    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.config.uploads_dir()
    }

    /// Maximum accepted upload size in bytes
    #[must_use]
    pub const fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Allocate paths for a new run
    #[must_use]
    pub fn begin_run(&self) -> RunPaths {
        let run_id = Uuid::new_v4();
        RunPaths {
            run_id,
            response: self.slot(&self.config.responses_dir(), run_id).join(RESPONSE_FILE),
            speech: self.slot(&self.config.output_dir(), run_id).join(SPEECH_FILE),
        }
    }

    /// Path an upload with `extension` is stored at for `run`
    #[must_use]
    pub fn upload_path(&self, run: &RunPaths, extension: &str) -> PathBuf {
        self.slot(&self.config.uploads_dir(), run.run_id)
            .join(format!("{UPLOAD_STEM}.{extension}"))
    }

    fn slot(&self, dir: &Path, run_id: Uuid) -> PathBuf {
        if self.config.isolate_requests {
            dir.join(run_id.to_string())
        } else {
            dir.to_path_buf()
        }
    }

    /// Stream an upload to `path`, truncating any existing file
    ///
    /// Returns the number of bytes written. A partial file is removed on failure.
    /// In shared-slot mode any previous upload with a different extension is
    /// removed first, so the slot never holds more than one file.
    ///
    /// # Errors
    ///
    /// Returns `Error::UploadTooLarge` past the size limit, the stream's own error
    /// if it fails, or an IO error
    pub async fn write_upload<S, B, E>(&self, path: &Path, stream: S) -> Result<u64>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<Error>,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        if !self.config.isolate_requests {
            self.remove_stale_uploads(path).await?;
        }

        let result = self.copy_stream(path, stream).await;
        if result.is_err() {
            if let Err(e) = fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove partial upload");
            }
        }
        result
    }

    /// Delete shared-slot uploads other than `keep`
    async fn remove_stale_uploads(&self, keep: &Path) -> Result<()> {
        let prefix = format!("{UPLOAD_STEM}.");
        let mut entries = fs::read_dir(self.config.uploads_dir()).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_upload = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix));
            if is_upload
                && path.file_name() != keep.file_name()
                && entry.file_type().await?.is_file()
            {
                fs::remove_file(&path).await?;
                tracing::debug!(path = %path.display(), "removed previous upload from shared slot");
            }
        }
        Ok(())
    }

    async fn copy_stream<S, B, E>(&self, path: &Path, stream: S) -> Result<u64>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<Error>,
    {
        let file = fs::File::create(path).await?;
        let mut writer = BufWriter::with_capacity(COPY_CHUNK_SIZE, file);
        let mut stream = std::pin::pin!(stream);
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Into::into)?;
            let bytes = chunk.as_ref();
            written = written.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
            if written > self.max_upload_bytes {
                return Err(Error::UploadTooLarge {
                    limit: self.max_upload_bytes,
                });
            }
            writer.write_all(bytes).await?;
        }

        writer.flush().await?;
        tracing::debug!(path = %path.display(), bytes = written, "upload stored");
        Ok(written)
    }

    /// Persist reply text for `run`, overwriting any previous reply at that path
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub async fn write_reply(&self, run: &RunPaths, text: &str) -> Result<()> {
        write_file(&run.response, text.as_bytes()).await
    }

    /// Persist synthesized speech for `run`, overwriting any previous audio at that path
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub async fn write_speech(&self, run: &RunPaths, audio: &[u8]) -> Result<()> {
        write_file(&run.speech, audio).await
    }

    /// Resolve a caller-supplied path to a stored upload
    ///
    /// Containment is checked before existence, so paths outside the uploads
    /// directory are rejected the same way whether or not they exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPath` if the path lies outside the uploads directory
    /// or isn't a regular file, or `Error::MissingFile` if nothing exists there
    pub async fn resolve_upload(&self, requested: &Path) -> Result<PathBuf> {
        let uploads_dir = self.uploads_dir();
        let uploads = fs::canonicalize(&uploads_dir).await?;
        let lexical = normalize(&std::path::absolute(requested)?);

        let inside = lexical.starts_with(&uploads)
            || lexical.starts_with(normalize(&std::path::absolute(&uploads_dir)?));
        if !inside {
            tracing::warn!(path = %requested.display(), "rejected path outside uploads directory");
            return Err(Error::InvalidPath(requested.to_path_buf()));
        }

        if !fs::try_exists(&lexical).await.unwrap_or(false) {
            return Err(Error::MissingFile(requested.to_path_buf()));
        }

        // symlinks inside uploads/ may still point elsewhere
        let resolved = fs::canonicalize(&lexical).await?;
        if !resolved.starts_with(&uploads) || !resolved.is_file() {
            tracing::warn!(path = %requested.display(), "rejected path escaping uploads directory");
            return Err(Error::InvalidPath(requested.to_path_buf()));
        }

        Ok(resolved)
    }
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;
    Ok(())
}
