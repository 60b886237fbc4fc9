//! Upload buffering.
//!
//! Some S3-compatible servers reject uploads without a declared content
//! length. [`UploadBuffer::capture`] spools a body of any shape into a
//! scoped temporary file so the exact length is known before the store
//! write starts. The file is removed when the [`BufferedUpload`] is closed
//! or dropped, on success and failure alike.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, trace};

/// Creates scoped temporary files for incoming uploads.
#[derive(Debug, Clone, Default)]
pub struct UploadBuffer {
    temp_dir: Option<PathBuf>,
}

impl UploadBuffer {
    /// Buffer into `temp_dir`, or the system temp dir when `None`.
    #[must_use]
    pub fn new(temp_dir: Option<PathBuf>) -> Self {
        Self { temp_dir }
    }

    /// Copy `body` to a new temporary file and report its length.
    ///
    /// A partially written file is removed if the copy fails.
    pub async fn capture<R>(&self, mut body: R) -> io::Result<BufferedUpload>
    where
        R: AsyncRead + Unpin,
    {
        let mut builder = tempfile::Builder::new();
        builder.prefix("bucketlens-upload-");
        let named = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let (file, path) = named.into_parts();
        trace!(path = %path.display(), "buffering upload");

        let mut file = tokio::fs::File::from_std(file);
        tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;
        let len = file.metadata().await?.len();
        drop(file);

        debug!(path = %path.display(), len, "upload buffered");
        Ok(BufferedUpload { path, len })
    }
}

/// A fully captured upload body on disk.
#[derive(Debug)]
pub struct BufferedUpload {
    path: TempPath,
    len: u64,
}

impl BufferedUpload {
    /// Location of the buffered bytes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exact byte length.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Delete the temporary file now, reporting any failure.
    pub fn close(self) -> io::Result<()> {
        self.path.close()
    }
}
