//! Streaming ZIP archives of a prefix.
//!
//! [`ArchiveStreamer::stream`] writes the archive in a spawned task and
//! hands the bytes out through a bounded channel as they are produced.
//! Objects are copied strictly one after another through a single buffer of
//! `chunk_size` bytes; after every write the archive output produced so far
//! is drained into the channel, so neither the archive nor a whole object
//! is ever held in memory.
//!
//! The response head is already sent by the time a mid-stream failure can
//! happen. A failure is therefore delivered as an `Err` item, which makes
//! the HTTP layer abort the body, and the client sees a truncated archive.

use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{Datelike, Timelike};
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::store::{ObjectSummary, StoreClient};

/// Chunks buffered between the archive task and the response body.
const CHANNEL_CAPACITY: usize = 8;

/// Archive bytes as they are produced; an `Err` item ends the stream.
pub type ArchiveStream = mpsc::Receiver<io::Result<Bytes>>;

/// A folder download ready to be sent.
#[derive(Debug)]
pub struct FolderArchive {
    /// Suggested download file name.
    pub file_name: String,
    /// Number of objects that will be archived.
    pub object_count: usize,
    pub body: ArchiveStream,
}

/// Writes archives of store objects into a byte stream.
#[derive(Debug, Clone)]
pub struct ArchiveStreamer {
    chunk_size: usize,
}

impl ArchiveStreamer {
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Start archiving `objects` of `bucket`; each entry is named by its key.
    pub fn stream(
        &self,
        client: Arc<dyn StoreClient>,
        bucket: String,
        objects: Vec<ObjectSummary>,
    ) -> ArchiveStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let chunk_size = self.chunk_size;
        tokio::spawn(async move {
            match write_archive(client.as_ref(), &bucket, &objects, chunk_size, &tx).await {
                Ok(bytes) => debug!(bucket = %bucket, objects = objects.len(), bytes, "archive streamed"),
                Err(ArchiveAbort::Disconnected) => {
                    debug!(bucket = %bucket, "archive receiver dropped, stopping");
                }
                Err(ArchiveAbort::Failed(err)) => {
                    warn!(bucket = %bucket, error = %err, "archive aborted mid-stream");
                    let _ = tx.send(Err(err)).await;
                }
            }
        });
        rx
    }
}

enum ArchiveAbort {
    Disconnected,
    Failed(io::Error),
}

impl From<io::Error> for ArchiveAbort {
    fn from(err: io::Error) -> Self {
        Self::Failed(err)
    }
}

impl From<zip::result::ZipError> for ArchiveAbort {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Failed(io::Error::other(err))
    }
}

/// Shared output buffer the zip writer appends to and the task drains.
#[derive(Debug, Clone, Default)]
struct ChunkSink(Arc<Mutex<Vec<u8>>>);

impl ChunkSink {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl Write for ChunkSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn drain(
    sink: &ChunkSink,
    tx: &mpsc::Sender<io::Result<Bytes>>,
    sent: &mut u64,
) -> Result<(), ArchiveAbort> {
    let chunk = sink.take();
    if chunk.is_empty() {
        return Ok(());
    }
    *sent += chunk.len() as u64;
    tx.send(Ok(Bytes::from(chunk)))
        .await
        .map_err(|_| ArchiveAbort::Disconnected)
}

fn entry_options(object: &ObjectSummary) -> SimpleFileOptions {
    let large = object
        .size
        .is_none_or(|size| size >= i64::from(u32::MAX));
    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(large);
    if let Some(ts) = object.last_modified.as_ref().and_then(zip_timestamp) {
        options = options.last_modified_time(ts);
    }
    options
}

fn zip_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> Option<zip::DateTime> {
    zip::DateTime::from_date_and_time(
        u16::try_from(ts.year()).ok()?,
        u8::try_from(ts.month()).ok()?,
        u8::try_from(ts.day()).ok()?,
        u8::try_from(ts.hour()).ok()?,
        u8::try_from(ts.minute()).ok()?,
        u8::try_from(ts.second()).ok()?,
    )
    .ok()
}

async fn write_archive(
    client: &dyn StoreClient,
    bucket: &str,
    objects: &[ObjectSummary],
    chunk_size: usize,
    tx: &mpsc::Sender<io::Result<Bytes>>,
) -> Result<u64, ArchiveAbort> {
    let sink = ChunkSink::default();
    let mut zip = ZipWriter::new_stream(sink.clone());
    let mut buf = vec![0u8; chunk_size];
    let mut sent = 0u64;

    for object in objects {
        let options = entry_options(object);
        if object.key.ends_with('/') {
            zip.add_directory(object.key.as_str(), options)?;
            drain(&sink, tx, &mut sent).await?;
            continue;
        }

        zip.start_file(object.key.as_str(), options)?;
        let mut reader = client
            .open_object(bucket, &object.key)
            .await
            .map_err(io::Error::other)?;
        let mut copied = 0u64;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            zip.write_all(&buf[..n])?;
            copied += n as u64;
            drain(&sink, tx, &mut sent).await?;
        }
        trace!(key = %object.key, bytes = copied, "archived object");
    }

    zip.finish()?;
    drain(&sink, tx, &mut sent).await?;
    Ok(sent)
}
