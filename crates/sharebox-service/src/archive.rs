//! Streaming zip archives of files and folders.
//!
//! Entries are resolved up front, then fetched one at a time by an async
//! task and handed to a single blocking thread that owns the
//! [`zip::ZipWriter`]. The writer pushes compressed chunks into a bounded
//! channel that the HTTP layer exposes as a response body.

use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_database::store::{FileStore, FolderStore};
use sharebox_storage::transfer::ObjectTransfer;

use crate::folder::FolderHierarchy;

const CHUNK_SIZE: usize = 64 * 1024;
const CHANNEL_DEPTH: usize = 16;

/// One file inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive.
    pub path: String,
    /// Object key to read the bytes from.
    pub object_name: String,
    /// Recorded size in bytes.
    pub size: u64,
}

/// `name` with a `.zip` suffix.
pub fn archive_file_name(name: &str) -> String {
    let name = name.trim();
    let name = if name.is_empty() { "download" } else { name };
    if name.to_lowercase().ends_with(".zip") {
        name.to_string()
    } else {
        format!("{name}.zip")
    }
}

/// Resolves selections into entries and streams them as a zip.
#[derive(Debug, Clone)]
pub struct BulkArchiveBuilder {
    folders: Arc<dyn FolderStore>,
    files: Arc<dyn FileStore>,
    hierarchy: FolderHierarchy,
    source: Arc<dyn ObjectTransfer>,
}

impl BulkArchiveBuilder {
    /// Creates a builder reading entries through `source`.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        files: Arc<dyn FileStore>,
        source: Arc<dyn ObjectTransfer>,
    ) -> Self {
        Self {
            hierarchy: FolderHierarchy::new(Arc::clone(&folders), Arc::clone(&files)),
            folders,
            files,
            source,
        }
    }

    /// Entries for a selection: the requested files at the archive root,
    /// then every requested folder under `<folder name>/`.
    pub async fn resolve_entries(
        &self,
        file_ids: &[Uuid],
        folder_ids: &[Uuid],
        user_id: Uuid,
    ) -> AppResult<Vec<ArchiveEntry>> {
        if file_ids.is_empty() && folder_ids.is_empty() {
            return Err(AppError::validation("No files or folders to download"));
        }

        let mut entries: Vec<ArchiveEntry> = self
            .files
            .find_by_ids(file_ids, user_id)
            .await?
            .into_iter()
            .map(|file| ArchiveEntry {
                path: file.display_name(),
                size: file.size_bytes(),
                object_name: file.object_name,
            })
            .collect();

        for folder in self.folders.find_by_ids(folder_ids, user_id).await? {
            let base = format!("{}/", folder.name);
            entries.extend(
                self.hierarchy
                    .get_all_files_in_folder(folder.id, user_id, &base)
                    .await?
                    .into_iter()
                    .map(|f| ArchiveEntry {
                        size: f.file.size_bytes(),
                        object_name: f.file.object_name,
                        path: f.relative_path,
                    }),
            );
        }

        Ok(entries)
    }

    /// Entries for one folder, with paths relative to the folder itself.
    pub async fn folder_entries(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Vec<ArchiveEntry>> {
        self.folders
            .find_by_id(folder_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))?;

        Ok(self
            .hierarchy
            .get_all_files_in_folder(folder_id, user_id, "")
            .await?
            .into_iter()
            .map(|f| ArchiveEntry {
                size: f.file.size_bytes(),
                object_name: f.file.object_name,
                path: f.relative_path,
            })
            .collect())
    }

    /// Stream a zip of `entries`. Entries whose bytes cannot be fetched are
    /// logged and left out.
    pub fn stream(&self, entries: Vec<ArchiveEntry>) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let (out_tx, out_rx) = mpsc::channel::<io::Result<Bytes>>(CHANNEL_DEPTH);
        let (entry_tx, entry_rx) = mpsc::channel::<(ArchiveEntry, Bytes)>(1);

        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            for entry in entries {
                match source.fetch(&entry.object_name).await {
                    Ok(data) => {
                        if entry_tx.send((entry, data)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(
                        path = %entry.path,
                        object_name = %entry.object_name,
                        error = %e,
                        "Skipping archive entry that could not be fetched"
                    ),
                }
            }
        });

        tokio::task::spawn_blocking(move || {
            let writer = ChannelWriter::new(out_tx.clone());
            if let Err(e) = write_archive(writer, entry_rx) {
                error!(error = %e, "Failed to write archive");
                let _ = out_tx.blocking_send(Err(e));
            }
        });

        futures::stream::unfold(out_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
    }
}

fn write_archive(
    writer: ChannelWriter,
    mut entries: mpsc::Receiver<(ArchiveEntry, Bytes)>,
) -> io::Result<()> {
    let mut zip = ZipWriter::new_stream(writer);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    let mut written = 0usize;
    while let Some((entry, data)) = entries.blocking_recv() {
        let large = data.len() as u64 > u64::from(u32::MAX);
        zip.start_file(entry.path.as_str(), options.large_file(large))
            .map_err(io::Error::other)?;
        zip.write_all(&data)?;
        written += 1;
    }

    zip.finish().map_err(io::Error::other)?;
    debug!(entries = written, "Archive finished");
    Ok(())
}

/// `io::Write` adapter that batches bytes into chunks for the channel.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buffer: Vec<u8>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buffer: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(CHUNK_SIZE),
        ));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive receiver dropped"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= CHUNK_SIZE {
            self.send_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        let _ = self.send_buffer();
    }
}
