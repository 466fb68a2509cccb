use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_model::{CatalogError, Folder, Result};
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

/// Zero-argument callable returning the source bytes of a photo on demand.
///
/// Cloned freely; each clone re-reads from the same underlying file.
pub type ByteProvider = Arc<
    dyn Fn() -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>> + Send + Sync,
>;

/// One file discovered by a folder scan.
#[derive(Clone)]
pub struct ScannedFile {
    pub relative_path: String,
    pub filename: String,
    pub extension: String,
    pub file_size: u64,
    pub modified_date: DateTime<Utc>,
    pub get_file: ByteProvider,
}

impl fmt::Debug for ScannedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannedFile")
            .field("relative_path", &self.relative_path)
            .field("filename", &self.filename)
            .field("extension", &self.extension)
            .field("file_size", &self.file_size)
            .field("modified_date", &self.modified_date)
            .finish_non_exhaustive()
    }
}

/// Produces a stream of discovered files for a folder.
///
/// Implementations should translate permission-denied and not-found
/// conditions into `CatalogError::PermissionDenied` /
/// `CatalogError::FolderNotFound`, a cancellation observed between
/// yielded files into `CatalogError::ScanCancelled`, and wrap anything
/// else as `CatalogError::Unknown`.
#[async_trait]
pub trait FolderScanner: Send + Sync {
    async fn scan<'a>(
        &'a self,
        folder: &'a Folder,
        recursive: bool,
        cancel: CancellationToken,
    ) -> Result<BoxStream<'a, Result<ScannedFile>>>;
}

pub fn scan_cancelled(folder_path: &str) -> CatalogError {
    CatalogError::ScanCancelled(format!("scan of '{folder_path}' was cancelled"))
}
