use thiserror::Error;

/// Error taxonomy shared by every catalog-core subsystem.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("scan cancelled: {0}")]
    ScanCancelled(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("storage full: {0}")]
    StorageFull(String),

    #[error("thumbnail pipeline error: {0}")]
    ThumbnailError(String),

    #[error("unknown error: {0}")]
    Unknown(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CatalogError {
    pub fn unknown(
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unknown(err.into())
    }

    /// Whether this error should be swallowed at the orchestrator boundary
    /// rather than propagated to the caller (see propagation policy).
    pub fn is_soft_cancellation(&self) -> bool {
        matches!(self, Self::ScanCancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
