use chrono::{DateTime, Utc};

use crate::ids::{AssetId, FolderId};

/// User-assigned rating flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Flag {
    #[default]
    None,
    Pick,
    Reject,
}

/// Which derived artifact a job or cache entry concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtifactKind {
    Thumbnail,
    Preview,
}

/// Opaque handle referencing a cached artifact blob.
///
/// Owned by the cache; valid until the next state change for its asset id.
/// Stands in for a browser object-URL in this non-browser implementation,
/// per the "URL ownership" design note: a content-addressed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArtifactUrl(pub String);

impl std::fmt::Display for ArtifactUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ArtifactUrl {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle state of one derived artifact belonging to a photo.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtifactState {
    #[default]
    Pending,
    Loading,
    Ready {
        url: ArtifactUrl,
    },
    Error {
        message: String,
    },
}

impl ArtifactState {
    pub fn url(&self) -> Option<&ArtifactUrl> {
        match self {
            ArtifactState::Ready { url } => Some(url),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ArtifactState::Pending)
    }
}

/// A single cataloged photo.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Photo {
    pub id: AssetId,
    pub folder_id: FolderId,
    pub relative_path: String,
    pub filename: String,
    /// Lower-case, dotless (e.g. "jpg", "arw").
    pub extension: String,
    pub flag: Flag,
    pub capture_date: Option<DateTime<Utc>>,
    pub modified_date: DateTime<Utc>,
    pub file_size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub thumbnail: ArtifactState,
    pub preview: ArtifactState,
}

impl Photo {
    pub fn new(
        folder_id: FolderId,
        relative_path: impl Into<String>,
        filename: impl Into<String>,
        extension: impl Into<String>,
        file_size: u64,
        modified_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AssetId::new(),
            folder_id,
            relative_path: relative_path.into(),
            filename: filename.into(),
            extension: extension.into(),
            flag: Flag::None,
            capture_date: None,
            modified_date,
            file_size,
            width: None,
            height: None,
            thumbnail: ArtifactState::Pending,
            preview: ArtifactState::Pending,
        }
    }

    pub fn artifact(&self, kind: ArtifactKind) -> &ArtifactState {
        match kind {
            ArtifactKind::Thumbnail => &self.thumbnail,
            ArtifactKind::Preview => &self.preview,
        }
    }

    pub fn artifact_mut(&mut self, kind: ArtifactKind) -> &mut ArtifactState {
        match kind {
            ArtifactKind::Thumbnail => &mut self.thumbnail,
            ArtifactKind::Preview => &mut self.preview,
        }
    }
}

/// Supported source file extensions, lower-case and dotless.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["arw", "jpg", "jpeg"];

pub fn is_supported_extension(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
}
