use chrono::{DateTime, Utc};

use crate::ids::FolderId;

/// Opaque key referencing a persisted filesystem directory handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandleKey(pub Vec<u8>);

impl HandleKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }
}

/// A user-selected folder being scanned for photos. Unique on `path`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Folder {
    pub id: FolderId,
    pub path: String,
    pub display_name: String,
    pub handle_key: HandleKey,
    pub last_scan_date: Option<DateTime<Utc>>,
}

impl Folder {
    pub fn new(path: impl Into<String>, display_name: impl Into<String>, handle_key: HandleKey) -> Self {
        Self {
            id: FolderId::new(),
            path: path.into(),
            display_name: display_name.into(),
            handle_key,
            last_scan_date: None,
        }
    }
}
