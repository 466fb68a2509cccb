use std::fmt;

use catalog_model::{ArtifactKind, AssetId};

/// Stable key for locating an artifact blob in either cache tier.
///
/// Scoped by [`ArtifactKind`] so a thumbnail and a preview for the same
/// asset never collide, and versioned so a future encode-format change
/// can be rolled out without colliding with stale persistent entries.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCacheKey(String);

impl ArtifactCacheKey {
    pub fn new(kind: ArtifactKind, id: AssetId) -> Self {
        let kind = match kind {
            ArtifactKind::Thumbnail => "thumbnail",
            ArtifactKind::Preview => "preview",
        };
        Self(format!("artifacts/v1/{kind}/{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ArtifactCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArtifactCacheKey").field(&self.0).finish()
    }
}

impl fmt::Display for ArtifactCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_scoped_by_kind() {
        let id = AssetId::new();
        let thumb = ArtifactCacheKey::new(ArtifactKind::Thumbnail, id);
        let preview = ArtifactCacheKey::new(ArtifactKind::Preview, id);
        assert_ne!(thumb.as_str(), preview.as_str());
    }
}
