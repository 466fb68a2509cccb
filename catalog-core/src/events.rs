//! Typed event sinks dispatched by the orchestrator.
//!
//! The originating design exposed mutable callback *properties* on each
//! service (`onAssetsAdded = fn`, ...). Per the redesign note in
//! [`crate::orchestrator`]'s module docs, those become a fixed set of
//! optional, typed sinks registered once at construction and dispatched
//! synchronously. Every dispatch tolerates an absent sink.

use catalog_model::{ArtifactUrl, AssetId, CatalogError, Photo};

type Sink<A> = Option<Box<dyn Fn(A) + Send + Sync>>;

/// Event sinks the catalog orchestrator dispatches to as it works.
#[derive(Default)]
pub struct CatalogEvents {
    on_assets_added: Sink<Vec<Photo>>,
    on_asset_updated: Sink<Photo>,
    on_thumbnail_ready: Sink<(AssetId, ArtifactUrl)>,
    on_preview_ready: Sink<(AssetId, ArtifactUrl)>,
    on_photo_ready: Sink<AssetId>,
    on_photo_error: Sink<(AssetId, CatalogError)>,
}

impl std::fmt::Debug for CatalogEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEvents")
            .field("on_assets_added", &self.on_assets_added.is_some())
            .field("on_asset_updated", &self.on_asset_updated.is_some())
            .field("on_thumbnail_ready", &self.on_thumbnail_ready.is_some())
            .field("on_preview_ready", &self.on_preview_ready.is_some())
            .field("on_photo_ready", &self.on_photo_ready.is_some())
            .field("on_photo_error", &self.on_photo_error.is_some())
            .finish()
    }
}

impl CatalogEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_assets_added(mut self, sink: impl Fn(Vec<Photo>) + Send + Sync + 'static) -> Self {
        self.on_assets_added = Some(Box::new(sink));
        self
    }

    pub fn on_asset_updated(mut self, sink: impl Fn(Photo) + Send + Sync + 'static) -> Self {
        self.on_asset_updated = Some(Box::new(sink));
        self
    }

    pub fn on_thumbnail_ready(
        mut self,
        sink: impl Fn((AssetId, ArtifactUrl)) + Send + Sync + 'static,
    ) -> Self {
        self.on_thumbnail_ready = Some(Box::new(sink));
        self
    }

    pub fn on_preview_ready(
        mut self,
        sink: impl Fn((AssetId, ArtifactUrl)) + Send + Sync + 'static,
    ) -> Self {
        self.on_preview_ready = Some(Box::new(sink));
        self
    }

    pub fn on_photo_ready(mut self, sink: impl Fn(AssetId) + Send + Sync + 'static) -> Self {
        self.on_photo_ready = Some(Box::new(sink));
        self
    }

    pub fn on_photo_error(
        mut self,
        sink: impl Fn((AssetId, CatalogError)) + Send + Sync + 'static,
    ) -> Self {
        self.on_photo_error = Some(Box::new(sink));
        self
    }

    pub(crate) fn fire_assets_added(&self, photos: Vec<Photo>) {
        if let Some(sink) = &self.on_assets_added {
            sink(photos);
        }
    }

    pub(crate) fn fire_asset_updated(&self, photo: Photo) {
        if let Some(sink) = &self.on_asset_updated {
            sink(photo);
        }
    }

    pub(crate) fn fire_thumbnail_ready(&self, id: AssetId, url: ArtifactUrl) {
        if let Some(sink) = &self.on_thumbnail_ready {
            sink((id, url));
        }
    }

    pub(crate) fn fire_preview_ready(&self, id: AssetId, url: ArtifactUrl) {
        if let Some(sink) = &self.on_preview_ready {
            sink((id, url));
        }
    }

    pub(crate) fn fire_photo_ready(&self, id: AssetId) {
        if let Some(sink) = &self.on_photo_ready {
            sink(id);
        }
    }

    pub(crate) fn fire_photo_error(&self, id: AssetId, err: CatalogError) {
        if let Some(sink) = &self.on_photo_error {
            sink((id, err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn absent_sinks_are_silently_skipped() {
        let events = CatalogEvents::new();
        events.fire_photo_ready(AssetId::new());
        events.fire_assets_added(vec![]);
    }

    #[test]
    fn registered_sink_is_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let events = CatalogEvents::new().on_photo_ready(move |_id| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        events.fire_photo_ready(AssetId::new());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
