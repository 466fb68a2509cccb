//! Scheduling and caching core for a photo catalog.
//!
//! Given a stream of photos discovered by a folder scan, this crate
//! produces two derived artifacts per photo — a thumbnail and a preview —
//! and delivers them to a viewer UI in an order that tracks what the user
//! is currently looking at. See [`artifact`] and [`queue`] for the
//! scheduler itself, [`cache`] for the two-tier artifact store, and
//! [`orchestrator`] for the component that wires everything to a folder
//! scan and a metadata database.
#![allow(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod config;
#[cfg(feature = "demo")]
pub mod demo;
pub mod events;
pub mod orchestrator;
pub mod photo_processor;
pub mod processor;
pub mod queue;

pub use catalog_model::{CatalogError, Result};
pub use config::ArtifactServiceConfig;
pub use events::CatalogEvents;
pub use orchestrator::CatalogOrchestrator;
