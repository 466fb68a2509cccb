//! Trait surfaces describing the external collaborators of the catalog
//! scheduler: the folder scanner, the decode service, the metadata
//! database, and the directory-handle store. These are contracts only —
//! no implementation lives here. `catalog-core::demo` provides in-memory
//! implementations used by its own test suite.

pub mod database;
pub mod decoder;
pub mod handle_store;
pub mod scanner;

pub mod prelude {
    pub use crate::database::CatalogDatabase;
    pub use crate::decoder::{DecodeService, DecodedImage, ResizeFilter};
    pub use crate::handle_store::HandleStore;
    pub use crate::scanner::{ByteProvider, FolderScanner, ScannedFile};
}
