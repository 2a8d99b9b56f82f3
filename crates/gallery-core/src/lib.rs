pub mod catalog;
pub mod category;
pub mod config;
pub mod error;
pub mod filter;
pub mod gallery;
pub mod loader;
pub mod locator;
pub mod render;
pub mod share;
pub mod upload;
pub mod viewer;

pub use catalog::{default_seed, Catalog, FallbackTable, ImageDescriptor};
pub use category::{Category, CategoryFilter, ALL_SENTINEL};
pub use config::{default_config_path, expand_tilde, GalleryConfig};
pub use error::GalleryError;
pub use filter::FilteredView;
pub use gallery::{Gallery, GalleryEvent, Notice, NoticeKind, UploadReport};
pub use loader::{HttpImageLoader, ImageLoader, LoadError, LoadFuture, REQUEST_TIMEOUT};
pub use locator::{display_url, PresentationParams};
pub use render::{render_view, RenderPlan, Tile, TileFailure, TileSource, TileState, TileTask};
pub use share::{share_url, SharePlatform};
pub use upload::{
    label_from_filename, validate, InMemoryFile, ReadFuture, UploadAffordance, UploadRejection,
    UploadSession, UploadSource, MAX_UPLOAD_BYTES,
};
pub use viewer::{Direction, Key, Viewer, ViewerDisplay, ViewerInput};
