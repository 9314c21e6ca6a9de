pub mod cache;
pub mod loader;
pub mod source;
pub mod transport;

// Re-exports for convenience
pub use loader::TileLoader;
pub use source::{TileSource, UrlTemplate};
