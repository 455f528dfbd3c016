//! Beat Player Catalog
//!
//! In-memory cache of the remote song catalog.
//!
//! # Features
//!
//! - **Refresh**: full-replace fetch from a [`CatalogSource`]; a failed fetch
//!   keeps the previous catalog
//! - **Observation**: live catalog and status channels for the UI and the
//!   playback coordinator
//! - **Search**: title/artist filtering over the current snapshot
//! - **New-user flag**: forwards the per-user profile flag from the source
//!
//! # Example
//!
//! ```ignore
//! use beat_catalog::{CatalogCache, JsonFileSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(JsonFileSource::new("catalog.json"));
//!     let cache = CatalogCache::new(source);
//!
//!     cache.refresh().await?;
//!     println!("{} songs", cache.len());
//!
//!     Ok(())
//! }
//! ```

mod cache;
mod error;
mod source;

pub use cache::{CatalogCache, CatalogStatus, NO_SONGS_MESSAGE};
pub use error::{FetchError, Result};
pub use source::{CatalogDocument, CatalogSource, JsonFileSource, UserDocument};
