//! Resource abstraction layer
//!
//! Everything between the raw API records and what the user sees.
//!
//! # Architecture
//!
//! - [`registry`] - The closed set of resource types and list formats
//! - [`record`] - Typed accessors over loosely-shaped JSON records
//! - [`size`] - Human-readable memory and disk sizes
//! - [`catalog`] - Command-scoped listing cache, lookups and name resolution
//! - [`formatter`] - Brief and text projections of single records
//! - [`fetcher`] - Per-type and aggregate listings in a requested format
//!
//! # Example
//!
//! ```ignore
//! use crate::resource::{list_kind, Catalog, ListFormat, ResourceType};
//!
//! async fn list_drives(client: &CloudSigmaClient) -> anyhow::Result<serde_json::Value> {
//!     let mut catalog = Catalog::new(client);
//!     list_kind(&mut catalog, ResourceType::Drive, ListFormat::Text).await
//! }
//! ```

pub mod catalog;
mod fetcher;
pub mod formatter;
pub mod record;
mod registry;
pub mod size;

pub use catalog::Catalog;
pub use fetcher::{list_all, list_kind, list_resources};
pub use registry::*;
