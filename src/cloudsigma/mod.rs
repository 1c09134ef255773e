//! CloudSigma API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - Per-region client exposing list/create/update/delete per collection
//! - [`http`] - Basic-auth HTTP utilities for the REST API
//!
//! # Example
//!
//! ```ignore
//! use crate::cloudsigma::client::CloudSigmaClient;
//! use crate::config::ClientConfig;
//! use crate::resource::ResourceType;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = CloudSigmaClient::new(ClientConfig::new("zrh", "me@example.com", "secret"))?;
//!     let servers = client.list_detail(ResourceType::Server).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
