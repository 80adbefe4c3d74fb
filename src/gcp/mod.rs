//! GCP API interaction module
//!
//! Authentication, the HTTP wrapper and the REST implementation of
//! [`crate::compute::ComputeApi`].
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - Compute Engine client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use gce_igm::gcp::{auth::GcpCredentials, client::GcpClient};
//! use gce_igm::compute::ComputeApi;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new(GcpCredentials::new().await?)?;
//!     let igm = client
//!         .get_instance_group_manager("my-project", "us-central1-a", "web")
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
