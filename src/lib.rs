//! gce-igm - Compute Engine managed instance group resource adapter
//!
//! Maps a declarative [`igm::InstanceGroupManagerSpec`] onto the Compute
//! Engine API and back, and drives the create, read, update, delete and
//! import lifecycle of a zonal instance group manager.
//!
//! ```ignore
//! use gce_igm::gcp::{auth::GcpCredentials, client::GcpClient};
//! use gce_igm::igm::{InstanceGroupManagerResource, ProviderDefaults};
//! use std::sync::Arc;
//!
//! async fn example(spec: gce_igm::igm::InstanceGroupManagerSpec) -> anyhow::Result<()> {
//!     let client = GcpClient::new(GcpCredentials::new().await?)?;
//!     let resource = InstanceGroupManagerResource::new(Arc::new(client), ProviderDefaults::default());
//!     let state = resource.create(&spec).await?;
//!     println!("created {}", state.id);
//!     Ok(())
//! }
//! ```

pub mod compute;
pub mod config;
pub mod error;
pub mod gcp;
pub mod igm;
pub mod state;

pub use error::{ApiError, Error, Result};
