//! The managed instance group resource
//!
//! - [`id`] - `project/zone/name` identifiers
//! - [`spec`] - typed configuration and validation
//! - [`state`] - what is persisted between calls
//! - [`transcode`] - configuration <-> API model conversions
//! - [`plan`] - minimal update calls
//! - [`resource`] - the lifecycle operations

pub mod id;
pub mod plan;
pub mod resource;
pub mod spec;
pub mod state;
pub mod transcode;

pub use id::InstanceGroupManagerId;
pub use plan::UpdatePlan;
pub use resource::{InstanceGroupManagerResource, ProviderDefaults, RetryPolicy, Timeouts};
pub use spec::InstanceGroupManagerSpec;
pub use state::InstanceGroupManagerState;
