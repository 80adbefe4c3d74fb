//! Compute Engine API surface used by the instance group manager resource
//!
//! - [`model`] - request/response types
//! - [`api`] - the [`ComputeApi`] trait the lifecycle code calls through
//! - [`operation`] - waiting on long-running zonal operations
//! - [`self_link`] - resource URL normalization

pub mod api;
pub mod model;
pub mod operation;
pub mod self_link;

pub use api::{ApiResult, ComputeApi};
pub use operation::OperationWaiter;
