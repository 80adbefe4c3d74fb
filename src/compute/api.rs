//! The subset of the Compute Engine API the resource depends on.
//!
//! The lifecycle code only talks to this trait; [`crate::gcp::client::GcpClient`]
//! implements it over REST and tests substitute scripted fakes.

use super::model::{
    InstanceGroup, InstanceGroupManager, InstanceGroupsSetNamedPortsRequest, Operation, Region,
};
use crate::error::ApiError;
use async_trait::async_trait;

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// `instanceGroupManagers.insert`
    async fn insert_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        manager: &InstanceGroupManager,
        request_id: &str,
    ) -> ApiResult<Operation>;

    /// `instanceGroupManagers.get`
    async fn get_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> ApiResult<InstanceGroupManager>;

    /// `instanceGroupManagers.patch`
    async fn patch_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        patch: &InstanceGroupManager,
    ) -> ApiResult<Operation>;

    /// `instanceGroupManagers.resize`
    async fn resize_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        size: i64,
    ) -> ApiResult<Operation>;

    /// `instanceGroupManagers.delete`
    async fn delete_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        request_id: &str,
    ) -> ApiResult<Operation>;

    /// `instanceGroups.setNamedPorts`
    async fn set_instance_group_named_ports(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        request: &InstanceGroupsSetNamedPortsRequest,
    ) -> ApiResult<Operation>;

    /// `instanceGroups.get`
    async fn get_instance_group(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> ApiResult<InstanceGroup>;

    /// `regions.get`
    async fn get_region(&self, project: &str, region: &str) -> ApiResult<Region>;

    /// `zoneOperations.get`
    async fn get_zone_operation(
        &self,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> ApiResult<Operation>;
}
