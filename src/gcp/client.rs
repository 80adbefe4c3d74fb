//! GCP Client
//!
//! REST implementation of [`ComputeApi`], combining authentication and HTTP
//! functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::compute::model::{
    InstanceGroup, InstanceGroupManager, InstanceGroupsSetNamedPortsRequest, Operation, Region,
};
use crate::compute::{ApiResult, ComputeApi};
use crate::error::ApiError;
use async_trait::async_trait;
use url::Url;

/// Compute Engine API root used unless configured otherwise
pub const DEFAULT_ENDPOINT: &str = "https://compute.googleapis.com/compute/beta/";

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    endpoint: Url,
}

impl GcpClient {
    /// Create a new GCP client against the default endpoint
    pub fn new(credentials: GcpCredentials) -> ApiResult<Self> {
        Self::with_endpoint(credentials, DEFAULT_ENDPOINT)
    }

    /// Create a client against another Compute API root, e.g. a test server
    pub fn with_endpoint(credentials: GcpCredentials, endpoint: &str) -> ApiResult<Self> {
        let mut endpoint = Url::parse(endpoint)
            .map_err(|e| ApiError::request(format!("invalid endpoint {:?}: {}", endpoint, e)))?;
        // Url::join replaces the last segment unless the base ends in '/'
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the current access token
    async fn get_token(&self) -> ApiResult<String> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| ApiError::auth(format!("{:#}", e)))
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build a Compute Engine API URL from unencoded path segments
    fn compute_url(&self, project: &str, segments: &[&str]) -> ApiResult<Url> {
        let mut path = format!("projects/{}", urlencoding::encode(project));
        for segment in segments {
            path.push('/');
            path.push_str(&urlencoding::encode(segment));
        }
        self.endpoint
            .join(&path)
            .map_err(|e| ApiError::request(format!("invalid URL path {:?}: {}", path, e)))
    }

    /// Build zonal Compute Engine API URL
    fn compute_zonal_url(&self, project: &str, zone: &str, resource: &[&str]) -> ApiResult<Url> {
        let mut segments = vec!["zones", zone];
        segments.extend_from_slice(resource);
        self.compute_url(project, &segments)
    }

    /// Build regional Compute Engine API URL
    fn compute_regional_url(&self, project: &str, region: &str, resource: &[&str]) -> ApiResult<Url> {
        let mut segments = vec!["regions", region];
        segments.extend_from_slice(resource);
        self.compute_url(project, &segments)
    }
}

#[async_trait]
impl ComputeApi for GcpClient {
    async fn insert_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        manager: &InstanceGroupManager,
        request_id: &str,
    ) -> ApiResult<Operation> {
        let mut url = self.compute_zonal_url(project, zone, &["instanceGroupManagers"])?;
        url.query_pairs_mut().append_pair("requestId", request_id);
        let token = self.get_token().await?;
        self.http.post(&url, &token, Some(manager)).await
    }

    async fn get_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> ApiResult<InstanceGroupManager> {
        let url = self.compute_zonal_url(project, zone, &["instanceGroupManagers", name])?;
        let token = self.get_token().await?;
        self.http.get(&url, &token).await
    }

    async fn patch_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        patch: &InstanceGroupManager,
    ) -> ApiResult<Operation> {
        let url = self.compute_zonal_url(project, zone, &["instanceGroupManagers", name])?;
        let token = self.get_token().await?;
        self.http.patch(&url, &token, patch).await
    }

    async fn resize_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        size: i64,
    ) -> ApiResult<Operation> {
        let mut url =
            self.compute_zonal_url(project, zone, &["instanceGroupManagers", name, "resize"])?;
        url.query_pairs_mut().append_pair("size", &size.to_string());
        let token = self.get_token().await?;
        self.http.post::<_, ()>(&url, &token, None).await
    }

    async fn delete_instance_group_manager(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        request_id: &str,
    ) -> ApiResult<Operation> {
        let mut url = self.compute_zonal_url(project, zone, &["instanceGroupManagers", name])?;
        url.query_pairs_mut().append_pair("requestId", request_id);
        let token = self.get_token().await?;
        self.http.delete(&url, &token).await
    }

    async fn set_instance_group_named_ports(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        request: &InstanceGroupsSetNamedPortsRequest,
    ) -> ApiResult<Operation> {
        let url =
            self.compute_zonal_url(project, zone, &["instanceGroups", name, "setNamedPorts"])?;
        let token = self.get_token().await?;
        self.http.post(&url, &token, Some(request)).await
    }

    async fn get_instance_group(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> ApiResult<InstanceGroup> {
        let url = self.compute_zonal_url(project, zone, &["instanceGroups", name])?;
        let token = self.get_token().await?;
        self.http.get(&url, &token).await
    }

    async fn get_region(&self, project: &str, region: &str) -> ApiResult<Region> {
        let url = self.compute_regional_url(project, region, &[])?;
        let token = self.get_token().await?;
        self.http.get(&url, &token).await
    }

    async fn get_zone_operation(
        &self,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> ApiResult<Operation> {
        let url = self.compute_zonal_url(project, zone, &["operations", operation])?;
        let token = self.get_token().await?;
        self.http.get(&url, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> GcpClient {
        GcpClient::with_endpoint(GcpCredentials::from_static_token("t"), endpoint).unwrap()
    }

    #[test]
    fn test_zonal_url() {
        let url = client(DEFAULT_ENDPOINT)
            .compute_zonal_url("my-project", "us-central1-a", &["instanceGroupManagers", "web"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://compute.googleapis.com/compute/beta/projects/my-project/zones/us-central1-a/instanceGroupManagers/web"
        );
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let url = client("http://127.0.0.1:8080/compute/v1")
            .compute_regional_url("p", "us-central1", &[])
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/compute/v1/projects/p/regions/us-central1");
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let url = client(DEFAULT_ENDPOINT)
            .compute_zonal_url("example.com:proj", "z", &["instanceGroups", "a/b"])
            .unwrap();
        assert!(url.path().ends_with("/projects/example.com%3Aproj/zones/z/instanceGroups/a%2Fb"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = GcpClient::with_endpoint(GcpCredentials::from_static_token("t"), "not a url")
            .err()
            .unwrap();
        assert!(!err.is_retryable());
    }
}
