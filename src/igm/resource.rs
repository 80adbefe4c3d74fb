//! Instance group manager lifecycle: create, read, update, delete, import

use super::id::InstanceGroupManagerId;
use super::plan::UpdatePlan;
use super::spec::InstanceGroupManagerSpec;
use super::state::InstanceGroupManagerState;
use super::transcode;
use crate::compute::model::{InstanceGroupManager, Operation};
use crate::compute::{self_link, ComputeApi, OperationWaiter};
use crate::error::{ApiError, Error, Result};
use backoff::backoff::Constant;
use backoff::future::retry_notify;
use backoff::Error as BackoffError;
use futures::future::join_all;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Default timeout for each lifecycle call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Project, zone and region applied when a resource does not name its own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderDefaults {
    pub project: Option<String>,
    pub zone: Option<String>,
    pub region: Option<String>,
}

impl ProviderDefaults {
    /// The configured region, else the region of the configured zone
    pub fn effective_region(&self) -> Option<String> {
        self.region
            .clone()
            .or_else(|| self.zone.as_deref().map(self_link::region_from_zone))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

/// Bounded retry with a fixed delay, applied to retryable failures only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 20,
            delay: Duration::from_secs(2),
        }
    }
}

pub struct InstanceGroupManagerResource {
    api: Arc<dyn ComputeApi>,
    defaults: ProviderDefaults,
    timeouts: Timeouts,
    delete_retry: RetryPolicy,
    waiter: OperationWaiter,
    instances_poll_interval: Duration,
}

impl InstanceGroupManagerResource {
    pub fn new(api: Arc<dyn ComputeApi>, defaults: ProviderDefaults) -> Self {
        Self {
            api,
            defaults,
            timeouts: Timeouts::default(),
            delete_retry: RetryPolicy::default(),
            waiter: OperationWaiter::default(),
            instances_poll_interval: Duration::from_secs(10),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_delete_retry(mut self, retry: RetryPolicy) -> Self {
        self.delete_retry = retry;
        self
    }

    /// Poll interval for both operations and `wait_for_instances`
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.waiter = OperationWaiter::new(interval);
        self.instances_poll_interval = interval;
        self
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Insert a new instance group manager and return its reconciled state.
    ///
    /// Once the insert request is accepted, any later failure is reported as
    /// [`Error::Created`] so the caller can still record the identifier.
    pub async fn create(&self, spec: &InstanceGroupManagerSpec) -> Result<InstanceGroupManagerState> {
        spec.validate()?;
        let project = self.project_for("", spec)?;
        let zone = self.zone_for("", spec).ok_or(Error::MissingContext("zone"))?;

        let manager = transcode::expand_manager(spec);
        tracing::debug!("InstanceGroupManager insert request: {:?}", manager);

        let request_id = Uuid::new_v4().to_string();
        let op = self
            .api
            .insert_instance_group_manager(&project, &zone, &manager, &request_id)
            .await
            .map_err(|e| Error::api("Error creating InstanceGroupManager", e))?;

        let id = InstanceGroupManagerId::new(&project, &zone, &spec.name).encode();
        tracing::info!("Instance group manager {} insert accepted ({})", id, op.name);

        let seeded = InstanceGroupManagerState {
            id: id.clone(),
            spec: InstanceGroupManagerSpec {
                project: Some(project.clone()),
                zone: Some(zone),
                ..spec.clone()
            },
            ..InstanceGroupManagerState::default()
        };

        let created = async {
            self.wait(&project, op, "Creating InstanceGroupManager", self.timeouts.create)
                .await?;
            self.read(&seeded)
                .await?
                .ok_or_else(|| Error::GoneAfterWrite(id.clone()))
        };

        created.await.map_err(|source| Error::Created {
            id: id.clone(),
            source: Box::new(source),
        })
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Fetch remote state. `Ok(None)` means the resource no longer exists
    /// and should be dropped from state.
    pub async fn read(&self, state: &InstanceGroupManagerState) -> Result<Option<InstanceGroupManagerState>> {
        let Some((project, mut manager)) = self.get_manager(state).await? else {
            tracing::warn!("Instance Group Manager {:?} not found, removing from state.", state.id);
            return Ok(None);
        };

        if state.spec.wait_for_instances {
            manager = self.wait_for_instances(state, manager).await?;
        }

        Ok(Some(transcode::flatten_manager(
            &manager,
            &project,
            state.spec.wait_for_instances,
        )))
    }

    /// Look the manager up by its stored ID, searching the provider region
    /// when no zone is known.
    async fn get_manager(
        &self,
        state: &InstanceGroupManagerState,
    ) -> Result<Option<(String, InstanceGroupManager)>> {
        let mut id = state.parsed_id()?;
        id.project = self.project_for(&id.project, &state.spec)?;
        if let Some(zone) = self.zone_for(&id.zone, &state.spec) {
            id.zone = zone;
        }

        if id.zone.is_empty() {
            let region = self
                .defaults
                .effective_region()
                .ok_or(Error::MissingContext("region"))?;
            let found = self.find_in_region(&id, &region).await?;
            return Ok(found.map(|m| (id.project, m)));
        }

        match self
            .api
            .get_instance_group_manager(&id.project, &id.zone, &id.name)
            .await
        {
            Ok(manager) => Ok(Some((id.project, manager))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(Error::api(
                format!("Error reading Instance Group Manager {:?}", id.name),
                e,
            )),
        }
    }

    /// Probe every zone of `region`; the first zone (in the region's order)
    /// holding the manager wins.
    async fn find_in_region(
        &self,
        id: &InstanceGroupManagerId,
        region: &str,
    ) -> Result<Option<InstanceGroupManager>> {
        let region_info = self
            .api
            .get_region(&id.project, region)
            .await
            .map_err(|e| Error::api(format!("Error reading region {}", region), e))?;

        tracing::debug!(
            "Searching {} zones of {} for instance group manager {}",
            region_info.zones.len(),
            region,
            id.name
        );

        let lookups = region_info.zones.iter().map(|zone| {
            let zone = self_link::resource_name(zone);
            self.api.get_instance_group_manager(&id.project, zone, &id.name)
        });

        for result in join_all(lookups).await {
            match result {
                Ok(manager) => return Ok(Some(manager)),
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    return Err(Error::api(
                        format!("Error reading Instance Group Manager {:?}", id.name),
                        e,
                    ))
                },
            }
        }
        Ok(None)
    }

    /// Poll until every instance of the group has been created
    /// (`currentActions.none >= targetSize`) or the create timeout elapses.
    async fn wait_for_instances(
        &self,
        state: &InstanceGroupManagerState,
        mut manager: InstanceGroupManager,
    ) -> Result<InstanceGroupManager> {
        let started = Instant::now();
        let name = state.spec.name.clone();

        loop {
            let ready = manager.current_actions.as_ref().map(|a| a.none).unwrap_or(0);
            let target = manager.target_size.unwrap_or(0);
            if ready >= target {
                return Ok(manager);
            }

            tracing::debug!("{}: {} of {} instances created", name, ready, target);
            let elapsed = started.elapsed();
            if elapsed >= self.timeouts.create {
                return Err(Error::WaitForInstances {
                    name,
                    message: format!(
                        "timeout after {:?} with {} of {} instances created",
                        elapsed, ready, target
                    ),
                });
            }

            tokio::time::sleep(self.instances_poll_interval).await;
            manager = match self.get_manager(state).await? {
                Some((_, manager)) => manager,
                None => {
                    return Err(Error::WaitForInstances {
                        name,
                        message: "instance group manager disappeared".to_string(),
                    })
                },
            };
        }
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Apply the difference between `prior` and `desired`, one sub-operation
    /// at a time, then read the result back.
    pub async fn update(
        &self,
        prior: &InstanceGroupManagerState,
        desired: &InstanceGroupManagerSpec,
    ) -> Result<InstanceGroupManagerState> {
        desired.validate()?;
        if let Some(field) = prior.spec.replacement_changes(desired).first().copied() {
            return Err(Error::RequiresReplacement {
                name: prior.spec.name.clone(),
                field,
            });
        }

        let id = self.qualified_id(prior)?;
        let plan = UpdatePlan::new(prior, desired);
        if plan.is_empty() {
            tracing::info!("Instance group manager {} is up to date", id);
        }

        if let Some(patch) = &plan.patch {
            tracing::debug!("InstanceGroupManager patch request: {:?}", patch);
            let op = self
                .api
                .patch_instance_group_manager(&id.project, &id.zone, &id.name, patch)
                .await
                .map_err(|e| Error::api("Error updating managed group instances", e))?;
            self.wait(&id.project, op, "Updating managed group instances", self.timeouts.update)
                .await?;
        }

        if let Some(request) = &plan.named_ports {
            let op = self
                .api
                .set_instance_group_named_ports(&id.project, &id.zone, &id.name, request)
                .await
                .map_err(|e| Error::api("Error updating InstanceGroupManager named ports", e))?;
            self.wait(&id.project, op, "Updating InstanceGroupManager", self.timeouts.update)
                .await?;
        }

        if let Some(size) = plan.resize {
            let op = self
                .api
                .resize_instance_group_manager(&id.project, &id.zone, &id.name, size)
                .await
                .map_err(|e| Error::api("Error resizing InstanceGroupManager", e))?;
            self.wait(&id.project, op, "Updating InstanceGroupManager", self.timeouts.update)
                .await?;
        }

        let mut next = prior.clone();
        next.spec.wait_for_instances = desired.wait_for_instances;
        self.read(&next)
            .await?
            .ok_or_else(|| Error::GoneAfterWrite(id.encode()))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete the manager and wait for its instances to drain.
    ///
    /// A wait that times out is tolerated as long as the instance group
    /// keeps shrinking between polls.
    pub async fn delete(&self, state: &InstanceGroupManagerState) -> Result<()> {
        let id = self.qualified_id(state)?;
        let request_id = Uuid::new_v4().to_string();

        let max_retries = self.delete_retry.max_retries;
        let attempts = AtomicU32::new(0);
        let delete_request = || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let (api, id, request_id) = (&self.api, &id, &request_id);
            async move {
                match api
                    .delete_instance_group_manager(&id.project, &id.zone, &id.name, request_id)
                    .await
                {
                    Ok(op) => Ok(Some(op)),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) if e.is_retryable() && attempt <= max_retries => {
                        Err(BackoffError::transient(e))
                    },
                    Err(e) => Err(BackoffError::permanent(e)),
                }
            }
        };
        let log_failure = |e: ApiError, _: Duration| {
            tracing::warn!(
                "Deleting instance group manager {} failed (attempt {}/{}): {}",
                id,
                attempts.load(Ordering::Relaxed),
                max_retries,
                e
            );
        };

        let op = retry_notify(Constant::new(self.delete_retry.delay), delete_request, log_failure)
            .await
            .map_err(|e| Error::api("Error deleting instance group manager", e))?;
        let Some(op) = op else {
            tracing::warn!("Instance group manager {} is already gone", id);
            return Ok(());
        };

        let mut current_size = state.spec.target_size.unwrap_or(0);
        let mut result = self
            .wait(&id.project, op.clone(), "Deleting InstanceGroupManager", self.timeouts.delete)
            .await;

        while let Err(err) = result {
            if !err.is_timeout() {
                return Err(err);
            }
            if current_size <= 0 {
                tracing::info!("Instance group {} has drained, not waiting for the delete any longer", id);
                break;
            }

            let group = match self.api.get_instance_group(&id.project, &id.zone, &id.name).await {
                Ok(group) => group,
                Err(e) if e.is_not_found() => {
                    tracing::info!("Instance group {} is gone, not waiting for the delete any longer", id);
                    break;
                },
                Err(e) => return Err(Error::api("Error getting instance group size", e)),
            };

            if group.size >= current_size {
                return Err(Error::NotShrinking {
                    name: id.name.clone(),
                    current: group.size,
                    previous: current_size,
                });
            }

            tracing::info!(
                "timeout occurred, but instance group is shrinking ({} < {})",
                group.size,
                current_size
            );
            current_size = group.size;
            result = self
                .wait(&id.project, op.clone(), "Deleting InstanceGroupManager", self.timeouts.delete)
                .await;
        }

        tracing::info!("Deleted instance group manager {}", id);
        Ok(())
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Seed a state from a fully qualified `project/zone/name` so that a
    /// following [`read`](Self::read) fills in everything else.
    pub fn import(&self, id: &str) -> Result<InstanceGroupManagerState> {
        let parsed = InstanceGroupManagerId::decode(id)?;
        if !parsed.is_fully_qualified() {
            return Err(Error::InvalidImportId(id.to_string()));
        }

        Ok(InstanceGroupManagerState {
            id: parsed.encode(),
            spec: InstanceGroupManagerSpec {
                name: parsed.name,
                project: Some(parsed.project),
                zone: Some(parsed.zone),
                wait_for_instances: false,
                ..InstanceGroupManagerSpec::default()
            },
            ..InstanceGroupManagerState::default()
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn wait(&self, project: &str, op: Operation, activity: &str, timeout: Duration) -> Result<Operation> {
        self.waiter.wait(self.api.as_ref(), project, op, activity, timeout).await
    }

    /// `from_id`, else the resource's project, else the provider's
    fn project_for(&self, from_id: &str, spec: &InstanceGroupManagerSpec) -> Result<String> {
        non_empty(from_id)
            .or_else(|| spec.project.clone().filter(|p| !p.is_empty()))
            .or_else(|| self.defaults.project.clone())
            .ok_or(Error::MissingContext("project"))
    }

    fn zone_for(&self, from_id: &str, spec: &InstanceGroupManagerSpec) -> Option<String> {
        non_empty(from_id)
            .or_else(|| spec.zone.clone().filter(|z| !z.is_empty()))
            .or_else(|| self.defaults.zone.clone())
    }

    fn qualified_id(&self, state: &InstanceGroupManagerState) -> Result<InstanceGroupManagerId> {
        let mut id = state.parsed_id()?;
        id.project = self.project_for(&id.project, &state.spec)?;
        id.zone = self
            .zone_for(&id.zone, &state.spec)
            .ok_or(Error::MissingContext("zone"))?;
        Ok(id)
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_region() {
        let defaults = ProviderDefaults {
            zone: Some("us-east1-b".into()),
            ..ProviderDefaults::default()
        };
        assert_eq!(defaults.effective_region().as_deref(), Some("us-east1"));

        let defaults = ProviderDefaults {
            zone: Some("us-east1-b".into()),
            region: Some("europe-west1".into()),
            ..ProviderDefaults::default()
        };
        assert_eq!(defaults.effective_region().as_deref(), Some("europe-west1"));
        assert_eq!(ProviderDefaults::default().effective_region(), None);
    }

    #[test]
    fn test_retry_policy_defaults() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.max_retries, 20);
        assert_eq!(retry.delay, Duration::from_secs(2));
    }
}
