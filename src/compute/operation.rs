//! Long-running operation polling
//!
//! Every mutating Compute call returns a zonal [`Operation`]. The waiter
//! re-fetches it until it reports `DONE`, then turns an embedded error into
//! [`Error::Operation`]. Giving up because the deadline passed yields the
//! distinct [`Error::OperationTimeout`] so callers can tell the two apart.

use super::api::ComputeApi;
use super::model::Operation;
use super::self_link;
use crate::error::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Default delay between two polls of the same operation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct OperationWaiter {
    poll_interval: Duration,
}

impl Default for OperationWaiter {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl OperationWaiter {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Block until `op` completes or `timeout` elapses.
    ///
    /// Transient failures while polling are logged and polling continues;
    /// any other polling failure aborts the wait.
    pub async fn wait(
        &self,
        api: &dyn ComputeApi,
        project: &str,
        op: Operation,
        activity: &str,
        timeout: Duration,
    ) -> Result<Operation> {
        let started = Instant::now();
        let name = op.name.clone();
        let zone = op
            .zone
            .as_deref()
            .map(|z| self_link::resource_name(z).to_string());
        let mut op = op;

        loop {
            if op.is_done() {
                return match op.error_message() {
                    Some(message) => Err(Error::Operation {
                        activity: activity.to_string(),
                        operation: name,
                        message,
                    }),
                    None => {
                        tracing::debug!("{}: operation {} done", activity, name);
                        Ok(op)
                    },
                };
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(Error::OperationTimeout {
                    activity: activity.to_string(),
                    operation: name,
                    elapsed,
                });
            }

            let Some(zone) = zone.as_deref() else {
                return Err(Error::Operation {
                    activity: activity.to_string(),
                    operation: name,
                    message: "operation is not zonal and cannot be polled".to_string(),
                });
            };

            tokio::time::sleep(self.poll_interval.min(timeout - elapsed)).await;

            match api.get_zone_operation(project, zone, &name).await {
                Ok(next) => {
                    tracing::trace!("{}: operation {} is {}", activity, name, next.status);
                    op = next;
                },
                Err(e) if e.is_retryable() => {
                    tracing::warn!("{}: transient error polling operation {}: {}", activity, name, e);
                },
                Err(e) => {
                    return Err(Error::api(
                        format!("{}: polling operation {}", activity, name),
                        e,
                    ));
                },
            }
        }
    }
}
