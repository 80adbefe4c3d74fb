//! Update planning
//!
//! Works out which API calls an update needs. Fields the patch endpoint
//! accepts are collected into one partial request guarded by the stored
//! fingerprint; named ports and the target size have dedicated calls.

use super::spec::InstanceGroupManagerSpec;
use super::state::InstanceGroupManagerState;
use super::transcode;
use crate::compute::model;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Body for `instanceGroupManagers.patch`
    pub patch: Option<model::InstanceGroupManager>,
    /// Body for `instanceGroups.setNamedPorts`
    pub named_ports: Option<model::InstanceGroupsSetNamedPortsRequest>,
    /// Argument for `instanceGroupManagers.resize`
    pub resize: Option<i64>,
}

impl UpdatePlan {
    pub fn new(prior: &InstanceGroupManagerState, desired: &InstanceGroupManagerSpec) -> Self {
        let current = &prior.spec;
        let mut patch = model::InstanceGroupManager {
            fingerprint: (!prior.fingerprint.is_empty()).then(|| prior.fingerprint.clone()),
            ..model::InstanceGroupManager::default()
        };
        let mut changed = false;

        if current.target_pools_differ(desired) {
            patch.target_pools = Some(desired.target_pools.iter().cloned().collect());
            changed = true;
        }

        // Sent even when empty so that removing the policy clears it
        if current.auto_healing_differs(desired) {
            patch.auto_healing_policies = Some(transcode::expand_auto_healing_policies(
                desired.auto_healing_policies.as_ref(),
            ));
            changed = true;
        }

        if current.versions_differ(desired) {
            patch.versions = Some(transcode::expand_versions(&desired.versions));
            changed = true;
        }

        if current.update_policy_differs(desired) {
            patch.update_policy = desired
                .update_policy
                .as_ref()
                .map(transcode::expand_update_policy);
            changed = true;
        }

        let named_ports = current.named_ports_differ(desired).then(|| {
            model::InstanceGroupsSetNamedPortsRequest {
                named_ports: transcode::expand_named_ports(&desired.named_ports),
            }
        });

        Self {
            patch: changed.then_some(patch),
            named_ports,
            resize: current.target_size_change(desired),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patch.is_none() && self.named_ports.is_none() && self.resize.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::igm::spec::{AutoHealingPolicy, FixedOrPercent, NamedPort, Version};
    use serde_json::json;

    fn prior() -> InstanceGroupManagerState {
        InstanceGroupManagerState {
            id: "p/us-central1-a/web".into(),
            spec: InstanceGroupManagerSpec {
                name: "web".into(),
                base_instance_name: "web".into(),
                project: Some("p".into()),
                zone: Some("us-central1-a".into()),
                target_size: Some(2),
                versions: vec![Version {
                    name: "v1".into(),
                    instance_template: "https://www.googleapis.com/compute/v1/projects/p/global/instanceTemplates/t1".into(),
                    target_size: None,
                }],
                ..InstanceGroupManagerSpec::default()
            },
            fingerprint: "fp-1".into(),
            ..InstanceGroupManagerState::default()
        }
    }

    fn desired() -> InstanceGroupManagerSpec {
        InstanceGroupManagerSpec {
            project: None,
            zone: None,
            ..prior().spec
        }
    }

    #[test]
    fn test_no_changes_means_no_calls() {
        assert!(UpdatePlan::new(&prior(), &desired()).is_empty());
    }

    #[test]
    fn test_target_pools_only_patch() {
        let mut want = desired();
        want.target_pools.insert("projects/p/regions/us-central1/targetPools/pool".into());

        let plan = UpdatePlan::new(&prior(), &want);
        assert!(plan.named_ports.is_none());
        assert!(plan.resize.is_none());
        let body = serde_json::to_value(plan.patch.unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "fingerprint": "fp-1",
                "targetPools": ["projects/p/regions/us-central1/targetPools/pool"]
            })
        );
    }

    #[test]
    fn test_removed_auto_healing_is_sent_empty() {
        let mut current = prior();
        current.spec.auto_healing_policies = Some(AutoHealingPolicy {
            health_check: "projects/p/global/healthChecks/hc".into(),
            initial_delay_sec: 60,
        });
        let plan = UpdatePlan::new(&current, &desired());
        let body = serde_json::to_value(plan.patch.unwrap()).unwrap();
        assert_eq!(body, json!({"fingerprint": "fp-1", "autoHealingPolicies": []}));
    }

    #[test]
    fn test_named_ports_use_dedicated_call() {
        let mut want = desired();
        want.named_ports.insert(NamedPort {
            name: "http".into(),
            port: 80,
        });
        let plan = UpdatePlan::new(&prior(), &want);
        assert!(plan.patch.is_none());
        assert!(plan.resize.is_none());
        assert_eq!(plan.named_ports.unwrap().named_ports.len(), 1);
    }

    #[test]
    fn test_target_size_uses_resize() {
        let mut want = desired();
        want.target_size = Some(5);
        let plan = UpdatePlan::new(&prior(), &want);
        assert!(plan.patch.is_none());
        assert!(plan.named_ports.is_none());
        assert_eq!(plan.resize, Some(5));
    }

    #[test]
    fn test_version_change_patches_versions() {
        let mut want = desired();
        want.versions[0].target_size = Some(FixedOrPercent::percent(100));
        let plan = UpdatePlan::new(&prior(), &want);
        let patch = plan.patch.unwrap();
        assert_eq!(patch.versions.as_ref().unwrap().len(), 1);
        assert!(patch.target_pools.is_none());
        assert!(patch.update_policy.is_none());
        assert!(patch.auto_healing_policies.is_none());
    }
}
