//! Conversions between the flat configuration and the API model
//!
//! `expand_*` builds request shapes from configuration, `flatten_*` maps
//! server responses back. None of these functions perform I/O.

use super::spec::{
    AutoHealingPolicy, FixedOrPercent, InstanceGroupManagerSpec, MinimalAction, NamedPort,
    UpdatePolicy, UpdateType, Version,
};
use super::state::InstanceGroupManagerState;
use crate::compute::model;
use crate::compute::self_link;
use std::collections::BTreeSet;

pub fn expand_named_ports(ports: &BTreeSet<NamedPort>) -> Vec<model::NamedPort> {
    ports
        .iter()
        .map(|p| model::NamedPort {
            name: p.name.clone(),
            port: p.port,
        })
        .collect()
}

pub fn flatten_named_ports(ports: &[model::NamedPort]) -> BTreeSet<NamedPort> {
    ports
        .iter()
        .map(|p| NamedPort {
            name: p.name.clone(),
            port: p.port,
        })
        .collect()
}

pub fn expand_auto_healing_policies(
    policy: Option<&AutoHealingPolicy>,
) -> Vec<model::AutoHealingPolicy> {
    policy
        .map(|p| model::AutoHealingPolicy {
            health_check: p.health_check.clone(),
            initial_delay_sec: p.initial_delay_sec,
        })
        .into_iter()
        .collect()
}

pub fn flatten_auto_healing_policies(
    policies: &[model::AutoHealingPolicy],
) -> Option<AutoHealingPolicy> {
    policies.first().map(|p| AutoHealingPolicy {
        health_check: p.health_check.clone(),
        initial_delay_sec: p.initial_delay_sec,
    })
}

/// A positive percent is sent as such; otherwise the fixed count is sent
/// explicitly, zero included, so "zero" is not mistaken for "unset".
pub fn expand_fixed_or_percent(value: Option<FixedOrPercent>) -> model::FixedOrPercent {
    match value {
        None => model::FixedOrPercent::default(),
        Some(v) if v.percent > 0 => model::FixedOrPercent::percent(v.percent),
        Some(v) => model::FixedOrPercent::fixed(v.fixed),
    }
}

/// The percent if positive, else the fixed count if positive, else nothing
pub fn flatten_fixed_or_percent(value: Option<&model::FixedOrPercent>) -> Option<FixedOrPercent> {
    let value = value?;
    match (value.percent.unwrap_or(0), value.fixed.unwrap_or(0)) {
        (percent, _) if percent > 0 => Some(FixedOrPercent::percent(percent)),
        (_, fixed) if fixed > 0 => Some(FixedOrPercent::fixed(fixed)),
        _ => None,
    }
}

pub fn expand_versions(versions: &[Version]) -> Vec<model::InstanceGroupManagerVersion> {
    versions
        .iter()
        .map(|v| model::InstanceGroupManagerVersion {
            name: v.name.clone(),
            instance_template: v.instance_template.clone(),
            target_size: Some(expand_fixed_or_percent(v.target_size)),
        })
        .collect()
}

pub fn flatten_versions(versions: &[model::InstanceGroupManagerVersion]) -> Vec<Version> {
    versions
        .iter()
        .map(|v| Version {
            name: v.name.clone(),
            instance_template: self_link::to_v1(&v.instance_template),
            target_size: flatten_fixed_or_percent(v.target_size.as_ref()),
        })
        .collect()
}

/// Surge and unavailability settings: the other member of the pair is
/// explicitly nulled so a patch replaces whatever the server had.
fn expand_policy_quantity(fixed: i64, percent: i64) -> model::FixedOrPercent {
    if percent > 0 {
        model::FixedOrPercent {
            percent: Some(percent),
            clear_fixed: true,
            ..model::FixedOrPercent::default()
        }
    } else {
        model::FixedOrPercent {
            fixed: Some(fixed),
            clear_percent: true,
            ..model::FixedOrPercent::default()
        }
    }
}

pub fn expand_update_policy(policy: &UpdatePolicy) -> model::UpdatePolicy {
    model::UpdatePolicy {
        minimal_action: Some(policy.minimal_action.as_api_str().to_string()),
        policy_type: Some(policy.update_type.as_api_str().to_string()),
        max_surge: Some(expand_policy_quantity(policy.max_surge_fixed, policy.max_surge_percent)),
        max_unavailable: Some(expand_policy_quantity(
            policy.max_unavailable_fixed,
            policy.max_unavailable_percent,
        )),
        min_ready_sec: (policy.min_ready_sec > 0).then_some(policy.min_ready_sec),
    }
}

/// Fixed and percent values are copied as reported; absent means 0.
pub fn flatten_update_policy(policy: Option<&model::UpdatePolicy>) -> Option<UpdatePolicy> {
    let policy = policy?;
    let minimal_action = policy.minimal_action.as_deref().and_then(MinimalAction::from_api_str);
    let update_type = policy.policy_type.as_deref().and_then(UpdateType::from_api_str);
    let (Some(minimal_action), Some(update_type)) = (minimal_action, update_type) else {
        tracing::warn!(
            "Ignoring update policy with unknown minimal action {:?} or type {:?}",
            policy.minimal_action,
            policy.policy_type
        );
        return None;
    };

    let quantity = |q: Option<&model::FixedOrPercent>| {
        q.map(|q| (q.fixed.unwrap_or(0), q.percent.unwrap_or(0)))
            .unwrap_or((0, 0))
    };
    let (max_surge_fixed, max_surge_percent) = quantity(policy.max_surge.as_ref());
    let (max_unavailable_fixed, max_unavailable_percent) = quantity(policy.max_unavailable.as_ref());

    Some(UpdatePolicy {
        minimal_action,
        update_type,
        max_surge_fixed,
        max_surge_percent,
        max_unavailable_fixed,
        max_unavailable_percent,
        min_ready_sec: policy.min_ready_sec.unwrap_or(0),
    })
}

/// Full insert request for `spec`. The target size is always sent so that
/// an explicit 0 survives.
pub fn expand_manager(spec: &InstanceGroupManagerSpec) -> model::InstanceGroupManager {
    let named_ports = expand_named_ports(&spec.named_ports);
    let auto_healing = expand_auto_healing_policies(spec.auto_healing_policies.as_ref());

    model::InstanceGroupManager {
        name: Some(spec.name.clone()),
        description: (!spec.description.is_empty()).then(|| spec.description.clone()),
        base_instance_name: Some(spec.base_instance_name.clone()),
        target_size: Some(spec.target_size.unwrap_or(0)),
        named_ports: (!named_ports.is_empty()).then_some(named_ports),
        target_pools: (!spec.target_pools.is_empty())
            .then(|| spec.target_pools.iter().cloned().collect()),
        auto_healing_policies: (!auto_healing.is_empty()).then_some(auto_healing),
        versions: Some(expand_versions(&spec.versions)),
        update_policy: spec.update_policy.as_ref().map(expand_update_policy),
        ..model::InstanceGroupManager::default()
    }
}

/// Reconcile a server response into stored state.
///
/// `project` is the project the manager was looked up in; `wait_for_instances`
/// is local-only and carried over from the configuration.
pub fn flatten_manager(
    manager: &model::InstanceGroupManager,
    project: &str,
    wait_for_instances: bool,
) -> InstanceGroupManagerState {
    let name = manager.name.clone().unwrap_or_default();
    let zone = manager
        .zone
        .as_deref()
        .map(|z| self_link::resource_name(z).to_string())
        .unwrap_or_default();

    let spec = InstanceGroupManagerSpec {
        name: name.clone(),
        base_instance_name: manager.base_instance_name.clone().unwrap_or_default(),
        description: manager.description.clone().unwrap_or_default(),
        project: Some(project.to_string()),
        zone: Some(zone.clone()),
        target_size: Some(manager.target_size.unwrap_or(0)),
        named_ports: flatten_named_ports(manager.named_ports.as_deref().unwrap_or_default()),
        target_pools: manager
            .target_pools
            .iter()
            .flatten()
            .cloned()
            .collect(),
        auto_healing_policies: flatten_auto_healing_policies(
            manager.auto_healing_policies.as_deref().unwrap_or_default(),
        ),
        versions: flatten_versions(manager.versions.as_deref().unwrap_or_default()),
        update_policy: flatten_update_policy(manager.update_policy.as_ref()),
        wait_for_instances,
    };

    InstanceGroupManagerState {
        id: super::id::InstanceGroupManagerId::new(project, &zone, &name).encode(),
        spec,
        fingerprint: manager.fingerprint.clone().unwrap_or_default(),
        instance_group: manager.instance_group.as_deref().map(self_link::to_v1).unwrap_or_default(),
        self_link: manager.self_link.as_deref().map(self_link::to_v1).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixed_or_percent_write_precedence() {
        let both = FixedOrPercent { fixed: 3, percent: 40 };
        assert_eq!(expand_fixed_or_percent(Some(both)), model::FixedOrPercent::percent(40));

        let zero = FixedOrPercent::fixed(0);
        let wire = expand_fixed_or_percent(Some(zero));
        assert_eq!(wire.fixed, Some(0));
        assert_eq!(serde_json::to_value(&wire).unwrap(), json!({"fixed": 0}));

        assert_eq!(
            serde_json::to_value(expand_fixed_or_percent(None)).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_fixed_or_percent_read_precedence() {
        let server = model::FixedOrPercent {
            fixed: Some(2),
            percent: Some(50),
            calculated: Some(2),
            ..model::FixedOrPercent::default()
        };
        assert_eq!(flatten_fixed_or_percent(Some(&server)), Some(FixedOrPercent::percent(50)));

        let server = model::FixedOrPercent {
            fixed: Some(2),
            calculated: Some(2),
            ..model::FixedOrPercent::default()
        };
        assert_eq!(flatten_fixed_or_percent(Some(&server)), Some(FixedOrPercent::fixed(2)));

        let server = model::FixedOrPercent {
            calculated: Some(0),
            ..model::FixedOrPercent::default()
        };
        assert_eq!(flatten_fixed_or_percent(Some(&server)), None);
        assert_eq!(flatten_fixed_or_percent(None), None);
    }

    #[test]
    fn test_update_policy_wire_shape() {
        let policy = UpdatePolicy {
            minimal_action: MinimalAction::Replace,
            update_type: UpdateType::Proactive,
            max_surge_fixed: 0,
            max_surge_percent: 25,
            max_unavailable_fixed: 0,
            max_unavailable_percent: 0,
            min_ready_sec: 30,
        };
        let body = serde_json::to_value(expand_update_policy(&policy)).unwrap();
        assert_eq!(
            body,
            json!({
                "minimalAction": "REPLACE",
                "type": "PROACTIVE",
                "maxSurge": {"fixed": null, "percent": 25},
                "maxUnavailable": {"fixed": 0, "percent": null},
                "minReadySec": 30
            })
        );
    }

    #[test]
    fn test_update_policy_read_back() {
        let wire: model::UpdatePolicy = serde_json::from_value(json!({
            "type": "OPPORTUNISTIC",
            "minimalAction": "RESTART",
            "maxSurge": {"fixed": 1, "calculated": 1},
            "maxUnavailable": {"percent": 10, "calculated": 0}
        }))
        .unwrap();
        let policy = flatten_update_policy(Some(&wire)).unwrap();
        assert_eq!(policy.max_surge_fixed, 1);
        assert_eq!(policy.max_surge_percent, 0);
        assert_eq!(policy.max_unavailable_fixed, 0);
        assert_eq!(policy.max_unavailable_percent, 10);
        assert_eq!(policy.min_ready_sec, 0);

        let unknown = model::UpdatePolicy {
            minimal_action: Some("NONE".into()),
            policy_type: Some("PROACTIVE".into()),
            ..model::UpdatePolicy::default()
        };
        assert_eq!(flatten_update_policy(Some(&unknown)), None);
    }

    #[test]
    fn test_versions_are_converted_to_v1_links() {
        let wire = vec![model::InstanceGroupManagerVersion {
            name: "canary".into(),
            instance_template:
                "https://www.googleapis.com/compute/beta/projects/p/global/instanceTemplates/t2".into(),
            target_size: Some(model::FixedOrPercent::fixed(1)),
        }];
        let versions = flatten_versions(&wire);
        assert_eq!(
            versions[0].instance_template,
            "https://www.googleapis.com/compute/v1/projects/p/global/instanceTemplates/t2"
        );
        assert_eq!(versions[0].target_size, Some(FixedOrPercent::fixed(1)));
    }

    #[test]
    fn test_expand_manager_sends_zero_target_size() {
        let spec = InstanceGroupManagerSpec {
            name: "igm".into(),
            base_instance_name: "igm".into(),
            versions: vec![Version {
                name: "v1".into(),
                instance_template: "t1".into(),
                target_size: None,
            }],
            ..InstanceGroupManagerSpec::default()
        };
        let body = serde_json::to_value(expand_manager(&spec)).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "igm",
                "baseInstanceName": "igm",
                "targetSize": 0,
                "versions": [{"name": "v1", "instanceTemplate": "t1", "targetSize": {}}]
            })
        );
    }

    #[test]
    fn test_auto_healing_and_named_ports_round_trip() {
        let policy = AutoHealingPolicy {
            health_check: "projects/p/global/healthChecks/hc".into(),
            initial_delay_sec: 120,
        };
        let wire = expand_auto_healing_policies(Some(&policy));
        assert_eq!(flatten_auto_healing_policies(&wire), Some(policy));
        assert!(expand_auto_healing_policies(None).is_empty());

        let ports: BTreeSet<NamedPort> = [
            NamedPort { name: "http".into(), port: 80 },
            NamedPort { name: "https".into(), port: 443 },
        ]
        .into_iter()
        .collect();
        assert_eq!(flatten_named_ports(&expand_named_ports(&ports)), ports);
    }

    #[test]
    fn test_flatten_manager() {
        let manager: model::InstanceGroupManager = serde_json::from_value(json!({
            "name": "web",
            "zone": "https://www.googleapis.com/compute/beta/projects/p/zones/us-central1-a",
            "baseInstanceName": "web",
            "targetSize": 2,
            "fingerprint": "fp=",
            "instanceGroup": "https://www.googleapis.com/compute/beta/projects/p/zones/us-central1-a/instanceGroups/web",
            "selfLink": "https://www.googleapis.com/compute/beta/projects/p/zones/us-central1-a/instanceGroupManagers/web",
            "namedPorts": [{"name": "http", "port": 80}],
            "targetPools": ["https://www.googleapis.com/compute/v1/projects/p/regions/us-central1/targetPools/pool"],
            "versions": [{"name": "v1", "instanceTemplate": "projects/p/global/instanceTemplates/t1", "targetSize": {"percent": 100}}]
        }))
        .unwrap();

        let state = flatten_manager(&manager, "p", true);
        assert_eq!(state.id, "p/us-central1-a/web");
        assert_eq!(state.spec.zone.as_deref(), Some("us-central1-a"));
        assert_eq!(state.spec.target_size, Some(2));
        assert_eq!(state.fingerprint, "fp=");
        assert!(state.instance_group.contains("/compute/v1/"));
        assert!(state.self_link.contains("/compute/v1/"));
        assert_eq!(state.spec.named_ports.len(), 1);
        assert_eq!(state.spec.target_pools.len(), 1);
        assert_eq!(state.spec.auto_healing_policies, None);
        assert_eq!(state.spec.update_policy, None);
        assert!(state.spec.wait_for_instances);
        assert_eq!(state.spec.versions[0].target_size, Some(FixedOrPercent::percent(100)));
    }
}
