//! Compute Engine wire types
//!
//! Only the fields the instance group manager resource reads or writes are
//! modelled. Absent optional fields are omitted from request bodies so a
//! patch only touches what it names.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManager {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_instance_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_ports: Option<Vec<NamedPort>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_pools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_healing_policies: Option<Vec<AutoHealingPolicy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<InstanceGroupManagerVersion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<UpdatePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    // Output only
    #[serde(default, skip_serializing)]
    pub zone: Option<String>,
    #[serde(default, skip_serializing)]
    pub instance_group: Option<String>,
    #[serde(default, skip_serializing)]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing)]
    pub current_actions: Option<CurrentActions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamedPort {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub port: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoHealingPolicy {
    #[serde(default)]
    pub health_check: String,
    #[serde(default)]
    pub initial_delay_sec: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupManagerVersion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub instance_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size: Option<FixedOrPercent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimal_action: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<FixedOrPercent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<FixedOrPercent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ready_sec: Option<i64>,
}

/// A quantity expressed either as an absolute count or as a percentage of
/// the group size.
///
/// `None` fields are left out of the request body unless the matching
/// `clear_*` flag is set, in which case an explicit `null` is sent so the
/// server drops the value it had.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FixedOrPercent {
    #[serde(default)]
    pub fixed: Option<i64>,
    #[serde(default)]
    pub percent: Option<i64>,
    #[serde(default)]
    pub calculated: Option<i64>,
    #[serde(skip)]
    pub clear_fixed: bool,
    #[serde(skip)]
    pub clear_percent: bool,
}

impl FixedOrPercent {
    pub fn fixed(value: i64) -> Self {
        Self {
            fixed: Some(value),
            ..Self::default()
        }
    }

    pub fn percent(value: i64) -> Self {
        Self {
            percent: Some(value),
            ..Self::default()
        }
    }
}

impl Serialize for FixedOrPercent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self.fixed {
            Some(fixed) => map.serialize_entry("fixed", &fixed)?,
            None if self.clear_fixed => map.serialize_entry("fixed", &None::<i64>)?,
            None => {},
        }
        match self.percent {
            Some(percent) => map.serialize_entry("percent", &percent)?,
            None if self.clear_percent => map.serialize_entry("percent", &None::<i64>)?,
            None => {},
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentActions {
    #[serde(default)]
    pub none: i64,
    #[serde(default)]
    pub creating: i64,
    #[serde(default)]
    pub recreating: i64,
    #[serde(default)]
    pub deleting: i64,
    #[serde(default)]
    pub abandoning: i64,
    #[serde(default)]
    pub restarting: i64,
    #[serde(default)]
    pub refreshing: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroupsSetNamedPortsRequest {
    pub named_ports: Vec<NamedPort>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(default)]
    pub name: String,
    /// Zone URLs
    #[serde(default)]
    pub zones: Vec<String>,
}

/// A zonal long-running operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub http_error_message: Option<String>,
}

impl Operation {
    pub const DONE: &'static str = "DONE";

    pub fn is_done(&self) -> bool {
        self.status == Self::DONE
    }

    /// Flattened error messages of a finished operation, if it failed.
    /// Falls back to `httpErrorMessage` when the error carries no items.
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        if error.errors.is_empty() {
            return self.http_error_message.clone().filter(|m| !m.is_empty());
        }
        Some(
            error
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OperationErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_error_falls_back_to_http_message() {
        let op: Operation = serde_json::from_value(json!({
            "name": "operation-2",
            "status": "DONE",
            "operationType": "delete",
            "error": {},
            "httpErrorMessage": "FORBIDDEN"
        }))
        .unwrap();
        assert_eq!(op.error_message().as_deref(), Some("FORBIDDEN"));

        let op: Operation =
            serde_json::from_value(json!({"name": "operation-3", "status": "DONE"})).unwrap();
        assert_eq!(op.error_message(), None);
    }

    #[test]
    fn test_patch_body_omits_unset_fields() {
        let patch = InstanceGroupManager {
            fingerprint: Some("abc=".into()),
            target_pools: Some(vec!["pool-a".into()]),
            ..InstanceGroupManager::default()
        };
        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(body, json!({"fingerprint": "abc=", "targetPools": ["pool-a"]}));
    }

    #[test]
    fn test_output_only_fields_are_never_sent() {
        let manager = InstanceGroupManager {
            name: Some("igm".into()),
            self_link: Some("https://example/igm".into()),
            zone: Some("us-central1-a".into()),
            ..InstanceGroupManager::default()
        };
        let body = serde_json::to_value(&manager).unwrap();
        assert_eq!(body, json!({"name": "igm"}));
    }

    #[test]
    fn test_fixed_or_percent_explicit_nulls() {
        let value = FixedOrPercent {
            percent: Some(20),
            clear_fixed: true,
            ..FixedOrPercent::default()
        };
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"fixed": null, "percent": 20}));

        let value = FixedOrPercent {
            fixed: Some(0),
            clear_percent: true,
            ..FixedOrPercent::default()
        };
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"fixed": 0, "percent": null}));

        assert_eq!(serde_json::to_value(FixedOrPercent::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_operation_error_message() {
        let op: Operation = serde_json::from_value(json!({
            "name": "operation-1",
            "status": "DONE",
            "error": {"errors": [
                {"code": "QUOTA_EXCEEDED", "message": "Quota 'CPUS' exceeded"},
                {"code": "RESOURCE_NOT_READY", "message": "not ready"}
            ]}
        }))
        .unwrap();
        assert!(op.is_done());
        assert_eq!(
            op.error_message().unwrap(),
            "QUOTA_EXCEEDED: Quota 'CPUS' exceeded; RESOURCE_NOT_READY: not ready"
        );
    }

    #[test]
    fn test_manager_decodes_api_response() {
        let manager: InstanceGroupManager = serde_json::from_value(json!({
            "kind": "compute#instanceGroupManager",
            "id": "1234567890",
            "name": "web",
            "zone": "https://www.googleapis.com/compute/beta/projects/p/zones/us-central1-a",
            "baseInstanceName": "web",
            "targetSize": 3,
            "fingerprint": "42WmSpB8rSM=",
            "currentActions": {"none": 2, "creating": 1},
            "versions": [{
                "name": "v1",
                "instanceTemplate": "https://www.googleapis.com/compute/beta/projects/p/global/instanceTemplates/t1",
                "targetSize": {"percent": 100, "calculated": 3}
            }]
        }))
        .unwrap();
        assert_eq!(manager.target_size, Some(3));
        assert_eq!(manager.current_actions.unwrap().creating, 1);
        let version = &manager.versions.unwrap()[0];
        assert_eq!(version.target_size.as_ref().unwrap().percent, Some(100));
    }
}
