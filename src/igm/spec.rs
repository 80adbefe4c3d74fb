//! Typed configuration of an instance group manager
//!
//! This is the flat, user-facing shape. [`super::transcode`] converts it to
//! and from the nested API model.

use super::id::is_valid_name;
use crate::compute::self_link;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceGroupManagerSpec {
    pub name: String,
    pub base_instance_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Unset means "whatever the server has"; create sends 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size: Option<i64>,
    #[serde(default, rename = "named_port")]
    pub named_ports: BTreeSet<NamedPort>,
    #[serde(default)]
    pub target_pools: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_healing_policies: Option<AutoHealingPolicy>,
    #[serde(rename = "version")]
    pub versions: Vec<Version>,
    /// Unset means "whatever the server has"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<UpdatePolicy>,
    #[serde(default)]
    pub wait_for_instances: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedPort {
    pub name: String,
    pub port: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoHealingPolicy {
    pub health_check: String,
    pub initial_delay_sec: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Version {
    pub name: String,
    pub instance_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size: Option<FixedOrPercent>,
}

/// Either an absolute count or a percentage; a positive `percent` wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedOrPercent {
    #[serde(default)]
    pub fixed: i64,
    #[serde(default)]
    pub percent: i64,
}

impl FixedOrPercent {
    pub fn fixed(fixed: i64) -> Self {
        Self { fixed, percent: 0 }
    }

    pub fn percent(percent: i64) -> Self {
        Self { fixed: 0, percent }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MinimalAction {
    Restart,
    Replace,
}

impl MinimalAction {
    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::Restart => "RESTART",
            Self::Replace => "REPLACE",
        }
    }

    pub fn from_api_str(value: &str) -> Option<Self> {
        match value {
            "RESTART" => Some(Self::Restart),
            "REPLACE" => Some(Self::Replace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    Opportunistic,
    Proactive,
}

impl UpdateType {
    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::Opportunistic => "OPPORTUNISTIC",
            Self::Proactive => "PROACTIVE",
        }
    }

    pub fn from_api_str(value: &str) -> Option<Self> {
        match value {
            "OPPORTUNISTIC" => Some(Self::Opportunistic),
            "PROACTIVE" => Some(Self::Proactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePolicy {
    pub minimal_action: MinimalAction,
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    #[serde(default)]
    pub max_surge_fixed: i64,
    #[serde(default)]
    pub max_surge_percent: i64,
    #[serde(default)]
    pub max_unavailable_fixed: i64,
    #[serde(default)]
    pub max_unavailable_percent: i64,
    #[serde(default)]
    pub min_ready_sec: i64,
}

impl InstanceGroupManagerSpec {
    /// Check the constraints the API would otherwise reject
    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.name) {
            return invalid(format!("name {:?} must match [a-z0-9-]+", self.name));
        }
        if self.base_instance_name.is_empty() {
            return invalid("base_instance_name must not be empty");
        }
        if let Some(size) = self.target_size {
            if size < 0 {
                return invalid(format!("target_size must not be negative, got {}", size));
            }
        }
        for port in &self.named_ports {
            if port.name.is_empty() || !(1..=65535).contains(&port.port) {
                return invalid(format!("named_port {}:{} is not valid", port.name, port.port));
            }
        }
        if let Some(policy) = &self.auto_healing_policies {
            if policy.health_check.is_empty() {
                return invalid("auto_healing_policies.health_check must not be empty");
            }
            check_range("auto_healing_policies.initial_delay_sec", policy.initial_delay_sec, 0, 3600)?;
        }
        if self.versions.is_empty() {
            return invalid("at least one version is required");
        }
        for version in &self.versions {
            if version.name.is_empty() || version.instance_template.is_empty() {
                return invalid("every version needs a name and an instance_template");
            }
            if let Some(size) = version.target_size {
                check_range("version.target_size.percent", size.percent, 0, 100)?;
                if size.fixed < 0 {
                    return invalid("version.target_size.fixed must not be negative");
                }
            }
        }
        if let Some(policy) = &self.update_policy {
            check_range("update_policy.max_surge_percent", policy.max_surge_percent, 0, 100)?;
            check_range("update_policy.max_unavailable_percent", policy.max_unavailable_percent, 0, 100)?;
            check_range("update_policy.min_ready_sec", policy.min_ready_sec, 0, 3600)?;
            if policy.max_surge_fixed < 0 || policy.max_unavailable_fixed < 0 {
                return invalid("update_policy fixed values must not be negative");
            }
            if policy.max_surge_fixed > 0 && policy.max_surge_percent > 0 {
                return invalid("update_policy.max_surge_fixed conflicts with max_surge_percent");
            }
            if policy.max_unavailable_fixed > 0 && policy.max_unavailable_percent > 0 {
                return invalid("update_policy.max_unavailable_fixed conflicts with max_unavailable_percent");
            }
        }
        Ok(())
    }

    /// Names of the fields in `desired` whose change would force a new
    /// resource. Unset project/zone in `desired` match anything.
    pub fn replacement_changes(&self, desired: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.name != desired.name {
            changed.push("name");
        }
        if self.base_instance_name != desired.base_instance_name {
            changed.push("base_instance_name");
        }
        if self.description != desired.description {
            changed.push("description");
        }
        if desired.project.is_some() && self.project != desired.project {
            changed.push("project");
        }
        if desired.zone.is_some() && self.zone != desired.zone {
            changed.push("zone");
        }
        changed
    }

    /// Target pools compared by relative path, order-insensitively
    pub fn target_pools_differ(&self, desired: &Self) -> bool {
        relative_set(&self.target_pools) != relative_set(&desired.target_pools)
    }

    pub fn auto_healing_differs(&self, desired: &Self) -> bool {
        match (&self.auto_healing_policies, &desired.auto_healing_policies) {
            (None, None) => false,
            (Some(a), Some(b)) => {
                a.initial_delay_sec != b.initial_delay_sec
                    || !self_link::same_resource(&a.health_check, &b.health_check)
            },
            _ => true,
        }
    }

    pub fn versions_differ(&self, desired: &Self) -> bool {
        if self.versions.len() != desired.versions.len() {
            return true;
        }
        self.versions.iter().zip(&desired.versions).any(|(a, b)| {
            a.name != b.name
                || !self_link::same_resource(&a.instance_template, &b.instance_template)
                || normalized_size(a.target_size) != normalized_size(b.target_size)
        })
    }

    /// An unset desired policy keeps whatever is configured remotely
    pub fn update_policy_differs(&self, desired: &Self) -> bool {
        match &desired.update_policy {
            Some(policy) => self.update_policy.as_ref() != Some(policy),
            None => false,
        }
    }

    pub fn named_ports_differ(&self, desired: &Self) -> bool {
        self.named_ports != desired.named_ports
    }

    /// The new size when `desired` asks for a different one
    pub fn target_size_change(&self, desired: &Self) -> Option<i64> {
        match desired.target_size {
            Some(size) if self.target_size != Some(size) => Some(size),
            _ => None,
        }
    }
}

/// An absent size and a zero size both mean "nothing configured"
fn normalized_size(size: Option<FixedOrPercent>) -> FixedOrPercent {
    size.unwrap_or_default()
}

fn relative_set(links: &BTreeSet<String>) -> BTreeSet<&str> {
    links.iter().map(|l| self_link::relative_path(l)).collect()
}

fn invalid<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::InvalidConfig(message.into()))
}

fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return invalid(format!("{} must be between {} and {}, got {}", field, min, max, value));
    }
    Ok(())
}
