//! Stored state of an instance group manager

use super::id::InstanceGroupManagerId;
use super::spec::InstanceGroupManagerSpec;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// What the host persists between lifecycle calls: the identifier, the
/// configuration as last read back from the server, and the computed
/// attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceGroupManagerState {
    pub id: String,
    pub spec: InstanceGroupManagerSpec,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub instance_group: String,
    #[serde(default)]
    pub self_link: String,
}

impl InstanceGroupManagerState {
    pub fn parsed_id(&self) -> Result<InstanceGroupManagerId> {
        InstanceGroupManagerId::decode(&self.id)
    }
}
