//! Local state file used by the command line driver

use crate::error::{Error, Result};
use crate::igm::InstanceGroupManagerState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The last known state of one instance group manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub resource: Option<InstanceGroupManagerState>,
    pub updated_at: DateTime<Utc>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            resource: None,
            updated_at: Utc::now(),
        }
    }
}

impl StateFile {
    /// Load the state at `path`; a missing file is an empty state
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("state file {}: {}", path.display(), e)))
    }

    /// Replace the stored resource and write the file
    pub fn store(&mut self, path: &Path, resource: Option<InstanceGroupManagerState>) -> Result<()> {
        self.resource = resource;
        self.updated_at = Utc::now();
        self.save(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| Error::io(path, e))
    }
}
