//! Instance group manager identifiers
//!
//! The stored ID is `{project}/{zone}/{name}`. Users may also hand over a
//! bare `{name}`, in which case project and zone come from the provider.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstanceGroupManagerId {
    pub project: String,
    pub zone: String,
    pub name: String,
}

impl InstanceGroupManagerId {
    pub fn new(project: &str, zone: &str, name: &str) -> Self {
        Self {
            project: project.to_string(),
            zone: zone.to_string(),
            name: name.to_string(),
        }
    }

    /// Encode as `project/zone/name`
    pub fn encode(&self) -> String {
        format!("{}/{}/{}", self.project, self.zone, self.name)
    }

    /// Parse either `project/zone/name` or a bare `name`
    pub fn decode(id: &str) -> Result<Self> {
        let parts: Vec<&str> = id.split('/').collect();
        match parts.as_slice() {
            [project, zone, name]
                if is_valid_project(project) && is_valid_name(zone) && is_valid_name(name) =>
            {
                Ok(Self::new(project, zone, name))
            },
            [name] if is_valid_name(name) => Ok(Self {
                name: name.to_string(),
                ..Self::default()
            }),
            _ => Err(Error::InvalidIdentifier(id.to_string())),
        }
    }

    /// True once both project and zone are known
    pub fn is_fully_qualified(&self) -> bool {
        !self.project.is_empty() && !self.zone.is_empty()
    }
}

impl fmt::Display for InstanceGroupManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for InstanceGroupManagerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

/// Resource and zone names: `[a-z0-9-]+`
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Project IDs, project numbers and domain-scoped projects
/// (`example.com:my-project`)
pub fn is_valid_project(project: &str) -> bool {
    let (domain, id) = match project.rsplit_once(':') {
        Some((domain, id)) => (Some(domain), id),
        None => (None, project),
    };

    if let Some(domain) = domain {
        if !is_valid_project_domain(domain) {
            return false;
        }
    }

    is_project_number(id) || is_label(id, |c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn is_project_number(id: &str) -> bool {
    (1..=19).contains(&id.len()) && id.chars().all(|c| c.is_ascii_digit())
}

/// A 1-63 character label of `[-a-z0-9]` whose first character satisfies
/// `first` and which does not end with a hyphen
fn is_label(label: &str, first: impl Fn(char) -> bool) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if first(c) => {},
        _ => return false,
    }
    if label.ends_with('-') {
        return false;
    }
    label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_valid_project_domain(domain: &str) -> bool {
    let mut labels: Vec<&str> = domain.split('.').collect();
    let Some(last) = labels.pop() else {
        return false;
    };
    let leading_ok = labels.iter().all(|label| {
        (1..=63).contains(&label.len())
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    });
    leading_ok && is_label(last, |c| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_id() {
        let id = InstanceGroupManagerId::decode("my-project/us-central1-a/web-igm").unwrap();
        assert_eq!(id, InstanceGroupManagerId::new("my-project", "us-central1-a", "web-igm"));
        assert!(id.is_fully_qualified());
        assert_eq!(id.encode(), "my-project/us-central1-a/web-igm");
    }

    #[test]
    fn test_decode_bare_name() {
        let id: InstanceGroupManagerId = "web-igm".parse().unwrap();
        assert_eq!(id.name, "web-igm");
        assert!(id.project.is_empty());
        assert!(id.zone.is_empty());
        assert!(!id.is_fully_qualified());
    }

    #[test]
    fn test_decode_domain_scoped_and_numeric_projects() {
        let id = InstanceGroupManagerId::decode("example.com:my-project/us-east1-b/igm").unwrap();
        assert_eq!(id.project, "example.com:my-project");

        let id = InstanceGroupManagerId::decode("123456789012/us-east1-b/igm").unwrap();
        assert_eq!(id.project, "123456789012");
    }

    #[test]
    fn test_decode_rejects_malformed_ids() {
        for bad in [
            "",
            "Web",
            "a/b",
            "p/z/n/extra",
            "my-project/us-central1-a/Web",
            "my-project/us_central1/igm",
            "-project/zone/igm",
            "project-/zone/igm",
            "my-project/zone/",
            "example.com:/zone/igm",
        ] {
            assert!(
                matches!(InstanceGroupManagerId::decode(bad), Err(Error::InvalidIdentifier(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_matches_encode() {
        let id = InstanceGroupManagerId::new("p-1", "europe-west1-b", "igm");
        assert_eq!(id.to_string(), "p-1/europe-west1-b/igm");
    }
}
