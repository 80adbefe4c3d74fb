//! Helpers for Compute Engine resource URLs ("self links")
//!
//! Users may reference templates, health checks and target pools either by
//! full URL or by relative path, against the v1 or beta API. These helpers
//! normalize links so such references compare equal.

/// Return the `projects/...` suffix of a self link, or the input unchanged
/// when it has none.
pub fn relative_path(link: &str) -> &str {
    match link.find("projects/") {
        Some(idx) => &link[idx..],
        None => link,
    }
}

/// True when both links point at the same resource
pub fn same_resource(a: &str, b: &str) -> bool {
    relative_path(a) == relative_path(b)
}

/// Rewrite a beta API link into its v1 form
pub fn to_v1(link: &str) -> String {
    link.replacen("/compute/beta/", "/compute/v1/", 1)
}

/// Extract the trailing resource name of a link
/// e.g., "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a" -> "us-central1-a"
pub fn resource_name(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

/// Region of a zone name ("us-central1-a" -> "us-central1")
pub fn region_from_zone(zone: &str) -> String {
    let parts: Vec<&str> = zone.rsplitn(2, '-').collect();
    if parts.len() == 2 {
        parts[1].to_string()
    } else {
        zone.to_string()
    }
}
