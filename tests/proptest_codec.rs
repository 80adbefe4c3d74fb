//! Property-based tests using proptest
//!
//! These tests verify the identifier codec and the fixed-or-percent
//! conversions using randomized inputs.

use gce_igm::igm::spec::{FixedOrPercent, NamedPort};
use gce_igm::igm::{transcode, InstanceGroupManagerId};
use gce_igm::Error;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Generate project IDs, optionally domain-scoped
fn arb_project() -> impl Strategy<Value = String> {
    (
        prop::option::of("[a-z]{2,10}\\.(com|org|net)"),
        "[a-z][a-z0-9-]{4,28}[a-z0-9]",
    )
        .prop_map(|(domain, id)| match domain {
            Some(domain) => format!("{}:{}", domain, id),
            None => id,
        })
}

/// Generate zone names like us-central1-a
fn arb_zone() -> impl Strategy<Value = String> {
    ("[a-z]{2,6}", "[a-z]{3,8}[0-9]", "[a-z]")
        .prop_map(|(area, location, letter)| format!("{}-{}-{}", area, location, letter))
}

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z0-9-]{1,40}"
}

fn arb_id() -> impl Strategy<Value = InstanceGroupManagerId> {
    (arb_project(), arb_zone(), arb_name())
        .prop_map(|(project, zone, name)| InstanceGroupManagerId::new(&project, &zone, &name))
}

/// Either a positive count or a positive percentage, never both
fn arb_fixed_or_percent() -> impl Strategy<Value = FixedOrPercent> {
    prop_oneof![
        (1i64..10_000).prop_map(FixedOrPercent::fixed),
        (1i64..=100).prop_map(FixedOrPercent::percent),
    ]
}

proptest! {
    /// Decoding an encoded identifier gives it back
    #[test]
    fn encode_then_decode_is_identity(id in arb_id()) {
        let decoded = InstanceGroupManagerId::decode(&id.encode()).unwrap();
        prop_assert!(decoded.is_fully_qualified());
        prop_assert_eq!(decoded, id);
    }

    /// A bare name decodes with project and zone left empty
    #[test]
    fn bare_name_decodes(name in arb_name()) {
        let decoded = InstanceGroupManagerId::decode(&name).unwrap();
        prop_assert_eq!(decoded.name, name);
        prop_assert!(decoded.project.is_empty());
        prop_assert!(decoded.zone.is_empty());
    }

    /// Two-part identifiers are never accepted
    #[test]
    fn two_parts_rejected(zone in arb_zone(), name in arb_name()) {
        let id = format!("{}/{}", zone, name);
        let rejected = matches!(InstanceGroupManagerId::decode(&id), Err(Error::InvalidIdentifier(_)));
        prop_assert!(rejected);
    }

    /// Upper case names are rejected
    #[test]
    fn uppercase_name_rejected(project in arb_project(), zone in arb_zone(), name in "[A-Z]{1,10}") {
        let id = format!("{}/{}/{}", project, zone, name);
        prop_assert!(InstanceGroupManagerId::decode(&id).is_err());
    }

    /// Four or more parts are rejected
    #[test]
    fn extra_parts_rejected(id in arb_id(), extra in arb_name()) {
        let encoded = format!("{}/{}", id.encode(), extra);
        prop_assert!(InstanceGroupManagerId::decode(&encoded).is_err());
    }

    /// Writing then reading a quantity reproduces it
    #[test]
    fn fixed_or_percent_round_trips(value in arb_fixed_or_percent()) {
        let wire = transcode::expand_fixed_or_percent(Some(value));
        prop_assert_eq!(transcode::flatten_fixed_or_percent(Some(&wire)), Some(value));
    }

    /// A positive percent always wins over a fixed value on write
    #[test]
    fn percent_wins_on_write(fixed in 0i64..10_000, percent in 1i64..=100) {
        let wire = transcode::expand_fixed_or_percent(Some(FixedOrPercent { fixed, percent }));
        prop_assert_eq!(wire.percent, Some(percent));
        prop_assert_eq!(wire.fixed, None);
    }

    /// Named ports survive the trip through the API model, in any order
    #[test]
    fn named_ports_round_trip(
        ports in prop::collection::btree_set(("[a-z]{1,10}", 1i64..=65535), 0..8)
    ) {
        let ports: BTreeSet<NamedPort> = ports
            .into_iter()
            .map(|(name, port)| NamedPort { name, port })
            .collect();
        let mut wire = transcode::expand_named_ports(&ports);
        wire.reverse();
        prop_assert_eq!(transcode::flatten_named_ports(&wire), ports);
    }
}
