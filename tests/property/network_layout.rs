// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Subnet Allocation
//!
//! Three-tier specs with random masks, zone counts and NAT counts are laid
//! out; the allocation must stay disjoint, in range and correctly routed.

use proptest::prelude::*;
use tiered_infrastructure::domain::{
    Ipv4Cidr, NetworkSpec, RouteTarget, SubnetConfiguration, SubnetTier,
};

fn zones() -> Vec<String> {
    vec![
        "us-east-1a".to_string(),
        "us-east-1b".to_string(),
        "us-east-1c".to_string(),
    ]
}

fn three_tier_spec() -> impl Strategy<Value = NetworkSpec> {
    (1usize..=3, 20u8..=26, 20u8..=26, 20u8..=26)
        .prop_flat_map(|(max_azs, public, compute, isolated)| {
            (1usize..=max_azs).prop_map(move |nat_gateways| NetworkSpec {
                name: "prop-vpc".to_string(),
                cidr: Ipv4Cidr::from_octets([10, 0, 0, 0], 16),
                max_azs,
                subnets: vec![
                    SubnetConfiguration::new("Public", SubnetTier::Public, public),
                    SubnetConfiguration::new("Compute", SubnetTier::PrivateWithEgress, compute),
                    SubnetConfiguration::new("Data", SubnetTier::Isolated, isolated),
                ],
                nat_gateways,
            })
        })
}

proptest! {
    /// One subnet per tier per zone, all inside the VPC and pairwise disjoint
    #[test]
    fn prop_subnets_are_disjoint_and_contained(spec in three_tier_spec()) {
        let layout = spec.layout(&zones()).unwrap();

        prop_assert_eq!(layout.availability_zones.len(), spec.max_azs);
        prop_assert_eq!(layout.subnets.len(), 3 * spec.max_azs);

        for (i, a) in layout.subnets.iter().enumerate() {
            prop_assert!(spec.cidr.contains(&a.cidr), "{} outside VPC", a.name);
            for b in layout.subnets.iter().skip(i + 1) {
                prop_assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.name, b.name);
            }
        }
    }

    /// Isolated subnets never route; private subnets use NATs round-robin
    #[test]
    fn prop_routes_follow_tiers(spec in three_tier_spec()) {
        let layout = spec.layout(&zones()).unwrap();
        prop_assert_eq!(layout.nat_gateways.len(), spec.nat_gateways);
        prop_assert!(layout.verify().is_ok());

        for subnet in layout.subnets_in(SubnetTier::Isolated) {
            prop_assert!(subnet.routes.is_empty());
        }

        for (zone_index, subnet) in layout.subnets_in(SubnetTier::PrivateWithEgress).enumerate() {
            let expected = &layout.nat_gateways[zone_index % layout.nat_gateways.len()];
            prop_assert_eq!(subnet.routes.len(), 1);
            prop_assert_eq!(
                &subnet.routes[0].target,
                &RouteTarget::NatGateway { name: expected.name.clone() }
            );
        }

        for nat in &layout.nat_gateways {
            let hosted = layout
                .subnets_in(SubnetTier::Public)
                .any(|s| s.name == nat.subnet && s.availability_zone == nat.availability_zone);
            prop_assert!(hosted, "{} is not in a public subnet", nat.name);
        }
    }

    /// More NAT gateways than zones is refused
    #[test]
    fn prop_nat_count_bounded_by_zones(spec in three_tier_spec(), extra in 1usize..=3) {
        let mut spec = spec;
        spec.nat_gateways = spec.max_azs + extra;
        prop_assert!(spec.layout(&zones()).is_err());
    }
}
