// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects and Subnet Tiering
//!
//! One VPC address range is carved into non-overlapping subnets, one per
//! (tier configuration, availability zone) pair. The tier decides the
//! routes a subnet receives:
//!
//! - [`SubnetTier::Public`]: default route to the internet gateway
//! - [`SubnetTier::PrivateWithEgress`]: default route to a NAT gateway
//! - [`SubnetTier::Isolated`]: no default route at all

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLength(u8),

    #[error("VPC prefix /{0} outside the allowed range /16-/28")]
    InvalidVpcPrefix(u8),

    #[error("Subnet mask /{mask} for {subnet} must be between the VPC prefix /{vpc_prefix} and /28")]
    InvalidSubnetMask {
        subnet: String,
        mask: u8,
        vpc_prefix: u8,
    },

    #[error("Address space exhausted while allocating /{mask} for {subnet}")]
    AddressSpaceExhausted { subnet: String, mask: u8 },

    #[error("Duplicate subnet configuration name: {0}")]
    DuplicateSubnetName(String),

    #[error("No subnet configurations declared")]
    NoSubnetConfigurations,

    #[error("No availability zones available for placement")]
    NoAvailabilityZones,

    #[error("NAT gateways requested but no public subnet tier is declared")]
    NatWithoutPublicTier,

    #[error("Private-with-egress tier {0} declared but no NAT gateway is configured")]
    EgressTierWithoutNat(String),

    #[error("{requested} NAT gateways requested but only {zones} availability zones are used")]
    TooManyNatGateways { requested: usize, zones: usize },

    #[error("Isolated subnet {0} carries a route to a gateway")]
    IsolatedRoute(String),
}

/// IPv4 network in CIDR notation
///
/// Invariants:
/// - Prefix length 0-32
/// - Host bits are cleared (the stored address is the network address)
///
/// # Examples
///
/// ```rust
/// use tiered_infrastructure::domain::Ipv4Cidr;
///
/// let vpc = Ipv4Cidr::new("192.168.0.0/16").unwrap();
/// let subnet = Ipv4Cidr::new("192.168.4.0/22").unwrap();
/// assert!(vpc.contains(&subnet));
/// assert_eq!(subnet.to_string(), "192.168.4.0/22");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Cidr {
    /// Parse a CIDR string such as `10.0.0.0/16`
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let address = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(address, prefix_length)
    }

    /// Create from an address and prefix; host bits are masked off
    pub fn from_parts(address: Ipv4Addr, prefix_length: u8) -> Result<Self, NetworkError> {
        if prefix_length > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        let network = Ipv4Addr::from(u32::from(address) & Self::mask(prefix_length));
        Ok(Self {
            network,
            prefix_length,
        })
    }

    /// Constructor for well-known blocks; prefixes above 32 are clamped
    pub const fn from_octets(octets: [u8; 4], prefix_length: u8) -> Self {
        let prefix_length = if prefix_length > 32 { 32 } else { prefix_length };
        let mask = if prefix_length == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_length as u32)
        };
        let o = (u32::from_be_bytes(octets) & mask).to_be_bytes();
        Self {
            network: Ipv4Addr::new(o[0], o[1], o[2], o[3]),
            prefix_length,
        }
    }

    /// `0.0.0.0/0`
    pub fn any() -> Self {
        Self {
            network: Ipv4Addr::UNSPECIFIED,
            prefix_length: 0,
        }
    }

    fn mask(prefix_length: u8) -> u32 {
        if prefix_length == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_length))
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_length))
    }

    /// First address as an integer
    pub fn first(&self) -> u64 {
        u64::from(u32::from(self.network))
    }

    /// Last address as an integer
    pub fn last(&self) -> u64 {
        self.first() + self.size() - 1
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.first() >= self.first() && other.last() <= self.last()
    }

    /// Whether the two blocks share at least one address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Whether this is the default route destination
    pub fn is_any(&self) -> bool {
        self.prefix_length == 0
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_length)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

/// Subnet classification by routing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    /// Direct route to an internet gateway
    Public,
    /// Outbound-only internet access through a NAT gateway
    PrivateWithEgress,
    /// No internet route in either direction
    Isolated,
}

impl SubnetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::PrivateWithEgress => "private_with_egress",
            Self::Isolated => "isolated",
        }
    }

    /// Whether subnets of this tier get any default route
    pub fn has_internet_route(&self) -> bool {
        !matches!(self, Self::Isolated)
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One subnet group, replicated across availability zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetConfiguration {
    pub name: String,
    pub tier: SubnetTier,
    pub cidr_mask: u8,
}

impl SubnetConfiguration {
    pub fn new(name: impl Into<String>, tier: SubnetTier, cidr_mask: u8) -> Self {
        Self {
            name: name.into(),
            tier,
            cidr_mask,
        }
    }
}

/// Declarative description of a VPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    pub cidr: Ipv4Cidr,
    pub max_azs: usize,
    pub subnets: Vec<SubnetConfiguration>,
    pub nat_gateways: usize,
}

/// Where a route sends traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum RouteTarget {
    InternetGateway,
    NatGateway { name: String },
}

/// Route table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub destination: Ipv4Cidr,
    #[serde(flatten)]
    pub target: RouteTarget,
}

/// Allocated subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub name: String,
    pub group: String,
    pub tier: SubnetTier,
    pub availability_zone: String,
    pub cidr: Ipv4Cidr,
    pub routes: Vec<Route>,
}

/// NAT gateway placed in a public subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGateway {
    pub name: String,
    pub subnet: String,
    pub availability_zone: String,
}

/// Concrete subnet allocation and routing for a [`NetworkSpec`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLayout {
    pub cidr: Ipv4Cidr,
    pub availability_zones: Vec<String>,
    pub internet_gateway: bool,
    pub subnets: Vec<Subnet>,
    pub nat_gateways: Vec<NatGateway>,
}

impl NetworkSpec {
    /// Smallest subnet block the provider accepts
    pub const MAX_SUBNET_MASK: u8 = 28;

    /// Largest VPC block the provider accepts
    pub const MIN_VPC_PREFIX: u8 = 16;

    /// Check the spec independently of the zones it will be laid out in
    pub fn validate(&self) -> Result<(), NetworkError> {
        let vpc_prefix = self.cidr.prefix_length();
        if !(Self::MIN_VPC_PREFIX..=Self::MAX_SUBNET_MASK).contains(&vpc_prefix) {
            return Err(NetworkError::InvalidVpcPrefix(vpc_prefix));
        }

        if self.subnets.is_empty() {
            return Err(NetworkError::NoSubnetConfigurations);
        }

        let mut names = HashSet::new();
        for config in &self.subnets {
            if !names.insert(config.name.as_str()) {
                return Err(NetworkError::DuplicateSubnetName(config.name.clone()));
            }
            if config.cidr_mask < vpc_prefix || config.cidr_mask > Self::MAX_SUBNET_MASK {
                return Err(NetworkError::InvalidSubnetMask {
                    subnet: config.name.clone(),
                    mask: config.cidr_mask,
                    vpc_prefix,
                });
            }
        }

        let has_public = self.subnets.iter().any(|s| s.tier == SubnetTier::Public);
        if self.nat_gateways > 0 && !has_public {
            return Err(NetworkError::NatWithoutPublicTier);
        }

        if self.nat_gateways == 0 {
            if let Some(egress) = self
                .subnets
                .iter()
                .find(|s| s.tier == SubnetTier::PrivateWithEgress)
            {
                return Err(NetworkError::EgressTierWithoutNat(egress.name.clone()));
            }
        }

        Ok(())
    }

    /// Allocate subnets and routes across the given availability zones
    ///
    /// Uses the first `max_azs` zones. Subnets are allocated in
    /// configuration order, then zone order, each block aligned to its own
    /// size. NAT gateways go into the public subnets of the first zones and
    /// private-with-egress subnets use them round-robin by zone.
    pub fn layout(&self, availability_zones: &[String]) -> Result<NetworkLayout, NetworkError> {
        self.validate()?;

        let zones: Vec<String> = availability_zones
            .iter()
            .take(self.max_azs)
            .cloned()
            .collect();
        if zones.is_empty() {
            return Err(NetworkError::NoAvailabilityZones);
        }
        if self.nat_gateways > zones.len() {
            return Err(NetworkError::TooManyNatGateways {
                requested: self.nat_gateways,
                zones: zones.len(),
            });
        }

        let public_group = self
            .subnets
            .iter()
            .find(|s| s.tier == SubnetTier::Public)
            .map(|s| s.name.clone());

        let nat_gateways: Vec<NatGateway> = match &public_group {
            Some(group) => zones
                .iter()
                .take(self.nat_gateways)
                .enumerate()
                .map(|(index, zone)| NatGateway {
                    name: format!("{}Subnet{}NatGateway", group, index + 1),
                    subnet: format!("{}Subnet{}", group, index + 1),
                    availability_zone: zone.clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        let mut cursor = self.cidr.first();
        let end = self.cidr.last();
        let mut subnets = Vec::with_capacity(self.subnets.len() * zones.len());

        for config in &self.subnets {
            for (zone_index, zone) in zones.iter().enumerate() {
                let name = format!("{}Subnet{}", config.name, zone_index + 1);
                let size = 1u64 << (32 - u32::from(config.cidr_mask));
                let start = cursor.div_ceil(size) * size;

                if start + size - 1 > end {
                    return Err(NetworkError::AddressSpaceExhausted {
                        subnet: name,
                        mask: config.cidr_mask,
                    });
                }

                let cidr = Ipv4Cidr::from_parts(Ipv4Addr::from(start as u32), config.cidr_mask)?;
                cursor = start + size;

                let routes = match config.tier {
                    SubnetTier::Public => vec![Route {
                        destination: Ipv4Cidr::any(),
                        target: RouteTarget::InternetGateway,
                    }],
                    SubnetTier::PrivateWithEgress => {
                        let nat = &nat_gateways[zone_index % nat_gateways.len()];
                        vec![Route {
                            destination: Ipv4Cidr::any(),
                            target: RouteTarget::NatGateway {
                                name: nat.name.clone(),
                            },
                        }]
                    }
                    SubnetTier::Isolated => Vec::new(),
                };

                subnets.push(Subnet {
                    name,
                    group: config.name.clone(),
                    tier: config.tier,
                    availability_zone: zone.clone(),
                    cidr,
                    routes,
                });
            }
        }

        let layout = NetworkLayout {
            cidr: self.cidr,
            availability_zones: zones,
            internet_gateway: public_group.is_some(),
            subnets,
            nat_gateways,
        };
        layout.verify()?;

        Ok(layout)
    }
}

impl NetworkLayout {
    /// Subnets of one tier, in allocation order
    pub fn subnets_in(&self, tier: SubnetTier) -> impl Iterator<Item = &Subnet> {
        self.subnets.iter().filter(move |s| s.tier == tier)
    }

    /// Names of the subnets in one tier
    pub fn subnet_names(&self, tier: SubnetTier) -> Vec<String> {
        self.subnets_in(tier).map(|s| s.name.clone()).collect()
    }

    /// Re-check the layout invariants
    ///
    /// - Every isolated subnet has zero routes
    /// - Subnets are inside the VPC range and pairwise disjoint
    pub fn verify(&self) -> Result<(), NetworkError> {
        for subnet in self.subnets_in(SubnetTier::Isolated) {
            if !subnet.routes.is_empty() {
                return Err(NetworkError::IsolatedRoute(subnet.name.clone()));
            }
        }

        for (index, subnet) in self.subnets.iter().enumerate() {
            if !self.cidr.contains(&subnet.cidr) {
                return Err(NetworkError::AddressSpaceExhausted {
                    subnet: subnet.name.clone(),
                    mask: subnet.cidr.prefix_length(),
                });
            }
            if let Some(other) = self.subnets[index + 1..]
                .iter()
                .find(|other| other.cidr.overlaps(&subnet.cidr))
            {
                return Err(NetworkError::InvalidCidr(format!(
                    "{} overlaps {}",
                    subnet.cidr, other.cidr
                )));
            }
        }

        Ok(())
    }
}
