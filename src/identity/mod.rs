//! Picks the topology member that corresponds to this machine.

pub mod probe;

pub use probe::{LocalAddressProbe, SystemAddressProbe};

use crate::core::{ProvisionError, Result};
use crate::topology::{ClusterMember, TopologyDescriptor};
use log::debug;
use std::collections::HashSet;
use std::net::IpAddr;

/// Resolves the local member by intersecting `local_addresses` with member addresses.
///
/// Loopback addresses never identify a node and are dropped before matching. Exactly one
/// member must match; several matches are rejected rather than picking one.
pub fn resolve<'a>(
    topology: &'a TopologyDescriptor,
    local_addresses: &[IpAddr],
) -> Result<&'a ClusterMember> {
    let local: HashSet<IpAddr> = local_addresses
        .iter()
        .copied()
        .filter(|addr| !addr.is_loopback())
        .collect();

    let matches = topology
        .members()
        .iter()
        .filter(|member| local.contains(&member.ip()))
        .collect::<Vec<_>>();

    match matches.as_slice() {
        [member] => {
            debug!(
                "resolved local member dcf_node_id={} ip={}",
                member.node_id(),
                member.ip()
            );
            Ok(*member)
        }
        [] => Err(ProvisionError::Identity(
            "no topology member matches this host".to_string(),
        )),
        many => {
            let ids = many
                .iter()
                .map(|m| format!("{}@{}", m.node_id(), m.ip()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(ProvisionError::Identity(format!(
                "several topology members match this host ({}); refusing to guess",
                ids
            )))
        }
    }
}
