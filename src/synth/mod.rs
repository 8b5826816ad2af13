//! Derives the local node's consensus membership and replication links.

pub mod consensus;
pub mod peer_link;
pub mod ports;

pub use consensus::{ConsensusGroupDescriptor, ConsensusMember};
pub use peer_link::PeerLink;
pub use ports::{ChannelTriad, PortScheme};

use crate::topology::{ClusterMember, TopologyDescriptor};

/// Computes the consensus group and the peer links for `local`.
///
/// Output depends only on the shared topology and the choice of local member, so the
/// consensus group is the same on every node.
pub fn synthesize(
    topology: &TopologyDescriptor,
    local: &ClusterMember,
) -> (ConsensusGroupDescriptor, Vec<PeerLink>) {
    let ports = PortScheme::new(topology.port());

    let consensus = ConsensusGroupDescriptor::new(
        topology
            .members()
            .iter()
            .map(|member| ConsensusMember {
                stream_id: topology.stream_id(),
                node_id: member.node_id(),
                ip: member.ip(),
                port: ports.consensus(),
                role: member.role(),
            })
            .collect(),
    );

    // All members share one base port, so both ends use the same triad.
    // Members on the local address are never peers, whatever their node id.
    let local_triad = ports.replication();
    let remote_triad = ports.replication();

    let peer_links = topology
        .members()
        .iter()
        .filter(|member| member.ip() != local.ip())
        .enumerate()
        .map(|(idx, peer)| PeerLink {
            index: idx + 1,
            remote_node_id: peer.node_id(),
            local_host: local.ip(),
            local: local_triad,
            remote_host: peer.ip(),
            remote: remote_triad,
        })
        .collect();

    (consensus, peer_links)
}
