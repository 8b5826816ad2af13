use super::ports::ChannelTriad;
use std::net::IpAddr;

/// Replication connection from the local node to one other member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerLink {
    /// 1-based position among non-local members, in descriptor order.
    pub index: usize,
    pub remote_node_id: u32,
    pub local_host: IpAddr,
    pub local: ChannelTriad,
    pub remote_host: IpAddr,
    pub remote: ChannelTriad,
}

impl PeerLink {
    /// Configuration key this link is written under.
    pub fn config_key(&self) -> String {
        format!("replconninfo{}", self.index)
    }

    /// Connection string in the `replconninfo` format.
    pub fn conninfo(&self) -> String {
        format!(
            "localhost={} localport={} localheartbeatport={} localservice={} \
             remotehost={} remoteport={} remoteheartbeatport={} remoteservice={}",
            self.local_host,
            self.local.data,
            self.local.heartbeat,
            self.local.service,
            self.remote_host,
            self.remote.data,
            self.remote.heartbeat,
            self.remote.service,
        )
    }
}
