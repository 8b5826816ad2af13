use crate::core::{ProvisionError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Replication role of a member inside the DCF consensus group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRole {
    Leader,
    Follower,
    Passive,
    Logger,
}

impl MemberRole {
    /// Canonical spelling understood by the DCF subsystem.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Leader => "LEADER",
            MemberRole::Follower => "FOLLOWER",
            MemberRole::Passive => "PASSIVE",
            MemberRole::Logger => "LOGGER",
        }
    }
}

impl FromStr for MemberRole {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEADER" => Ok(MemberRole::Leader),
            "FOLLOWER" => Ok(MemberRole::Follower),
            "PASSIVE" => Ok(MemberRole::Passive),
            "LOGGER" => Ok(MemberRole::Logger),
            _ => Err(ProvisionError::Config(format!(
                "unknown member role '{}' (expected leader, follower, passive or logger)",
                s
            ))),
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MemberRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One entry of the topology descriptor's `hosts` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMember {
    node_id: u32,
    ip: IpAddr,
    role: MemberRole,
}

impl ClusterMember {
    pub fn new(node_id: u32, ip: IpAddr, role: MemberRole) -> Self {
        Self { node_id, ip, role }
    }

    /// DCF node id, unique across the cluster.
    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn role(&self) -> MemberRole {
        self.role
    }
}
