use crate::core::{ProvisionError, Result};
use crate::topology::MemberRole;
use serde::Serialize;
use std::net::IpAddr;

/// One member as seen by the local DCF subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusMember {
    pub stream_id: u32,
    pub node_id: u32,
    pub ip: IpAddr,
    pub port: u16,
    pub role: MemberRole,
}

/// Full DCF membership, identical on every node of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConsensusGroupDescriptor {
    members: Vec<ConsensusMember>,
}

impl ConsensusGroupDescriptor {
    pub fn new(members: Vec<ConsensusMember>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[ConsensusMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Compact JSON array, the value of `dcf_config`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            ProvisionError::Config(format!("failed to serialize consensus group: {}", e))
        })
    }
}
