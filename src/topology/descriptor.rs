use super::member::{ClusterMember, MemberRole};
use crate::core::{ProvisionError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_DIR: &str = "/opt/opengauss";
pub const DEFAULT_USER: &str = "omm";
pub const DEFAULT_GROUP: &str = "dbgrp";
pub const DEFAULT_PORT: u16 = 26000;
pub const DEFAULT_STREAM_ID: u32 = 1;

/// Largest offset added to the base port by the derived port scheme.
pub const MAX_PORT_OFFSET: u16 = 4;

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    base_dir: Option<String>,
    user: Option<String>,
    group: Option<String>,
    port: Option<u64>,
    dcf_stream_id: Option<u64>,
    hosts: Option<Vec<RawHost>>,
}

#[derive(Debug, Deserialize)]
struct RawHost {
    dcf_node_id: Option<u64>,
    ip: Option<String>,
    role: Option<String>,
}

/// Shared description of the whole cluster.
///
/// Every node is provisioned from the same descriptor, so everything derived from it
/// (consensus membership, peer links, trust rules) agrees across the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyDescriptor {
    members: Vec<ClusterMember>,
    base_dir: PathBuf,
    user: String,
    group: String,
    port: u16,
    stream_id: u32,
}

impl TopologyDescriptor {
    /// Reads and validates a descriptor file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProvisionError::Config(format!(
                "config file '{}' does not exist",
                path.display()
            )));
        }
        let raw = fs::read_to_string(path).map_err(|e| {
            ProvisionError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses a descriptor from its JSON text.
    ///
    /// Absent, empty or zero values of `base_dir`, `user`, `group`, `port` and
    /// `dcf_stream_id` fall back to the defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let raw: RawDescriptor = serde_json::from_str(raw)
            .map_err(|e| ProvisionError::Config(format!("malformed descriptor: {}", e)))?;

        let hosts = match raw.hosts {
            Some(hosts) if !hosts.is_empty() => hosts,
            _ => return Err(ProvisionError::Config("hosts required".to_string())),
        };

        let port = match raw.port {
            None | Some(0) => DEFAULT_PORT,
            Some(port) => u16::try_from(port).map_err(|_| {
                ProvisionError::Config(format!("port {} is out of range", port))
            })?,
        };
        let stream_id = match raw.dcf_stream_id {
            None | Some(0) => DEFAULT_STREAM_ID,
            Some(id) => u32::try_from(id).map_err(|_| {
                ProvisionError::Config(format!("dcf_stream_id {} is out of range", id))
            })?,
        };

        let members = hosts
            .into_iter()
            .enumerate()
            .map(|(idx, host)| member_from_raw(idx, host))
            .collect::<Result<Vec<_>>>()?;

        Self::new(
            members,
            non_empty_or(raw.base_dir, DEFAULT_BASE_DIR),
            non_empty_or(raw.user, DEFAULT_USER),
            non_empty_or(raw.group, DEFAULT_GROUP),
            port,
            stream_id,
        )
    }

    /// Builds a descriptor from already-typed parts, enforcing its invariants.
    pub fn new(
        members: Vec<ClusterMember>,
        base_dir: impl Into<PathBuf>,
        user: impl Into<String>,
        group: impl Into<String>,
        port: u16,
        stream_id: u32,
    ) -> Result<Self> {
        if members.is_empty() {
            return Err(ProvisionError::Config("hosts required".to_string()));
        }

        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(member.node_id()) {
                return Err(ProvisionError::Config(format!(
                    "dcf_node_id {} appears more than once",
                    member.node_id()
                )));
            }
        }

        if port.checked_add(MAX_PORT_OFFSET).is_none() {
            return Err(ProvisionError::Config(format!(
                "port {} leaves no room for derived ports up to +{}",
                port, MAX_PORT_OFFSET
            )));
        }

        Ok(Self {
            members,
            base_dir: base_dir.into(),
            user: user.into(),
            group: group.into(),
            port,
            stream_id,
        })
    }

    /// Members in descriptor order.
    pub fn members(&self) -> &[ClusterMember] {
        &self.members
    }

    pub fn member(&self, node_id: u32) -> Option<&ClusterMember> {
        self.members.iter().find(|m| m.node_id() == node_id)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Base port; the client listener uses it directly, derived channels use offsets.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn host_ips(&self) -> Vec<IpAddr> {
        self.members.iter().map(|m| m.ip()).collect()
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

fn member_from_raw(idx: usize, host: RawHost) -> Result<ClusterMember> {
    let missing =
        |field: &str| ProvisionError::Config(format!("hosts[{}] is missing '{}'", idx, field));

    let node_id = host.dcf_node_id.ok_or_else(|| missing("dcf_node_id"))?;
    let node_id = u32::try_from(node_id).map_err(|_| {
        ProvisionError::Config(format!(
            "hosts[{}] dcf_node_id {} is out of range",
            idx, node_id
        ))
    })?;

    let ip = host.ip.ok_or_else(|| missing("ip"))?;
    let ip = ip.trim().parse::<IpAddr>().map_err(|_| {
        ProvisionError::Config(format!("hosts[{}] has invalid ip '{}'", idx, ip))
    })?;

    let role = host.role.ok_or_else(|| missing("role"))?;
    let role = role.parse::<MemberRole>()?;

    Ok(ClusterMember::new(node_id, ip, role))
}
