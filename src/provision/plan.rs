use crate::conf::{AccessControlFragment, ConfValue, EnvironmentExports, RuntimeConfFragment};
use crate::context::RunContext;
use crate::core::Result;
use crate::synth::synthesize;
use crate::topology::{ClusterMember, TopologyDescriptor};
use std::path::{Path, PathBuf};

/// Fixed directory layout under the install base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub base_dir: PathBuf,
    pub package_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl InstallLayout {
    pub fn under(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            package_dir: base_dir.join("pkg"),
            data_dir: base_dir.join("data"),
            base_dir,
        }
    }

    pub fn initdb_binary(&self) -> PathBuf {
        self.package_dir.join("bin").join("gs_initdb")
    }

    pub fn access_control_file(&self) -> PathBuf {
        self.data_dir.join("pg_hba.conf")
    }

    pub fn runtime_config_file(&self) -> PathBuf {
        self.data_dir.join("postgresql.conf")
    }

    pub fn dcf_data_dir(&self) -> PathBuf {
        self.data_dir.join("dcf_data")
    }

    pub fn dcf_log_dir(&self) -> PathBuf {
        self.data_dir.join("dcf_log")
    }
}

/// Everything the pipeline will write for the local node.
///
/// Built before any side effect so that descriptor and identity problems abort the run
/// while the host is still untouched.
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    pub layout: InstallLayout,
    pub user: String,
    pub group: String,
    pub local_node_id: u32,
    pub node_name: String,
    pub init_password: String,
    pub environment: EnvironmentExports,
    pub access_control: AccessControlFragment,
    pub runtime_config: RuntimeConfFragment,
}

impl ProvisionPlan {
    pub fn build(
        topology: &TopologyDescriptor,
        local: &ClusterMember,
        ctx: &RunContext,
    ) -> Result<Self> {
        let layout = InstallLayout::under(topology.base_dir());
        let (consensus, peer_links) = synthesize(topology, local);

        let mut runtime_config = RuntimeConfFragment::new();
        runtime_config.set("port", topology.port())?;
        runtime_config.set("dcf_node_id", local.node_id())?;
        runtime_config.set("dcf_data_path", path_value(&layout.dcf_data_dir()))?;
        runtime_config.set("dcf_log_path", path_value(&layout.dcf_log_dir()))?;
        runtime_config.set("dcf_config", ConfValue::Text(consensus.to_json()?))?;
        for link in &peer_links {
            runtime_config.set(link.config_key(), ConfValue::Text(link.conninfo()))?;
        }

        Ok(Self {
            environment: EnvironmentExports::for_install(&layout.package_dir, &layout.data_dir),
            access_control: AccessControlFragment::trust_all(topology.host_ips()),
            layout,
            user: topology.user().to_string(),
            group: topology.group().to_string(),
            local_node_id: local.node_id(),
            node_name: ctx.hostname.clone(),
            init_password: ctx.init_password.clone(),
            runtime_config,
        })
    }
}

fn path_value(path: &Path) -> ConfValue {
    ConfValue::Text(path.display().to_string())
}
