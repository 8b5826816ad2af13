use super::ops::{
    DatabaseInitializer, FilesystemOps, InitRequest, OpResult, PackageFetcher, PrincipalManager,
    UserEntry,
};
use super::plan::ProvisionPlan;
use super::step::Step;
use crate::core::{ProvisionError, Result};
use anyhow::{anyhow, bail};
use log::info;
use std::path::PathBuf;

const BLOCK_HEADER: &str = "# added by dcf-provision";

/// External collaborators the steps call into.
pub struct Collaborators {
    pub package: Box<dyn PackageFetcher>,
    pub filesystem: Box<dyn FilesystemOps>,
    pub principals: Box<dyn PrincipalManager>,
    pub database: Box<dyn DatabaseInitializer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Ready,
    Running(Step),
    Completed,
    /// Terminal; completed steps are left in place.
    Aborted(Step),
}

/// Runs the provisioning steps once, in order, stopping at the first failure.
pub struct ProvisioningPipeline {
    plan: ProvisionPlan,
    ops: Collaborators,
    state: PipelineState,
    completed: Vec<Step>,
    package: Option<PathBuf>,
    principal: Option<UserEntry>,
}

impl ProvisioningPipeline {
    pub fn new(plan: ProvisionPlan, ops: Collaborators) -> Self {
        Self {
            plan,
            ops,
            state: PipelineState::Ready,
            completed: Vec::new(),
            package: None,
            principal: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn completed_steps(&self) -> &[Step] {
        &self.completed
    }

    pub fn plan(&self) -> &ProvisionPlan {
        &self.plan
    }

    pub fn run(&mut self) -> Result<()> {
        match self.state {
            PipelineState::Ready => {}
            PipelineState::Aborted(step) | PipelineState::Running(step) => {
                return Err(ProvisionError::step_failed(
                    step,
                    "pipeline already ran and stopped at this step",
                ));
            }
            PipelineState::Completed => {
                let last = self.completed.last().copied().unwrap_or(Step::PatchRuntimeConfig);
                return Err(ProvisionError::step_failed(
                    last,
                    "pipeline already completed",
                ));
            }
        }

        let total = Step::ALL.len();
        for (n, step) in Step::ALL.into_iter().enumerate() {
            self.state = PipelineState::Running(step);
            info!("[{}/{}] {}", n + 1, total, step);

            if let Err(e) = self.execute(step) {
                self.state = PipelineState::Aborted(step);
                return Err(ProvisionError::step_failed(step, format!("{:#}", e)));
            }
            self.completed.push(step);
        }

        self.state = PipelineState::Completed;
        info!(
            "node dcf_node_id={} provisioned under '{}'",
            self.plan.local_node_id,
            self.plan.layout.base_dir.display()
        );
        Ok(())
    }

    fn execute(&mut self, step: Step) -> OpResult<()> {
        match step {
            Step::AcquirePackage => self.acquire_package(),
            Step::PrepareLayout => self.prepare_layout(),
            Step::ProvisionPrincipal => self.provision_principal(),
            Step::UnpackPackage => self.unpack_package(),
            Step::ExportEnvironment => self.export_environment(),
            Step::ClaimOwnership => self.claim_ownership(),
            Step::InitializeDatabase => self.initialize_database(),
            Step::PatchAccessControl => self.patch_access_control(),
            Step::PatchRuntimeConfig => self.patch_runtime_config(),
        }
    }

    fn acquire_package(&mut self) -> OpResult<()> {
        info!("using package from {}", self.ops.package.describe());
        let path = self.ops.package.acquire()?;
        if !self.ops.filesystem.exists(&path) {
            bail!("package '{}' not found", path.display());
        }
        self.package = Some(path);
        Ok(())
    }

    fn prepare_layout(&mut self) -> OpResult<()> {
        let layout = &self.plan.layout;
        if self.ops.filesystem.exists(&layout.base_dir) {
            bail!("directory '{}' already exists", layout.base_dir.display());
        }
        self.ops.filesystem.create_dir_all(&layout.package_dir)?;
        self.ops.filesystem.create_dir_all(&layout.data_dir)?;
        info!(
            "package dir is '{}', data dir is '{}'",
            layout.package_dir.display(),
            layout.data_dir.display()
        );
        Ok(())
    }

    fn provision_principal(&mut self) -> OpResult<()> {
        let principals = &self.ops.principals;
        let (user, group) = (self.plan.user.as_str(), self.plan.group.as_str());

        let group_entry = match principals.group(group)? {
            Some(entry) => {
                info!("group '{}' already exists", group);
                entry
            }
            None => {
                info!("group '{}' not found, adding it", group);
                principals.add_group(group)?;
                principals
                    .group(group)?
                    .ok_or_else(|| anyhow!("group '{}' missing after creation", group))?
            }
        };

        let user_entry = match principals.user(user)? {
            Some(entry) if entry.gid != group_entry.gid => {
                bail!("user '{}' does not belong to group '{}'", user, group);
            }
            Some(entry) => {
                info!("user '{}' already exists", user);
                entry
            }
            None => {
                info!("user '{}' not found, adding it", user);
                principals.add_user(user, group)?;
                principals
                    .user(user)?
                    .ok_or_else(|| anyhow!("user '{}' missing after creation", user))?
            }
        };

        self.principal = Some(user_entry);
        Ok(())
    }

    fn unpack_package(&mut self) -> OpResult<()> {
        let package = self
            .package
            .as_ref()
            .ok_or_else(|| anyhow!("no package acquired"))?;
        self.ops
            .filesystem
            .unpack(package, &self.plan.layout.package_dir)
    }

    fn export_environment(&mut self) -> OpResult<()> {
        let principal = self
            .principal
            .as_ref()
            .ok_or_else(|| anyhow!("principal not provisioned"))?;
        let profile = principal.home.join(".bashrc");
        self.ops
            .filesystem
            .append(&profile, &appended_block(&self.plan.environment.render()))?;
        info!("appended environment to '{}'", profile.display());
        Ok(())
    }

    fn claim_ownership(&mut self) -> OpResult<()> {
        self.ops.filesystem.chown_recursive(
            &self.plan.layout.base_dir,
            &self.plan.user,
            &self.plan.group,
        )
    }

    fn initialize_database(&mut self) -> OpResult<()> {
        let request = InitRequest {
            user: self.plan.user.clone(),
            binary: self.plan.layout.initdb_binary(),
            node_name: self.plan.node_name.clone(),
            data_dir: self.plan.layout.data_dir.clone(),
            password: self.plan.init_password.clone(),
            consensus: true,
        };
        self.ops.database.initialize(&request)
    }

    fn patch_access_control(&mut self) -> OpResult<()> {
        let path = self.plan.layout.access_control_file();
        self.ops
            .filesystem
            .append(&path, &appended_block(&self.plan.access_control.render()))?;
        info!(
            "trusted {} cluster addresses in '{}'",
            self.plan.access_control.rules().len(),
            path.display()
        );
        Ok(())
    }

    fn patch_runtime_config(&mut self) -> OpResult<()> {
        let path = self.plan.layout.runtime_config_file();
        self.ops
            .filesystem
            .append(&path, &appended_block(&self.plan.runtime_config.render()))?;
        info!(
            "wrote {} parameters to '{}'",
            self.plan.runtime_config.len(),
            path.display()
        );
        Ok(())
    }
}

// Leading newline keeps the block on its own line when the file lacks a trailing one.
fn appended_block(body: &str) -> String {
    format!("\n{}\n{}", BLOCK_HEADER, body)
}
