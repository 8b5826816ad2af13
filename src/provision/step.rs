use std::fmt;

/// Provisioning steps in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    AcquirePackage,
    PrepareLayout,
    ProvisionPrincipal,
    UnpackPackage,
    ExportEnvironment,
    ClaimOwnership,
    InitializeDatabase,
    PatchAccessControl,
    PatchRuntimeConfig,
}

impl Step {
    pub const ALL: [Step; 9] = [
        Step::AcquirePackage,
        Step::PrepareLayout,
        Step::ProvisionPrincipal,
        Step::UnpackPackage,
        Step::ExportEnvironment,
        Step::ClaimOwnership,
        Step::InitializeDatabase,
        Step::PatchAccessControl,
        Step::PatchRuntimeConfig,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Step::AcquirePackage => "acquire package",
            Step::PrepareLayout => "prepare layout",
            Step::ProvisionPrincipal => "provision principal",
            Step::UnpackPackage => "unpack package",
            Step::ExportEnvironment => "export environment",
            Step::ClaimOwnership => "claim ownership",
            Step::InitializeDatabase => "initialize database",
            Step::PatchAccessControl => "patch access control",
            Step::PatchRuntimeConfig => "patch runtime config",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
