//! Ordered, fail-fast provisioning of the local node.

pub mod ops;
pub mod package;
pub mod pipeline;
pub mod plan;
pub mod step;
pub mod system;

pub use ops::{
    DatabaseInitializer, FilesystemOps, GroupEntry, InitRequest, OpResult, PackageFetcher,
    PrincipalManager, UserEntry,
};
pub use package::{HostPlatform, LocalPackage, RemotePackage};
pub use pipeline::{Collaborators, PipelineState, ProvisioningPipeline};
pub use plan::{InstallLayout, ProvisionPlan};
pub use step::Step;
pub use system::{GsInitdb, LocalFilesystem, SystemPrincipals};
