// ============================================================================
// dcf-provision library
// ============================================================================

pub mod conf;
pub mod context;
pub mod core;
pub mod identity;
pub mod provision;
pub mod synth;
pub mod topology;

pub use context::{RunContext, TransportSecurity};
pub use crate::core::{ProvisionError, Result};
pub use identity::{LocalAddressProbe, SystemAddressProbe, resolve};
pub use provision::{
    Collaborators, PipelineState, ProvisionPlan, ProvisioningPipeline, Step,
};
pub use synth::{ConsensusGroupDescriptor, PeerLink, synthesize};
pub use topology::{ClusterMember, MemberRole, TopologyDescriptor};

/// Derives the local node's provisioning plan from the shared topology.
///
/// Probes local addresses, picks the matching member and renders every file fragment.
/// Nothing on the host is modified.
///
/// # Examples
///
/// ```
/// use dcf_provision::{LocalAddressProbe, RunContext, TopologyDescriptor, plan_local_node};
/// use std::net::IpAddr;
///
/// struct Fixed(Vec<IpAddr>);
///
/// impl LocalAddressProbe for Fixed {
///     fn local_addresses(&self) -> dcf_provision::Result<Vec<IpAddr>> {
///         Ok(self.0.clone())
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let topology = TopologyDescriptor::from_json_str(
///     r#"{"hosts":[{"dcf_node_id":1,"ip":"10.0.0.1","role":"leader"},
///                  {"dcf_node_id":2,"ip":"10.0.0.2","role":"follower"}]}"#,
/// )?;
/// let probe = Fixed(vec!["10.0.0.2".parse()?]);
/// let plan = plan_local_node(&topology, &probe, &RunContext::new("db-2"))?;
/// assert_eq!(plan.local_node_id, 2);
/// # Ok(())
/// # }
/// ```
pub fn plan_local_node(
    topology: &TopologyDescriptor,
    probe: &dyn LocalAddressProbe,
    ctx: &RunContext,
) -> Result<ProvisionPlan> {
    let addresses = probe.local_addresses()?;
    let local = resolve(topology, &addresses)?;
    log::info!(
        "this host is dcf_node_id={} ({}, {})",
        local.node_id(),
        local.ip(),
        local.role()
    );
    ProvisionPlan::build(topology, local, ctx)
}
