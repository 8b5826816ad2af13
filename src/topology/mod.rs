//! Immutable in-memory model of the cluster topology descriptor.

pub mod descriptor;
pub mod member;

pub use descriptor::{
    DEFAULT_BASE_DIR, DEFAULT_GROUP, DEFAULT_PORT, DEFAULT_STREAM_ID, DEFAULT_USER,
    MAX_PORT_OFFSET, TopologyDescriptor,
};
pub use member::{ClusterMember, MemberRole};
