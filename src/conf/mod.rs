//! Structured models of the text blocks appended to node-local files.

pub mod access;
pub mod profile;
pub mod runtime;

pub use access::{AccessControlFragment, TrustRule};
pub use profile::EnvironmentExports;
pub use runtime::{ConfValue, RuntimeConfFragment};
