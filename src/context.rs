//! Per-run settings built once by the binary and handed to each component.

use crate::core::{ProvisionError, Result};
use log::warn;
use std::fs;
use std::process::Command;

/// Initial password handed to `gs_initdb` when none is configured.
pub const DEFAULT_INIT_PASSWORD: &str = "og@123456";

/// TLS policy for the package download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportSecurity {
    #[default]
    Verified,
    /// Certificates are not checked. Only reachable through an explicit operator flag.
    Insecure,
}

/// Settings shared by every step of a single provisioning run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub hostname: String,
    pub transport: TransportSecurity,
    pub init_password: String,
}

impl RunContext {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            transport: TransportSecurity::default(),
            init_password: DEFAULT_INIT_PASSWORD.to_string(),
        }
    }

    /// Context for this machine, using its kernel host name.
    pub fn for_local_host() -> Result<Self> {
        Ok(Self::new(local_hostname()?))
    }

    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        if transport == TransportSecurity::Insecure {
            warn!("TLS certificate verification is disabled for package download");
        }
        self.transport = transport;
        self
    }

    pub fn init_password(mut self, password: impl Into<String>) -> Self {
        self.init_password = password.into();
        self
    }
}

fn local_hostname() -> Result<String> {
    if let Ok(name) = fs::read_to_string("/proc/sys/kernel/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }

    let output = Command::new("hostname").output().map_err(|e| {
        ProvisionError::Environment(format!("cannot determine host name: {}", e))
    })?;
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || name.is_empty() {
        return Err(ProvisionError::Environment(
            "cannot determine host name".to_string(),
        ));
    }
    Ok(name)
}
