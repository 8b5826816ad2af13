use super::ops::{OpResult, PackageFetcher};
use crate::context::TransportSecurity;
use crate::core::{ProvisionError, Result};
use anyhow::{Context, bail};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const RELEASE_VERSION: &str = "2.1.0";
const RELEASE_HOST: &str = "https://opengauss.obs.cn-south-1.myhuaweicloud.com";
const FALLBACK_DISTRIBUTION: &str = "openEuler";

/// Architecture and distribution used to pick a release build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub arch: String,
    pub distribution: String,
}

impl HostPlatform {
    pub fn new(arch: impl Into<String>, distribution: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            distribution: distribution.into(),
        }
    }

    pub fn detect() -> Self {
        let distribution = fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|text| os_release_id(&text))
            .unwrap_or_else(|| FALLBACK_DISTRIBUTION.to_string());
        Self::new(std::env::consts::ARCH, distribution)
    }

    /// Download URL of the release build for this platform.
    pub fn package_url(&self) -> Result<String> {
        let (flavor, os) = match self.arch.as_str() {
            "x86_64" if self.distribution.eq_ignore_ascii_case("centos") => ("x86", "CentOS"),
            "x86_64" => ("x86_openEuler", "openEuler"),
            "aarch64" => ("arm", "openEuler"),
            other => {
                return Err(ProvisionError::Environment(format!(
                    "unsupported machine type '{}'",
                    other
                )));
            }
        };
        Ok(format!(
            "{}/{}/{}/openGauss-{}-{}-64bit.tar.bz2",
            RELEASE_HOST, RELEASE_VERSION, flavor, RELEASE_VERSION, os
        ))
    }
}

fn os_release_id(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim().strip_prefix("ID="))
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Archive already present on local disk.
#[derive(Debug, Clone)]
pub struct LocalPackage {
    path: PathBuf,
}

impl LocalPackage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PackageFetcher for LocalPackage {
    fn acquire(&self) -> OpResult<PathBuf> {
        if !self.path.is_file() {
            bail!("file '{}' not found", self.path.display());
        }
        Ok(self.path.clone())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Downloads the archive into a kept temporary file.
#[derive(Debug, Clone)]
pub struct RemotePackage {
    url: String,
    transport: TransportSecurity,
}

impl RemotePackage {
    pub fn new(url: impl Into<String>, transport: TransportSecurity) -> Self {
        Self {
            url: url.into(),
            transport,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PackageFetcher for RemotePackage {
    fn acquire(&self) -> OpResult<PathBuf> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .danger_accept_invalid_certs(self.transport == TransportSecurity::Insecure)
            .build()
            .context("failed to build HTTP client")?;

        info!("downloading {}", self.url);
        let mut response = client
            .get(&self.url)
            .send()
            .with_context(|| format!("request to '{}' failed", self.url))?
            .error_for_status()
            .with_context(|| format!("download of '{}' rejected", self.url))?;

        let mut file = tempfile::Builder::new()
            .prefix("opengauss-")
            .suffix(".tar.bz2")
            .tempfile()
            .context("failed to create download file")?;
        let bytes = response
            .copy_to(&mut file)
            .context("failed to write download")?;
        let (_, path) = file.keep().context("failed to keep download file")?;

        info!("downloaded {} bytes to '{}'", bytes, path.display());
        Ok(path)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
