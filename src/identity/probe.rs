use crate::core::{ProvisionError, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::net::IpAddr;
use std::process::Command;

lazy_static! {
    static ref INET_ADDR: Regex =
        Regex::new(r"\binet6?\s+(?:addr:\s*)?([0-9A-Fa-f:.]+)").unwrap();
}

/// Host capability that lists the machine's network addresses.
pub trait LocalAddressProbe {
    /// Non-loopback addresses configured on this host.
    fn local_addresses(&self) -> Result<Vec<IpAddr>>;
}

/// Probes interface addresses with `ip -o addr show`, falling back to `ifconfig`.
#[derive(Debug, Clone, Default)]
pub struct SystemAddressProbe;

impl SystemAddressProbe {
    pub fn new() -> Self {
        Self
    }

    fn listing() -> Result<String> {
        let candidates: [(&str, &[&str]); 2] = [("ip", &["-o", "addr", "show"]), ("ifconfig", &[])];
        for (program, args) in candidates {
            match Command::new(program).args(args).output() {
                Ok(output) if output.status.success() => {
                    debug!("listing interface addresses with '{}'", program);
                    return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
                }
                Ok(output) => debug!("'{}' exited with {}", program, output.status),
                Err(e) => debug!("'{}' unavailable: {}", program, e),
            }
        }
        Err(ProvisionError::Environment(
            "neither 'ip' nor 'ifconfig' could list interface addresses".to_string(),
        ))
    }
}

impl LocalAddressProbe for SystemAddressProbe {
    fn local_addresses(&self) -> Result<Vec<IpAddr>> {
        let addresses = parse_interface_addresses(&Self::listing()?);
        if addresses.is_empty() {
            return Err(ProvisionError::Identity(
                "no non-loopback local address found".to_string(),
            ));
        }
        Ok(addresses)
    }
}

/// Extracts non-loopback addresses from `ip -o addr` or `ifconfig` output.
pub fn parse_interface_addresses(listing: &str) -> Vec<IpAddr> {
    let mut addresses = Vec::new();
    for captures in INET_ADDR.captures_iter(listing) {
        let Ok(addr) = captures[1].parse::<IpAddr>() else {
            continue;
        };
        if !addr.is_loopback() && !addresses.contains(&addr) {
            addresses.push(addr);
        }
    }
    addresses
}
