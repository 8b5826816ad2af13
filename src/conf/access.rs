use std::fmt::Write;
use std::net::IpAddr;

/// `pg_hba.conf` rule granting unauthenticated access from a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustRule {
    address: IpAddr,
}

impl TrustRule {
    pub fn host(address: IpAddr) -> Self {
        Self { address }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    fn render(&self) -> String {
        let prefix = if self.address.is_ipv4() { 32 } else { 128 };
        format!("host\tall\tall\t{}/{}\ttrust", self.address, prefix)
    }
}

/// Rules appended to `pg_hba.conf`, one per cluster member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlFragment {
    rules: Vec<TrustRule>,
}

impl AccessControlFragment {
    /// Trusts every address in order, the local one included.
    pub fn trust_all(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            rules: addresses.into_iter().map(TrustRule::host).collect(),
        }
    }

    pub fn rules(&self) -> &[TrustRule] {
        &self.rules
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            let _ = writeln!(out, "{}", rule.render());
        }
        out
    }
}
