use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use super::Role;

/// How a target entered the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOrigin {
    Explicit,
    Discovered,
}

/// A validated server to analyze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    /// Hostname or IP address, as supplied or discovered.
    pub host: String,
    /// Authoritative role override from the declaration string.
    pub declared_role: Option<Role>,
    /// Declaration order; results are reported in this order.
    pub position: usize,
    pub origin: TargetOrigin,
    /// Address already known from discovery; probed without a forward lookup.
    pub address: Option<IpAddr>,
}

impl fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

/// A live address found by discovery, with its PTR name when one exists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredHost {
    pub addr: Ipv4Addr,
    pub name: Option<String>,
}

impl DiscoveredHost {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self { addr, name: None }
    }

    /// Name used for the target: the PTR name, else the address.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.addr.to_string(),
        }
    }
}
