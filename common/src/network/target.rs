//! # Target Resolution
//!
//! Turns the raw inputs of a run into validated [`ServerTarget`]s:
//! * an explicit, comma-separated host list (`srv-app-01, 10.0.0.5`),
//! * zero or more discovery ranges (see [`DiscoveryRange`]),
//! * a declaration string forcing roles (`srv-app-01=APP;srv-sql-01=SQL`).
//!
//! Parsing is pure. Everything is validated in [`TargetSpec::plan`] before any
//! socket is opened; discovered hosts are merged in afterwards by
//! [`TargetPlan::into_targets`].
//!
//! Hosts are compared by [`host_key`], so `srv-01` and `srv-01.corp.local` are
//! the same server.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use tracing::{debug, warn};

use crate::error::{RunError, ValidationError};
use crate::models::{DiscoveredHost, Role, ServerTarget, TargetOrigin};
use crate::network::range::DiscoveryRange;

const MAX_HOST_LEN: usize = 253;

/// Raw discovery range input, validated during planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// Base prefix plus start and end octet, e.g. `("192.168.10", 1, 50)`.
    Octets { base: String, start: u32, end: u32 },
    /// Text form, e.g. `192.168.10.1-50`.
    Text(String),
}

impl RangeSpec {
    fn validate(&self) -> Result<DiscoveryRange, ValidationError> {
        match self {
            RangeSpec::Octets { base, start, end } => DiscoveryRange::new(base, *start, *end),
            RangeSpec::Text(text) => text.parse(),
        }
    }
}

/// Unvalidated target specification as handed over by a front-end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSpec {
    pub hosts: String,
    pub ranges: Vec<RangeSpec>,
    pub declarations: String,
}

impl TargetSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hosts(mut self, hosts: &str) -> Self {
        self.hosts = hosts.to_string();
        self
    }

    pub fn discover(mut self, base: &str, start: u32, end: u32) -> Self {
        self.ranges.push(RangeSpec::Octets {
            base: base.to_string(),
            start,
            end,
        });
        self
    }

    pub fn discover_text(mut self, range: &str) -> Self {
        self.ranges.push(RangeSpec::Text(range.to_string()));
        self
    }

    pub fn declarations(mut self, declarations: &str) -> Self {
        self.declarations = declarations.to_string();
        self
    }

    /// Validates every part of the specification.
    pub fn plan(&self) -> Result<TargetPlan, ValidationError> {
        let hosts = parse_hosts(&self.hosts)?;
        let ranges = self
            .ranges
            .iter()
            .map(RangeSpec::validate)
            .collect::<Result<Vec<_>, _>>()?;
        let declarations = parse_declarations(&self.declarations)?;

        debug!(
            hosts = hosts.len(),
            ranges = ranges.len(),
            declarations = declarations.len(),
            "target specification validated"
        );

        Ok(TargetPlan {
            hosts,
            ranges,
            declarations,
        })
    }
}

/// A validated specification waiting for optional discovery results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlan {
    hosts: Vec<String>,
    ranges: Vec<DiscoveryRange>,
    declarations: HashMap<String, Role>,
}

impl TargetPlan {
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn ranges(&self) -> &[DiscoveryRange] {
        &self.ranges
    }

    pub fn needs_discovery(&self) -> bool {
        !self.ranges.is_empty()
    }

    pub fn declared_role(&self, host: &str) -> Option<Role> {
        self.declarations.get(&host_key(host)).copied()
    }

    /// Builds the ordered target list: explicit hosts first, then discovered
    /// hosts by ascending address, duplicates dropped.
    ///
    /// A discovered host is a duplicate when either its PTR name or its address
    /// matches a host already listed; a declaration may name either.
    pub fn into_targets(self, discovered: &[DiscoveredHost]) -> Result<Vec<ServerTarget>, RunError> {
        let mut discovered: Vec<DiscoveredHost> = discovered.to_vec();
        discovered.sort_unstable_by_key(|host| host.addr);

        let mut seen: HashSet<String> = HashSet::new();
        let mut targets: Vec<ServerTarget> = Vec::new();

        for host in &self.hosts {
            if !seen.insert(host_key(host)) {
                continue;
            }
            targets.push(ServerTarget {
                declared_role: self.declared_role(host),
                position: targets.len(),
                host: host.clone(),
                origin: TargetOrigin::Explicit,
                address: None,
            });
        }

        for found in &discovered {
            let addr_key = found.addr.to_string();
            let name_key = found.name.as_deref().map(host_key);
            if seen.contains(&addr_key) || name_key.as_ref().is_some_and(|key| seen.contains(key)) {
                debug!(addr = %found.addr, name = ?found.name, "discovered host is already a target");
                continue;
            }

            let declared_role = name_key
                .as_ref()
                .and_then(|key| self.declarations.get(key))
                .or_else(|| self.declarations.get(&addr_key))
                .copied();

            seen.insert(addr_key);
            seen.extend(name_key);
            targets.push(ServerTarget {
                declared_role,
                position: targets.len(),
                host: found.label(),
                origin: TargetOrigin::Discovered,
                address: Some(IpAddr::V4(found.addr)),
            });
        }

        for declared_host in self.declarations.keys() {
            if !seen.contains(declared_host) {
                warn!(host = %declared_host, "role declared for a host that is not a target");
            }
        }

        if targets.is_empty() {
            return Err(RunError::NoTargets);
        }
        Ok(targets)
    }
}

/// Normalizes a host spelling: trimmed, lowercase, no trailing root dot.
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Identity of a host for duplicates and declaration lookup.
///
/// IP literals are kept whole; names collapse to their first label, so a short
/// name and its FQDN share one key.
pub fn host_key(host: &str) -> String {
    let host = normalize_host(host);
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }
    match host.split_once('.') {
        Some((short, _)) => short.to_string(),
        None => host,
    }
}

/// Parses a comma-separated host list, keeping the first spelling of duplicates.
pub fn parse_hosts(s: &str) -> Result<Vec<String>, ValidationError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut hosts: Vec<String> = Vec::new();

    for part in s.split(',') {
        let host = part.trim();
        if host.is_empty() {
            continue;
        }
        validate_host(host)?;
        if seen.insert(host_key(host)) {
            hosts.push(host.to_string());
        }
    }

    Ok(hosts)
}

/// Parses declarations in the form `srv1=SQL;srv2=CTX`.
pub fn parse_declarations(s: &str) -> Result<HashMap<String, Role>, ValidationError> {
    let mut declarations: HashMap<String, Role> = HashMap::new();

    for block in s.split(';') {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let Some((host, role)) = block.split_once('=') else {
            return Err(ValidationError::MalformedDeclaration {
                block: block.to_string(),
            });
        };

        let (host, role) = (host.trim(), role.trim());
        if host.is_empty() || role.is_empty() {
            return Err(ValidationError::EmptyDeclaration {
                block: block.to_string(),
            });
        }
        validate_host(host)?;

        let role: Role = role.parse()?;
        if let Some(previous) = declarations.insert(host_key(host), role) {
            if previous != role {
                warn!(host, %previous, %role, "host declared twice, keeping the last role");
            }
        }
    }

    Ok(declarations)
}

fn validate_host(host: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':');

    if host.len() > MAX_HOST_LEN || !host.chars().all(allowed) {
        return Err(ValidationError::InvalidHost {
            host: host.to_string(),
        });
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
