//! # Engine Configuration
//!
//! Port profiles, role weights and thresholds are built and validated once, then
//! shared read-only by every worker of a run.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ValidationError;
use crate::models::{Confidence, Role};

pub const DEFAULT_CONCURRENCY: usize = 6;
pub const DEFAULT_LIVENESS_PORT: u16 = 135;

/// Windows ports that hint at a server role: (port, label, role, weight).
const WINDOWS_PORTS: &[(u16, &str, Option<Role>, u32)] = &[
    (80, "HTTP", Some(Role::App), 2),
    (135, "RPC Endpoint Mapper", None, 0),
    (443, "HTTPS", Some(Role::App), 2),
    (1433, "Microsoft SQL Server", Some(Role::Sql), 4),
    (1434, "SQL Server Browser", Some(Role::Sql), 2),
    (3389, "RDP / Terminal Services", Some(Role::Ctx), 4),
    (4022, "SQL Server Service Broker", Some(Role::Sql), 2),
    (8080, "HTTP (alternate)", Some(Role::App), 1),
    (8443, "HTTPS (alternate)", Some(Role::App), 1),
];

/// Service-name fragments that hint at a role when reported by an inventory source.
const WINDOWS_MARKERS: &[(&str, Role)] = &[
    ("mssql", Role::Sql),
    ("sqlserveragent", Role::Sql),
    ("sqlbrowser", Role::Sql),
    ("sql server", Role::Sql),
    ("w3svc", Role::App),
    ("world wide web", Role::App),
    ("tomcat", Role::App),
    ("iis", Role::App),
    ("sage", Role::App),
    ("termservice", Role::Ctx),
    ("sessionenv", Role::Ctx),
    ("umrdpservice", Role::Ctx),
];

const MARKER_WEIGHT: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRule {
    pub label: String,
    /// Role this port hints at; `None` for informational ports.
    pub role: Option<Role>,
    pub weight: u32,
}

/// Fixed mapping of port to service label and role hint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortProfile {
    rules: BTreeMap<u16, PortRule>,
}

impl PortProfile {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn windows_default() -> Self {
        let rules = WINDOWS_PORTS
            .iter()
            .map(|&(port, label, role, weight)| {
                let rule = PortRule {
                    label: label.to_string(),
                    role,
                    weight,
                };
                (port, rule)
            })
            .collect();

        Self { rules }
    }

    /// Adds a port, rejecting port 0, duplicates and role hints without weight.
    pub fn with_port(
        mut self,
        port: u16,
        label: &str,
        role: Option<Role>,
        weight: u32,
    ) -> Result<Self, ValidationError> {
        let rule_text = || format!("{port}={label}");

        if port == 0 {
            return Err(ValidationError::InvalidPortRule {
                rule: rule_text(),
                reason: "port 0 cannot be probed",
            });
        }
        if self.rules.contains_key(&port) {
            return Err(ValidationError::InvalidPortRule {
                rule: rule_text(),
                reason: "port is already part of the profile",
            });
        }
        if role.is_some() && weight == 0 {
            return Err(ValidationError::InvalidPortRule {
                rule: rule_text(),
                reason: "a role hint needs a non-zero weight",
            });
        }

        let rule = PortRule {
            label: label.to_string(),
            role,
            weight,
        };
        self.rules.insert(port, rule);
        Ok(self)
    }

    /// Adds a rule written as `PORT`, `PORT=ROLE` or `PORT=ROLE:WEIGHT`.
    ///
    /// Custom ports without an explicit weight count as a weak signal (1).
    pub fn with_rule_str(self, s: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidPortRule {
            rule: s.trim().to_string(),
            reason,
        };

        let (port_str, role_part) = match s.split_once('=') {
            Some((port, rest)) => (port, Some(rest)),
            None => (s, None),
        };

        let port: u16 = port_str
            .trim()
            .parse()
            .map_err(|_| invalid("port must be a number between 1 and 65535"))?;

        let (role, weight) = match role_part {
            None => (None, 0),
            Some(rest) => {
                let (role_str, weight_str) = match rest.split_once(':') {
                    Some((role, weight)) => (role, Some(weight)),
                    None => (rest, None),
                };
                let role: Role = role_str.parse()?;
                let weight: u32 = match weight_str {
                    Some(w) => w.trim().parse().map_err(|_| invalid("weight must be a number"))?,
                    None => 1,
                };
                (Some(role), weight)
            }
        };

        self.with_port(port, "custom", role, weight)
    }

    /// All profile ports in ascending order.
    pub fn ports(&self) -> Vec<u16> {
        self.rules.keys().copied().collect()
    }

    pub fn rule(&self, port: u16) -> Option<&PortRule> {
        self.rules.get(&port)
    }

    pub fn role_of(&self, port: u16) -> Option<Role> {
        self.rule(port).and_then(|rule| rule.role)
    }

    pub fn label_of(&self, port: u16) -> Option<String> {
        self.rule(port).map(|rule| rule.label.clone())
    }

    pub fn ports_for(&self, role: Role) -> Vec<u16> {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.role == Some(role))
            .map(|(port, _)| *port)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &PortRule)> {
        self.rules.iter().map(|(port, rule)| (*port, rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A software/service name fragment that hints at a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRule {
    pub keyword: String,
    pub role: Role,
    pub weight: u32,
}

impl MarkerRule {
    pub fn matches(&self, marker: &str) -> bool {
        marker.to_lowercase().contains(&self.keyword.to_lowercase())
    }
}

pub fn default_marker_rules() -> Vec<MarkerRule> {
    WINDOWS_MARKERS
        .iter()
        .map(|&(keyword, role)| MarkerRule {
            keyword: keyword.to_string(),
            role,
            weight: MARKER_WEIGHT,
        })
        .collect()
}

/// Score boundaries for the confidence tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceThresholds {
    high: u32,
    medium: u32,
}

impl ConfidenceThresholds {
    pub fn new(high: u32, medium: u32) -> Result<Self, ValidationError> {
        if medium == 0 || high <= medium {
            return Err(ValidationError::InvalidThresholds { high, medium });
        }
        Ok(Self { high, medium })
    }

    pub fn high(&self) -> u32 {
        self.high
    }

    pub fn medium(&self) -> u32 {
        self.medium
    }

    /// Tier for a summed score; zero means no evidence at all.
    pub fn tier(&self, score: u32) -> Option<Confidence> {
        match score {
            0 => None,
            s if s >= self.high => Some(Confidence::High),
            s if s >= self.medium => Some(Confidence::Medium),
            _ => Some(Confidence::Low),
        }
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self { high: 6, medium: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Port used for the liveness handshake.
    pub liveness_port: u16,
    pub probe_timeout: Duration,
    /// Maximum number of concurrent liveness probes.
    pub pool_size: usize,
    /// Name live hosts by their PTR record.
    pub reverse_dns: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            liveness_port: DEFAULT_LIVENESS_PORT,
            probe_timeout: Duration::from_millis(500),
            pool_size: 48,
            reverse_dns: true,
        }
    }
}

/// Immutable configuration of the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub profile: PortProfile,
    pub markers: Vec<MarkerRule>,
    pub thresholds: ConfidenceThresholds,
    /// Tie-break order for equally scored roles, first wins.
    pub role_priority: Vec<Role>,
    pub port_timeout: Duration,
    /// Concurrent port probes per target.
    pub port_parallelism: usize,
    /// Budget for one target's whole pipeline, name resolution included.
    pub target_deadline: Duration,
    pub discovery: DiscoveryConfig,
}

impl EngineConfig {
    /// Position of `role` in the tie-break order; unlisted roles rank last.
    pub fn priority_rank(&self, role: Role) -> usize {
        self.role_priority
            .iter()
            .position(|candidate| *candidate == role)
            .unwrap_or(self.role_priority.len() + role as usize)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: PortProfile::windows_default(),
            markers: default_marker_rules(),
            thresholds: ConfidenceThresholds::default(),
            role_priority: Role::ALL.to_vec(),
            port_timeout: Duration::from_millis(800),
            port_parallelism: 8,
            target_deadline: Duration::from_secs(10),
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Per-invocation knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Upper bound for concurrently analyzed targets.
    pub concurrency: usize,
    /// Overall budget; outstanding work is cancelled once it elapses.
    pub run_deadline: Option<Duration>,
}

impl RunOptions {
    /// Worker pool size for `targets` targets: the cap, never above the target count.
    pub fn pool_size(&self, targets: usize) -> usize {
        self.concurrency.clamp(1, targets.max(1))
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            run_deadline: None,
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
