use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The closed set of server roles this tool knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Application server.
    App,
    /// Database server.
    Sql,
    /// Terminal/session server.
    Ctx,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::App, Role::Sql, Role::Ctx];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::App => "APP",
            Role::Sql => "SQL",
            Role::Ctx => "CTX",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    /// Parses a role token case-insensitively ("app", "SQL", " Ctx ").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APP" => Ok(Role::App),
            "SQL" => Ok(Role::Sql),
            "CTX" => Ok(Role::Ctx),
            _ => Err(ValidationError::UnknownRole {
                token: s.trim().to_string(),
            }),
        }
    }
}

/// Coarse signal-strength bucket exposed instead of raw scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredRole {
    pub role: Role,
    pub confidence: Confidence,
}

/// Where a piece of role evidence came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalSource {
    /// An open port mapped to a role by the port profile.
    Port(u16),
    /// A detected software or service name.
    Marker(String),
    /// A user-supplied declaration.
    Declared,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Port(port) => write!(f, "port {port}"),
            SignalSource::Marker(marker) => write!(f, "marker '{marker}'"),
            SignalSource::Declared => f.write_str("declaration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSignal {
    pub role: Role,
    pub weight: u32,
    pub source: SignalSource,
}

/// Whether the inferred roles of a result were declared or derived from evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSource {
    Declared,
    Inferred,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
