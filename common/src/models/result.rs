use std::net::IpAddr;

use chrono::{DateTime, Utc};

use super::{InferredRole, PortCheckResult, Role, RoleSignal, RoleSource, RunId, ServerTarget};
use crate::error::TargetError;

/// Everything learned about one target during one run.
///
/// Exactly one of these exists per resolved [`ServerTarget`]; faults are carried
/// in [`AnalysisResult::error`] instead of dropping the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub target: ServerTarget,
    pub run_id: RunId,
    /// Addresses the target's name resolved to; the first one was probed.
    pub addresses: Vec<IpAddr>,
    /// Probe outcomes in ascending port order.
    pub ports: Vec<PortCheckResult>,
    pub signals: Vec<RoleSignal>,
    /// Highest confidence first.
    pub roles: Vec<InferredRole>,
    pub role_source: RoleSource,
    pub error: Option<TargetError>,
    /// Human-readable findings for the report.
    pub notes: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    /// A bare result for a target whose pipeline never produced findings.
    ///
    /// It carries no roles; the analysis pipeline folds a declared role in.
    pub fn failed(target: ServerTarget, run_id: RunId, error: TargetError) -> Self {
        Self {
            target,
            run_id,
            addresses: Vec::new(),
            ports: Vec::new(),
            signals: Vec::new(),
            roles: Vec::new(),
            role_source: RoleSource::Inferred,
            error: Some(error),
            notes: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn inferred_roles(&self) -> Vec<Role> {
        self.roles.iter().map(|inferred| inferred.role).collect()
    }

    pub fn open_ports(&self) -> impl Iterator<Item = &PortCheckResult> {
        self.ports.iter().filter(|port| port.is_open())
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
