use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AnalysisResult, Role};

/// Correlation token stamped on every result and log line of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Generates a fresh id from the current time and a short random suffix,
    /// e.g. `run-20261019-142501-3f9a0c1d`.
    pub fn generate() -> Self {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        RunId(format!("run-{stamp}-{}", &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        RunId(value.to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub targets_total: usize,
    /// Targets whose pipeline ran (not skipped or cancelled by the run deadline).
    pub targets_analyzed: usize,
    pub open_ports_by_role: BTreeMap<Role, usize>,
    pub error_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Worker pool size actually used.
    pub concurrency: usize,
    pub summary: RunSummary,
}

/// The bundle handed to the reporting side.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// In target declaration order.
    pub results: Vec<AnalysisResult>,
    pub context: RunContext,
}
