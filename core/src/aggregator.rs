use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rolemap_common::config::PortProfile;
use rolemap_common::models::{AnalysisResult, Role, RunContext, RunId, RunResult, RunSummary};

/// Collects ordered results into the [`RunResult`] handed to reporting.
pub struct ResultAggregator {
    run_id: RunId,
    started_at: DateTime<Utc>,
}

impl ResultAggregator {
    pub fn start(run_id: RunId) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn finish(
        self,
        results: Vec<AnalysisResult>,
        concurrency: usize,
        profile: &PortProfile,
    ) -> RunResult {
        let summary = summarize(&results, profile);
        RunResult {
            results,
            context: RunContext {
                run_id: self.run_id,
                started_at: self.started_at,
                finished_at: Utc::now(),
                concurrency,
                summary,
            },
        }
    }
}

pub fn summarize(results: &[AnalysisResult], profile: &PortProfile) -> RunSummary {
    let mut open_ports_by_role: BTreeMap<Role, usize> = BTreeMap::new();
    for port in results.iter().flat_map(AnalysisResult::open_ports) {
        if let Some(role) = profile.role_of(port.port) {
            *open_ports_by_role.entry(role).or_default() += 1;
        }
    }

    RunSummary {
        targets_total: results.len(),
        targets_analyzed: results
            .iter()
            .filter(|r| !r.error.as_ref().is_some_and(|e| e.is_run_deadline()))
            .count(),
        open_ports_by_role,
        error_count: results.iter().filter(|r| r.error.is_some()).count(),
    }
}
