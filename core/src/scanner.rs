//! # Target Analysis
//!
//! Runs every target through resolve → probe → inventory → classify on a
//! bounded worker pool and collects one [`AnalysisResult`] per target.
//!
//! Workers write into pre-allocated, index-addressed slots, so the output is in
//! declaration order no matter which target finishes first. Target-level faults
//! are recorded on that target's result and never abort the run; only a run
//! deadline that elapses before anything completes fails it as a whole.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use rolemap_common::config::{EngineConfig, RunOptions};
use rolemap_common::error::{RunError, TargetError};
use rolemap_common::models::{AnalysisResult, PortCheckResult, RunId, ServerTarget};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::classifier::RoleClassifier;
use crate::inventory::InventoryProvider;
use crate::network::NetworkProbe;
use crate::progress::{Progress, ProgressFn};

pub mod prober;
pub mod resolver;

pub use prober::{PortReport, Prober};

/// The per-target pipeline shared by all workers.
pub struct TargetPipeline {
    net: Arc<dyn NetworkProbe>,
    inventory: Arc<dyn InventoryProvider>,
    prober: Prober,
    classifier: RoleClassifier,
    config: Arc<EngineConfig>,
}

impl TargetPipeline {
    pub fn new(
        net: Arc<dyn NetworkProbe>,
        inventory: Arc<dyn InventoryProvider>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            prober: Prober::new(Arc::clone(&net), Arc::clone(&config)),
            classifier: RoleClassifier::new(Arc::clone(&config)),
            net,
            inventory,
            config,
        }
    }

    /// Analyzes one target within the per-target deadline.
    pub async fn analyze(&self, target: ServerTarget, run_id: RunId) -> AnalysisResult {
        let deadline = Instant::now() + self.config.target_deadline;
        info!(origin = ?target.origin, declared = ?target.declared_role, "target started");

        let addrs = match target.address {
            Some(addr) => vec![addr],
            None => {
                let pending = self.config.profile.len();
                match resolver::resolve_before(self.net.as_ref(), &target.host, deadline, pending).await {
                    Ok(addrs) => addrs,
                    Err(e) => return self.failed(target, run_id, e),
                }
            }
        };
        let Some(addr) = resolver::primary_addr(&addrs) else {
            let e = TargetError::Resolution {
                host: target.host.clone(),
                reason: "name resolved to no addresses".into(),
            };
            return self.failed(target, run_id, e);
        };

        let report = self.prober.probe(addr, deadline).await;

        let mut notes = Vec::new();
        if addrs.len() > 1 {
            notes.push(format!("resolved to {} addresses, probed {addr}", addrs.len()));
        }

        let markers = match tokio::time::timeout_at(deadline, self.inventory.markers(&target)).await {
            Ok(Ok(markers)) => markers,
            Ok(Err(e)) => {
                warn!(error = %e, "inventory lookup failed");
                notes.push(format!("inventory unavailable: {e}"));
                Vec::new()
            }
            Err(_) => {
                warn!("inventory lookup hit the target deadline");
                notes.push("inventory lookup cut off by the target deadline".into());
                Vec::new()
            }
        };

        let classification = self
            .classifier
            .classify(&report.ports, &markers, target.declared_role);
        notes.extend(classification.notes);

        let error = if report.deadline_hit() {
            Some(TargetError::DeadlineExceeded {
                unprobed: report.unprobed,
            })
        } else if !report.host_answered && !report.ports.is_empty() {
            Some(TargetError::Unreachable)
        } else {
            None
        };

        for inferred in &classification.roles {
            info!(
                role = %inferred.role,
                confidence = %inferred.confidence,
                source = ?classification.role_source,
                "role inferred"
            );
        }
        if let Some(e) = &error {
            warn!(error = %e, "target errored");
        }

        AnalysisResult {
            target,
            run_id,
            addresses: addrs,
            ports: report.ports,
            signals: classification.signals,
            roles: classification.roles,
            role_source: classification.role_source,
            error,
            notes,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Result for a target that produced no findings. A declared role still
    /// applies; a target cut off by its deadline lists every port as unprobed.
    pub fn failed(&self, target: ServerTarget, run_id: RunId, error: TargetError) -> AnalysisResult {
        if !error.is_run_deadline() {
            warn!(host = %target.host, error = %error, "target errored");
        }

        let ports = match error {
            TargetError::DeadlineExceeded { .. } => self
                .config
                .profile
                .iter()
                .map(|(port, rule)| PortCheckResult::unprobed(port, Some(rule.label.clone())))
                .collect(),
            _ => Vec::new(),
        };
        let classification = self.classifier.classify(&[], &[], target.declared_role);

        AnalysisResult {
            ports,
            signals: classification.signals,
            roles: classification.roles,
            role_source: classification.role_source,
            notes: classification.notes,
            ..AnalysisResult::failed(target, run_id, error)
        }
    }
}

/// What the orchestrator hands to aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// One per target, in declaration order.
    pub results: Vec<AnalysisResult>,
    /// Worker pool size actually used.
    pub concurrency: usize,
}

#[derive(Default)]
struct Slot {
    started: AtomicBool,
    result: OnceLock<AnalysisResult>,
}

pub struct AnalysisOrchestrator {
    pipeline: Arc<TargetPipeline>,
    progress: Option<ProgressFn>,
}

impl AnalysisOrchestrator {
    pub fn new(pipeline: Arc<TargetPipeline>) -> Self {
        Self {
            pipeline,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Analyzes `targets` on a pool of `min(targets, options.concurrency)` workers.
    ///
    /// Once `run_deadline` passes, running work is aborted: targets that never
    /// started are reported as skipped, started ones as cancelled.
    pub async fn analyze_all(
        &self,
        targets: Vec<ServerTarget>,
        run_id: &RunId,
        options: &RunOptions,
        run_deadline: Option<Instant>,
    ) -> Result<Analysis, RunError> {
        if targets.is_empty() {
            return Err(RunError::NoTargets);
        }

        let total = targets.len();
        let concurrency = options.pool_size(total);
        let slots: Arc<Vec<Slot>> = Arc::new((0..total).map(|_| Slot::default()).collect());
        let permits = Arc::new(Semaphore::new(concurrency));
        let done = Arc::new(AtomicUsize::new(0));

        debug!(targets = total, concurrency, "analysis pool starting");

        let mut tasks: JoinSet<()> = JoinSet::new();
        for (idx, target) in targets.iter().cloned().enumerate() {
            let span = info_span!("target", host = %target.host, position = target.position);
            let pipeline = Arc::clone(&self.pipeline);
            let slots = Arc::clone(&slots);
            let permits = Arc::clone(&permits);
            let done = Arc::clone(&done);
            let progress = self.progress.clone();
            let run_id = run_id.clone();

            tasks.spawn(
                async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return;
                    };
                    slots[idx].started.store(true, Ordering::SeqCst);

                    let result = pipeline.analyze(target, run_id).await;
                    // each slot has exactly one writer
                    let _ = slots[idx].result.set(result);

                    let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(report) = &progress {
                        report(Progress::TargetFinished {
                            done: finished,
                            total,
                        });
                    }
                }
                .instrument(span),
            );
        }

        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined
                    && e.is_panic()
                {
                    error!("analysis worker panicked: {e}");
                }
            }
        };

        let deadline_hit = match run_deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, drain).await.is_err(),
            None => {
                drain.await;
                false
            }
        };

        if deadline_hit {
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        let mut completed = 0;
        let mut skipped = 0;
        let mut cancelled = 0;
        let results: Vec<AnalysisResult> = targets
            .into_iter()
            .zip(slots.iter())
            .map(|(target, slot)| {
                if let Some(result) = slot.result.get() {
                    completed += 1;
                    return result.clone();
                }

                let started = slot.started.load(Ordering::SeqCst);
                let error = match (deadline_hit, started) {
                    (true, false) => {
                        skipped += 1;
                        TargetError::SkippedByRunDeadline
                    }
                    (true, true) => {
                        cancelled += 1;
                        TargetError::CancelledByRunDeadline
                    }
                    (false, _) => TargetError::Internal("analysis worker stopped without a result".into()),
                };
                self.pipeline.failed(target, run_id.clone(), error)
            })
            .collect();

        if deadline_hit {
            warn!(completed, cancelled, skipped, "run deadline exceeded");
            if completed == 0 {
                return Err(RunError::DeadlineExceeded);
            }
        }

        Ok(Analysis {
            results,
            concurrency,
        })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{NoInventory, StaticInventory};
    use crate::network::scripted::ScriptedNetwork;
    use async_trait::async_trait;
    use rolemap_common::models::{PortState, Role, RoleSource, SignalSource, TargetOrigin};
    use std::net::Ipv4Addr;
    use std::sync::Mutex;
    use std::time::Duration;

    fn target(host: &str, position: usize, declared_role: Option<Role>) -> ServerTarget {
        ServerTarget {
            host: host.into(),
            declared_role,
            position,
            origin: TargetOrigin::Explicit,
            address: None,
        }
    }

    fn targets(hosts: &[&str]) -> Vec<ServerTarget> {
        hosts
            .iter()
            .enumerate()
            .map(|(i, host)| target(host, i, None))
            .collect()
    }

    fn quick_config() -> Arc<EngineConfig> {
        Arc::new(EngineConfig {
            port_timeout: Duration::from_millis(30),
            ..EngineConfig::default()
        })
    }

    fn orchestrator(net: ScriptedNetwork, inventory: Arc<dyn InventoryProvider>) -> AnalysisOrchestrator {
        let pipeline = TargetPipeline::new(Arc::new(net), inventory, quick_config());
        AnalysisOrchestrator::new(Arc::new(pipeline))
    }

    fn options(concurrency: usize) -> RunOptions {
        RunOptions {
            concurrency,
            run_deadline: None,
        }
    }

    fn hosts_of(analysis: &Analysis) -> Vec<&str> {
        analysis.results.iter().map(|r| r.target.host.as_str()).collect()
    }

    struct FailingInventory;

    #[async_trait]
    impl InventoryProvider for FailingInventory {
        async fn markers(&self, _target: &ServerTarget) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("inventory export is missing")
        }
    }

    struct PanickingInventory;

    #[async_trait]
    impl InventoryProvider for PanickingInventory {
        async fn markers(&self, target: &ServerTarget) -> anyhow::Result<Vec<String>> {
            if target.host == "10.0.0.2" {
                panic!("inventory blew up");
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn results_keep_declaration_order() {
        let net = ScriptedNetwork::new()
            .open(Ipv4Addr::new(10, 0, 0, 1), 1433)
            .delay(Ipv4Addr::new(10, 0, 0, 1), Duration::from_millis(60))
            .open(Ipv4Addr::new(10, 0, 0, 3), 3389);
        let orch = orchestrator(net, Arc::new(NoInventory));
        let run_id = RunId::from("run-test");

        let analysis = orch
            .analyze_all(targets(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]), &run_id, &options(3), None)
            .await
            .unwrap();

        assert_eq!(analysis.concurrency, 3);
        assert_eq!(hosts_of(&analysis), vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert!(analysis.results.iter().all(|r| r.run_id == run_id));
        assert_eq!(analysis.results[0].inferred_roles(), vec![Role::Sql]);
        assert!(analysis.results[1].roles.is_empty());
        assert!(analysis.results[1].is_ok());
        assert_eq!(analysis.results[2].inferred_roles(), vec![Role::Ctx]);
    }

    #[tokio::test]
    async fn pool_never_exceeds_the_target_count() {
        let orch = orchestrator(ScriptedNetwork::new(), Arc::new(NoInventory));
        let analysis = orch
            .analyze_all(targets(&["10.0.0.1"]), &RunId::from("r"), &options(32), None)
            .await
            .unwrap();
        assert_eq!(analysis.concurrency, 1);

        let analysis = orch
            .analyze_all(targets(&["10.0.0.1", "10.0.0.2"]), &RunId::from("r"), &options(0), None)
            .await
            .unwrap();
        assert_eq!(analysis.concurrency, 1);
    }

    #[tokio::test]
    async fn empty_input_is_no_targets() {
        let orch = orchestrator(ScriptedNetwork::new(), Arc::new(NoInventory));
        let err = orch
            .analyze_all(Vec::new(), &RunId::from("r"), &options(4), None)
            .await
            .unwrap_err();
        assert_eq!(err, RunError::NoTargets);
    }

    #[tokio::test]
    async fn target_faults_are_recorded_not_raised() {
        let net = ScriptedNetwork::new()
            .host("srv-app-01", Ipv4Addr::new(10, 0, 0, 4))
            .open(Ipv4Addr::new(10, 0, 0, 4), 443)
            .silent(Ipv4Addr::new(10, 0, 0, 9));
        let orch = orchestrator(net, Arc::new(NoInventory));

        let analysis = orch
            .analyze_all(
                targets(&["srv-app-01", "srv-gone", "10.0.0.9"]),
                &RunId::from("r"),
                &options(3),
                None,
            )
            .await
            .unwrap();

        let [app, gone, silent] = analysis.results.as_slice() else {
            panic!("expected three results");
        };

        assert!(app.is_ok());
        assert_eq!(app.inferred_roles(), vec![Role::App]);

        assert!(matches!(gone.error, Some(TargetError::Resolution { .. })));
        assert!(gone.ports.is_empty());
        assert!(gone.roles.is_empty());

        assert_eq!(silent.error, Some(TargetError::Unreachable));
        assert!(silent.roles.is_empty());
        assert!(silent.ports.iter().all(|p| p.state == PortState::Timeout));
    }

    #[tokio::test]
    async fn declared_role_survives_an_unreachable_host() {
        let net = ScriptedNetwork::new().silent(Ipv4Addr::new(10, 0, 0, 9));
        let orch = orchestrator(net, Arc::new(NoInventory));

        let analysis = orch
            .analyze_all(
                vec![target("10.0.0.9", 0, Some(Role::Sql))],
                &RunId::from("r"),
                &options(1),
                None,
            )
            .await
            .unwrap();

        let result = &analysis.results[0];
        assert_eq!(result.error, Some(TargetError::Unreachable));
        assert_eq!(result.inferred_roles(), vec![Role::Sql]);
    }

    #[tokio::test]
    async fn per_target_deadline_keeps_partial_findings() {
        let net = ScriptedNetwork::new().delay(Ipv4Addr::new(10, 0, 0, 5), Duration::from_millis(300));
        let cfg = Arc::new(EngineConfig {
            target_deadline: Duration::from_millis(80),
            ..EngineConfig::default()
        });
        let pipeline = TargetPipeline::new(Arc::new(net), Arc::new(NoInventory), cfg);
        let orch = AnalysisOrchestrator::new(Arc::new(pipeline));

        let analysis = orch
            .analyze_all(targets(&["10.0.0.5"]), &RunId::from("r"), &options(1), None)
            .await
            .unwrap();

        let result = &analysis.results[0];
        assert!(matches!(result.error, Some(TargetError::DeadlineExceeded { unprobed }) if unprobed > 0));
        assert_eq!(result.ports.len(), EngineConfig::default().profile.len());
    }

    #[tokio::test]
    async fn target_deadline_leaves_siblings_alone() {
        let net = ScriptedNetwork::new()
            .delay(Ipv4Addr::new(10, 0, 0, 5), Duration::from_millis(300))
            .open(Ipv4Addr::new(10, 0, 0, 6), 1433)
            .open(Ipv4Addr::new(10, 0, 0, 6), 1434);
        let cfg = Arc::new(EngineConfig {
            port_timeout: Duration::from_millis(30),
            target_deadline: Duration::from_millis(80),
            ..EngineConfig::default()
        });
        let pipeline = TargetPipeline::new(Arc::new(net), Arc::new(NoInventory), cfg);
        let orch = AnalysisOrchestrator::new(Arc::new(pipeline));

        let analysis = orch
            .analyze_all(targets(&["10.0.0.5", "10.0.0.6"]), &RunId::from("r"), &options(2), None)
            .await
            .unwrap();

        let [slow, sql] = analysis.results.as_slice() else {
            panic!("expected two results");
        };
        assert!(matches!(slow.error, Some(TargetError::DeadlineExceeded { .. })));
        assert!(sql.is_ok());
        assert_eq!(sql.inferred_roles(), vec![Role::Sql]);
        assert_eq!(sql.open_ports().count(), 2);
    }

    #[tokio::test]
    async fn slow_name_lookup_counts_against_the_target_deadline() {
        let net = ScriptedNetwork::new()
            .host("srv-slow", Ipv4Addr::new(10, 0, 0, 8))
            .resolve_delay(Duration::from_millis(300));
        let cfg = Arc::new(EngineConfig {
            target_deadline: Duration::from_millis(50),
            ..EngineConfig::default()
        });
        let profile_len = cfg.profile.len();
        let pipeline = TargetPipeline::new(Arc::new(net), Arc::new(NoInventory), cfg);

        let result = pipeline.analyze(target("srv-slow", 0, None), RunId::from("r")).await;

        assert_eq!(result.error, Some(TargetError::DeadlineExceeded { unprobed: profile_len }));
        assert_eq!(result.ports.len(), profile_len);
        assert!(result.ports.iter().all(|p| p.state == PortState::Timeout));
    }

    #[tokio::test]
    async fn declared_role_survives_a_failed_lookup() {
        let orch = orchestrator(ScriptedNetwork::new(), Arc::new(NoInventory));

        let analysis = orch
            .analyze_all(
                vec![target("srv-gone", 0, Some(Role::Sql))],
                &RunId::from("r"),
                &options(1),
                None,
            )
            .await
            .unwrap();

        let result = &analysis.results[0];
        assert!(matches!(result.error, Some(TargetError::Resolution { .. })));
        assert_eq!(result.inferred_roles(), vec![Role::Sql]);
        assert_eq!(result.role_source, RoleSource::Declared);
        assert!(result.signals.iter().any(|s| s.source == SignalSource::Declared));
    }

    #[tokio::test]
    async fn discovered_address_skips_name_resolution() {
        let net = Arc::new(ScriptedNetwork::new().open(Ipv4Addr::new(10, 0, 0, 4), 3389));
        let pipeline = TargetPipeline::new(net.clone(), Arc::new(NoInventory), quick_config());
        let discovered = ServerTarget {
            host: "srv-ctx-04.corp.local".into(),
            declared_role: None,
            position: 0,
            origin: TargetOrigin::Discovered,
            address: Some(Ipv4Addr::new(10, 0, 0, 4).into()),
        };

        let result = pipeline.analyze(discovered, RunId::from("r")).await;

        assert!(result.is_ok());
        assert_eq!(result.inferred_roles(), vec![Role::Ctx]);
        assert_eq!(net.resolve_attempts(), 0);
    }

    #[tokio::test]
    async fn inventory_markers_and_failures() {
        let net = ScriptedNetwork::new().open(Ipv4Addr::new(10, 0, 0, 1), 80);
        let inventory = StaticInventory::new().with_markers("10.0.0.1", &["W3SVC"]);
        let orch = orchestrator(net, Arc::new(inventory));

        let analysis = orch
            .analyze_all(targets(&["10.0.0.1"]), &RunId::from("r"), &options(1), None)
            .await
            .unwrap();
        assert_eq!(analysis.results[0].roles[0].role, Role::App);
        assert_eq!(analysis.results[0].signals.len(), 2);

        let orch = orchestrator(ScriptedNetwork::new(), Arc::new(FailingInventory));
        let analysis = orch
            .analyze_all(targets(&["10.0.0.1"]), &RunId::from("r"), &options(1), None)
            .await
            .unwrap();
        let result = &analysis.results[0];
        assert!(result.is_ok());
        assert!(result.notes.iter().any(|n| n.contains("inventory export is missing")));
    }

    #[tokio::test]
    async fn panicking_worker_becomes_an_internal_error() {
        let orch = orchestrator(ScriptedNetwork::new(), Arc::new(PanickingInventory));

        let analysis = orch
            .analyze_all(
                targets(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]),
                &RunId::from("r"),
                &options(2),
                None,
            )
            .await
            .unwrap();

        assert!(analysis.results[0].is_ok());
        assert!(matches!(analysis.results[1].error, Some(TargetError::Internal(_))));
        assert!(analysis.results[2].is_ok());
    }

    #[tokio::test]
    async fn run_deadline_skips_and_cancels() {
        let net = ScriptedNetwork::new()
            .delay(Ipv4Addr::new(10, 0, 0, 2), Duration::from_secs(5))
            .delay(Ipv4Addr::new(10, 0, 0, 3), Duration::from_secs(5));
        let orch = orchestrator(net, Arc::new(NoInventory));

        let deadline = Instant::now() + Duration::from_millis(200);
        let analysis = orch
            .analyze_all(
                targets(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]),
                &RunId::from("r"),
                &options(1),
                Some(deadline),
            )
            .await
            .unwrap();

        let errors: Vec<Option<TargetError>> =
            analysis.results.iter().map(|r| r.error.clone()).collect();
        assert_eq!(
            errors,
            vec![
                None,
                Some(TargetError::CancelledByRunDeadline),
                Some(TargetError::SkippedByRunDeadline),
            ]
        );
        assert_eq!(
            analysis.results[2].error.as_ref().map(ToString::to_string).as_deref(),
            Some("skipped: run deadline exceeded")
        );
    }

    #[tokio::test]
    async fn run_deadline_before_any_completion_fails_the_run() {
        let net = ScriptedNetwork::new().delay(Ipv4Addr::new(10, 0, 0, 1), Duration::from_secs(5));
        let orch = orchestrator(net, Arc::new(NoInventory));

        let deadline = Instant::now() + Duration::from_millis(50);
        let err = orch
            .analyze_all(targets(&["10.0.0.1"]), &RunId::from("r"), &options(1), Some(deadline))
            .await
            .unwrap_err();
        assert_eq!(err, RunError::DeadlineExceeded);
    }

    #[tokio::test]
    async fn progress_reports_every_finished_target() {
        let seen: Arc<Mutex<Vec<Progress>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let orch = orchestrator(ScriptedNetwork::new(), Arc::new(NoInventory))
            .with_progress(Some(Arc::new(move |event| sink.lock().unwrap().push(event))));

        orch.analyze_all(targets(&["10.0.0.1", "10.0.0.2"]), &RunId::from("r"), &options(2), None)
            .await
            .unwrap();

        let mut done: Vec<usize> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                Progress::TargetFinished { done, total } => {
                    assert_eq!(*total, 2);
                    *done
                }
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        done.sort_unstable();
        assert_eq!(done, vec![1, 2]);
    }
}
