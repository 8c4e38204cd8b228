//! # Engine
//!
//! The single entry point front-ends call. A run goes through:
//! 1. validation of the raw target specification (no sockets opened yet),
//! 2. optional discovery of live hosts,
//! 3. per-target analysis on the worker pool,
//! 4. aggregation into a [`RunResult`].

use std::sync::Arc;

use rolemap_common::config::{EngineConfig, RunOptions};
use rolemap_common::error::{EngineError, RunError};
use rolemap_common::models::{DiscoveredHost, RunId, RunResult};
use rolemap_common::network::range::DiscoveryRange;
use rolemap_common::network::target::TargetSpec;
use tokio::time::Instant;
use tracing::{Instrument, info, info_span};

use crate::aggregator::ResultAggregator;
use crate::discovery::Discoverer;
use crate::inventory::{InventoryProvider, NoInventory};
use crate::network::NetworkProbe;
use crate::network::tcp::TcpNetwork;
use crate::progress::ProgressFn;
use crate::scanner::{AnalysisOrchestrator, TargetPipeline};

pub struct Engine {
    config: Arc<EngineConfig>,
    net: Arc<dyn NetworkProbe>,
    inventory: Arc<dyn InventoryProvider>,
    progress: Option<ProgressFn>,
}

impl Engine {
    /// An engine doing real TCP handshakes, without an inventory source.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            net: Arc::new(TcpNetwork),
            inventory: Arc::new(NoInventory),
            progress: None,
        }
    }

    pub fn with_network(mut self, net: Arc<dyn NetworkProbe>) -> Self {
        self.net = net;
        self
    }

    pub fn with_inventory(mut self, inventory: Arc<dyn InventoryProvider>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sweeps `ranges` for live hosts without analyzing them.
    pub async fn discover(&self, ranges: &[DiscoveryRange]) -> Vec<DiscoveredHost> {
        Discoverer::new(Arc::clone(&self.net), self.config.discovery.clone())
            .with_progress(self.progress.clone())
            .discover(ranges)
            .await
    }

    /// Validates `spec`, discovers and analyzes its targets, and returns one
    /// result per target in declaration order.
    ///
    /// The run deadline in `options` counts from this call and covers discovery.
    pub async fn run(&self, spec: &TargetSpec, options: &RunOptions) -> Result<RunResult, EngineError> {
        let plan = spec.plan()?;

        let started = Instant::now();
        let run_deadline = options.run_deadline.map(|budget| started + budget);
        let aggregator = ResultAggregator::start(RunId::generate());
        let span = info_span!("run", run_id = %aggregator.run_id());

        async move {
            let discovered = match (plan.needs_discovery(), run_deadline) {
                (false, _) => Vec::new(),
                (true, None) => self.discover(plan.ranges()).await,
                (true, Some(deadline)) => tokio::time::timeout_at(deadline, self.discover(plan.ranges()))
                    .await
                    .map_err(|_| RunError::DeadlineExceeded)?,
            };

            let targets = plan.into_targets(&discovered)?;
            info!(
                targets = targets.len(),
                discovered = discovered.len(),
                concurrency = options.pool_size(targets.len()),
                "analysis started"
            );

            let pipeline = TargetPipeline::new(
                Arc::clone(&self.net),
                Arc::clone(&self.inventory),
                Arc::clone(&self.config),
            );
            let analysis = AnalysisOrchestrator::new(Arc::new(pipeline))
                .with_progress(self.progress.clone())
                .analyze_all(targets, aggregator.run_id(), options, run_deadline)
                .await?;

            let run = aggregator.finish(analysis.results, analysis.concurrency, &self.config.profile);
            let summary = &run.context.summary;
            info!(
                targets = summary.targets_total,
                analyzed = summary.targets_analyzed,
                errors = summary.error_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "run completed"
            );
            Ok::<_, EngineError>(run)
        }
        .instrument(span)
        .await
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
