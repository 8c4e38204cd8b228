use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use rolemap_common::config::EngineConfig;
use rolemap_common::error::ProbeError;
use rolemap_common::models::{PortCheckResult, PortState, Transport};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::network::NetworkProbe;

/// Outcome of probing every profile port of one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortReport {
    /// One entry per profile port, ascending.
    pub ports: Vec<PortCheckResult>,
    /// Some port completed or refused a handshake.
    pub host_answered: bool,
    /// Ports the deadline cut off; they are reported as `Timeout`.
    /// A port whose probe task failed is a `Timeout` too, but not counted here.
    pub unprobed: usize,
}

impl PortReport {
    pub fn deadline_hit(&self) -> bool {
        self.unprobed > 0
    }
}

pub struct Prober {
    net: Arc<dyn NetworkProbe>,
    config: Arc<EngineConfig>,
}

impl Prober {
    pub fn new(net: Arc<dyn NetworkProbe>, config: Arc<EngineConfig>) -> Self {
        Self { net, config }
    }

    /// Probes the profile ports of `addr`, at most `port_parallelism` at a time.
    ///
    /// Whatever has not finished when `deadline` passes is aborted and recorded
    /// as [`PortState::Timeout`] with no latency.
    pub async fn probe(&self, addr: IpAddr, deadline: Instant) -> PortReport {
        let ports = self.config.profile.ports();
        if ports.is_empty() {
            return PortReport {
                ports: Vec::new(),
                host_answered: false,
                unprobed: 0,
            };
        }

        let permits = Arc::new(Semaphore::new(
            self.config.port_parallelism.clamp(1, ports.len()),
        ));
        let port_timeout = self.config.port_timeout;
        let mut tasks: JoinSet<(usize, PortCheckResult, bool)> = JoinSet::new();

        for (idx, &port) in ports.iter().enumerate() {
            let net = Arc::clone(&self.net);
            let permits = Arc::clone(&permits);
            let service = self.config.profile.label_of(port);

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (idx, PortCheckResult::unprobed(port, service), false);
                };

                let started = Instant::now();
                let outcome = net.connect(SocketAddr::new(addr, port), port_timeout).await;
                let (state, latency, answered) = match outcome {
                    Ok(()) => (PortState::Open, Some(started.elapsed()), true),
                    Err(ProbeError::Refused) => (PortState::Closed, Some(started.elapsed()), true),
                    Err(ProbeError::TimedOut) => (PortState::Timeout, None, false),
                    Err(ProbeError::Unreachable(_)) => (PortState::Closed, Some(started.elapsed()), false),
                };

                debug!(
                    %addr,
                    port,
                    %state,
                    latency_ms = latency.map(|l| l.as_millis() as u64),
                    "port probed"
                );

                let result = PortCheckResult {
                    port,
                    transport: Transport::Tcp,
                    state,
                    latency,
                    service,
                };
                (idx, result, answered)
            });
        }

        let mut slots: Vec<Option<PortCheckResult>> = vec![None; ports.len()];
        let mut host_answered = false;

        let collect = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((idx, result, answered)) => {
                        host_answered |= answered;
                        slots[idx] = Some(result);
                    }
                    Err(e) => warn!(%addr, "port probe task failed: {e}"),
                }
            }
        };

        let deadline_hit = tokio::time::timeout_at(deadline, collect).await.is_err();
        if deadline_hit {
            tasks.abort_all();
        }

        // a slot left empty by a failed task is a timeout, but not a deadline miss
        let mut unprobed = 0;
        let ports = ports
            .into_iter()
            .zip(slots)
            .map(|(port, slot)| {
                slot.unwrap_or_else(|| {
                    if deadline_hit {
                        unprobed += 1;
                    }
                    PortCheckResult::unprobed(port, self.config.profile.label_of(port))
                })
            })
            .collect();

        PortReport {
            ports,
            host_answered,
            unprobed,
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
