//! # Subnet Discovery
//!
//! Expands discovery ranges into candidate addresses and keeps the ones that
//! complete a TCP handshake on the liveness port.
//!
//! A silent or refusing address is simply absent; most of a subnet is expected
//! to be empty, so "nothing found" is an empty result rather than an error.
//! Live hosts are then named by reverse DNS when that is enabled.

use std::collections::BTreeSet;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rolemap_common::config::DiscoveryConfig;
use rolemap_common::models::DiscoveredHost;
use rolemap_common::network::range::DiscoveryRange;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::network::NetworkProbe;
use crate::progress::{Progress, ProgressFn};

/// Finds live hosts inside discovery ranges.
///
/// Liveness probes run on a bounded pool so a full /24 sweep neither opens 254
/// sockets at once nor waits for 254 sequential timeouts.
pub struct Discoverer {
    net: Arc<dyn NetworkProbe>,
    config: DiscoveryConfig,
    progress: Option<ProgressFn>,
}

impl Discoverer {
    pub fn new(net: Arc<dyn NetworkProbe>, config: DiscoveryConfig) -> Self {
        Self {
            net,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Returns the live hosts of all `ranges`, ascending by address.
    pub async fn discover(&self, ranges: &[DiscoveryRange]) -> Vec<DiscoveredHost> {
        let candidates: Vec<Ipv4Addr> = ranges
            .iter()
            .flat_map(DiscoveryRange::to_iter)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let range_text: Vec<String> = ranges.iter().map(ToString::to_string).collect();
        info!(
            ranges = %range_text.join(","),
            candidates = candidates.len(),
            port = self.config.liveness_port,
            "searching for live hosts"
        );

        let net = Arc::clone(&self.net);
        let port = self.config.liveness_port;
        let probe_timeout = self.config.probe_timeout;
        let found = Arc::new(AtomicUsize::new(0));
        let progress = self.progress.clone();

        let live = handshake_range_discovery(candidates.clone(), self.config.pool_size, move |addr| {
            let net = Arc::clone(&net);
            let found = Arc::clone(&found);
            let progress = progress.clone();
            async move {
                let alive = handshake_probe(net.as_ref(), addr, port, probe_timeout).await;
                if alive {
                    let live = found.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(report) = &progress {
                        report(Progress::HostFound { live });
                    }
                }
                alive
            }
        })
        .await;

        let hosts = if self.config.reverse_dns {
            self.name_hosts(live).await
        } else {
            live.into_iter().map(DiscoveredHost::new).collect()
        };

        info!(
            candidates = candidates.len(),
            live = hosts.len(),
            named = hosts.iter().filter(|host| host.name.is_some()).count(),
            "discovery finished"
        );
        hosts
    }

    /// Looks up PTR names for `live`, on the same bounded pool as the sweep.
    async fn name_hosts(&self, live: Vec<Ipv4Addr>) -> Vec<DiscoveredHost> {
        if live.is_empty() {
            return Vec::new();
        }

        let permits = Arc::new(Semaphore::new(self.config.pool_size.clamp(1, live.len())));
        let lookup_timeout = self.config.probe_timeout;
        let mut tasks: JoinSet<(usize, Option<String>)> = JoinSet::new();

        for (idx, addr) in live.iter().copied().enumerate() {
            let net = Arc::clone(&self.net);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (idx, None);
                };
                let name = tokio::time::timeout(lookup_timeout, net.reverse(IpAddr::V4(addr)))
                    .await
                    .ok()
                    .flatten();
                debug!(%addr, name = ?name, "reverse lookup");
                (idx, name)
            });
        }

        let mut names: Vec<Option<String>> = vec![None; live.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, name)) => names[idx] = name,
                Err(e) => warn!("reverse lookup task failed: {e}"),
            }
        }

        live.into_iter()
            .zip(names)
            .map(|(addr, name)| DiscoveredHost { addr, name })
            .collect()
    }
}

/// Runs `prober` over `targets` with at most `pool_size` probes in flight and
/// returns the addresses it accepted, in input order.
pub async fn handshake_range_discovery<F, Fut>(
    targets: Vec<Ipv4Addr>,
    pool_size: usize,
    prober: F,
) -> Vec<Ipv4Addr>
where
    F: Fn(Ipv4Addr) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    if targets.is_empty() {
        return Vec::new();
    }

    let permits = Arc::new(Semaphore::new(pool_size.clamp(1, targets.len())));
    let prober = Arc::new(prober);
    let mut tasks: JoinSet<(usize, bool)> = JoinSet::new();

    for (idx, addr) in targets.iter().copied().enumerate() {
        let permits = Arc::clone(&permits);
        let prober = Arc::clone(&prober);
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return (idx, false);
            };
            (idx, prober(addr).await)
        });
    }

    let mut alive = vec![false; targets.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, is_alive)) => alive[idx] = is_alive,
            Err(e) => warn!("liveness probe task failed: {e}"),
        }
    }

    targets
        .into_iter()
        .zip(alive)
        .filter_map(|(addr, is_alive)| is_alive.then_some(addr))
        .collect()
}

/// A completed handshake marks the host live; refusal and timeout do not.
pub async fn handshake_probe(
    net: &dyn NetworkProbe,
    addr: Ipv4Addr,
    port: u16,
    probe_timeout: Duration,
) -> bool {
    let socket_addr = SocketAddr::new(IpAddr::V4(addr), port);
    match net.connect(socket_addr, probe_timeout).await {
        Ok(()) => {
            debug!(%addr, port, "host answered liveness probe");
            true
        }
        Err(_) => false,
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
