//! A scripted [`NetworkProbe`] for tests.
//!
//! Unknown addresses behave like live hosts with every port closed: each connect
//! is refused immediately. Silent addresses swallow handshakes until the probe
//! timeout elapses. Reverse lookups only answer for registered PTR names.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rolemap_common::error::{ProbeError, TargetError};

use super::NetworkProbe;

#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    names: HashMap<String, Vec<IpAddr>>,
    open: HashSet<SocketAddr>,
    silent: HashSet<IpAddr>,
    delays: HashMap<IpAddr, Duration>,
    ptr: HashMap<IpAddr, String>,
    resolve_delay: Option<Duration>,
    connects: AtomicUsize,
    resolves: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolvable hostname.
    pub fn host(mut self, name: &str, ip: impl Into<IpAddr>) -> Self {
        self.names
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(ip.into());
        self
    }

    pub fn open(mut self, ip: impl Into<IpAddr>, port: u16) -> Self {
        self.open.insert(SocketAddr::new(ip.into(), port));
        self
    }

    /// Makes an address drop every handshake (unroutable host).
    pub fn silent(mut self, ip: impl Into<IpAddr>) -> Self {
        self.silent.insert(ip.into());
        self
    }

    /// Adds a fixed delay before every handshake answer from `ip`.
    pub fn delay(mut self, ip: impl Into<IpAddr>, delay: Duration) -> Self {
        self.delays.insert(ip.into(), delay);
        self
    }

    /// Registers the PTR name returned by reverse lookups of `ip`.
    pub fn ptr(mut self, ip: impl Into<IpAddr>, name: &str) -> Self {
        self.ptr.insert(ip.into(), name.to_string());
        self
    }

    /// Delays every forward lookup.
    pub fn resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = Some(delay);
        self
    }

    /// Highest number of handshakes that were in progress at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn connect_attempts(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn resolve_attempts(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkProbe for ScriptedNetwork {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, TargetError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        self.names
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| TargetError::Resolution {
                host: host.to_string(),
                reason: "no such host".into(),
            })
    }

    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<(), ProbeError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _leave = InFlight(&self.in_flight);

        if let Some(delay) = self.delays.get(&addr.ip()) {
            tokio::time::sleep(*delay).await;
        }

        if self.silent.contains(&addr.ip()) {
            tokio::time::sleep(timeout).await;
            return Err(ProbeError::TimedOut);
        }

        if self.open.contains(&addr) {
            Ok(())
        } else {
            Err(ProbeError::Refused)
        }
    }

    async fn reverse(&self, addr: IpAddr) -> Option<String> {
        self.ptr.get(&addr).cloned()
    }
}

/// Decrements the in-flight count even when the handshake future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
