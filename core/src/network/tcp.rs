use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use rolemap_common::error::{ProbeError, TargetError};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;

use super::NetworkProbe;

/// Plain TCP connect probing through the tokio reactor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpNetwork;

#[async_trait]
impl NetworkProbe for TcpNetwork {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, TargetError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let resolution_failed = |reason: String| TargetError::Resolution {
            host: host.to_string(),
            reason,
        };

        let resolved = lookup_host((host, 0))
            .await
            .map_err(|e| resolution_failed(e.to_string()))?;

        let mut addrs: Vec<IpAddr> = Vec::new();
        for socket_addr in resolved {
            if !addrs.contains(&socket_addr.ip()) {
                addrs.push(socket_addr.ip());
            }
        }

        if addrs.is_empty() {
            return Err(resolution_failed("no addresses returned".into()));
        }
        Ok(addrs)
    }

    async fn connect(&self, addr: SocketAddr, probe_timeout: Duration) -> Result<(), ProbeError> {
        match timeout(probe_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::from(e)),
            Err(_elapsed) => Err(ProbeError::TimedOut),
        }
    }

    async fn reverse(&self, addr: IpAddr) -> Option<String> {
        let name = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr))
            .await
            .ok()?
            .ok()?;

        // getnameinfo hands the address back when there is no PTR record
        let name = name.trim().trim_end_matches('.');
        if name.is_empty() || name.parse::<IpAddr>().is_ok() {
            return None;
        }
        Some(name.to_string())
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
