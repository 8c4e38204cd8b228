use std::net::IpAddr;

use rolemap_common::error::TargetError;
use tokio::time::Instant;
use tracing::debug;

use crate::network::NetworkProbe;

/// Resolves `host` before `deadline`, yielding every distinct address found.
///
/// A lookup still running at the deadline is a deadline error, with all
/// `pending_ports` left unprobed.
pub async fn resolve_before(
    net: &dyn NetworkProbe,
    host: &str,
    deadline: Instant,
    pending_ports: usize,
) -> Result<Vec<IpAddr>, TargetError> {
    let addrs = tokio::time::timeout_at(deadline, net.resolve(host))
        .await
        .map_err(|_| TargetError::DeadlineExceeded {
            unprobed: pending_ports,
        })??;

    if addrs.is_empty() {
        return Err(TargetError::Resolution {
            host: host.to_string(),
            reason: "name resolved to no addresses".into(),
        });
    }

    debug!(host, addresses = addrs.len(), "name resolved");
    Ok(addrs)
}

/// Address used for probing; Windows hosts are reached over IPv4 first.
pub fn primary_addr(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
