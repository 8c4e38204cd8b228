//! The **network seam** every probe goes through.
//!
//! Discovery and port probing only talk to [`NetworkProbe`]; the concrete
//! [`tcp::TcpNetwork`] does real handshakes, while the scripted double lets tests
//! describe a fleet without touching sockets.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use rolemap_common::error::{ProbeError, TargetError};

#[cfg(any(test, feature = "testing"))]
pub mod scripted;
pub mod tcp;

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Resolves a hostname (or IP literal) to its addresses, in resolver order.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, TargetError>;

    /// Attempts a single TCP handshake.
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<(), ProbeError>;

    /// Looks up the PTR name of `addr`. Any failure is simply no name.
    async fn reverse(&self, addr: IpAddr) -> Option<String>;
}
