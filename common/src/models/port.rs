use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
}

/// Reachability outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortState {
    Open,
    Closed,
    Timeout,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
            PortState::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCheckResult {
    pub port: u16,
    pub transport: Transport,
    pub state: PortState,
    /// Connect latency; `None` when the probe timed out or never ran.
    pub latency: Option<Duration>,
    /// Service label from the port profile, e.g. "Microsoft SQL Server".
    pub service: Option<String>,
}

impl PortCheckResult {
    /// A port the per-target deadline cut off before it was probed.
    pub fn unprobed(port: u16, service: Option<String>) -> Self {
        Self {
            port,
            transport: Transport::Tcp,
            state: PortState::Timeout,
            latency: None,
            service,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}
