use std::sync::Arc;
use std::time::Duration;

use rolemap_common::config::{DiscoveryConfig, EngineConfig};
use rolemap_common::error::TargetError;
use rolemap_common::models::{AnalysisResult, PortState, Role};
use rolemap_core::Engine;
use rolemap_core::network::scripted::ScriptedNetwork;

/// Engine over a scripted fleet with short timeouts.
pub fn engine(net: &Arc<ScriptedNetwork>) -> Engine {
    let config = EngineConfig {
        port_timeout: Duration::from_millis(40),
        discovery: DiscoveryConfig {
            probe_timeout: Duration::from_millis(40),
            ..DiscoveryConfig::default()
        },
        ..EngineConfig::default()
    };
    Engine::new(config).with_network(net.clone())
}

/// The parts of a result that must not depend on scheduling.
#[derive(Debug, PartialEq)]
pub struct Outcome {
    pub host: String,
    pub roles: Vec<Role>,
    pub ports: Vec<(u16, PortState)>,
    pub error: Option<TargetError>,
}

pub fn outcomes(results: &[AnalysisResult]) -> Vec<Outcome> {
    results
        .iter()
        .map(|r| Outcome {
            host: r.target.host.clone(),
            roles: r.inferred_roles(),
            ports: r.ports.iter().map(|p| (p.port, p.state)).collect(),
            error: r.error.clone(),
        })
        .collect()
}
