//! # Software Inventory
//!
//! Optional source of detected software and service names per target. Markers
//! feed the role classifier as extra signals; remote inspection itself lives
//! outside this crate, so the default provider knows nothing.

use std::collections::HashMap;

use async_trait::async_trait;
use rolemap_common::models::ServerTarget;
use rolemap_common::network::target::normalize_host;

#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Software/service names detected on `target`, e.g. `"MSSQLSERVER"`.
    async fn markers(&self, target: &ServerTarget) -> anyhow::Result<Vec<String>>;
}

/// Provider used when no inventory source is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInventory;

#[async_trait]
impl InventoryProvider for NoInventory {
    async fn markers(&self, _target: &ServerTarget) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Fixed host to markers mapping, e.g. loaded from an inventory export.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    markers: HashMap<String, Vec<String>>,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markers(mut self, host: &str, markers: &[&str]) -> Self {
        self.markers
            .entry(normalize_host(host))
            .or_default()
            .extend(markers.iter().map(|marker| marker.to_string()));
        self
    }
}

#[async_trait]
impl InventoryProvider for StaticInventory {
    async fn markers(&self, target: &ServerTarget) -> anyhow::Result<Vec<String>> {
        Ok(self
            .markers
            .get(&normalize_host(&target.host))
            .cloned()
            .unwrap_or_default())
    }
}
