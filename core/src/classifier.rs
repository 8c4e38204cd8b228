//! # Role Classification
//!
//! Turns port findings and inventory markers into weighted [`RoleSignal`]s and
//! ranks the roles they point at.
//!
//! Each role's score is the sum of its signal weights; the score picks the
//! confidence tier through [`ConfidenceThresholds`](rolemap_common::config::ConfidenceThresholds).
//! Equal scores fall back to the configured role priority. A declared role skips
//! scoring entirely and is reported at high confidence, with the evidence kept
//! alongside it.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use rolemap_common::config::EngineConfig;
use rolemap_common::models::{
    Confidence, InferredRole, PortCheckResult, Role, RoleSignal, RoleSource, SignalSource,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub signals: Vec<RoleSignal>,
    /// Strongest first.
    pub roles: Vec<InferredRole>,
    pub role_source: RoleSource,
    pub notes: Vec<String>,
}

pub struct RoleClassifier {
    config: Arc<EngineConfig>,
}

impl RoleClassifier {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Collects the evidence: one signal per open role port, and one per marker
    /// and role it matches.
    pub fn signals(&self, ports: &[PortCheckResult], markers: &[String]) -> Vec<RoleSignal> {
        let profile = &self.config.profile;

        let from_ports = ports.iter().filter(|p| p.is_open()).filter_map(|p| {
            let rule = profile.rule(p.port)?;
            let role = rule.role?;
            Some(RoleSignal {
                role,
                weight: rule.weight,
                source: SignalSource::Port(p.port),
            })
        });

        let mut from_markers = Vec::new();
        for marker in markers {
            let mut best: BTreeMap<Role, u32> = BTreeMap::new();
            for rule in self.config.markers.iter().filter(|rule| rule.matches(marker)) {
                let weight = best.entry(rule.role).or_default();
                *weight = (*weight).max(rule.weight);
            }
            from_markers.extend(best.into_iter().map(|(role, weight)| RoleSignal {
                role,
                weight,
                source: SignalSource::Marker(marker.clone()),
            }));
        }

        from_ports.chain(from_markers).collect()
    }

    /// Ranks roles by summed signal weight. Roles without evidence are left out.
    pub fn score(&self, signals: &[RoleSignal]) -> Vec<InferredRole> {
        let mut scores: BTreeMap<Role, u32> = BTreeMap::new();
        for signal in signals {
            let score = scores.entry(signal.role).or_default();
            *score = score.saturating_add(signal.weight);
        }

        let mut ranked: Vec<(Role, u32)> = scores.into_iter().collect();
        ranked.sort_by_key(|&(role, score)| (Reverse(score), self.config.priority_rank(role)));

        ranked
            .into_iter()
            .filter_map(|(role, score)| {
                let confidence = self.config.thresholds.tier(score)?;
                Some(InferredRole { role, confidence })
            })
            .collect()
    }

    pub fn classify(
        &self,
        ports: &[PortCheckResult],
        markers: &[String],
        declared: Option<Role>,
    ) -> Classification {
        let mut signals = self.signals(ports, markers);

        let Some(role) = declared else {
            let roles = self.score(&signals);
            return Classification {
                signals,
                roles,
                role_source: RoleSource::Inferred,
                notes: Vec::new(),
            };
        };

        let mut notes = Vec::new();
        if !signals.iter().any(|signal| signal.role == role) {
            let inferred = self.score(&signals);
            match inferred.first() {
                Some(top) => notes.push(format!(
                    "declared role {role} is not confirmed by the evidence, which points to {} ({})",
                    top.role, top.confidence
                )),
                None => notes.push(format!("declared role {role} is not confirmed by the evidence")),
            }
        }

        signals.push(RoleSignal {
            role,
            weight: self.config.thresholds.high(),
            source: SignalSource::Declared,
        });

        Classification {
            signals,
            roles: vec![InferredRole {
                role,
                confidence: Confidence::High,
            }],
            role_source: RoleSource::Declared,
            notes,
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
