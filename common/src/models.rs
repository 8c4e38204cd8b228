//! # Domain Models
//!
//! Everything a run produces: targets, port findings, role signals, per-target
//! results and the run context handed to the reporting side.

mod port;
mod result;
mod role;
mod run;
mod target;

pub use port::{PortCheckResult, PortState, Transport};
pub use result::AnalysisResult;
pub use role::{Confidence, InferredRole, Role, RoleSignal, RoleSource, SignalSource};
pub use run::{RunContext, RunId, RunResult, RunSummary};
pub use target::{DiscoveredHost, ServerTarget, TargetOrigin};
