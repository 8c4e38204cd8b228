//! # Error Taxonomy
//!
//! Only [`ValidationError`] and [`RunError`] ever cross the engine boundary (wrapped
//! in [`EngineError`]). [`ProbeError`] and [`TargetError`] are absorbed into the
//! result data model and never abort a run.

use std::io;

use thiserror::Error;

/// Malformed input, raised before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown role '{token}' (expected one of APP, SQL, CTX)")]
    UnknownRole { token: String },

    #[error("empty declaration token in '{block}'")]
    EmptyDeclaration { block: String },

    #[error("malformed declaration '{block}' (expected host=ROLE)")]
    MalformedDeclaration { block: String },

    #[error("invalid host '{host}'")]
    InvalidHost { host: String },

    #[error("invalid discovery base '{base}' (expected three octets, e.g. 192.168.10)")]
    InvalidBase { base: String },

    #[error("invalid discovery range {start}-{end}: {reason}")]
    InvalidRange { start: u32, end: u32, reason: &'static str },

    #[error("invalid discovery range '{input}': {reason}")]
    UnparsableRange { input: String, reason: String },

    #[error("invalid port rule '{rule}': {reason}")]
    InvalidPortRule { rule: String, reason: &'static str },

    #[error("invalid confidence thresholds (high={high}, medium={medium})")]
    InvalidThresholds { high: u32, medium: u32 },
}

/// Whole-run failure surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("no targets to analyze: supply hosts or a discovery range that finds live hosts")]
    NoTargets,

    #[error("run deadline exceeded before any target completed")]
    DeadlineExceeded,
}

/// A single failed connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("connection refused")]
    Refused,

    #[error("connection timed out")]
    TimedOut,

    #[error("connection failed: {0:?}")]
    Unreachable(io::ErrorKind),
}

impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ProbeError::Refused,
            io::ErrorKind::TimedOut => ProbeError::TimedOut,
            kind => ProbeError::Unreachable(kind),
        }
    }
}

/// Target-level fault, recorded on that target's result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("name resolution failed for '{host}': {reason}")]
    Resolution { host: String, reason: String },

    #[error("host did not answer on any probed port")]
    Unreachable,

    #[error("target deadline exceeded ({unprobed} port(s) left unprobed)")]
    DeadlineExceeded { unprobed: usize },

    #[error("skipped: run deadline exceeded")]
    SkippedByRunDeadline,

    #[error("cancelled: run deadline exceeded")]
    CancelledByRunDeadline,

    #[error("internal analysis fault: {0}")]
    Internal(String),
}

impl TargetError {
    /// True when the run deadline prevented the target from being analyzed.
    pub fn is_run_deadline(&self) -> bool {
        matches!(
            self,
            TargetError::SkippedByRunDeadline | TargetError::CancelledByRunDeadline
        )
    }
}

/// The only error type returned by the engine entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Run(#[from] RunError),
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
