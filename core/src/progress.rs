use std::sync::Arc;

/// Progress notifications for front-ends (spinners, status lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Discovery found another live host; `live` counts all found so far.
    HostFound { live: usize },
    /// A target's analysis finished, successfully or not.
    TargetFinished { done: usize, total: usize },
}

pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;
