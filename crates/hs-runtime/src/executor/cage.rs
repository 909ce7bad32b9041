use hs_core::SandboxError;

use super::session::run_session;
use super::{CancellationHandle, SandboxExecutor, SandboxLimits, ScriptJob, ScriptOutcome};

/// Runs on the calling thread. Isolation comes from the capability table and the limits.
#[derive(Debug, Clone, Default)]
pub struct CageExecutor {
    limits: SandboxLimits,
}

impl CageExecutor {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }
}

impl SandboxExecutor for CageExecutor {
    fn name(&self) -> &'static str {
        "cage"
    }

    fn execute(
        &self,
        job: ScriptJob,
        cancel: &CancellationHandle,
    ) -> Result<ScriptOutcome, SandboxError> {
        run_session(self.name(), &job, &self.limits, vec![cancel.clone()])
    }
}
