use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use hs_core::SandboxError;

use super::session::{run_session, timeout_error};
use super::{CancellationHandle, SandboxExecutor, SandboxLimits, ScriptJob, ScriptOutcome};

/// Slack on top of the in-engine deadline before the host gives up on the worker.
const WORKER_GRACE: Duration = Duration::from_millis(250);

fn worker_error(detail: impl std::fmt::Display) -> SandboxError {
    SandboxError::new(
        "SANDBOX_WORKER",
        format!("Script execution failed: InternalError: {}", detail),
    )
}

/// One worker thread and one engine per run. Nothing is shared with the host but the job
/// going in and the result coming out.
#[derive(Debug, Clone, Default)]
pub struct IsolatedVmExecutor {
    limits: SandboxLimits,
}

impl IsolatedVmExecutor {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }
}

impl SandboxExecutor for IsolatedVmExecutor {
    fn name(&self) -> &'static str {
        "isolated"
    }

    fn execute(
        &self,
        job: ScriptJob,
        cancel: &CancellationHandle,
    ) -> Result<ScriptOutcome, SandboxError> {
        let backend = self.name();
        let limits = self.limits;
        let abandon = CancellationHandle::new();
        let signals = vec![cancel.clone(), abandon.clone()];
        let (sender, receiver) = mpsc::channel();

        thread::Builder::new()
            .name("hs-sandbox-vm".to_string())
            .spawn(move || {
                let result = run_session(backend, &job, &limits, signals);
                // The host may have stopped listening after a timeout.
                let _ = sender.send(result);
            })
            .map_err(|error| worker_error(format!("could not start sandbox worker: {}", error)))?;

        match receiver.recv_timeout(limits.timeout + WORKER_GRACE) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                abandon.cancel();
                tracing::warn!(backend, "sandbox worker abandoned after timeout");
                Err(timeout_error(&limits))
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!(backend, "sandbox worker stopped without a result");
                Err(worker_error("sandbox worker stopped unexpectedly"))
            }
        }
    }
}
