use std::cell::RefCell;
use std::rc::Rc;

use hs_core::{EnvironmentSet, ExpectResult, Request, Response};

use crate::executor::{ScriptJob, ScriptKind, SandboxLimits};
use crate::report::TestStack;

/// Captured console lines under a line and byte cap. The first overflow sticks, so a script
/// that swallows the error still fails.
#[derive(Debug)]
pub(crate) struct ConsoleBuffer {
    lines: Vec<String>,
    bytes: usize,
    max_lines: usize,
    max_bytes: usize,
    overflow: Option<String>,
}

impl ConsoleBuffer {
    pub(crate) fn new(max_lines: usize, max_bytes: usize) -> Self {
        Self {
            lines: Vec::new(),
            bytes: 0,
            max_lines,
            max_bytes,
            overflow: None,
        }
    }

    pub(crate) fn push(&mut self, line: String) -> Result<(), String> {
        if let Some(message) = &self.overflow {
            return Err(message.clone());
        }
        let rejection = if self.lines.len() >= self.max_lines {
            Some(format!("console output exceeded {} lines", self.max_lines))
        } else if self.bytes + line.len() > self.max_bytes {
            Some(format!("console output exceeded {} bytes", self.max_bytes))
        } else {
            None
        };
        if let Some(message) = rejection {
            self.overflow = Some(message.clone());
            return Err(message);
        }
        self.bytes += line.len();
        self.lines.push(line);
        Ok(())
    }

    pub(crate) fn overflow(&self) -> Option<&str> {
        self.overflow.as_deref()
    }

    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Everything a single script run may touch. Lives inside one engine and never crosses threads.
#[derive(Debug)]
pub(crate) struct ScriptState {
    pub(crate) kind: ScriptKind,
    pub(crate) envs: EnvironmentSet,
    pub(crate) request: Request,
    pub(crate) response: Option<Rc<Response>>,
    pub(crate) tests: TestStack,
    pub(crate) console: ConsoleBuffer,
}

pub(crate) type SharedState = Rc<RefCell<ScriptState>>;

impl ScriptState {
    pub(crate) fn from_job(job: &ScriptJob, limits: &SandboxLimits) -> Self {
        Self {
            kind: job.kind,
            envs: job.envs.clone(),
            request: job.request.clone(),
            response: job.response.clone().map(Rc::new),
            tests: TestStack::new(),
            console: ConsoleBuffer::new(limits.max_console_lines, limits.max_console_bytes),
        }
    }

    pub(crate) fn shared_with_limits(job: &ScriptJob, limits: &SandboxLimits) -> SharedState {
        Rc::new(RefCell::new(Self::from_job(job, limits)))
    }

    #[cfg(test)]
    pub(crate) fn shared(job: &ScriptJob) -> SharedState {
        Self::shared_with_limits(job, &SandboxLimits::default())
    }
}

pub(crate) fn record_result(state: &SharedState, result: ExpectResult) {
    state.borrow_mut().tests.record(result);
}

#[cfg(test)]
mod state_tests {
    use super::*;

    #[test]
    fn console_buffer_enforces_line_and_byte_caps() {
        let mut lines = ConsoleBuffer::new(2, 1024);
        assert!(lines.push("a".to_string()).is_ok());
        assert!(lines.push("b".to_string()).is_ok());
        assert_eq!(
            lines.push("c".to_string()),
            Err("console output exceeded 2 lines".to_string())
        );
        assert_eq!(lines.lines(), ["a".to_string(), "b".to_string()]);

        let mut bytes = ConsoleBuffer::new(10, 4);
        assert!(bytes.push("abc".to_string()).is_ok());
        assert_eq!(
            bytes.push("de".to_string()),
            Err("console output exceeded 4 bytes".to_string())
        );
        assert_eq!(bytes.overflow(), Some("console output exceeded 4 bytes"));
        assert!(bytes.push(String::new()).is_err());
    }
}
