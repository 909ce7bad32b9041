use crate::types::TestDescriptor;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct SandboxError {
    pub code: String,
    pub message: String,
    /// Test tree recorded before a runtime failure. Diagnostic only.
    pub partial_tests: Option<TestDescriptor>,
}

impl SandboxError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            partial_tests: None,
        }
    }

    pub fn with_partial_tests(mut self, tests: TestDescriptor) -> Self {
        self.partial_tests = Some(tests);
        self
    }
}
