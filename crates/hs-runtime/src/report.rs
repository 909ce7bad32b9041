use hs_core::{ExpectResult, TestDescriptor};

/// Open test nodes, outermost first. Index 0 is always the root.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TestStack {
    open: Vec<TestDescriptor>,
}

impl Default for TestStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStack {
    pub(crate) fn new() -> Self {
        Self {
            open: vec![TestDescriptor::root()],
        }
    }

    pub(crate) fn push(&mut self, descriptor: impl Into<String>) {
        self.open.push(TestDescriptor::new(descriptor));
    }

    /// Closes the innermost test and appends it to its parent. The root never closes.
    pub(crate) fn pop(&mut self) {
        if self.open.len() < 2 {
            return;
        }
        if let Some(node) = self.open.pop() {
            if let Some(parent) = self.open.last_mut() {
                parent.children.push(node);
            }
        }
    }

    pub(crate) fn record(&mut self, result: ExpectResult) {
        if let Some(active) = self.open.last_mut() {
            active.expect_results.push(result);
        }
    }

    /// Appends a finished child without running anything, as `skip` does.
    pub(crate) fn attach(&mut self, node: TestDescriptor) {
        if let Some(active) = self.open.last_mut() {
            active.children.push(node);
        }
    }

    pub(crate) fn finish(mut self) -> TestDescriptor {
        while self.open.len() > 1 {
            self.pop();
        }
        self.open.pop().unwrap_or_else(TestDescriptor::root)
    }
}
