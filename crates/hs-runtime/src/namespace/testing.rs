use hs_core::{ExpectResult, TestDescriptor};
use rhai::{Dynamic, Engine, FnPtr, NativeCallContext};

use crate::helpers::rhai_bridge::{dynamic_to_value, ScriptResult};
use crate::state::SharedState;

/// A script-visible namespace object bound to one run's state.
pub(crate) trait ScriptNamespace: Clone + 'static {
    fn state(&self) -> &SharedState;
}

/// Runs `body` as a child of the active test node. The node is closed even when the body fails.
pub(crate) fn run_test(
    context: &NativeCallContext,
    state: &SharedState,
    descriptor: String,
    body: &FnPtr,
) -> ScriptResult<()> {
    state.borrow_mut().tests.push(descriptor);
    let outcome = body.call_within_context::<Dynamic>(context, ());
    state.borrow_mut().tests.pop();
    outcome.map(|_| ())
}

pub(crate) fn skip_test(state: &SharedState, descriptor: String) {
    let mut node = TestDescriptor::new(descriptor);
    node.expect_results.push(ExpectResult::skipped("Test skipped"));
    state.borrow_mut().tests.attach(node);
}

/// `test`, `describe`, `skip` and `xit` on a namespace type.
pub(crate) fn register_testing<T: ScriptNamespace>(engine: &mut Engine) {
    for name in ["test", "describe"] {
        engine.register_fn(
            name,
            |context: NativeCallContext, namespace: &mut T, descriptor: Dynamic, body: FnPtr| {
                run_test(
                    &context,
                    namespace.state(),
                    dynamic_to_value(descriptor).to_text(),
                    &body,
                )
            },
        );
    }
    for name in ["skip", "xit"] {
        engine.register_fn(name, |namespace: &mut T, descriptor: Dynamic, _body: Dynamic| {
            skip_test(namespace.state(), dynamic_to_value(descriptor).to_text())
        });
    }
}
