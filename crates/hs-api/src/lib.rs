use hs_core::{EnvironmentSet, Request, Response, SandboxError, TestDescriptor};
use hs_runtime::{executor_for, SandboxOptions, ScriptJob, ScriptKind, ScriptOutcome};
use serde::Serialize;

pub use hs_runtime::{BackendKind, CancellationHandle};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreRequestResult {
    pub envs: EnvironmentSet,
    pub request: Request,
    pub console: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunResult {
    pub envs: EnvironmentSet,
    pub tests: TestDescriptor,
    pub console: Vec<String>,
}

fn execute(job: ScriptJob, options: &SandboxOptions) -> Result<ScriptOutcome, SandboxError> {
    executor_for(options).execute(job, &options.cancellation())
}

/// Runs a script before the request is sent. The inputs are copied; on success the
/// updated environment and request come back, on failure nothing does.
pub fn run_pre_request_script(
    script: &str,
    envs: &EnvironmentSet,
    request: &Request,
    options: &SandboxOptions,
) -> Result<PreRequestResult, SandboxError> {
    let job = ScriptJob::new(ScriptKind::PreRequest, script, envs.clone(), request.clone());
    let outcome = execute(job, options)?;
    Ok(PreRequestResult {
        envs: outcome.envs,
        request: outcome.request,
        console: outcome.console,
    })
}

/// Runs a script against a received response. The returned tree always has a `root` node.
pub fn run_test_script(
    script: &str,
    envs: &EnvironmentSet,
    request: &Request,
    response: &Response,
    options: &SandboxOptions,
) -> Result<TestRunResult, SandboxError> {
    let job = ScriptJob::new(ScriptKind::Test, script, envs.clone(), request.clone())
        .with_response(response.clone());
    let outcome = execute(job, options)?;
    Ok(TestRunResult {
        envs: outcome.envs,
        tests: outcome.tests,
        console: outcome.console,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_core::{EnvironmentVariable, ExpectStatus};

    fn var(key: &str, value: &str) -> EnvironmentVariable {
        EnvironmentVariable::new(key, value)
    }

    fn response() -> Response {
        Response::new(201, serde_json::json!({"ok": true}))
    }

    fn run_tests(script: &str, envs: &EnvironmentSet) -> Result<TestRunResult, SandboxError> {
        run_test_script(
            script,
            envs,
            &Request::default(),
            &response(),
            &SandboxOptions::default(),
        )
    }

    fn all_pass(tests: &TestDescriptor) -> bool {
        let tally = tests.tally();
        tally.failed == 0 && tally.passed > 0
    }

    #[test]
    fn selected_scope_shadows_global() {
        let envs = EnvironmentSet::new(vec![var("a", "global")], vec![var("a", "selected")]);
        let script = r#"
            pw.test("precedence", || {
                pw.expect(pw.env.get("a")).toBe("selected");
                pw.expect(pw.env.resolve("<<a>>")).toBe("selected");
                pw.expect(pw.env.getResolve("a")).toBe("selected");
            });
        "#;
        let result = run_tests(script, &envs).expect("script should run");
        assert!(all_pass(&result.tests));
    }

    #[test]
    fn set_round_trips_and_creates_missing_keys() {
        let envs = EnvironmentSet::new(vec![var("g", "1")], vec![var("a", "b")]);
        let script = r#"
            pw.env.set("a", "c");
            pw.env.set("g", "2");
            pw.env.set("fresh", "v");
            pw.test("read back", || { pw.expect(pw.env.get("a")).toBe("c"); });
        "#;
        let result = run_tests(script, &envs).expect("script should run");
        assert!(all_pass(&result.tests));
        assert_eq!(
            result.envs.selected,
            vec![
                EnvironmentVariable {
                    key: "a".to_string(),
                    initial_value: "b".to_string(),
                    current_value: "c".to_string(),
                    secret: false,
                },
                var("fresh", "v"),
            ]
        );
        assert_eq!(result.envs.global[0].current_value, "2");
        assert_eq!(result.envs.global[0].initial_value, "1");
        assert_eq!(envs.selected[0].current_value, "b");
    }

    #[test]
    fn cyclic_templates_fall_back_to_the_literal() {
        let envs = EnvironmentSet::new(vec![], vec![var("a", "<<b>>"), var("b", "<<a>>"), var("s", "<<s>>")]);
        let script = r#"
            pw.test("cycles", || {
                pw.expect(pw.env.resolve("<<a>>")).toBe("<<a>>");
                pw.expect(pw.env.resolve("<<s>>")).toBe("<<s>>");
                pw.expect(pw.env.resolve("<<unknown>>")).toBe("");
            });
        "#;
        let result = run_tests(script, &envs).expect("script should run");
        assert!(all_pass(&result.tests));
    }

    #[test]
    fn strictness_negation_and_tree_shape() {
        let script = r#"
            pw.test("A", || {
                pw.expect(2).toBe(2);
                pw.expect(2).toBe("2");
            });
            pw.test("B", || {
                pw.expect(2).not.toBe(2);
                pw.expect(2).not.toBe(4);
            });
        "#;
        let result = run_tests(script, &EnvironmentSet::default()).expect("script should run");
        assert_eq!(result.tests.descriptor, "root");
        assert_eq!(result.tests.children.len(), 2);
        let a = result.tests.child("A").expect("A should exist");
        assert_eq!(a.expect_results.len(), 2);
        assert_eq!(a.expect_results[0].status, ExpectStatus::Pass);
        assert_eq!(a.expect_results[1].status, ExpectStatus::Fail);
        let b = result.tests.child("B").expect("B should exist");
        assert_eq!(b.expect_results[0].status, ExpectStatus::Fail);
        assert_eq!(b.expect_results[1].status, ExpectStatus::Pass);
    }

    #[test]
    fn empty_scripts_still_return_a_root() {
        let result = run_tests("", &EnvironmentSet::default()).expect("empty script should run");
        assert_eq!(result.tests, TestDescriptor::root());
    }

    #[test]
    fn non_string_keys_are_rejected() {
        let envs = EnvironmentSet::new(vec![], vec![var("a", "b")]);
        let error = run_tests("pw.env.set(\"a\", \"c\"); pw.env.set(5, \"c\");", &envs)
            .expect_err("non-string key should fail");
        assert_eq!(
            error.message,
            "Script execution failed: TypeError: Expected key to be a string"
        );
        assert_eq!(envs.selected[0].current_value, "b");
    }

    #[test]
    fn pre_request_scripts_return_the_updated_request() {
        let envs = EnvironmentSet::new(vec![var("host", "api.example.com")], vec![]);
        let request = Request::new("GET", "https://<<host>>/items");
        let script = r#"
            hopp.request.setUrl(pw.env.resolve(hopp.request.url));
            hopp.request.setParam("page", "1");
            hopp.env.active.set("token", "abc");
        "#;
        let result = run_pre_request_script(script, &envs, &request, &SandboxOptions::default())
            .expect("script should run");
        assert_eq!(result.request.endpoint, "https://api.example.com/items");
        assert_eq!(result.request.params[0].key, "page");
        assert_eq!(result.envs.selected[0].key, "token");
        assert_eq!(request.endpoint, "https://<<host>>/items");
    }

    #[test]
    fn backends_return_the_same_result() {
        let envs = EnvironmentSet::new(vec![], vec![var("a", "b")]);
        let script = r#"
            pw.env.set("a", "c");
            pm.test("status", || { pm.response.to.have.status(201); });
            hopp.test("body", || { hopp.expect(hopp.response.body.asJSON().ok).to.be.true; });
        "#;
        let results = [BackendKind::Cage, BackendKind::Isolated].map(|backend| {
            run_test_script(
                script,
                &envs,
                &Request::default(),
                &response(),
                &SandboxOptions {
                    backend: Some(backend),
                    ..SandboxOptions::default()
                },
            )
        });
        assert_eq!(results[0], results[1]);
        let result = results[0].clone().expect("script should run");
        assert!(all_pass(&result.tests));
    }
}
