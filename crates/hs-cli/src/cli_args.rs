use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use hs_runtime::{BackendKind, SandboxOptions};

#[derive(Debug, Parser)]
#[command(name = "hs-cli")]
#[command(about = "Run pre-request and test scripts in the script sandbox")]
pub(crate) struct Cli {
    /// Log sandbox activity at debug level on stderr.
    #[arg(long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    PreRequest(PreRequestArgs),
    Test(TestArgs),
    Suite(SuiteArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct SandboxFlags {
    #[arg(long = "backend")]
    pub(crate) backend: Option<BackendKind>,
    #[arg(long = "timeout-ms")]
    pub(crate) timeout_ms: Option<u64>,
    #[arg(long = "max-operations")]
    pub(crate) max_operations: Option<u64>,
    #[arg(long = "max-console-lines")]
    pub(crate) max_console_lines: Option<usize>,
    #[arg(long = "max-console-bytes")]
    pub(crate) max_console_bytes: Option<usize>,
}

impl SandboxFlags {
    pub(crate) fn options(&self) -> SandboxOptions {
        SandboxOptions {
            backend: self.backend,
            max_operations: self.max_operations,
            max_console_lines: self.max_console_lines,
            max_console_bytes: self.max_console_bytes,
            timeout: self.timeout_ms.map(Duration::from_millis),
            ..SandboxOptions::default()
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct PreRequestArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
    #[arg(long = "envs")]
    pub(crate) envs: Option<String>,
    #[arg(long = "request")]
    pub(crate) request: Option<String>,
    #[command(flatten)]
    pub(crate) sandbox: SandboxFlags,
}

#[derive(Debug, Args)]
pub(crate) struct TestArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
    #[arg(long = "envs")]
    pub(crate) envs: Option<String>,
    #[arg(long = "request")]
    pub(crate) request: Option<String>,
    #[arg(long = "response")]
    pub(crate) response: String,
    #[command(flatten)]
    pub(crate) sandbox: SandboxFlags,
}

#[derive(Debug, Args)]
pub(crate) struct SuiteArgs {
    #[arg(long = "cases-dir")]
    pub(crate) cases_dir: String,
    #[command(flatten)]
    pub(crate) sandbox: SandboxFlags,
}
