use hs_core::SandboxError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> SandboxError {
    SandboxError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: SandboxError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    if let Some(partial) = error.partial_tests {
        println!(
            "PARTIAL_TESTS_JSON:{}",
            serde_json::to_string(&partial).unwrap_or_else(|_| "null".to_string())
        );
    }
    1
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> SandboxError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_input_invalid(error: serde_json::Error) -> SandboxError {
    map_error("CLI_INPUT_INVALID", error)
}

pub(crate) fn map_cli_suite(error: impl Display) -> SandboxError {
    map_error("CLI_SUITE", error)
}
