use std::fs;
use std::path::Path;

use hs_core::SandboxError;
use serde::de::DeserializeOwned;

use crate::{map_cli_input_invalid, map_cli_source_read};

pub(crate) fn read_text(path: &Path) -> Result<String, SandboxError> {
    if !path.exists() {
        return Err(SandboxError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("File does not exist: {}", path.display()),
        ));
    }
    fs::read_to_string(path).map_err(map_cli_source_read)
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SandboxError> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).map_err(map_cli_input_invalid)
}

/// Reads a JSON input when a path is given, else falls back to the type's default.
pub(crate) fn read_json_or_default<T: DeserializeOwned + Default>(
    path: Option<&str>,
) -> Result<T, SandboxError> {
    match path {
        Some(path) => read_json(Path::new(path)),
        None => Ok(T::default()),
    }
}
