pub mod env;
pub mod error;
pub mod template;
pub mod types;
pub mod value;

pub use env::{EnvLookup, EnvScope, EnvSource};
pub use error::SandboxError;
pub use template::{resolve_template, resolve_template_from};
pub use types::*;
pub use value::*;
