pub(crate) mod keyword_rewrite;
pub(crate) mod rhai_bridge;
pub(crate) mod value_path;
