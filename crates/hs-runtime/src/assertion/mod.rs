pub(crate) mod chai;
pub(crate) mod expectation;

pub(crate) use chai::{register_chai, ChaiChain};
pub(crate) use expectation::{register_expectation, Expectation};
