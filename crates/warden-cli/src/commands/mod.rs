//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod manage;
pub(crate) mod token;
pub(crate) mod validate;
