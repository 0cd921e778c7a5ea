//! CLI command implementations.

pub(crate) mod math;

pub(crate) use math::MathCommand;
