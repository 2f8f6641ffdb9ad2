//! Environment domain entities.

pub mod model;

pub use model::{Environment, EnvironmentGroup};
