//! Resource policy entities.

pub mod model;

pub use model::{ResourcePolicy, ResourceType};
