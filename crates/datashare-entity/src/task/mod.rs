//! Deferred worker task entities.

pub mod action;
pub mod model;
pub mod status;

pub use model::Task;
pub use status::TaskStatus;
