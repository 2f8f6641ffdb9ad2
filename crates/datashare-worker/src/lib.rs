//! Background task processing for DataShare.
//!
//! This crate provides:
//! - A task executor that dispatches claimed tasks to the handler bound to
//!   their action
//! - A worker runner that polls the task table with bounded concurrency
//! - Handlers for share grant / revoke runs and dataset update notifications

pub mod executor;
pub mod handlers;
pub mod runner;

pub use executor::{TaskExecutionError, TaskExecutor, TaskHandler};
pub use runner::WorkerRunner;
