//! Core type definitions used across the DataShare workspace.

pub mod id;

pub use id::*;
