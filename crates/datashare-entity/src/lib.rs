//! # datashare-entity
//!
//! Domain entity models for DataShare. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod dataset;
pub mod environment;
pub mod permission;
pub mod share;
pub mod task;
