//! Dataset domain entities.

pub mod model;

pub use model::{Dataset, DatasetBucket, DatasetTable};
