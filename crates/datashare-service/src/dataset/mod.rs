//! Dataset-side operations.

pub mod table;

pub use table::DatasetTableService;
