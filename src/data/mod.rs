//! Dataset loading

pub mod parquet;

pub use parquet::load_dataset;
