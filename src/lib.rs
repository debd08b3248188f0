//! Core library functions for community-aware anomaly detection

pub mod config;
pub mod error;
pub mod data;
pub mod graph;
pub mod community;
pub mod anomaly;
pub mod evaluation;
pub mod storage;
pub mod viz;

pub use error::{Error, Result};
