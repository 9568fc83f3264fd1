//! Aggregation, comparison and anomaly detection over cleaned datasets.
//!
//! Every analysis reads a [`CleanDataset`](crate::cleaning::types::CleanDataset)
//! and returns flat row types from [`types`]. [`analyzer::run_analysis`] wires
//! them into one report.

pub mod aggregate;
pub mod analyzer;
pub mod anomaly;
pub mod comparison;
pub mod geographic;
pub mod patterns;
pub mod types;
pub mod utility;
