pub mod analyzers;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod parser;
pub mod stats;
