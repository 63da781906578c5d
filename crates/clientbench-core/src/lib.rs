pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod results;
pub mod strategy;
pub mod workload;

pub use error::BenchError;
