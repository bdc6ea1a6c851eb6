pub mod adapters;
pub mod chart;
pub mod config;
pub mod engine;
pub mod error;
pub mod stats;

pub use adapters::*;
pub use chart::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use stats::*;
