//! pong-data crate

pub mod chain;
pub mod contract;
pub mod types;

pub use types::{PingRecord, PongRecord};
