pub mod config;
pub mod engine;
pub mod errors;
pub mod grpc;
pub mod metrics;
pub mod models;
pub mod server;
pub mod store;
pub mod tx;

pub use config::Config;
pub use engine::BalanceEngine;
pub use errors::{BalanceError, Result};
