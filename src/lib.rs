pub mod adapter;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod primary;
pub mod rate_limit;
pub mod server;
pub mod signals;
pub mod sink;

pub use logging::init_tracing;
