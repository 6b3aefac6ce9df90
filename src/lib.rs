pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod event_log;
pub mod events;
pub mod interfaces;
pub mod observability;
pub mod storage;
pub mod utils;

// Grace period for in-flight work once shutdown is triggered
pub const SHUTDOWN_GRACE_SECS: u64 = 10;
