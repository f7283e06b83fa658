pub mod collections;
pub mod config;
pub mod error;
pub mod log;
