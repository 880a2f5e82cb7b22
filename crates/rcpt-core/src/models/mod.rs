//! Data models: extraction results and configuration.

pub mod config;
pub mod receipt;
