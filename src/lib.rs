// src/lib.rs
pub mod config;
pub mod provider;
pub mod ping;
pub mod resources;
pub mod metrics;
