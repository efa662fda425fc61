//! Core module - configuration
//!
//! - [`Config`] - registry configuration

pub mod config;

pub use config::Config;
