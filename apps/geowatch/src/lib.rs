//! # Geowatch Library
//!
//! This library exposes the Geowatch modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod notify;

// Re-export geowatch_core for convenience
pub use geowatch_core;
