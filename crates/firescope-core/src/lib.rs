//! Firescope Core - Domain models, ports, configuration and file formats
//!
//! This crate contains the core domain types and port definitions shared by
//! the geometry repair and bounded extract components.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;
pub mod ports;

pub use error::{FirescopeError, Result};
