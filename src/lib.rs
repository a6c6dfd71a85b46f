//! webstress CLI library.
//!
//! Exposes the command-line surface and configuration loading so
//! integration tests can drive them directly.

pub mod cli;
pub mod config;
