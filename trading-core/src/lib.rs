//! # Trading Core Library
//!
//! Plumbing shared by the trader binaries.
//!
//! ## Modules
//! - `args`: Standardized argument parsing.
//! - `config`: Layered application configuration (defaults, TOML file, environment).
//! - `fs`: Centralized file system paths, crash-atomic state persistence and the JSON ledger.
//! - `report`: Report sinks for the per-cycle summary.

pub mod args;
pub mod config;
pub mod fs;
pub mod report;
