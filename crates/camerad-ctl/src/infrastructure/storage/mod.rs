//! Persistence adapters.  Currently only the TOML configuration file.

pub mod config;
