//! Storage infrastructure: the node's TOML configuration file.

pub mod config;
