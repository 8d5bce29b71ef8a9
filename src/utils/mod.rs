//! Shared helpers for the plugin and its binaries.

pub mod bootstrap;
