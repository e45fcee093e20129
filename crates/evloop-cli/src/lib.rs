//! Evloop CLI library
//!
//! The subcommands live here so they can be driven from tests without
//! spawning the binary.

pub mod commands;
