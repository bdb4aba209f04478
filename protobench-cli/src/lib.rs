//! Protobench CLI library
//!
//! Configuration, exporters and subcommand implementations behind the
//! `protobench` binary, exposed for testing.

pub mod commands;
pub mod completions;
pub mod config;
pub mod output;
