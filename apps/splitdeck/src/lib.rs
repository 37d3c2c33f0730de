//! Terminal host for a remote-controllable split timer.

pub mod cli;
pub mod config;
pub mod shell;
pub mod stopwatch;
pub mod telemetry;
