//! Website uptime and latency monitor.
//!
//! The engine in [`monitoring`] polls a list of HTTP endpoints, records every
//! result and raises alerts on up/down transitions. [`config`] and [`cli`]
//! build the validated settings it runs with; [`console`] renders progress.

pub mod cli;
pub mod config;
pub mod console;
pub mod monitoring;
pub mod validation;
