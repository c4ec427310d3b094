//! Shared utilities for govlock.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::{init_logging, init_tracing, LogFormat};
pub use stats::StatsCounter;
pub use time::{format_duration, parse_duration, DurationParseError};
