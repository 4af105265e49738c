//! Daemon-adjacent concerns: process-wide signal handling.

pub mod signals;
