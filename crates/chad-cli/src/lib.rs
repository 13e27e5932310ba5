//! Library surface of the `chad` binary, shared with its integration tests.

pub mod cli;
pub mod commands;
pub mod logging;
