//! rewxb CLI library.
//!
//! Command runners and console reporting for the `rewxb` binary.

pub mod commands;
