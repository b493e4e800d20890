//! reviewgate operator CLI.
//!
//! Runs guardrail chains from the command line with a simulated reviewer
//! answering human review requests.

pub mod check;
pub mod cli;
pub mod demo;
pub mod error;
pub mod reviewer;
