//! entrybot — stateless agent handlers behind a single invocation endpoint.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! drive them through [`comms::build_router`].

pub mod agents;
pub mod comms;
pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod memory;
pub mod tools;

#[cfg(test)]
mod testutil;
