//! # Backend Simulator
//!
//! Stand-ins for the preprocessing, training, inference and experimentation
//! services the gateway fronts. Used by the gateway's integration tests and
//! for local runs without the real services.
//!
//! ## Features
//!
//! - One HTTP server exposing every backend endpoint at its standard path
//! - Generated success bodies (randomized predictions, experiment sweeps)
//! - Per-endpoint fixed replies, error statuses and artificial latency
//! - Per-endpoint call counters and last-payload capture

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod backend;
pub mod generators;

pub use backend::{Behavior, Reply, SimulatedBackend, SimulatorHandle};
