//! waypoint control-plane adapter.
//!
//! Sits between the control-plane client and the proxy dispatch path: loads
//! the resolver config, bounds and decodes policy responses, and builds
//! quota-exceeded replies from the core's bucket arithmetic.

pub mod config;
pub mod engine;

pub use engine::DecisionEngine;
