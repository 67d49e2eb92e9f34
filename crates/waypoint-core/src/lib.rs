//! waypoint core: the decision-resolution layer of a programmable reverse proxy.
//!
//! Converts an untyped policy response from the control plane into a validated
//! `Directive` (reply directly, or forward with a quota-and-failover plan), and
//! provides the epoch-aligned bucket arithmetic quota plans depend on.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every malformed input surfaces as `WaypointError`; nothing is silently
//! coerced into a default directive.
//!
//! Everything in this crate is pure: no I/O, no shared mutable state.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod directive;
pub mod error;
pub mod handles;
pub mod headers;
pub mod rate;
pub mod upstream;
pub mod value;

pub use directive::{resolve, Directive, Forward, Reply, Resolver};
/// Shared result type.
pub use error::{ErrorKind, Result, WaypointError};
pub use headers::HeaderSet;
pub use rate::{Rate, UnitType};
pub use upstream::{Scheme, Upstream};
