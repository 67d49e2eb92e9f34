//! Top-level facade crate for waypoint.
//!
//! Re-exports the decision core and the control-plane adapter so users can depend on a single crate.

pub mod core {
    pub use waypoint_core::*;
}

pub mod control {
    pub use waypoint_control::*;
}
