//! Utilities shared by the staking binaries, such as bringing up the tracing stack.

pub mod logging;

// Re-export tracing crate for convenience.
pub use tracing;
