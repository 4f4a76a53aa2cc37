//! # Contracts
//!
//! Shared data model for the telemetry bridge. Every other crate depends on
//! this one; it depends on nothing in the workspace.
//!
//! ## Time Model
//! - Samples carry no simulator timestamp; elapsed time between polls is
//!   measured on the bridge side with a monotonic clock.

mod blueprint;
mod error;
mod message;
mod scenario;
mod telemetry;

pub use blueprint::*;
pub use error::*;
pub use message::*;
pub use scenario::*;
pub use telemetry::*;
