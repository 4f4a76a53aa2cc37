//! # Controller
//!
//! Simulation lifecycle.
//!
//! - `SessionState`: running/autopilot flags and trip distance
//! - `LifecycleController`: start, stop, toggle autopilot, reset, shutdown
//! - Status notifications through a callback

pub mod error;
pub mod lifecycle;
pub mod session;
pub mod status;

pub use error::{ControllerError, Result};
pub use lifecycle::{LifecycleController, StatusReport};
pub use session::{LoopView, SessionSnapshot, SessionState};
pub use status::{ignore_status, ControllerStatus, StatusCallback};
