//! # Telemetry
//!
//! Shapes raw simulator samples into broker messages.
//!
//! Responsibilities:
//! - Unit conversion (m/s to km/h and mph, fuel rounding, RPM truncation)
//! - Gear code to integer mapping over a closed enum
//! - Trip distance accumulation on a monotonic clock
//!
//! Nothing in here validates ranges or performs I/O.

pub mod error;
pub mod mapper;
pub mod odometer;

pub use error::MapError;
pub use mapper::{MappedBatch, MapperOptions, TelemetryMapper};
pub use odometer::TripOdometer;
