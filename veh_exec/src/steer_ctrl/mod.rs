//! # Steering control module
//!
//! Steering control points the vehicle at its target. The bearing error is
//! approximated from the lateral offset between the vehicle and the target
//! and the distance to the target, and passed through a PID controller whose
//! output is the steering angle demand.
//!
//! The bearing approximation is `atan(vehicle_pos - target_pos) / distance`.
//! Note that the distance scales the angle rather than the offset, so the
//! error shrinks as the target gets further away.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the steering control table in the parameter file.
pub const PARAMS_SECTION: &str = "steer_ctrl";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during SteerCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum SteerCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid steering control parameters: {0}")]
    InvalidParams(String),

    #[error("Could not initialise the archives: {0}")]
    ArchiveError(#[from] ArchiveError),

    #[error("Distance to target must be non-zero and finite, found {0} m")]
    InvalidDistance(f64),

    #[error("Vehicle and target positions must be finite, found {0} m and {1} m")]
    InvalidPosition(f64, f64),
}
