//! # Speed control module
//!
//! Speed control keeps the vehicle at its cruise speed while backing off as
//! obstacles appear in its path. Each cycle:
//!
//!  1. The target speed is chosen from the obstacle field. With nothing in
//!     the path the default (cruise) target is restored. Otherwise the target
//!     is reduced in proportion to how soon the nearest obstacle would be
//!     reached.
//!  2. If an obstacle would be reached within one wheel revolution the module
//!     short-circuits into an emergency stop: zero throttle and the emergency
//!     flag raised. The caller must cut actuation and hand over to manual
//!     control.
//!  3. The PID controller is run on the measured speed. Its output is treated
//!     as a speed increment which is mapped onto the throttle voltage, which
//!     is itself accumulated cycle to cycle and saturated to the throttle
//!     range.

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

use crate::obstacles::ObstacleError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the speed control table in the parameter file.
pub const PARAMS_SECTION: &str = "speed_ctrl";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during SpeedCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum SpeedCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid speed control parameters: {0}")]
    InvalidParams(String),

    #[error("Could not initialise the archives: {0}")]
    ArchiveError(#[from] ArchiveError),

    #[error("Measured speed is not finite: {0} m/s")]
    InvalidSpeed(f64),

    #[error(
        "Obstacle field is for a vehicle half width of {field} px, the speed \
        controller is configured for {params} px"
    )]
    VehicleWidthMismatch {
        field: f64,
        params: f64
    },

    #[error("Obstacle field error: {0}")]
    ObstacleError(#[from] ObstacleError),
}
