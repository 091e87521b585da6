//! Parameters structure for SteerCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::pid::{check_params, PidGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for steering control.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Params {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Bearing error target, normally zero
    ///
    /// Units: radians
    pub target_rad: f64,

    /// Lower bound on the integral term, no bound if not given.
    #[serde(default)]
    pub windup_lower: Option<f64>,

    /// Upper bound on the integral term, no bound if not given.
    #[serde(default)]
    pub windup_upper: Option<f64>,

    /// If true the integral term is cleared when the bearing error changes
    /// sign.
    #[serde(default = "default_zero_cross_reset")]
    pub zero_cross_reset: bool,

    /// Minimum time between controller updates. If not given the controller
    /// runs every cycle with a unit timestep.
    ///
    /// Units: seconds
    #[serde(default)]
    pub sample_time_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// The controller gains.
    pub fn gains(&self) -> PidGains {
        PidGains {
            k_p: self.k_p,
            k_i: self.k_i,
            k_d: self.k_d
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        check_params(
            self.gains(),
            self.target_rad,
            self.windup_lower,
            self.windup_upper,
            self.sample_time_s
        )
    }
}

fn default_zero_cross_reset() -> bool {
    true
}
