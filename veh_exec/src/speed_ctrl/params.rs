//! Parameters structure for SpeedCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::pid::{check_params, PidGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for speed control.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Params {

    // ---- CONTROLLER ----

    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Default (cruise) speed target
    ///
    /// Units: meters/second
    pub target_ms: f64,

    /// Lower bound on the integral term, no bound if not given.
    #[serde(default)]
    pub windup_lower: Option<f64>,

    /// Upper bound on the integral term, no bound if not given.
    #[serde(default)]
    pub windup_upper: Option<f64>,

    /// If true the integral term is cleared when the speed error changes sign.
    #[serde(default = "default_zero_cross_reset")]
    pub zero_cross_reset: bool,

    /// Minimum time between controller updates. If not given the controller
    /// runs every cycle with a unit timestep.
    ///
    /// Units: seconds
    #[serde(default)]
    pub sample_time_s: Option<f64>,

    // ---- VEHICLE ----

    /// Maximum speed of the vehicle
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Circumference of the drive wheel
    ///
    /// Units: meters
    pub wheel_circumference_m: f64,

    /// Lateral half-width of the vehicle in the perception image
    ///
    /// Units: pixels
    pub vehicle_half_width_px: f64,

    // ---- OBSTACLE AVOIDANCE ----

    /// Scales the target speed reduction caused by the nearest obstacle.
    pub speed_mod_scalar: f64,

    // ---- THROTTLE ----

    /// Maximum throttle voltage
    ///
    /// Units: volts
    pub max_throttle_v: f64,

    /// Fraction of the maximum throttle voltage that may be demanded.
    pub throttle_scalar: f64,
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

    /// The largest throttle voltage that will be output.
    ///
    /// Units: volts
    pub fn max_volt_v(&self) -> f64 {
        self.max_throttle_v * self.throttle_scalar
    }

    /// Check the parameters are usable, returning a description of the first
    /// problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.max_speed_ms > 0.0) || !self.max_speed_ms.is_finite() {
            return Err(format!(
                "max_speed_ms must be positive and finite, found {}", self.max_speed_ms
            ));
        }
        if !(self.wheel_circumference_m > 0.0) || !self.wheel_circumference_m.is_finite() {
            return Err(format!(
                "wheel_circumference_m must be positive and finite, found {}",
                self.wheel_circumference_m
            ));
        }
        if !(self.vehicle_half_width_px >= 0.0) || !self.vehicle_half_width_px.is_finite() {
            return Err(format!(
                "vehicle_half_width_px must be non-negative and finite, found {}",
                self.vehicle_half_width_px
            ));
        }
        if !(self.speed_mod_scalar >= 0.0) || !self.speed_mod_scalar.is_finite() {
            return Err(format!(
                "speed_mod_scalar must be non-negative and finite, found {}",
                self.speed_mod_scalar
            ));
        }
        if !(self.max_volt_v() >= 0.0) || !self.max_volt_v().is_finite() {
            return Err(format!(
                "max_throttle_v * throttle_scalar must be non-negative and finite, \
                found {}", self.max_volt_v()
            ));
        }

        check_params(
            self.gains(),
            self.target_ms,
            self.windup_lower,
            self.windup_upper,
            self.sample_time_s
        )
    }
}

fn default_zero_cross_reset() -> bool {
    true
}
