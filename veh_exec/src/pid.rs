//! # PID controller module
//!
//! A discrete-time PID controller shared by the speed and steering loops.
//!
//! The controller can optionally be rate limited. When periodic sampling is
//! enabled a step is only accepted if more than `sample_time_s` has elapsed
//! since the previous accepted step, and the elapsed time becomes the
//! integration timestep. Steps requested faster than this are no-ops which
//! return the previous output. When periodic sampling is disabled every step
//! uses a unit timestep.
//!
//! Two anti-windup mechanisms act on the integral term:
//!  1. Zero crossing reset: the integral is cleared when the error changes
//!     sign between two steps.
//!  2. Saturation: the integral is clamped into the optional windup bounds.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::{Deserialize, Serialize};
use std::time::Instant;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The gains of a PID controller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,
}

/// A PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,

    /// The current setpoint
    target: f64,

    /// The setpoint restored by `reset_target`
    default_target: f64,

    /// Error calculated in the last accepted step
    error: f64,

    /// Error from the step before the last accepted one
    prev_error: f64,

    /// The integral accumulation
    integral: f64,

    /// Last output, returned again when a step is skipped
    output: f64,

    windup_lower: Option<f64>,
    windup_upper: Option<f64>,

    /// If true the integral is cleared when the error changes sign
    zero_cross_reset: bool,

    /// Minimum time between accepted steps, `None` if sampling is disabled
    sample_time_s: Option<f64>,

    /// Instant of the last accepted step, or of enabling periodic sampling
    last_update: Instant,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PidController {
    fn default() -> Self {
        Self::new(PidGains::default())
    }
}

impl PidController {

    /// Create a new controller with the given gains.
    ///
    /// The target is zero, there are no windup bounds, zero crossing reset is
    /// enabled and periodic sampling is disabled.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            target: 0.0,
            default_target: 0.0,
            error: 0.0,
            prev_error: 0.0,
            integral: 0.0,
            output: 0.0,
            windup_lower: None,
            windup_upper: None,
            zero_cross_reset: true,
            sample_time_s: None,
            last_update: Instant::now(),
        }
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Set the default target, also making it the current target.
    pub fn set_default_target(&mut self, target: f64) {
        self.default_target = target;
        self.target = target;
    }

    /// Restore the current target to the default one.
    pub fn reset_target(&mut self) {
        self.target = self.default_target;
    }

    /// Set both windup bounds on the integral term.
    pub fn set_windup_bounds(&mut self, lower: f64, upper: f64) {
        self.windup_lower = Some(lower);
        self.windup_upper = Some(upper);
    }

    pub fn set_windup_lower(&mut self, lower: Option<f64>) {
        self.windup_lower = lower;
    }

    pub fn set_windup_upper(&mut self, upper: Option<f64>) {
        self.windup_upper = upper;
    }

    pub fn set_zero_cross_reset(&mut self, enabled: bool) {
        self.zero_cross_reset = enabled;
    }

    /// Rate limit the controller, the sample clock starts now.
    pub fn enable_periodic_sampling(&mut self, sample_time_s: f64) {
        self.enable_periodic_sampling_at(sample_time_s, Instant::now())
    }

    /// Rate limit the controller with the sample clock starting at `now`.
    pub fn enable_periodic_sampling_at(&mut self, sample_time_s: f64, now: Instant) {
        self.sample_time_s = Some(sample_time_s);
        self.last_update = now;
    }

    pub fn disable_periodic_sampling(&mut self) {
        self.sample_time_s = None;
    }

    /// Clear the integral accumulation.
    pub fn reset_integral(&mut self) {
        self.integral = 0.0;
    }

    /// Overwrite the integral accumulation.
    ///
    /// Used by outer loops which saturate the controller's output further
    /// downstream and need to stop the integrator from winding up.
    pub fn reseed_integral(&mut self, integral: f64) {
        self.integral = integral;
    }

    /// Clear all accumulated state, keeping gains, targets and limits.
    ///
    /// The sample clock is restarted.
    pub fn reset(&mut self) {
        self.error = 0.0;
        self.prev_error = 0.0;
        self.integral = 0.0;
        self.output = 0.0;
        self.last_update = Instant::now();
    }

    /// Run the controller for the given measurement.
    ///
    /// This function is time-aware so there is no need to pass in a delta-time
    /// value.
    pub fn step(&mut self, measurement: f64) -> f64 {
        self.step_at(measurement, Instant::now())
    }

    /// Run the controller for the given measurement taken at `now`.
    ///
    /// If the step is rate limited the previous output is returned unchanged.
    pub fn step_at(&mut self, measurement: f64, now: Instant) -> f64 {
        match self.try_step_at(measurement, now) {
            Some(o) => o,
            None => self.output
        }
    }

    /// Run the controller for the given measurement taken at `now`, returning
    /// `None` if the step was rate limited.
    ///
    /// A rate limited step does not modify any of the controller's state.
    pub fn try_step_at(&mut self, measurement: f64, now: Instant) -> Option<f64> {
        // Get the timestep, or skip if we're being called too quickly
        let dt = match self.sample_time_s {
            Some(sample_time_s) => {
                let elapsed_s = now
                    .saturating_duration_since(self.last_update)
                    .as_secs_f64();

                if elapsed_s <= sample_time_s {
                    trace!(
                        "PID step skipped, {:.06} s elapsed of {:.06} s sample time",
                        elapsed_s, sample_time_s
                    );
                    return None;
                }

                self.last_update = now;
                elapsed_s
            },
            None => 1.0
        };

        self.error = self.target - measurement;

        // Accumulate the integral and calculate the derivative
        self.integral += self.error * dt;
        let deriv = (self.error - self.prev_error) / dt;

        // Anti-windup
        if self.zero_cross_reset && self.error * self.prev_error < 0.0 {
            self.integral = 0.0;
        }
        self.integral = self.saturate(self.integral);

        self.output =
            self.gains.k_p * self.error
            + self.gains.k_i * self.integral
            + self.gains.k_d * deriv;

        self.prev_error = self.error;

        Some(self.output)
    }

    /// Clamp the value into the windup bounds, if any are set.
    fn saturate(&self, value: f64) -> f64 {
        let mut value = value;

        if let Some(upper) = self.windup_upper {
            if value > upper {
                value = upper;
            }
        }
        if let Some(lower) = self.windup_lower {
            if value < lower {
                value = lower;
            }
        }

        value
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn default_target(&self) -> f64 {
        self.default_target
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn windup_bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.windup_lower, self.windup_upper)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Check the parameters shared by every PID-based module.
///
/// Gains and target must be finite, bounds must not be NaN and must be
/// ordered, and the sample time must be non-negative and finite. Returns a
/// description of the first problem found.
pub fn check_params(
    gains: PidGains,
    target: f64,
    windup_lower: Option<f64>,
    windup_upper: Option<f64>,
    sample_time_s: Option<f64>
) -> Result<(), String> {
    let finite = [
        ("k_p", gains.k_p),
        ("k_i", gains.k_i),
        ("k_d", gains.k_d),
        ("target", target)
    ];
    for (name, value) in finite.iter() {
        if !value.is_finite() {
            return Err(format!("{} must be finite, found {}", name, value));
        }
    }

    let bounds = [("windup_lower", windup_lower), ("windup_upper", windup_upper)];
    for (name, bound) in bounds.iter() {
        if let Some(b) = bound {
            if b.is_nan() {
                return Err(format!("{} must be a number, found {}", name, b));
            }
        }
    }

    if let (Some(l), Some(u)) = (windup_lower, windup_upper) {
        if l > u {
            return Err(format!(
                "windup_lower ({}) is greater than windup_upper ({})", l, u
            ));
        }
    }

    if let Some(t) = sample_time_s {
        if !(t >= 0.0) || !t.is_finite() {
            return Err(format!(
                "sample_time_s must be non-negative and finite, found {}", t
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn gains(k_p: f64, k_i: f64, k_d: f64) -> PidGains {
        PidGains { k_p, k_i, k_d }
    }

    #[test]
    fn test_unit_timestep() {
        let mut pid = PidController::new(gains(1.0, 0.5, 0.25));
        pid.set_target(1.0);

        // error = 1, integral = 1, deriv = 1
        assert_eq!(pid.step(0.0), 1.0 + 0.5 + 0.25);

        // error = 0.5, integral = 1.5, deriv = -0.5
        assert_eq!(pid.step(0.5), 0.5 + 0.75 - 0.125);
        assert_eq!(pid.prev_error(), 0.5);
    }

    #[test]
    fn test_zero_gains_give_zero_output() {
        let mut pid = PidController::new(gains(0.0, 0.0, 0.0));
        let raw_angle = 0.2f64.atan();

        assert_eq!(pid.step(raw_angle), 0.0);
        assert_eq!(pid.step(-raw_angle), 0.0);
    }

    #[test]
    fn test_zero_cross_reset() {
        let mut pid = PidController::new(gains(0.0, 1.0, 0.0));
        pid.set_target(0.0);

        pid.step(-1.0);
        pid.step(-2.0);
        assert_eq!(pid.integral(), 3.0);

        // Error goes from +2 to -1, integral is cleared
        assert_eq!(pid.step(1.0), 0.0);
        assert_eq!(pid.integral(), 0.0);

        // Without the reset the integral carries over
        let mut pid = PidController::new(gains(0.0, 1.0, 0.0));
        pid.set_zero_cross_reset(false);
        pid.step(-1.0);
        pid.step(-2.0);
        assert_eq!(pid.step(1.0), 2.0);
    }

    #[test]
    fn test_windup_bounds_hold() {
        let mut pid = PidController::new(gains(0.1, 1.0, 0.0));
        pid.set_windup_bounds(-2.5, 2.5);
        pid.set_target(10.0);

        let t0 = Instant::now();
        pid.enable_periodic_sampling_at(0.05, t0);

        let measurements = [0.0, 1.0, 3.0, 30.0, 25.0, 12.0, -4.0, 0.0, 11.0];
        for (i, m) in measurements.iter().enumerate() {
            let now = t0 + Duration::from_millis(100 * (i as u64 + 1));
            pid.step_at(*m, now);
            assert!(
                pid.integral() >= -2.5 && pid.integral() <= 2.5,
                "integral {} out of bounds after step {}", pid.integral(), i
            );
        }
    }

    #[test]
    fn test_unset_bounds_do_not_saturate() {
        let mut pid = PidController::new(gains(0.0, 1.0, 0.0));
        pid.set_target(100.0);

        for _ in 0..5 {
            pid.step(0.0);
        }
        assert_eq!(pid.integral(), 500.0);

        pid.set_windup_upper(Some(50.0));
        pid.step(0.0);
        assert_eq!(pid.integral(), 50.0);
        assert_eq!(pid.windup_bounds(), (None, Some(50.0)));
    }

    #[test]
    fn test_sample_gate_is_idempotent() {
        let mut pid = PidController::new(gains(1.0, 1.0, 1.0));
        pid.set_target(1.0);

        let t0 = Instant::now();
        pid.enable_periodic_sampling_at(0.1, t0);

        // Inside the first sample period nothing happens
        assert_eq!(pid.step_at(0.0, t0 + Duration::from_millis(50)), 0.0);
        assert_eq!(pid.integral(), 0.0);

        let first = pid.step_at(0.0, t0 + Duration::from_millis(200));
        let integral = pid.integral();
        let prev_error = pid.prev_error();

        // Called again within the sample time, and exactly at it
        let t1 = t0 + Duration::from_millis(200);
        assert_eq!(pid.step_at(0.7, t1 + Duration::from_millis(30)), first);
        assert_eq!(pid.step_at(0.3, t1 + Duration::from_millis(100)), first);
        assert!(pid.try_step_at(0.3, t1 + Duration::from_millis(60)).is_none());
        assert_eq!(pid.integral(), integral);
        assert_eq!(pid.prev_error(), prev_error);

        // Past the sample time the step is accepted
        let second = pid.step_at(0.5, t1 + Duration::from_millis(150));
        assert!(second != first);
    }

    #[test]
    fn test_elapsed_time_is_timestep() {
        let mut pid = PidController::new(gains(0.0, 1.0, 0.0));
        pid.set_target(2.0);

        let t0 = Instant::now();
        pid.enable_periodic_sampling_at(0.1, t0);

        let out = pid.step_at(0.0, t0 + Duration::from_millis(250));
        assert!((out - 0.5).abs() < 1e-9);

        pid.disable_periodic_sampling();
        let out = pid.step(0.0);
        assert!((out - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut pid = PidController::new(gains(1.0, 1.0, 0.0));
        pid.set_default_target(3.0);
        pid.set_target(1.0);
        pid.step(0.0);
        pid.step(0.5);

        pid.reset();
        pid.reset_target();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.prev_error(), 0.0);
        assert_eq!(pid.output(), 0.0);
        assert_eq!(pid.target(), 3.0);
    }

    #[test]
    fn test_integral_reset_and_reseed() {
        let mut pid = PidController::new(gains(0.0, 1.0, 0.0));
        pid.set_target(1.0);

        pid.step(0.0);
        pid.step(0.0);
        assert_eq!(pid.integral(), 2.0);

        pid.reset_integral();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.prev_error(), 1.0);
        assert_eq!(pid.step(0.0), 1.0);

        pid.reseed_integral(-4.0);
        assert_eq!(pid.step(0.0), -3.0);
    }

    #[test]
    fn test_check_params() {
        let g = gains(1.0, 0.1, 0.0);

        assert!(check_params(g, 0.0, Some(-1.0), Some(1.0), Some(0.1)).is_ok());
        assert!(check_params(g, 0.0, None, None, None).is_ok());
        assert!(check_params(g, 0.0, Some(1.0), Some(-1.0), None).is_err());
        assert!(check_params(g, 0.0, None, None, Some(-0.1)).is_err());
        assert!(check_params(g, 0.0, None, None, Some(std::f64::NAN)).is_err());
        assert!(check_params(g, 0.0, Some(std::f64::NAN), None, None).is_err());

        // Infinite bounds are fine, they just never clamp
        assert!(check_params(g, 0.0, Some(std::f64::NEG_INFINITY), None, None).is_ok());
    }

    #[test]
    fn test_non_finite_gains_rejected() {
        let nan = std::f64::NAN;
        let inf = std::f64::INFINITY;

        assert!(check_params(gains(nan, 0.0, 0.0), 0.0, None, None, None).is_err());
        assert!(check_params(gains(0.0, inf, 0.0), 0.0, None, None, None).is_err());
        assert!(check_params(gains(0.0, 0.0, -inf), 0.0, None, None, None).is_err());
        assert!(check_params(gains(0.0, 0.0, 0.0), nan, None, None, None).is_err());
    }
}
