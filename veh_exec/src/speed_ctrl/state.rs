//! Implementations for the SpeedCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

// Internal
use super::{Params, SpeedCtrlError, PARAMS_SECTION};
use crate::{
    obstacles::{min_crash_time, ObstacleError, ObstacleField},
    pid::{PidController, PidGains},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Speed control module state
#[derive(Default)]
pub struct SpeedCtrl {
    pub(crate) params: Params,

    pid: PidController,

    /// Throttle voltage accumulator, persists between cycles.
    ///
    /// Units: volts
    volt_out_v: f64,

    pub(crate) report: StatusReport,
    arch_report: Archiver,
}

/// Input data to speed control.
#[derive(Debug, Clone)]
pub struct InputData {
    /// Speed measured by the tachometer
    ///
    /// Units: meters/second
    pub speed_meas_ms: f64,

    /// The latest obstacle snapshot, including the vehicle's position
    pub obstacles: ObstacleField,
}

/// Output demand from SpeedCtrl that the throttle driver must execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OutputData {
    /// Throttle voltage demand
    ///
    /// Units: volts
    pub throttle_v: f64,

    /// If true a collision is imminent. Actuation must be cut and control
    /// handed over to the operator.
    pub emergency_stop: bool,
}

/// Status report for SpeedCtrl processing.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    /// Session time at which the cycle was processed
    pub time_s: f64,

    pub speed_meas_ms: f64,

    /// Speed target used in this cycle
    pub target_ms: f64,

    pub num_obstacles_in_path: usize,

    /// Time until the nearest in-path obstacle is reached, if known
    pub min_crash_time_s: Option<f64>,

    /// Reduction applied to the target in this cycle
    pub speed_mod_ms: f64,

    pub pid_output_ms: f64,

    /// True if the controller was called faster than its sample time
    pub pid_step_skipped: bool,

    pub throttle_v: f64,

    /// True if the throttle voltage was clamped into its range
    pub throttle_saturated: bool,

    pub emergency_stop: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for SpeedCtrl {
    type InitData = &'static str;
    type InitError = SpeedCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = SpeedCtrlError;

    /// Initialise the SpeedCtrl module.
    ///
    /// Expected init data is the path to the parameter file, relative to the
    /// parameters directory.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load_section(init_data, PARAMS_SECTION)?;

        *self = Self::new(params)?;

        self.arch_report = Archiver::from_path(
            session, "speed_ctrl/status_report.csv"
        )?;

        Ok(())
    }

    /// Perform cyclic processing of speed control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let output = self.feed(input_data.speed_meas_ms, &input_data.obstacles)?;

        Ok((output, self.report))
    }
}

impl Archived for SpeedCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}

impl SpeedCtrl {

    /// Create a new instance of the module from the parameters.
    pub fn new(params: Params) -> Result<Self, SpeedCtrlError> {
        params.validate().map_err(SpeedCtrlError::InvalidParams)?;

        let mut pid = PidController::new(params.gains());
        pid.set_default_target(params.target_ms);
        pid.set_windup_lower(params.windup_lower);
        pid.set_windup_upper(params.windup_upper);
        pid.set_zero_cross_reset(params.zero_cross_reset);
        if let Some(t) = params.sample_time_s {
            pid.enable_periodic_sampling(t);
        }

        Ok(Self {
            params,
            pid,
            volt_out_v: 0.0,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        })
    }

    /// Create a new instance from the `[speed_ctrl]` table of the given
    /// parameter file.
    pub fn from_param_file<P: AsRef<Path>>(path: P) -> Result<Self, SpeedCtrlError> {
        Self::new(params::load_section_from_path(path, PARAMS_SECTION)?)
    }

    /// Create an empty obstacle field sized for this vehicle.
    ///
    /// Snapshots passed to `feed` must come from a field built this way.
    pub fn new_obstacle_field(&self) -> ObstacleField {
        ObstacleField::new(self.params.vehicle_half_width_px)
    }

    /// Run one cycle of speed control.
    pub fn feed(
        &mut self,
        speed_meas_ms: f64,
        obstacles: &ObstacleField
    ) -> Result<OutputData, SpeedCtrlError> {
        self.feed_at(speed_meas_ms, obstacles, Instant::now())
    }

    /// Run one cycle of speed control with the speed measured at `now`.
    pub fn feed_at(
        &mut self,
        speed_meas_ms: f64,
        obstacles: &ObstacleField,
        now: Instant
    ) -> Result<OutputData, SpeedCtrlError> {
        if !speed_meas_ms.is_finite() {
            return Err(SpeedCtrlError::InvalidSpeed(speed_meas_ms));
        }
        if obstacles.vehicle_half_width_px() != self.params.vehicle_half_width_px {
            return Err(SpeedCtrlError::VehicleWidthMismatch {
                field: obstacles.vehicle_half_width_px(),
                params: self.params.vehicle_half_width_px
            });
        }

        // Clear the status report
        self.report = StatusReport {
            time_s: session::get_elapsed_seconds(),
            speed_meas_ms,
            ..Default::default()
        };

        // Get the target, an imminent collision overrides the controller
        let target_ms = match self.calc_target(speed_meas_ms, obstacles)? {
            Some(t) => t,
            None => return Ok(self.emergency_stop())
        };

        if target_ms != self.pid.target() {
            debug!(
                "Speed target changed from {:.03} m/s to {:.03} m/s",
                self.pid.target(), target_ms
            );
            self.pid.set_target(target_ms);
        }
        self.report.target_ms = target_ms;

        // Run the controller. The integral is recorded first so that it can
        // be restored if the throttle saturates.
        let integral_before = self.pid.integral();

        match self.pid.try_step_at(speed_meas_ms, now) {
            Some(speed_out_ms) => {
                self.report.pid_output_ms = speed_out_ms;
                self.speed_to_throttle(speed_out_ms, integral_before);
            },
            None => {
                // Stale cycle, hold the throttle
                self.report.pid_output_ms = self.pid.output();
                self.report.pid_step_skipped = true;
            }
        }

        self.report.throttle_v = self.volt_out_v;

        trace!(
            "SpeedCtrl: meas {:.03} m/s, target {:.03} m/s, pid {:.03}, throttle {:.03} V",
            speed_meas_ms, target_ms, self.report.pid_output_ms, self.volt_out_v
        );

        Ok(OutputData {
            throttle_v: self.volt_out_v,
            emergency_stop: false
        })
    }

    /// Calculate the speed target for this cycle based on the obstacles in
    /// the vehicle's path.
    ///
    /// Returns `None` if an emergency stop is required.
    fn calc_target(
        &mut self,
        speed_meas_ms: f64,
        obstacles: &ObstacleField
    ) -> Result<Option<f64>, SpeedCtrlError> {
        let in_path = obstacles.obstacles_in_path();
        self.report.num_obstacles_in_path = in_path.len();

        // Nothing in the way, go back to cruising
        if in_path.is_empty() {
            return Ok(Some(self.pid.default_target()));
        }

        // If we're not moving forward nothing will be reached, keep the
        // current target
        let crash_times_s = match obstacles.time_to_collision(speed_meas_ms) {
            Ok(c) => c,
            Err(ObstacleError::InvalidSpeed(s)) => {
                trace!("Crash times not calculated for a speed of {} m/s", s);
                return Ok(Some(self.pid.target()));
            },
            Err(e) => return Err(e.into())
        };

        let min_crash_s = match min_crash_time(&crash_times_s) {
            Some(t) => t,
            None => return Ok(Some(self.pid.target()))
        };
        self.report.min_crash_time_s = Some(min_crash_s);

        if ObstacleField::is_emergency(
            &crash_times_s,
            speed_meas_ms,
            self.params.wheel_circumference_m
        )? {
            return Ok(None);
        }

        // Slow down in proportion to how close the nearest obstacle is,
        // without reversing
        let speed_mod_ms = (
            self.params.speed_mod_scalar
            * self.params.wheel_circumference_m
            / min_crash_s
        ).min(self.pid.target());
        self.report.speed_mod_ms = speed_mod_ms;

        Ok(Some(self.pid.target() - speed_mod_ms))
    }

    /// Map the controller's speed output onto the throttle voltage.
    ///
    /// The voltage is accumulated and clamped to `[0, max_volt_v]`. On
    /// saturation the integral is restored to its value before this cycle's
    /// step so the integrator does not wind up against the throttle limit.
    fn speed_to_throttle(&mut self, speed_out_ms: f64, integral_before: f64) {
        let speed_ratio = speed_out_ms / self.params.max_speed_ms;
        let max_volt_v = self.params.max_volt_v();

        self.volt_out_v += max_volt_v * speed_ratio;

        // Written so that a NaN voltage also falls into the clamp
        if !(self.volt_out_v >= 0.0 && self.volt_out_v <= max_volt_v) {
            self.volt_out_v = self.volt_out_v.max(0.0).min(max_volt_v);
            self.pid.reseed_integral(integral_before);
            self.report.throttle_saturated = true;
        }
    }

    /// Cut the throttle and raise the emergency flag.
    ///
    /// The controller is not run this cycle.
    fn emergency_stop(&mut self) -> OutputData {
        warn!(
            "Emergency stop engaged, nearest obstacle in {:.03} s",
            self.report.min_crash_time_s.unwrap_or(0.0)
        );

        self.volt_out_v = 0.0;

        self.report.target_ms = self.pid.target();
        self.report.pid_output_ms = self.pid.output();
        self.report.throttle_v = 0.0;
        self.report.emergency_stop = true;

        OutputData {
            throttle_v: 0.0,
            emergency_stop: true
        }
    }

    /// Update the controller gains, for instance while tuning.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.pid.set_gains(gains);
        self.params.k_p = gains.k_p;
        self.params.k_i = gains.k_i;
        self.params.k_d = gains.k_d;
    }

    /// Write the current gains back into the `[speed_ctrl]` table of the
    /// given parameter file. Nothing else in the file is modified.
    pub fn save_gains<P: AsRef<Path>>(&self, path: P) -> Result<(), params::LoadError> {
        params::update_section(path, PARAMS_SECTION, &self.pid.gains())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Current speed target.
    ///
    /// Units: meters/second
    pub fn target_ms(&self) -> f64 {
        self.pid.target()
    }

    /// Current throttle voltage.
    ///
    /// Units: volts
    pub fn volt_out_v(&self) -> f64 {
        self.volt_out_v
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
