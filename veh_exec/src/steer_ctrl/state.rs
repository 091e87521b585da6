//! Implementations for the SteerCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

// Internal
use super::{Params, SteerCtrlError, PARAMS_SECTION};
use crate::pid::{PidController, PidGains};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering control module state
#[derive(Default)]
pub struct SteerCtrl {
    pub(crate) params: Params,

    pid: PidController,

    pub(crate) report: StatusReport,
    arch_report: Archiver,
}

/// Input data to steering control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Lateral position of the vehicle
    ///
    /// Units: meters
    pub vehicle_pos_m: f64,

    /// Lateral position of the target
    ///
    /// Units: meters
    pub target_pos_m: f64,

    /// Distance to the target along the direction of travel
    ///
    /// Units: meters
    pub distance_to_target_m: f64,
}

/// Output demand from SteerCtrl that the steering driver must execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OutputData {
    /// Steering angle demand
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// Status report for SteerCtrl processing.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    pub time_s: f64,

    /// Approximate bearing error fed into the controller
    pub raw_angle_rad: f64,

    pub angle_dem_rad: f64,

    pub pid_step_skipped: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for SteerCtrl {
    type InitData = &'static str;
    type InitError = SteerCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = SteerCtrlError;

    /// Initialise the SteerCtrl module.
    ///
    /// Expected init data is the path to the parameter file, relative to the
    /// parameters directory.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load_section(init_data, PARAMS_SECTION)?;

        *self = Self::new(params)?;

        self.arch_report = Archiver::from_path(
            session, "steer_ctrl/status_report.csv"
        )?;

        Ok(())
    }

    /// Perform cyclic processing of steering control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let output = self.feed(
            input_data.vehicle_pos_m,
            input_data.target_pos_m,
            input_data.distance_to_target_m
        )?;

        Ok((output, self.report))
    }
}

impl Archived for SteerCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}

impl OutputData {
    /// The steering angle demand in degrees.
    pub fn angle_deg(&self) -> f64 {
        self.angle_rad.to_degrees()
    }
}

impl SteerCtrl {

    /// Create a new instance of the module from the parameters.
    pub fn new(params: Params) -> Result<Self, SteerCtrlError> {
        params.validate().map_err(SteerCtrlError::InvalidParams)?;

        let mut pid = PidController::new(params.gains());
        pid.set_default_target(params.target_rad);
        pid.set_windup_lower(params.windup_lower);
        pid.set_windup_upper(params.windup_upper);
        pid.set_zero_cross_reset(params.zero_cross_reset);
        if let Some(t) = params.sample_time_s {
            pid.enable_periodic_sampling(t);
        }

        Ok(Self {
            params,
            pid,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        })
    }

    /// Create a new instance from the `[steer_ctrl]` table of the given
    /// parameter file.
    pub fn from_param_file<P: AsRef<Path>>(path: P) -> Result<Self, SteerCtrlError> {
        Self::new(params::load_section_from_path(path, PARAMS_SECTION)?)
    }

    /// Run one cycle of steering control.
    pub fn feed(
        &mut self,
        vehicle_pos_m: f64,
        target_pos_m: f64,
        distance_to_target_m: f64
    ) -> Result<OutputData, SteerCtrlError> {
        self.feed_at(vehicle_pos_m, target_pos_m, distance_to_target_m, Instant::now())
    }

    /// Run one cycle of steering control with positions estimated at `now`.
    pub fn feed_at(
        &mut self,
        vehicle_pos_m: f64,
        target_pos_m: f64,
        distance_to_target_m: f64,
        now: Instant
    ) -> Result<OutputData, SteerCtrlError> {
        let raw_angle_rad = calc_angle(vehicle_pos_m, target_pos_m, distance_to_target_m)?;

        let (angle_dem_rad, skipped) = match self.pid.try_step_at(raw_angle_rad, now) {
            Some(a) => (a, false),
            None => (self.pid.output(), true)
        };

        self.report = StatusReport {
            time_s: session::get_elapsed_seconds(),
            raw_angle_rad,
            angle_dem_rad,
            pid_step_skipped: skipped,
        };

        trace!(
            "SteerCtrl: raw angle {:.04} rad, demand {:.04} rad",
            raw_angle_rad, angle_dem_rad
        );

        Ok(OutputData {
            angle_rad: angle_dem_rad
        })
    }

    /// Update the controller gains, for instance while tuning.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.pid.set_gains(gains);
        self.params.k_p = gains.k_p;
        self.params.k_i = gains.k_i;
        self.params.k_d = gains.k_d;
    }

    /// Write the current gains back into the `[steer_ctrl]` table of the
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
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Approximate the bearing error to the target.
///
/// Units: radians
pub fn calc_angle(
    vehicle_pos_m: f64,
    target_pos_m: f64,
    distance_to_target_m: f64
) -> Result<f64, SteerCtrlError> {
    if !vehicle_pos_m.is_finite() || !target_pos_m.is_finite() {
        return Err(SteerCtrlError::InvalidPosition(vehicle_pos_m, target_pos_m));
    }
    if distance_to_target_m == 0.0 || !distance_to_target_m.is_finite() {
        return Err(SteerCtrlError::InvalidDistance(distance_to_target_m));
    }

    Ok((vehicle_pos_m - target_pos_m).atan() / distance_to_target_m)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
