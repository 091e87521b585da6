//! # Obstacle field
//!
//! Holds the latest snapshot of obstacles reported by perception and answers
//! the questions the speed loop asks of it each cycle: which obstacles are in
//! the vehicle's path, how long until each of them is reached, and whether a
//! collision is imminent.
//!
//! Lateral positions and half-widths are in image pixels, depths are distances
//! along the direction of travel in meters.
//!
//! ## In-path test
//!
//! An obstacle is considered to be in the vehicle's path if either of its
//! lateral edges lies within the vehicle's lateral extent (inclusive). The
//! edges are tested independently, so an obstacle wider than the vehicle which
//! straddles it with both edges outside is not detected. This is a known
//! limitation of the heuristic.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use ndarray::{Array1, Axis};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A snapshot of the obstacles around the vehicle.
#[derive(Debug, Clone)]
pub struct ObstacleField {
    /// Lateral centre position of each obstacle
    ///
    /// Units: pixels
    pos_px: Array1<f64>,

    /// Lateral half-width of each obstacle
    ///
    /// Units: pixels
    half_width_px: Array1<f64>,

    /// Depth of each obstacle
    ///
    /// Units: meters
    depth_m: Array1<f64>,

    /// Lateral position of the vehicle
    ///
    /// Units: pixels
    vehicle_pos_px: f64,

    /// Lateral half-width of the vehicle
    ///
    /// Units: pixels
    vehicle_half_width_px: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with the obstacle field.
#[derive(Debug, Error)]
pub enum ObstacleError {
    #[error(
        "Obstacle arrays must have matching lengths, found {positions} positions, \
        {half_widths} half widths and {depths} depths"
    )]
    LengthMismatch {
        positions: usize,
        half_widths: usize,
        depths: usize
    },

    #[error("Measured speed must be positive and finite, found {0} m/s")]
    InvalidSpeed(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObstacleField {

    /// Create an empty field for a vehicle of the given half-width.
    pub fn new(vehicle_half_width_px: f64) -> Self {
        Self {
            pos_px: Array1::zeros(0),
            half_width_px: Array1::zeros(0),
            depth_m: Array1::zeros(0),
            vehicle_pos_px: 0.0,
            vehicle_half_width_px,
        }
    }

    /// Replace the obstacles and vehicle position with a new snapshot.
    ///
    /// If the arrays do not have the same length the field is left unchanged.
    pub fn update<P, W, D>(
        &mut self,
        pos_px: P,
        half_width_px: W,
        depth_m: D,
        vehicle_pos_px: f64
    ) -> Result<(), ObstacleError>
    where
        P: Into<Array1<f64>>,
        W: Into<Array1<f64>>,
        D: Into<Array1<f64>>
    {
        let pos_px = pos_px.into();
        let half_width_px = half_width_px.into();
        let depth_m = depth_m.into();

        if pos_px.len() != half_width_px.len() || pos_px.len() != depth_m.len() {
            return Err(ObstacleError::LengthMismatch {
                positions: pos_px.len(),
                half_widths: half_width_px.len(),
                depths: depth_m.len()
            });
        }

        self.pos_px = pos_px;
        self.half_width_px = half_width_px;
        self.depth_m = depth_m;
        self.vehicle_pos_px = vehicle_pos_px;

        Ok(())
    }

    /// Get the indices of the obstacles in the vehicle's path, in ascending
    /// order.
    pub fn obstacles_in_path(&self) -> Vec<usize> {
        let veh_lower = self.vehicle_pos_px - self.vehicle_half_width_px;
        let veh_upper = self.vehicle_pos_px + self.vehicle_half_width_px;
        let in_span = |x: f64| x >= veh_lower && x <= veh_upper;

        let lower = &self.pos_px - &self.half_width_px;
        let upper = &self.pos_px + &self.half_width_px;

        lower
            .iter()
            .zip(upper.iter())
            .enumerate()
            .filter(|(_, (l, u))| in_span(**l) || in_span(**u))
            .map(|(i, _)| i)
            .collect()
    }

    /// Get the time until the vehicle reaches each obstacle in its path.
    ///
    /// The result is empty if there are no obstacles in the path.
    ///
    /// Units: seconds
    pub fn time_to_collision(&self, speed_meas_ms: f64) -> Result<Array1<f64>, ObstacleError> {
        if !(speed_meas_ms > 0.0) || !speed_meas_ms.is_finite() {
            return Err(ObstacleError::InvalidSpeed(speed_meas_ms));
        }

        let in_path = self.obstacles_in_path();

        Ok(self.depth_m.select(Axis(0), &in_path) / speed_meas_ms)
    }

    /// Determine whether any of the crash times is shorter than the time it
    /// takes the wheel to complete one revolution at the current speed.
    pub fn is_emergency(
        crash_times_s: &Array1<f64>,
        speed_meas_ms: f64,
        wheel_circumference_m: f64
    ) -> Result<bool, ObstacleError> {
        if !(speed_meas_ms > 0.0) || !speed_meas_ms.is_finite() {
            return Err(ObstacleError::InvalidSpeed(speed_meas_ms));
        }

        let update_period_s = wheel_circumference_m / speed_meas_ms;

        Ok(crash_times_s.iter().any(|t| update_period_s > *t))
    }

    /// Number of obstacles in the field.
    pub fn len(&self) -> usize {
        self.pos_px.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_px.is_empty()
    }

    pub fn vehicle_pos_px(&self) -> f64 {
        self.vehicle_pos_px
    }

    pub fn vehicle_half_width_px(&self) -> f64 {
        self.vehicle_half_width_px
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the smallest of the crash times, or `None` if there are none.
pub fn min_crash_time(crash_times_s: &Array1<f64>) -> Option<f64> {
    crash_times_s
        .iter()
        .cloned()
        .fold(None, |min, t| match min {
            Some(m) if m <= t => Some(m),
            _ => Some(t)
        })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
