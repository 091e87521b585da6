//! Main vehicle-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Perception and measurement acquisition
//!         - Speed control processing
//!         - Steering control processing
//!         - Actuation
//!
//! If speed control raises an emergency stop the executable hands over to
//! manual control for the rest of the run, where the joystick maps drive the
//! actuators.
//!
//! There is no hardware attached to this executable yet, so the vehicle and a
//! single obstacle ahead of it are simulated with a simple first order model.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::WrapErr};
use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    archive::Archived,
    host,
    logger::{logger_init, LevelFilter, LogLevels},
    module::State,
    params,
    session::Session,
};
use veh_lib::{
    joystick,
    obstacles::{ObstacleError, ObstacleField},
    speed_ctrl::{self, SpeedCtrl},
    steer_ctrl::{self, SteerCtrl},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.05;

/// Number of cycles to run the scenario for.
const NUM_CYCLES: u64 = 400;

/// Parameter file holding the controller tables.
const CTRL_PARAMS: &str = "ctrl.toml";

/// Lateral position of the vehicle in the perception image.
const VEHICLE_POS_PX: f64 = 400.0;

/// Fraction of the speed error removed by the simulated drivetrain each
/// second.
const SIM_SPEED_RESPONSE: f64 = 1.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Who is currently driving the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DriveMode {
    Auto,
    Manual
}

/// Simulated vehicle and obstacle.
struct SimVehicle {
    speed_ms: f64,
    lateral_pos_m: f64,
    obstacle_depth_m: f64,
    throttle_v: f64,
    steer_rad: f64,
    max_volt_v: f64,
    max_speed_ms: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "veh_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger, per-cycle control traces go to the log file only and
    // skipped PID steps are not logged at all
    logger_init(
        LogLevels::new(LevelFilter::Debug, LevelFilter::Trace)
            .with_target("veh_lib::pid", LevelFilter::Debug),
        &session
    ).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Vehicle Control Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut speed_ctrl = SpeedCtrl::default();
    speed_ctrl.init(CTRL_PARAMS, &session)
        .wrap_err("Failed to initialise SpeedCtrl")?;
    info!("SpeedCtrl init complete");

    let mut steer_ctrl = SteerCtrl::default();
    steer_ctrl.init(CTRL_PARAMS, &session)
        .wrap_err("Failed to initialise SteerCtrl")?;
    info!("SteerCtrl init complete");

    let manual_params: joystick::Params = params::load_section(CTRL_PARAMS, "manual")
        .wrap_err("Could not load manual control params")?;

    info!("Module initialisation complete\n");

    // ---- SCENARIO ----

    let mut sim = SimVehicle {
        speed_ms: 0.0,
        lateral_pos_m: 0.4,
        obstacle_depth_m: 25.0,
        throttle_v: 0.0,
        steer_rad: 0.0,
        max_volt_v: speed_ctrl.params().max_volt_v(),
        max_speed_ms: speed_ctrl.params().max_speed_ms,
    };
    let mut obstacles = speed_ctrl.new_obstacle_field();
    let mut mode = DriveMode::Auto;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    for cycle in 0..NUM_CYCLES {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        sim.perceive(&mut obstacles)
            .wrap_err("Perception produced an invalid obstacle snapshot")?;

        // ---- CONTROL ----

        match mode {
            DriveMode::Auto => {
                let speed_input = speed_ctrl::InputData {
                    speed_meas_ms: sim.speed_ms,
                    obstacles: obstacles.clone(),
                };

                match speed_ctrl.proc(&speed_input) {
                    Ok((out, _)) if out.emergency_stop => {
                        warn!("Emergency stop on cycle {}, handing over to manual control", cycle);
                        sim.throttle_v = 0.0;
                        mode = DriveMode::Manual;
                    },
                    Ok((out, _)) => sim.throttle_v = out.throttle_v,
                    Err(e) => warn!("SpeedCtrl processing error: {}", e)
                }

                let steer_input = steer_ctrl::InputData {
                    vehicle_pos_m: sim.lateral_pos_m,
                    target_pos_m: 0.0,
                    distance_to_target_m: 5.0,
                };

                match steer_ctrl.proc(&steer_input) {
                    Ok((out, _)) => sim.steer_rad = out.angle_rad,
                    Err(e) => warn!("SteerCtrl processing error: {}", e)
                }

                // ---- WRITE ARCHIVES ----

                if let Err(e) = speed_ctrl.write() {
                    warn!("Could not archive SpeedCtrl: {}", e);
                }
                if let Err(e) = steer_ctrl.write() {
                    warn!("Could not archive SteerCtrl: {}", e);
                }
            },
            DriveMode::Manual => {
                // The operator holds the stick centred, bringing the vehicle
                // to a halt
                sim.throttle_v = manual_params.throttle.apply(0.0).max(0.0);
                sim.steer_rad = manual_params.steering.apply(0.0).to_radians();
            }
        }

        // ---- ACTUATION ----

        sim.step(CYCLE_PERIOD_S);

        debug!(
            "Cycle {}: {:?}, speed {:.03} m/s, obstacle at {:.03} m, lateral {:.03} m",
            cycle, mode, sim.speed_ms, sim.obstacle_depth_m, sim.lateral_pos_m
        );

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S)
            .checked_sub(cycle_dur)
        {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            )
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimVehicle {
    /// Produce the obstacle snapshot perception would see this cycle.
    fn perceive(&self, obstacles: &mut ObstacleField) -> Result<(), ObstacleError> {
        // One obstacle slightly right of centre, and one well off to the left
        // which never gets in the way. Obstacles behind the vehicle are not
        // seen.
        let mut pos_px = vec![80.0];
        let mut half_width_px = vec![30.0];
        let mut depth_m = vec![12.0];

        if self.obstacle_depth_m > 0.0 {
            pos_px.push(430.0);
            half_width_px.push(40.0);
            depth_m.push(self.obstacle_depth_m);
        }

        obstacles.update(pos_px, half_width_px, depth_m, VEHICLE_POS_PX)
    }

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f64) {
        let speed_dem_ms = if self.max_volt_v > 0.0 {
            self.throttle_v / self.max_volt_v * self.max_speed_ms
        }
        else {
            0.0
        };

        self.speed_ms += (speed_dem_ms - self.speed_ms) * (SIM_SPEED_RESPONSE * dt).min(1.0);
        self.speed_ms = self.speed_ms.max(0.0);

        self.obstacle_depth_m -= self.speed_ms * dt;
        self.lateral_pos_m += self.speed_ms * dt * self.steer_rad.sin();
    }
}
