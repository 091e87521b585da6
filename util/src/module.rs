//! Module interfaces
//!
//! Control modules run by the cyclic executables implement `State`. A module
//! is constructed in an inert default state, brought up once with `init`, and
//! then driven with `proc` once per control cycle:
//!
//! ```ignore
//! let mut speed_ctrl = SpeedCtrl::default();
//! speed_ctrl.init("ctrl.toml", &session)?;
//!
//! loop {
//!     let (output, report) = speed_ctrl.proc(&input)?;
//!     // actuate using `output`, archive `report`
//! }
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A control module's persistent state.
pub trait State {
    /// Configuration handed over at start up, usually a parameter file name
    type InitData;
    /// Failure to configure the module. Always fatal to the executable.
    type InitError;

    /// Measurements consumed each cycle.
    type InputData;
    /// Demands produced each cycle for the actuators.
    type OutputData;
    /// Diagnostics for the cycle, archived by the caller.
    type StatusReport;
    /// Failure of a single cycle. The caller decides whether to carry on.
    type ProcError;

    /// Configure the module.
    ///
    /// The `session` gives the location for any archives the module writes.
    /// Calling `init` again replaces all previous state.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one control cycle on `input_data`, returning the demands and the
    /// cycle's status report.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
