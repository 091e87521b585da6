//! # Vehicle control library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to
//! access the control modules defined inside the vehicle crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Joystick mapping - linear maps used in manual control
pub mod joystick;

/// Obstacle field - which obstacles are in the way and when they'll be reached
pub mod obstacles;

/// PID controller shared by the control loops
pub mod pid;

/// Speed control module - regulates the throttle and stops for obstacles
pub mod speed_ctrl;

/// Steering control module - points the vehicle at its target
pub mod steer_ctrl;

// ------------------------------------------------------------------------------------------------
// TEST UTILITIES
// ------------------------------------------------------------------------------------------------

/// Session and software root shared by the tests which initialise modules.
///
/// The session epoch can only be set once per process so every test must go
/// through `session()` rather than creating its own.
#[cfg(test)]
pub(crate) mod test_util {
    use conquer_once::Lazy;
    use std::path::PathBuf;
    use util::{host::SW_ROOT_ENV_VAR, session::Session};

    static SESSION: Lazy<Session> = Lazy::new(|| {
        let root = sw_root();
        std::fs::create_dir_all(root.join("params")).unwrap();
        std::env::set_var(SW_ROOT_ENV_VAR, &root);

        Session::new_in("veh_lib_test", root.join("sessions")).unwrap()
    });

    fn sw_root() -> PathBuf {
        std::env::temp_dir().join(format!("veh_lib_test_{}", std::process::id()))
    }

    /// Get the test session, setting up the software root on first use.
    pub(crate) fn session() -> &'static Session {
        &*SESSION
    }

    /// Write a file into the test software root's parameters directory.
    pub(crate) fn write_param_file(name: &str, contents: &str) {
        session();
        std::fs::write(sw_root().join("params").join(name), contents).unwrap();
    }
}
