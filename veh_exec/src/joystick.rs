//! # Joystick mapping
//!
//! Linear maps from manual joystick input to actuator demands, used when the
//! operator has control of the vehicle (after an emergency stop for example).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A linear map `demand = joystick * m + b`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct JoystickMap {
    /// Gradient
    pub m: f64,

    /// Offset
    pub b: f64,
}

/// Parameters for manual control.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Params {
    /// Joystick to throttle voltage map
    #[serde(default = "JoystickMap::throttle")]
    pub throttle: JoystickMap,

    /// Joystick to steering angle (degrees) map
    #[serde(default = "JoystickMap::steering")]
    pub steering: JoystickMap,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JoystickMap {
    /// Joystick to throttle voltage.
    pub const fn throttle() -> Self {
        Self { m: 1.5, b: 0.0 }
    }

    /// Joystick to steering angle in degrees.
    pub const fn steering() -> Self {
        Self { m: 45.0, b: 0.0 }
    }

    pub fn apply(&self, joystick_val: f64) -> f64 {
        joystick_val * self.m + self.b
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            throttle: JoystickMap::throttle(),
            steering: JoystickMap::steering(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_maps() {
        assert_eq!(JoystickMap::throttle().apply(1.0), 1.5);
        assert_eq!(JoystickMap::throttle().apply(-0.5), -0.75);
        assert_eq!(JoystickMap::steering().apply(-1.0), -45.0);
        assert_eq!(JoystickMap::steering().apply(0.0), 0.0);
    }

    #[test]
    fn test_params_defaults() {
        let params: Params = toml::from_str("throttle = { m = 2.0, b = 0.1 }").unwrap();

        assert_eq!(params.throttle, JoystickMap { m: 2.0, b: 0.1 });
        assert_eq!(params.steering, JoystickMap::steering());
    }

    #[test]
    fn test_offset() {
        let map = JoystickMap { m: 2.0, b: 0.5 };
        assert_eq!(map.apply(1.0), 2.5);
    }
}
