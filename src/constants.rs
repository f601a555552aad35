use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Fixed scale between the floor-plan pixel grid and metres.
pub const PIXELS_PER_METER: f64 = 18.0;

// Log-distance path-loss model, calibrated against on-site walk tests.
pub const TX_POWER_DBM: f64 = -59.0;
pub const BASE_PATH_LOSS_EXPONENT: f64 = 2.2;
pub const NEAR_RSSI: f64 = -60.0;
pub const FAR_RSSI: f64 = -80.0;
pub const MIN_VALID_RSSI: i32 = -90;
pub const MIN_DISTANCE_M: f64 = 0.5;
pub const MAX_DISTANCE_M: f64 = 15.0;
pub const RANGING_CALIBRATION: f64 = 1.15;

// Trilateration solver.
pub const MAX_SOLVER_ITERATIONS: usize = 50;
pub const MAX_SOLVER_BEACONS: usize = 6;
pub const INITIAL_LEARNING_RATE: f64 = 0.5;
pub const CONVERGENCE_STEP_PX: f64 = 0.5;
pub const MIN_TRILATERATION_CONFIDENCE: f64 = 0.3;
pub const HYBRID_TRILATERATION_CONFIDENCE: f64 = 0.5;

// Walkable corridor rectangles, pixel space.
pub const MAIN_CORRIDOR_MIN_X: f64 = 200.0;
pub const MAIN_CORRIDOR_MAX_X: f64 = 1650.0;
pub const MAIN_CORRIDOR_MIN_Y: f64 = 180.0;
pub const MAIN_CORRIDOR_MAX_Y: f64 = 270.0;
pub const MAIN_CORRIDOR_CENTER_Y: f64 = 225.0;
pub const LEFT_CORRIDOR_MIN_X: f64 = 200.0;
pub const LEFT_CORRIDOR_MAX_X: f64 = 290.0;
pub const LEFT_CORRIDOR_MIN_Y: f64 = 270.0;
pub const LEFT_CORRIDOR_MAX_Y: f64 = 700.0;
pub const LEFT_CORRIDOR_CENTER_X: f64 = 245.0;
pub const CORRIDOR_MARGIN_PX: f64 = 100.0;
pub const JUNCTION_MAX_Y: f64 = 300.0;
pub const SOFT_CONSTRAINT_STRENGTH: f64 = 0.7;
pub const CENTERLINE_PULL: f64 = 0.2;

// Smoothing pipeline, shared between normal and navigation profiles.
pub const MAX_SPEED_PX_S: f64 = 90.0;
pub const MOVEMENT_SPEED_THRESHOLD_PX_S: f64 = 15.0;
pub const JITTER_BUFFER_SIZE: usize = 2;
pub const MIN_DELTA_T_S: f64 = 0.05;

pub const SNAP_TO_ROUTE_THRESHOLD_PX: f64 = 60.0;

/// Positioning mode requested by the client, or configured as the
/// process-wide default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, AsRefStr)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Mode {
    Proximity,
    Weighted,
    Trilateration,
    Hybrid,
}

impl Mode {
    // Stable discriminants for the process-wide atomic default.
    pub fn as_u8(self) -> u8 {
        match self {
            Mode::Proximity => 0,
            Mode::Weighted => 1,
            Mode::Trilateration => 2,
            Mode::Hybrid => 3,
        }
    }

    pub fn from_u8(value: u8) -> Mode {
        match value {
            0 => Mode::Proximity,
            1 => Mode::Weighted,
            2 => Mode::Trilateration,
            _ => Mode::Hybrid,
        }
    }
}
