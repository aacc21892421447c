use nalgebra::Vector3;
use serde::Serialize;

use crate::orbital::KeplerianElements;

// ---------------------------------------------------------------------------
// SimState: snapshot recorded when an event first fires
// ---------------------------------------------------------------------------

/// Everything the display layer needs about the vehicle at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimState {
    pub time: f64,      // s since run start
    pub altitude: f64,  // m above datum
    pub downrange: f64, // m
    pub hs: f64,        // horizontal speed, m/s
    pub vs: f64,        // vertical speed, m/s
    pub lat: f64,       // deg
    pub lon: f64,       // deg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>, // m above local ground
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apoapsis: Option<f64>, // altitude, m
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periapsis: Option<f64>, // altitude, m
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inertial: Option<InertialSnapshot>,
}

/// Extra state carried by inertial-frame snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InertialSnapshot {
    pub pos: Vector3<f64>, // m, body-centred
    pub vel: Vector3<f64>, // m/s
    pub dv_spent: f64,     // m/s
    pub elements: Option<KeplerianElements>,
}

// ---------------------------------------------------------------------------
// Kinematics: per-step values the event triggers look at
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub time: f64,
    pub altitude: f64,
    pub height: Option<f64>,
    pub hs: f64,
    pub vs: f64,
    /// Circular orbit speed at the current altitude, if the body is known.
    pub orbital_velocity: Option<f64>,
    pub stages: usize,
    pub stagecap: usize,
}

impl Kinematics {
    /// Height above ground, falling back to altitude when the ground is unknown.
    pub fn clearance(&self) -> f64 {
        self.height.unwrap_or(self.altitude)
    }

    /// Only the reserve stages (if any) remain.
    pub fn burnt_out(&self) -> bool {
        self.stages <= self.stagecap
    }
}
