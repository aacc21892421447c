use log::debug;

// ---------------------------------------------------------------------------
// Surface-frame steering: one-way finite-state machine
// ---------------------------------------------------------------------------

/// Thrust direction policy in the surface frame.
///
/// The only automatic transition is `Retrograde -> VerticalLanding`, taken
/// once horizontal speed has been driven through zero. Nothing ever leaves
/// `VerticalLanding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceMode {
    /// Pitch/heading held constant in the local frame.
    #[default]
    Fixed,
    /// Along the current velocity.
    Prograde,
    /// Against the current velocity.
    Retrograde,
    /// Pitched to null horizontal speed using the available thrust.
    VerticalLanding,
}

impl SurfaceMode {
    pub fn name(self) -> &'static str {
        match self {
            SurfaceMode::Fixed => "Fixed",
            SurfaceMode::Prograde => "Progd",
            SurfaceMode::Retrograde => "Retro",
            SurfaceMode::VerticalLanding => "VertL",
        }
    }

    /// Apply the guarded transition after a step with horizontal speed `hs`.
    pub fn advance(self, hs: f64) -> Self {
        match self {
            SurfaceMode::Retrograde if hs <= 0.0 => {
                debug!("steering {} -> {} (hs {:.2})", self.name(), SurfaceMode::VerticalLanding.name(), hs);
                SurfaceMode::VerticalLanding
            }
            other => other,
        }
    }

    /// Unit thrust components `(cx, cy)` (horizontal, vertical) for this step.
    ///
    /// `held` is the current direction (returned unchanged by `Fixed`, and
    /// when speed is zero); `step_dv` is the delta-v this step can deliver at
    /// full effect, used by `VerticalLanding`.
    pub fn direction(self, hs: f64, vs: f64, held: (f64, f64), step_dv: f64) -> (f64, f64) {
        let speed = hs.hypot(vs);
        match self {
            SurfaceMode::Fixed => held,
            SurfaceMode::Prograde if speed > 0.0 => (hs / speed, vs / speed),
            SurfaceMode::Retrograde if speed > 0.0 => (-hs / speed, -vs / speed),
            SurfaceMode::Prograde | SurfaceMode::Retrograde => held,
            SurfaceMode::VerticalLanding => {
                if step_dv > hs.abs() {
                    let cx = -hs / step_dv;
                    (cx, (1.0 - cx * cx).sqrt())
                } else {
                    (0.0, 1.0)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inertial-frame steering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InertialMode {
    /// Pitch/heading in the local horizon frame, read once at setup.
    #[default]
    Fixed,
    /// Pitch/heading in the local horizon frame, re-read every step.
    Live,
    Prograde,
    Retrograde,
    /// Pointing frozen in the inertial frame at setup.
    Inertial,
    /// Live attitude interpreted in the horizon frame captured at setup.
    LiveInertial,
}

impl InertialMode {
    /// Whether the attitude source is consulted after setup.
    pub fn is_live(self) -> bool {
        matches!(self, InertialMode::Live | InertialMode::LiveInertial)
    }

    /// Whether pointing follows the horizon rather than inertial space.
    pub fn follows_horizon(self) -> bool {
        matches!(self, InertialMode::Fixed | InertialMode::Live)
    }
}

/// Pitch above the horizon and heading from north, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub pitch: f64,
    pub heading: f64,
}

impl Attitude {
    pub fn new(pitch: f64, heading: f64) -> Self {
        Self { pitch, heading }
    }
}

/// Where a live steering mode reads attitude from.
pub trait AttitudeSource {
    fn attitude(&self, time: f64) -> Attitude;
}

impl AttitudeSource for Attitude {
    fn attitude(&self, _time: f64) -> Attitude {
        *self
    }
}

/// Attitude computed from run time, e.g. a pitch program or a telemetry tap.
pub struct LiveAttitude<F>(pub F);

impl<F: Fn(f64) -> Attitude> AttitudeSource for LiveAttitude<F> {
    fn attitude(&self, time: f64) -> Attitude {
        (self.0)(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrograde_hands_over_once() {
        let mode = SurfaceMode::Retrograde;
        assert_eq!(mode.advance(10.0), SurfaceMode::Retrograde);
        let landing = mode.advance(-0.1);
        assert_eq!(landing, SurfaceMode::VerticalLanding);
        assert_eq!(landing.advance(50.0), SurfaceMode::VerticalLanding);
    }

    #[test]
    fn other_modes_never_transition() {
        for mode in [SurfaceMode::Fixed, SurfaceMode::Prograde] {
            assert_eq!(mode.advance(-5.0), mode);
        }
    }

    #[test]
    fn prograde_and_retrograde_follow_velocity() {
        let (cx, cy) = SurfaceMode::Prograde.direction(3.0, 4.0, (1.0, 0.0), 0.0);
        assert!((cx - 0.6).abs() < 1e-12 && (cy - 0.8).abs() < 1e-12);
        let (cx, cy) = SurfaceMode::Retrograde.direction(3.0, 4.0, (1.0, 0.0), 0.0);
        assert!((cx + 0.6).abs() < 1e-12 && (cy + 0.8).abs() < 1e-12);
        // Stationary: keep previous direction
        assert_eq!(SurfaceMode::Prograde.direction(0.0, 0.0, (0.2, 0.9), 0.0), (0.2, 0.9));
    }

    #[test]
    fn vertical_landing_nulls_horizontal_speed() {
        let (cx, cy) = SurfaceMode::VerticalLanding.direction(2.0, -10.0, (0.0, 1.0), 5.0);
        assert!((cx * 5.0 + 2.0).abs() < 1e-12);
        assert!((cx * cx + cy * cy - 1.0).abs() < 1e-12);
        // Not enough thrust to cancel: straight up
        assert_eq!(SurfaceMode::VerticalLanding.direction(8.0, -10.0, (0.0, 1.0), 5.0), (0.0, 1.0));
    }

    #[test]
    fn live_attitude_reads_each_call() {
        let program = LiveAttitude(|t: f64| Attitude::new(90.0 - t, 90.0));
        assert_eq!(program.attitude(10.0).pitch, 80.0);
        assert_eq!(Attitude::new(5.0, 0.0).attitude(99.0).pitch, 5.0);
        assert!(InertialMode::LiveInertial.is_live());
        assert!(!InertialMode::Inertial.follows_horizon());
    }
}
