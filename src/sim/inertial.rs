use nalgebra::Vector3;

use crate::math::{Axis, Rotation};
use crate::orbital::{KeplerianElements, ParentBody};
use crate::physics::gravity::gravity_pointmass;
use crate::vehicle::Booster;

use super::runner::{Integrator, SimConfig, StepResult};
use super::state::{InertialSnapshot, Kinematics, SimState};
use super::steering::{Attitude, AttitudeSource, InertialMode};
use super::surface::SurfaceStart;

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Local horizon -> inertial rotation at `pos`. Local axes: x up, y east,
/// z north.
fn horizon_frame(pos: &Vector3<f64>) -> Rotation {
    let r = pos.norm();
    if r <= 0.0 {
        return Rotation::identity();
    }
    let lat = (pos.z / r).clamp(-1.0, 1.0).asin();
    let lon = pos.y.atan2(pos.x);
    Rotation::about(Axis::Z, lon) * Rotation::about(Axis::Y, -lat)
}

/// Unit vector for a pitch/heading in the local horizon frame.
fn horizon_direction(attitude: &Attitude) -> Vector3<f64> {
    let (sp, cp) = attitude.pitch.to_radians().sin_cos();
    let (sh, ch) = attitude.heading.to_radians().sin_cos();
    Vector3::new(sp, cp * sh, cp * ch)
}

// ---------------------------------------------------------------------------
// Initial state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialStart {
    pub pos: Vector3<f64>, // m, body-centred inertial
    pub vel: Vector3<f64>, // m/s
    pub throttle: f64,
}

impl InertialStart {
    /// Circular orbit of `radius` at inclination `inc` and true anomaly
    /// `true_anom` (rad), node on the x axis.
    pub fn circular(radius: f64, mu: f64, inc: f64, true_anom: f64) -> Option<Self> {
        let (pos, vel) = KeplerianElements::circular(radius, inc, true_anom, mu)?.to_state(mu);
        Some(Self { pos, vel, throttle: 0.0 })
    }

    /// Build the inertial state from surface-frame telemetry over a body of
    /// `radius`. The attitude heading gives the direction of travel.
    pub fn from_surface(start: &SurfaceStart, radius: f64) -> Self {
        let sign = if start.retro { -1.0 } else { 1.0 };
        let heading = start.attitude.heading.to_radians();
        let frame = Rotation::about(Axis::Z, start.lon.to_radians())
            * Rotation::about(Axis::Y, -start.lat.to_radians());

        let pos = frame * Vector3::new(radius + start.altitude, 0.0, 0.0);
        let vel = frame
            * Vector3::new(
                start.vs,
                sign * start.hs * heading.sin(),
                sign * start.hs * heading.cos(),
            );
        Self { pos, vel, throttle: start.throttle }
    }
}

// ---------------------------------------------------------------------------
// InertialSim
// ---------------------------------------------------------------------------

/// Full 3D state-vector integrator in a body-centred inertial frame.
pub struct InertialSim<A: AttitudeSource> {
    booster: Booster,
    radius: f64,
    mu: f64,
    mode: InertialMode,
    source: A,
    held: Attitude,
    setup_frame: Rotation,
    dt: f64,
    stagecap: usize,
    throttle: f64,

    time: f64,
    pos: Vector3<f64>,
    vel: Vector3<f64>,
    origin: Vector3<f64>, // unit vector to the start position
    pointing: Vector3<f64>,
    dv_spent: f64,
}

impl<A: AttitudeSource> InertialSim<A> {
    /// `None` when the body is unknown or the position is degenerate.
    pub fn setup(
        booster: &Booster,
        start: &InertialStart,
        parent: ParentBody,
        mode: InertialMode,
        source: A,
        config: &SimConfig,
    ) -> Option<Self> {
        let radius = parent.radius?;
        let mu = parent.mu?;
        let r = start.pos.norm();
        if r <= 0.0 || mu <= 0.0 {
            return None;
        }

        let held = source.attitude(0.0);
        let setup_frame = horizon_frame(&start.pos);
        let mut sim = Self {
            booster: booster.clone(),
            radius,
            mu,
            mode,
            source,
            held,
            setup_frame,
            dt: config.dt,
            stagecap: config.stagecap,
            throttle: start.throttle,
            time: 0.0,
            pos: start.pos,
            vel: start.vel,
            origin: start.pos / r,
            pointing: setup_frame * horizon_direction(&held),
            dv_spent: 0.0,
        };
        sim.pointing = sim.resolve_pointing();
        Some(sim)
    }

    /// Current thrust direction (unit vector, inertial frame).
    pub fn pointing(&self) -> Vector3<f64> {
        self.pointing
    }

    pub fn position(&self) -> Vector3<f64> {
        self.pos
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.vel
    }

    pub fn dv_spent(&self) -> f64 {
        self.dv_spent
    }

    fn resolve_pointing(&self) -> Vector3<f64> {
        let along_velocity = |sign: f64| {
            let speed = self.vel.norm();
            if speed > 0.0 { sign * self.vel / speed } else { self.pointing }
        };
        match self.mode {
            InertialMode::Fixed => horizon_frame(&self.pos) * horizon_direction(&self.held),
            InertialMode::Live => {
                horizon_frame(&self.pos) * horizon_direction(&self.source.attitude(self.time))
            }
            InertialMode::Prograde => along_velocity(1.0),
            InertialMode::Retrograde => along_velocity(-1.0),
            InertialMode::Inertial => self.setup_frame * horizon_direction(&self.held),
            InertialMode::LiveInertial => {
                self.setup_frame * horizon_direction(&self.source.attitude(self.time))
            }
        }
    }

    /// (radial unit vector, distance from centre)
    fn radial(&self) -> (Vector3<f64>, f64) {
        let r = self.pos.norm();
        if r > 0.0 { (self.pos / r, r) } else { (self.origin, 0.0) }
    }

    fn altitude(&self) -> f64 {
        self.radial().1 - self.radius
    }

    /// (horizontal, vertical) speed relative to the local horizon.
    fn speeds(&self) -> (f64, f64) {
        let (up, _) = self.radial();
        let vs = self.vel.dot(&up);
        ((self.vel - vs * up).norm(), vs)
    }

    /// Great-circle distance over the surface from the start position.
    fn downrange(&self) -> f64 {
        let (up, _) = self.radial();
        self.radius * self.origin.cross(&up).norm().atan2(self.origin.dot(&up))
    }

    fn lat_lon(&self) -> (f64, f64) {
        let (up, _) = self.radial();
        (up.z.clamp(-1.0, 1.0).asin().to_degrees(), up.y.atan2(up.x).to_degrees())
    }
}

impl<A: AttitudeSource> Integrator for InertialSim<A> {
    fn step(&mut self) -> StepResult {
        let dt = self.dt;
        self.time += dt;

        let Some(dv) = self.booster.simulate(self.throttle, dt, self.stagecap) else {
            return StepResult::NoThrust;
        };
        self.pointing = self.resolve_pointing();

        self.pos += self.vel * dt;
        self.vel += self.pointing * dv + gravity_pointmass(&self.pos, self.mu) * dt;
        self.dv_spent += dv;
        StepResult::Advanced
    }

    fn encode(&self) -> SimState {
        let (hs, vs) = self.speeds();
        let (lat, lon) = self.lat_lon();
        let elements = KeplerianElements::from_state(&self.pos, &self.vel, self.mu);

        SimState {
            time: self.time,
            altitude: self.altitude(),
            downrange: self.downrange(),
            hs,
            vs,
            lat,
            lon,
            height: None,
            apoapsis: elements.and_then(|e| e.apoapsis()).map(|a| a - self.radius),
            periapsis: elements.map(|e| e.periapsis() - self.radius),
            inertial: Some(InertialSnapshot {
                pos: self.pos,
                vel: self.vel,
                dv_spent: self.dv_spent,
                elements,
            }),
        }
    }

    fn kinematics(&self) -> Kinematics {
        let (hs, vs) = self.speeds();
        let altitude = self.altitude();
        Kinematics {
            time: self.time,
            altitude,
            height: None,
            hs,
            vs,
            orbital_velocity: ParentBody::new(self.radius, self.mu).circular_velocity(altitude),
            stages: self.booster.stage_count(),
            stagecap: self.stagecap,
        }
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn set_throttle(&mut self, throttle: f64) {
        self.throttle = throttle;
    }
}
