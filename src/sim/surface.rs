use std::f64::consts::{FRAC_PI_2, PI};

use crate::math::wrap_two_pi;
use crate::orbital::{ParentBody, PlanarOrbit};
use crate::physics::gravity::gravity_accel;
use crate::vehicle::Booster;

use super::ground::Ground;
use super::runner::{Integrator, SimConfig, StepResult};
use super::state::{Kinematics, SimState};
use super::steering::{Attitude, SurfaceMode};

/// Initial conditions for a surface-frame run, as read from telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceStart {
    pub hs: f64,       // m/s
    pub vs: f64,       // m/s
    pub altitude: f64, // m
    pub throttle: f64, // 0..1
    pub attitude: Attitude,
    pub lat: f64, // deg
    pub lon: f64, // deg
    /// Attitude is retrograde: thrust opposes the direction of travel.
    pub retro: bool,
}

/// Flat/spherical local-frame integrator: horizontal and vertical speed
/// over a (possibly curved) body, with great-circle ground track.
pub struct SurfaceSim<'a> {
    booster: Booster,
    parent: ParentBody,
    ground: &'a Ground,
    mode: SurfaceMode,
    dt: f64,
    stagecap: usize,
    throttle: f64,

    // unit thrust (horizontal, vertical) and unit track (north, east)
    cx: f64,
    cy: f64,
    clat: f64,
    clong: f64,

    time: f64,
    hs: f64,
    vs: f64,
    altitude: f64,
    downrange: f64,
    lat: f64, // rad
    lon: f64, // rad
    local_ground: Option<f64>,
}

impl<'a> SurfaceSim<'a> {
    pub fn setup(
        booster: &Booster,
        start: &SurfaceStart,
        parent: ParentBody,
        ground: &'a Ground,
        mode: SurfaceMode,
        config: &SimConfig,
    ) -> Self {
        let pitch = start.attitude.pitch.to_radians();
        let heading = start.attitude.heading.to_radians();
        let sign = if start.retro { -1.0 } else { 1.0 };

        Self {
            booster: booster.clone(),
            parent,
            ground,
            mode,
            dt: config.dt,
            stagecap: config.stagecap,
            throttle: start.throttle,
            cx: sign * pitch.cos(),
            cy: pitch.sin(),
            clat: sign * heading.cos(),
            clong: sign * heading.sin(),
            time: 0.0,
            hs: start.hs,
            vs: start.vs,
            altitude: start.altitude,
            downrange: 0.0,
            lat: start.lat.to_radians(),
            lon: start.lon.to_radians(),
            local_ground: ground.altitude_at(start.lat, start.lon),
        }
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn booster(&self) -> &Booster {
        &self.booster
    }

    /// Move `distance` metres along the current track, handling pole
    /// crossings and longitude wraparound.
    fn advance_track(&mut self, distance: f64, radius: f64) {
        self.lat += distance * self.clat / radius;
        if self.lat.abs() > FRAC_PI_2 {
            self.lat = if self.lat > 0.0 { PI - self.lat } else { -PI - self.lat };
            self.lon += PI;
            self.clat = -self.clat;
            self.clong = -self.clong;
        }
        let cos_lat = self.lat.cos();
        if cos_lat.abs() > f64::EPSILON {
            self.lon += distance * self.clong / (radius * cos_lat);
        }
        self.lon = wrap_two_pi(self.lon);
    }
}

impl Integrator for SurfaceSim<'_> {
    fn step(&mut self) -> StepResult {
        let (hs0, vs0) = (self.hs, self.vs);
        let dt = self.dt;
        self.time += dt;

        let Some(dv) = self.booster.simulate(self.throttle, dt, self.stagecap) else {
            return StepResult::NoThrust;
        };

        let step_dv = self.booster.thrust_accel(self.throttle).unwrap_or(0.0) * dt;
        (self.cx, self.cy) = self.mode.direction(self.hs, self.vs, (self.cx, self.cy), step_dv);

        self.hs += dv * self.cx;
        let g = gravity_accel(self.altitude, self.parent.radius, self.parent.mu);
        self.vs += dv * self.cy - g * dt;

        // trapezoidal position update
        self.altitude += (self.vs + vs0) / 2.0 * dt;
        let distance = (self.hs + hs0) / 2.0 * dt;
        self.downrange += distance;

        if let Some(radius) = self.parent.radius {
            let r = radius + self.altitude;
            if r > 0.0 {
                self.advance_track(distance, r);

                // The horizon tilts under us by the central angle travelled.
                let (s, c) = (distance / r).sin_cos();
                (self.hs, self.vs) = (self.hs * c - self.vs * s, self.hs * s + self.vs * c);
            }
        }

        self.local_ground = self.ground.altitude_at(self.lat.to_degrees(), self.lon.to_degrees());

        self.mode = self.mode.advance(self.hs);
        StepResult::Advanced
    }

    fn encode(&self) -> SimState {
        let (apoapsis, periapsis) = match (self.parent.radius, self.parent.mu) {
            (Some(radius), Some(mu)) => {
                match PlanarOrbit::from_speeds(radius + self.altitude, self.hs, self.vs, mu) {
                    Some(orbit) => (orbit.apoapsis().map(|a| a - radius), Some(orbit.periapsis() - radius)),
                    None => (None, None),
                }
            }
            _ => (None, None),
        };

        SimState {
            time: self.time,
            altitude: self.altitude,
            downrange: self.downrange,
            hs: self.hs,
            vs: self.vs,
            lat: self.lat.to_degrees(),
            lon: self.lon.to_degrees(),
            height: self.local_ground.map(|g| self.altitude - g),
            apoapsis,
            periapsis,
            inertial: None,
        }
    }

    fn kinematics(&self) -> Kinematics {
        Kinematics {
            time: self.time,
            altitude: self.altitude,
            height: self.local_ground.map(|g| self.altitude - g),
            hs: self.hs,
            vs: self.vs,
            orbital_velocity: self.parent.circular_velocity(self.altitude),
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
