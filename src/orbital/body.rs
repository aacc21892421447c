use std::collections::HashMap;

use nalgebra::Vector3;

use super::elements::KeplerianElements;

// ---------------------------------------------------------------------------
// ParentBody: the body currently being orbited, as seen through telemetry
// ---------------------------------------------------------------------------

/// Radius and gravitational parameter of the body being orbited. Either may
/// be unknown (missing telemetry), in which case derived values are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParentBody {
    pub radius: Option<f64>, // m
    pub mu: Option<f64>,     // m^3/s^2
}

impl ParentBody {
    pub fn new(radius: f64, mu: f64) -> Self {
        Self { radius: Some(radius), mu: Some(mu) }
    }

    /// Circular orbit speed at `altitude` (vis-viva with a = r).
    pub fn circular_velocity(&self, altitude: f64) -> Option<f64> {
        self.velocity_at_sma(self.radius? + altitude)
    }

    /// Speed at `altitude` on the orbit with the given periapsis and
    /// apoapsis altitudes (full vis-viva).
    pub fn elliptical_velocity(&self, periapsis: f64, apoapsis: f64, altitude: f64) -> Option<f64> {
        let radius = self.radius?;
        let mu = self.mu?;
        let sma = radius + (periapsis + apoapsis) / 2.0;
        let r = radius + altitude;
        if sma <= 0.0 || r <= 0.0 {
            return None;
        }
        let squared = mu * (2.0 / r - 1.0 / sma);
        (squared >= 0.0).then(|| squared.sqrt())
    }

    /// Circular speed for a given semi-major axis (radius from centre).
    pub fn velocity_at_sma(&self, sma: f64) -> Option<f64> {
        let mu = self.mu?;
        (mu >= 0.0 && sma > 0.0).then(|| (mu / sma).sqrt())
    }
}

// ---------------------------------------------------------------------------
// CelestialBody: configured body with an optional orbit about its parent
// ---------------------------------------------------------------------------

/// Orbit of a body about its parent, evaluated analytically from mean motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyOrbit {
    pub sma: f64,
    pub ecc: f64,
    pub inc: f64,           // rad
    pub lan: f64,           // rad
    pub argp: f64,          // rad
    pub mean_anom_epoch: f64, // rad
    pub epoch: f64,         // s, universal time
}

impl BodyOrbit {
    /// Elements at universal time `ut`, given the parent's mu.
    pub fn elements_at(&self, ut: f64, parent_mu: f64) -> Option<KeplerianElements> {
        let at_epoch = KeplerianElements::from_mean_anomaly(
            self.sma,
            self.ecc,
            self.inc,
            self.lan,
            self.argp,
            self.mean_anom_epoch,
            parent_mu,
        )?;
        Some(at_epoch.advanced(ut - self.epoch))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CelestialBody {
    pub name: String,
    pub radius: f64, // m
    pub mu: f64,     // m^3/s^2
    pub parent: Option<String>,
    pub orbit: Option<BodyOrbit>,
    pub soi: Option<f64>, // m, configured sphere of influence
}

impl CelestialBody {
    pub fn as_parent(&self) -> ParentBody {
        ParentBody::new(self.radius, self.mu)
    }
}

// ---------------------------------------------------------------------------
// BodyRegistry: loaded once, read-only afterwards
// ---------------------------------------------------------------------------

/// Registry of celestial bodies, passed explicitly to whatever needs lookups.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BodyRegistry {
    #[default]
    NotLoaded,
    Loaded(HashMap<String, CelestialBody>),
}

impl BodyRegistry {
    pub fn from_bodies(bodies: impl IntoIterator<Item = CelestialBody>) -> Self {
        BodyRegistry::Loaded(bodies.into_iter().map(|b| (b.name.clone(), b)).collect())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, BodyRegistry::Loaded(_))
    }

    pub fn get(&self, name: &str) -> Option<&CelestialBody> {
        match self {
            BodyRegistry::NotLoaded => None,
            BodyRegistry::Loaded(bodies) => bodies.get(name),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BodyRegistry::NotLoaded => 0,
            BodyRegistry::Loaded(bodies) => bodies.len(),
        }
    }

    pub fn parent_of(&self, name: &str) -> Option<&CelestialBody> {
        self.get(self.get(name)?.parent.as_deref()?)
    }

    /// Sphere of influence radius: configured value, else the Laplace
    /// approximation a·(μ/μparent)^(2/5).
    pub fn soi(&self, name: &str) -> Option<f64> {
        let body = self.get(name)?;
        if body.soi.is_some() {
            return body.soi;
        }
        let parent = self.parent_of(name)?;
        let orbit = body.orbit?;
        Some(orbit.sma * (body.mu / parent.mu).powf(0.4))
    }

    /// Orbital elements of `name` about its parent at universal time `ut`.
    pub fn elements_at(&self, name: &str, ut: f64) -> Option<KeplerianElements> {
        let body = self.get(name)?;
        let parent = self.parent_of(name)?;
        body.orbit?.elements_at(ut, parent.mu)
    }

    /// Position and velocity of `name` relative to its parent at `ut`.
    pub fn state_at(&self, name: &str, ut: f64) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let parent_mu = self.parent_of(name)?.mu;
        Some(self.elements_at(name, ut)?.to_state(parent_mu))
    }

    /// The stock Kerbol system (a subset).
    pub fn stock() -> Self {
        let deg = |d: f64| d.to_radians();
        let planet = |name: &str, radius, mu, parent: &str, orbit: BodyOrbit, soi| CelestialBody {
            name: name.into(),
            radius,
            mu,
            parent: Some(parent.into()),
            orbit: Some(orbit),
            soi: Some(soi),
        };
        let orbit = |sma, ecc, inc: f64, lan: f64, argp: f64, m0| BodyOrbit {
            sma,
            ecc,
            inc: deg(inc),
            lan: deg(lan),
            argp: deg(argp),
            mean_anom_epoch: m0,
            epoch: 0.0,
        };

        BodyRegistry::from_bodies([
            CelestialBody {
                name: "Sun".into(),
                radius: 261_600_000.0,
                mu: 1.172_332_8e18,
                parent: None,
                orbit: None,
                soi: None,
            },
            planet("Kerbin", 600_000.0, 3.5316e12, "Sun",
                orbit(13_599_840_256.0, 0.0, 0.0, 0.0, 0.0, 3.14), 84_159_286.0),
            planet("Mun", 200_000.0, 6.513_839_8e10, "Kerbin",
                orbit(12_000_000.0, 0.0, 0.0, 0.0, 0.0, 1.7), 2_429_559.1),
            planet("Minmus", 60_000.0, 1.765_800_0e9, "Kerbin",
                orbit(47_000_000.0, 0.0, 6.0, 78.0, 38.0, 0.9), 2_247_428.4),
            planet("Eve", 700_000.0, 8.171_730_2e12, "Sun",
                orbit(9_832_684_544.0, 0.01, 2.1, 15.0, 0.0, 3.14), 85_109_365.0),
            planet("Duna", 320_000.0, 3.013_632_1e11, "Sun",
                orbit(20_726_155_264.0, 0.051, 0.06, 135.5, 0.0, 3.14), 47_921_949.0),
        ])
    }
}
