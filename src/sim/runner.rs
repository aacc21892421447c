use log::{debug, trace};

use crate::orbital::ParentBody;
use crate::vehicle::Booster;

use super::event::{EventKey, EventMap, Profile};
use super::ground::Ground;
use super::state::{Kinematics, SimState};
use super::steering::SurfaceMode;
use super::surface::{SurfaceSim, SurfaceStart};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub dt: f64,         // s, integration step
    pub max_time: f64,   // s, hard ceiling on simulated time
    pub stagecap: usize, // stages held in reserve (never burnt)
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { dt: 1.0, max_time: 1200.0, stagecap: 0 }
    }
}

// ---------------------------------------------------------------------------
// Integrator interface
// ---------------------------------------------------------------------------

/// Outcome of a single integration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Advanced,
    /// The booster could not deliver thrust; the run stops here.
    NoThrust,
}

/// A kinematic integrator driven by the shared event loop. Constructors
/// (`setup`) clone the booster, so the caller's vehicle is never touched.
pub trait Integrator {
    fn step(&mut self) -> StepResult;
    /// Snapshot of the current state. Pure: identical state, identical record.
    fn encode(&self) -> SimState;
    fn kinematics(&self) -> Kinematics;
    fn time(&self) -> f64;
    fn set_throttle(&mut self, throttle: f64);
}

// ---------------------------------------------------------------------------
// Shared event loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The profile's terminal predicate was satisfied.
    Complete,
    TimeLimit,
    NoThrust,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub events: EventMap,
    pub end: RunEnd,
    pub time: f64, // s, simulated time when the run stopped
}

/// Step `sim` until `profile` is satisfied, the ceiling is reached or thrust
/// runs out. `cutoff`, if given, records burnout at that time.
fn drive<I: Integrator>(
    sim: &mut I,
    profile: &Profile,
    config: &SimConfig,
    mut events: EventMap,
    cutoff: Option<f64>,
) -> RunResult {
    let end = loop {
        if profile.is_done(&events) {
            break RunEnd::Complete;
        }
        if sim.time() >= config.max_time || config.dt <= 0.0 {
            break RunEnd::TimeLimit;
        }
        if sim.step() == StepResult::NoThrust {
            break RunEnd::NoThrust;
        }

        let kinematics = sim.kinematics();
        profile.capture(&mut events, &kinematics, || sim.encode());
        if cutoff.is_some_and(|t| sim.time() >= t) {
            events.record(EventKey::Burnout, || sim.encode());
        }

        trace!(
            "t={:.0} alt={:.0} hs={:.1} vs={:.1} [{}]",
            kinematics.time,
            kinematics.altitude,
            kinematics.hs,
            kinematics.vs,
            events.codes()
        );
    };

    debug!("{} run ended at t={:.0}s: {:?} [{}]", profile.name, sim.time(), end, events.codes());
    RunResult { events, end, time: sim.time() }
}

/// Run any integrator against any profile.
pub fn run<I: Integrator>(sim: &mut I, profile: &Profile, config: &SimConfig) -> RunResult {
    drive(sim, profile, config, EventMap::new(), None)
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Ascent to orbit in the surface frame: captures `o`, `v` and `b`.
pub fn run_ascent(
    booster: &Booster,
    start: &SurfaceStart,
    parent: ParentBody,
    ground: &Ground,
    mode: SurfaceMode,
    config: &SimConfig,
) -> RunResult {
    let mut sim = SurfaceSim::setup(booster, start, parent, ground, mode, config);
    run(&mut sim, &Profile::ASCENT, config)
}

/// Retro-propulsive descent in the surface frame: captures `h`, `v`, `s`, `b`.
/// `start.retro` should be set so pitch and heading are read as retrograde.
pub fn run_retro(
    booster: &Booster,
    start: &SurfaceStart,
    parent: ParentBody,
    ground: &Ground,
    mode: SurfaceMode,
    config: &SimConfig,
) -> RunResult {
    let mut sim = SurfaceSim::setup(booster, start, parent, ground, mode, config);
    run(&mut sim, &Profile::RETRO, config)
}

/// Maneuver burn: coast until `burn_start` (s from now), record `0`, then
/// burn at `throttle` until burnout or `burn_duration` has elapsed.
///
/// Works with either integrator. If the burn starts beyond the time ceiling
/// nothing is recorded.
pub fn run_maneuver<I: Integrator>(
    sim: &mut I,
    burn_start: f64,
    throttle: f64,
    burn_duration: Option<f64>,
    config: &SimConfig,
) -> RunResult {
    let mut events = EventMap::new();
    if burn_start > config.max_time || config.dt <= 0.0 {
        debug!("maneuver: burn at +{:.0}s is beyond the {:.0}s ceiling", burn_start, config.max_time);
        return RunResult { events, end: RunEnd::TimeLimit, time: sim.time() };
    }

    sim.set_throttle(0.0);
    while sim.time() < burn_start {
        if sim.step() == StepResult::NoThrust {
            return RunResult { events, end: RunEnd::NoThrust, time: sim.time() };
        }
    }

    events.record(EventKey::BurnStart, || sim.encode());
    sim.set_throttle(throttle);
    let cutoff = burn_duration.map(|d| sim.time() + d);
    drive(sim, &Profile::MANEUVER, config, events, cutoff)
}
