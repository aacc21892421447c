use log::debug;

use super::propellant::{Propellant, Residuals};
use super::stage::{Stage, StageBuilder};

// ---------------------------------------------------------------------------
// Booster: ordered stack of stages, stage 0 active (bottom)
// ---------------------------------------------------------------------------

/// The stack owns its stages exclusively. Payload mass above each stage is
/// always derived from the current stack, so dropping a stage needs no
/// bookkeeping.
///
/// Planning runs work on a `clone()`; the caller's live booster is never
/// touched by a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Booster {
    pub name: String,
    stages: Vec<Stage>,
    pub residuals: Residuals,
}

impl Booster {
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self { name: name.into(), stages, residuals: Residuals::default() }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Get the currently active stage.
    pub fn active_stage(&self) -> Option<&Stage> {
        self.stages.first()
    }

    /// Wet mass of everything above stage `idx`.
    pub fn payload_mass(&self, idx: usize) -> f64 {
        self.stages
            .get(idx + 1..)
            .map_or(0.0, |above| above.iter().map(|s| s.wet(0.0)).sum())
    }

    /// Total wet mass of the stack, t.
    pub fn wet_mass(&self) -> f64 {
        self.stages.iter().map(|s| s.wet(0.0)).sum()
    }

    /// Delta-v of one stage, carrying the stages above it as payload.
    pub fn stage_delta_v(&self, idx: usize) -> Option<f64> {
        self.stages.get(idx)?.delta_v(self.payload_mass(idx))
    }

    /// Total ideal delta-v; unavailable if any stage's figure is.
    pub fn delta_v(&self) -> Option<f64> {
        (0..self.stages.len()).map(|i| self.stage_delta_v(i)).sum()
    }

    /// Drop the active stage. Irreversible.
    pub fn stage(&mut self) -> Option<Stage> {
        if self.stages.is_empty() {
            return None;
        }
        let dropped = self.stages.remove(0);
        debug!("{}: staged {} ({} left)", self.name, dropped.name, self.stages.len());
        Some(dropped)
    }

    /// Thrust acceleration (m/s^2) of the active stage at `throttle`,
    /// against the whole stack's mass.
    pub fn thrust_accel(&self, throttle: f64) -> Option<f64> {
        let stage = self.active_stage()?;
        let thrust = stage.thrust?;
        let mass = self.wet_mass();
        if mass <= 0.0 {
            return None;
        }
        Some(thrust * stage.effective_throttle(throttle) / mass)
    }

    /// Burn for `dt` at `throttle`, keeping `stagecap` stages in reserve.
    ///
    /// Returns the delta-v delivered this step. Empty stages are dropped
    /// automatically, but never so many that fewer than `stagecap` remain;
    /// once only the reserve is left the booster coasts (`Some(0.0)`).
    /// `None` means the booster has nothing left to burn.
    pub fn simulate(&mut self, throttle: f64, dt: f64, stagecap: usize) -> Option<f64> {
        loop {
            if self.stages.is_empty() {
                return None;
            }
            if self.stages.len() <= stagecap {
                return Some(0.0);
            }
            let payload = self.payload_mass(0);
            let residuals = self.residuals;
            match self.stages[0].simulate(throttle, dt, payload, &residuals) {
                Some(dv) => {
                    if self.stages[0].is_exhausted(&residuals) {
                        self.stage();
                    }
                    return Some(dv);
                }
                None => {
                    self.stage();
                }
            }
        }
    }

    /// Total burn time at `throttle` across the stages above the reserve.
    pub fn burn_time(&self, throttle: f64, stagecap: usize) -> Option<f64> {
        let burnable = self.stages.len().saturating_sub(stagecap);
        self.stages[..burnable]
            .iter()
            .map(|s| {
                if s.is_exhausted(&self.residuals) {
                    Some(0.0)
                } else {
                    s.burn_time(throttle, &self.residuals)
                }
            })
            .sum()
    }

    /// Update a propellant level from live telemetry.
    pub fn set_filled(&mut self, stage: usize, name: &str, units: f64) -> bool {
        self.stages
            .get_mut(stage)
            .is_some_and(|s| s.set_filled(name, units))
    }
}

// ---------------------------------------------------------------------------
// Booster builder
// ---------------------------------------------------------------------------

pub struct BoosterBuilder {
    name: String,
    stages: Vec<Stage>,
    residuals: Residuals,
}

impl BoosterBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), stages: vec![], residuals: Residuals::default() }
    }

    /// Add a stage on top of those already added (bottom stage first).
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn residuals(mut self, residuals: Residuals) -> Self {
        self.residuals = residuals;
        self
    }

    pub fn build(self) -> Booster {
        Booster { name: self.name, stages: self.stages, residuals: self.residuals }
    }
}

// ---------------------------------------------------------------------------
// Preset boosters
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Two-stage kerolox launcher sized for a low Kerbin orbit.
    pub fn two_stage() -> Booster {
        BoosterBuilder::new("Two-Stage")
            .stage(
                StageBuilder::new("Core")
                    .isp(300.0)
                    .dry_mass(6.0)
                    .thrust(650.0)
                    .propellant(Propellant::new("LiquidFuel", 2880.0, 0.005))
                    .propellant(Propellant::new("Oxidizer", 3520.0, 0.005))
                    .build(),
            )
            .stage(
                StageBuilder::new("Upper")
                    .isp(345.0)
                    .dry_mass(1.5)
                    .thrust(60.0)
                    .propellant(Propellant::new("LiquidFuel", 360.0, 0.005))
                    .propellant(Propellant::new("Oxidizer", 440.0, 0.005))
                    .build(),
            )
            .build()
    }

    /// Small hypergolic lander (MON10/MMH, 1 kN).
    pub fn lander() -> Booster {
        BoosterBuilder::new("Lander")
            .stage(
                StageBuilder::new("Descent")
                    .isp(260.0)
                    .dry_mass(0.4)
                    .thrust(1.0)
                    .propellant(Propellant::new("MON10", 48.4, 0.001407))
                    .propellant(Propellant::new("MMH", 51.6, 0.000874))
                    .build(),
            )
            .build()
    }
}
