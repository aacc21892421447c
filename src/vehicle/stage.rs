use log::trace;

use crate::physics::gravity::G0;

use super::propellant::{Propellant, Residuals};

/// Below this a propellant (t) counts as drained.
const EMPTY_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Stage definition (one stage of a multi-stage booster)
// ---------------------------------------------------------------------------

/// Masses are in tonnes and thrust in kN, so thrust / mass is m/s^2.
///
/// A stage does not store the mass of the stages above it: every mass and
/// delta-v query takes the current `payload` so the figure can never go stale
/// across a staging event.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub props: Vec<Propellant>,
    pub isp: f64,                 // s, main engine
    pub dry_mass: f64,            // t, structure only
    pub thrust: Option<f64>,      // kN
    pub min_throttle: f64,        // fraction 0..1
}

impl Stage {
    /// Effective exhaust velocity, m/s.
    pub fn veff(&self) -> f64 {
        self.isp * G0
    }

    /// Map a nominal throttle onto the engine's usable range.
    /// Zero stays zero (engine off).
    pub fn effective_throttle(&self, throttle: f64) -> f64 {
        if throttle <= 0.0 {
            return 0.0;
        }
        let t = throttle.min(1.0);
        t * (1.0 - self.min_throttle) + self.min_throttle
    }

    /// Mass of consumables the main engine does not draw (carried as dead weight).
    pub fn consumables_mass(&self) -> f64 {
        self.props.iter().filter(|p| !p.main_engine).map(|p| p.mass()).sum()
    }

    pub fn main_propellant_mass(&self) -> f64 {
        self.props.iter().filter(|p| p.main_engine).map(|p| p.mass()).sum()
    }

    /// Burnout mass including everything above this stage.
    pub fn dry(&self, payload: f64) -> f64 {
        self.dry_mass + payload + self.consumables_mass()
    }

    pub fn wet(&self, payload: f64) -> f64 {
        self.dry(payload) + self.main_propellant_mass()
    }

    /// Tsiolkovsky delta-v; `None` for physically meaningless inputs.
    pub fn delta_v(&self, payload: f64) -> Option<f64> {
        if self.props.iter().any(|p| p.density <= 0.0) {
            return None;
        }
        let dry = self.dry(payload);
        if dry <= 0.0 {
            return None;
        }
        Some(self.veff() * (self.wet(payload) / dry).ln())
    }

    /// Per-propellant fraction of the main-engine mass flow, as
    /// `(index into props, fraction)`. Explicit ratios win when every
    /// main-engine propellant has one; otherwise flow is split in
    /// proportion to full tank mass.
    pub fn mixture(&self) -> Vec<(usize, f64)> {
        let main: Vec<(usize, &Propellant)> = self
            .props
            .iter()
            .enumerate()
            .filter(|(_, p)| p.main_engine)
            .collect();

        let explicit = !main.is_empty()
            && main.iter().all(|(_, p)| p.ratio.is_some_and(|r| r > 0.0));
        let weight = |p: &Propellant| {
            if explicit {
                p.ratio.unwrap_or(0.0)
            } else {
                p.full_mass()
            }
        };

        let total: f64 = main.iter().map(|(_, p)| weight(p)).sum();
        if total <= 0.0 {
            return Vec::new();
        }
        main.iter()
            .map(|(i, p)| (*i, weight(p) / total))
            .filter(|(_, f)| *f > 0.0)
            .collect()
    }

    /// True once the main engine can no longer fire: no thrust, or any
    /// co-consumed propellant is down to its residual.
    pub fn is_exhausted(&self, residuals: &Residuals) -> bool {
        if !self.thrust.is_some_and(|t| t > 0.0) {
            return true;
        }
        let mix = self.mixture();
        mix.is_empty()
            || mix
                .iter()
                .any(|&(i, _)| residuals.usable(&self.props[i]) <= EMPTY_EPSILON)
    }

    /// Burn for `dt` seconds at `throttle`, draining propellant.
    ///
    /// Returns the delta-v actually delivered, computed from the mass really
    /// consumed (the smallest tank may cut the request short), or `None` if
    /// the stage cannot produce thrust at all.
    pub fn simulate(
        &mut self,
        throttle: f64,
        dt: f64,
        payload: f64,
        residuals: &Residuals,
    ) -> Option<f64> {
        if self.is_exhausted(residuals) {
            return None;
        }
        let thrust = self.thrust?;
        let eff = self.effective_throttle(throttle);
        if eff <= 0.0 || dt <= 0.0 {
            return Some(0.0);
        }
        let veff = self.veff();
        if veff <= 0.0 {
            return None;
        }

        let requested = thrust * eff / veff * dt; // t
        let mix = self.mixture();

        // Scale the whole flow down so that no propellant goes below its residual.
        let mut scale = 1.0_f64;
        for &(i, frac) in &mix {
            let want = frac * requested;
            if want > 0.0 {
                scale = scale.min(residuals.usable(&self.props[i]) / want);
            }
        }

        let m0 = self.wet(payload);
        for &(i, frac) in &mix {
            self.props[i].drain_mass(frac * requested * scale);
        }
        let m1 = self.wet(payload);
        if m1 <= 0.0 {
            return Some(0.0);
        }

        trace!(
            "stage {}: requested {:.5}t, scale {:.3}, m {:.4}->{:.4}",
            self.name, requested, scale, m0, m1
        );
        Some(veff * (m0 / m1).ln())
    }

    /// Seconds until the first propellant hits its residual at constant throttle.
    pub fn burn_time(&self, throttle: f64, residuals: &Residuals) -> Option<f64> {
        let thrust = self.thrust.filter(|t| *t > 0.0)?;
        let eff = self.effective_throttle(throttle);
        if eff <= 0.0 || self.veff() <= 0.0 {
            return None;
        }
        let flow = thrust * eff / self.veff(); // t/s
        self.mixture()
            .iter()
            .map(|&(i, frac)| residuals.usable(&self.props[i]) / (frac * flow))
            .reduce(f64::min)
    }

    /// Set the fill level of the named propellant. Returns false if absent.
    pub fn set_filled(&mut self, name: &str, units: f64) -> bool {
        match self.props.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.set_filled(units);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    name: String,
    props: Vec<Propellant>,
    isp: f64,
    dry_mass: f64,
    thrust: Option<f64>,
    min_throttle: f64,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: vec![],
            isp: 300.0,
            dry_mass: 1.0,
            thrust: None,
            min_throttle: 0.0,
        }
    }

    pub fn propellant(mut self, p: Propellant) -> Self { self.props.push(p); self }
    pub fn isp(mut self, v: f64) -> Self { self.isp = v; self }
    pub fn dry_mass(mut self, v: f64) -> Self { self.dry_mass = v; self }
    pub fn thrust(mut self, v: f64) -> Self { self.thrust = Some(v); self }
    pub fn min_throttle(mut self, v: f64) -> Self { self.min_throttle = v.clamp(0.0, 1.0); self }

    pub fn build(self) -> Stage {
        Stage {
            name: self.name,
            props: self.props,
            isp: self.isp,
            dry_mass: self.dry_mass,
            thrust: self.thrust,
            min_throttle: self.min_throttle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kerolox(isp: f64) -> Stage {
        // 9 t of main-engine propellant on a 1 t structure
        StageBuilder::new("Core")
            .isp(isp)
            .dry_mass(1.0)
            .thrust(200.0)
            .propellant(Propellant::new("LiquidFuel", 810.0, 0.005))
            .propellant(Propellant::new("Oxidizer", 990.0, 0.005))
            .build()
    }

    #[test]
    fn tsiolkovsky_scenario() {
        let s = kerolox(300.0);
        let dv = s.delta_v(0.0).unwrap();
        let expected = 300.0 * 9.80665 * 10.0_f64.ln();
        assert!((dv - expected).abs() < 1e-6, "dv {} != {}", dv, expected);
        assert!((dv - 6774.0).abs() < 5.0, "should be ~6772 m/s, got {:.0}", dv);
    }

    #[test]
    fn wet_exceeds_dry_with_propellant() {
        let s = kerolox(300.0);
        for payload in [0.0, 2.5, 40.0] {
            assert!(s.wet(payload) > s.dry(payload));
        }
    }

    #[test]
    fn delta_v_increases_with_isp() {
        let mut last = 0.0;
        for isp in [150.0, 220.0, 300.0, 345.0, 800.0] {
            let dv = kerolox(isp).delta_v(3.0).unwrap();
            assert!(dv > last);
            last = dv;
        }
    }

    #[test]
    fn non_main_consumables_count_as_dry() {
        let mut s = kerolox(300.0);
        s.props.push(Propellant::new("MonoPropellant", 100.0, 0.004).main_engine(false));
        assert!((s.dry(0.0) - 1.4).abs() < 1e-12);
        assert!((s.wet(0.0) - 10.4).abs() < 1e-12);
    }

    #[test]
    fn non_positive_density_is_unavailable() {
        let mut s = kerolox(300.0);
        s.props[0].density = 0.0;
        assert!(s.delta_v(0.0).is_none());
    }

    #[test]
    fn effective_throttle_mapping() {
        let mut s = kerolox(300.0);
        s.min_throttle = 0.4;
        assert_eq!(s.effective_throttle(0.0), 0.0);
        assert!((s.effective_throttle(0.5) - 0.7).abs() < 1e-12);
        assert!((s.effective_throttle(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mixture_proportional_to_full_mass() {
        let s = kerolox(300.0);
        let mix = s.mixture();
        assert!((mix[0].1 - 0.45).abs() < 1e-12);
        assert!((mix[1].1 - 0.55).abs() < 1e-12);
    }

    #[test]
    fn explicit_ratio_overrides_tank_mass() {
        let mut s = kerolox(300.0);
        s.props[0].ratio = Some(1.0);
        s.props[1].ratio = Some(3.0);
        let mix = s.mixture();
        assert!((mix[0].1 - 0.25).abs() < 1e-12);
        assert!((mix[1].1 - 0.75).abs() < 1e-12);
    }

    #[test]
    fn simulate_drains_and_reports_delta_v() {
        let mut s = kerolox(300.0);
        let m0 = s.wet(0.0);
        let dv = s.simulate(1.0, 1.0, 0.0, &Residuals::default()).unwrap();
        let flow = 200.0 / s.veff();
        assert!((m0 - s.wet(0.0) - flow).abs() < 1e-9);
        let expected = s.veff() * (m0 / (m0 - flow)).ln();
        assert!((dv - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_throttle_coasts() {
        let mut s = kerolox(300.0);
        let m0 = s.wet(0.0);
        assert_eq!(s.simulate(0.0, 1.0, 0.0, &Residuals::default()), Some(0.0));
        assert_eq!(s.wet(0.0), m0);
    }

    #[test]
    fn smallest_tank_limits_actual_delta_v() {
        let mut s = kerolox(300.0);
        s.props[0].set_filled(1.0); // almost no fuel left
        let nominal_flow = 200.0 / s.veff() * 10.0;
        let m0 = s.wet(0.0);
        let dv = s.simulate(1.0, 10.0, 0.0, &Residuals::default()).unwrap();
        let burned = m0 - s.wet(0.0);
        assert!(burned < nominal_flow, "flow should be scaled down");
        assert!(s.props[0].filled.abs() < 1e-9);
        assert!(s.props[1].filled > 0.0);
        assert!((dv - s.veff() * (m0 / s.wet(0.0)).ln()).abs() < 1e-9);
        assert!(s.is_exhausted(&Residuals::default()));
        assert_eq!(s.simulate(1.0, 1.0, 0.0, &Residuals::default()), None);
    }

    #[test]
    fn residuals_hold_back_one_percent() {
        let mut s = kerolox(300.0);
        let r = Residuals::enabled(0.01);
        for _ in 0..10_000 {
            if s.simulate(1.0, 1.0, 0.0, &r).is_none() {
                break;
            }
        }
        assert!((s.props[0].mass() - 0.0405).abs() < 1e-6);
        assert!((s.props[1].mass() - 0.0495).abs() < 1e-6);
    }

    #[test]
    fn burn_time_matches_flow() {
        let s = kerolox(300.0);
        let t = s.burn_time(1.0, &Residuals::default()).unwrap();
        let expected = 9.0 / (200.0 / s.veff());
        assert!((t - expected).abs() < 1e-6);
        assert!(s.burn_time(0.0, &Residuals::default()).is_none());
    }

    #[test]
    fn no_thrust_is_exhausted() {
        let mut s = kerolox(300.0);
        s.thrust = None;
        assert!(s.is_exhausted(&Residuals::default()));
        assert_eq!(s.simulate(1.0, 1.0, 0.0, &Residuals::default()), None);
    }
}
