// ---------------------------------------------------------------------------
// Propellant: one tank's worth of a single resource within a stage
// ---------------------------------------------------------------------------

/// Tonnes per unit of volume for the propellants we know about.
/// Stock resources use KSP units, the rest are litres.
const DENSITY_TABLE: &[(&str, f64)] = &[
    ("LiquidFuel", 0.005),
    ("Oxidizer", 0.005),
    ("MonoPropellant", 0.004),
    ("SolidFuel", 0.0075),
    ("XenonGas", 0.0001),
    ("Kerosene", 0.00082),
    ("LqdOxygen", 0.001141),
    ("LqdHydrogen", 0.000_070_85),
    ("MMH", 0.000874),
    ("UDMH", 0.000791),
    ("Aerozine50", 0.0009),
    ("Hydrazine", 0.001004),
    ("NTO", 0.00145),
    ("MON3", 0.001423),
    ("MON10", 0.001407),
    ("HTP", 0.001431),
];

/// Look up the density of a known propellant, t/unit.
pub fn density_of(name: &str) -> Option<f64> {
    DENSITY_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, d)| d)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Propellant {
    pub name: String,
    pub volume: f64,          // tank capacity, units
    pub filled: f64,          // current contents, units
    pub density: f64,         // t/unit
    pub main_engine: bool,    // drawn by the stage's main engine
    pub ratio: Option<f64>,   // explicit mixture ratio (by mass)
}

impl Propellant {
    /// A full tank drawn by the main engine.
    pub fn new(name: impl Into<String>, volume: f64, density: f64) -> Self {
        Self {
            name: name.into(),
            volume,
            filled: volume,
            density,
            main_engine: true,
            ratio: None,
        }
    }

    pub fn filled(mut self, v: f64) -> Self { self.filled = v.clamp(0.0, self.volume); self }
    pub fn main_engine(mut self, v: bool) -> Self { self.main_engine = v; self }
    pub fn ratio(mut self, v: f64) -> Self { self.ratio = Some(v); self }

    /// Current mass, t.
    pub fn mass(&self) -> f64 {
        self.filled * self.density
    }

    /// Mass when the tank is full, t.
    pub fn full_mass(&self) -> f64 {
        self.volume * self.density
    }

    pub fn set_filled(&mut self, units: f64) {
        self.filled = units.clamp(0.0, self.volume);
    }

    /// Remove `mass` tonnes; never goes below empty.
    pub fn drain_mass(&mut self, mass: f64) {
        if self.density <= 0.0 || mass <= 0.0 {
            return;
        }
        self.filled = (self.filled - mass / self.density).max(0.0);
    }
}

// ---------------------------------------------------------------------------
// Residuals: propellant left unburnable at the bottom of each tank
// ---------------------------------------------------------------------------

/// Residual reserve policy. The 1% default is a typical figure, not an
/// engine-accurate one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residuals {
    pub enabled: bool,
    pub fraction: f64,
}

impl Default for Residuals {
    fn default() -> Self {
        Self { enabled: false, fraction: 0.01 }
    }
}

impl Residuals {
    pub fn enabled(fraction: f64) -> Self {
        Self { enabled: true, fraction }
    }

    /// Mass (t) that cannot be drawn from this propellant.
    pub fn threshold(&self, prop: &Propellant) -> f64 {
        if self.enabled {
            prop.full_mass() * self.fraction
        } else {
            0.0
        }
    }

    /// Mass (t) still available to the engine.
    pub fn usable(&self, prop: &Propellant) -> f64 {
        (prop.mass() - self.threshold(prop)).max(0.0)
    }
}
