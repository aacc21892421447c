use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{PlannerError, Result};
use crate::sim::event::EventMap;
use crate::vehicle::{density_of, Booster, Propellant, Stage, StageBuilder};

// ---------------------------------------------------------------------------
// Booster files
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropSpec {
    name: String,
    volume: f64,
    filled: Option<f64>,
    density: Option<f64>,
    ratio: Option<f64>,
    #[serde(default = "main_engine_default")]
    main_engine: bool,
}

fn main_engine_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageSpec {
    name: Option<String>,
    props: Vec<PropSpec>,
    isp: f64,
    dry: f64,
    thrust: Option<f64>,
    /// Percent, 0-100.
    #[serde(default)]
    min_throttle: f64,
}

impl PropSpec {
    fn into_propellant(self) -> Result<Propellant> {
        if self.volume < 0.0 {
            return Err(PlannerError::InvalidBooster(format!("{}: negative volume", self.name)));
        }
        let density = match self.density {
            Some(d) => d,
            None => density_of(&self.name).ok_or_else(|| PlannerError::UnknownPropellant(self.name.clone()))?,
        };
        let mut prop = Propellant::new(self.name, self.volume, density).main_engine(self.main_engine);
        if let Some(filled) = self.filled {
            prop = prop.filled(filled);
        }
        if let Some(ratio) = self.ratio {
            prop = prop.ratio(ratio);
        }
        Ok(prop)
    }
}

impl StageSpec {
    fn into_stage(self, index: usize) -> Result<Stage> {
        if self.isp <= 0.0 {
            return Err(PlannerError::InvalidBooster(format!("stage {}: isp must be positive", index)));
        }
        if self.dry < 0.0 {
            return Err(PlannerError::InvalidBooster(format!("stage {}: negative dry mass", index)));
        }
        let mut builder = StageBuilder::new(self.name.unwrap_or_else(|| format!("Stage {}", index)))
            .isp(self.isp)
            .dry_mass(self.dry)
            .min_throttle(self.min_throttle / 100.0);
        if let Some(thrust) = self.thrust {
            builder = builder.thrust(thrust);
        }
        for prop in self.props {
            builder = builder.propellant(prop.into_propellant()?);
        }
        Ok(builder.build())
    }
}

/// Parse a booster from its JSON description (bottom stage first).
pub fn read_booster<R: Read>(name: &str, reader: R) -> Result<Booster> {
    let specs: Vec<StageSpec> = serde_json::from_reader(reader)?;
    if specs.is_empty() {
        return Err(PlannerError::InvalidBooster("no stages".into()));
    }
    let stages = specs
        .into_iter()
        .enumerate()
        .map(|(i, spec)| spec.into_stage(i))
        .collect::<Result<Vec<_>>>()?;
    debug!("booster {}: {} stages", name, stages.len());
    Ok(Booster::new(name, stages))
}

/// Load a booster file; the booster is named after the file stem.
pub fn load_booster(path: impl AsRef<Path>) -> Result<Booster> {
    let path = path.as_ref();
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("booster");
    read_booster(name, BufReader::new(File::open(path)?))
}

// ---------------------------------------------------------------------------
// Event output
// ---------------------------------------------------------------------------

/// Write captured events as a JSON object keyed by event code.
pub fn write_events<W: Write>(writer: &mut W, events: &EventMap) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, events)?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_events_file(path: impl AsRef<Path>, events: &EventMap) -> Result<()> {
    let mut file = File::create(path)?;
    write_events(&mut file, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::EventKey;
    use crate::sim::state::SimState;

    const TWO_STAGE: &str = r#"[
        {"props": [{"name": "LiquidFuel", "volume": 360}, {"name": "Oxidizer", "volume": 440}],
         "isp": 300, "dry": 0.5, "thrust": 200},
        {"name": "Upper",
         "props": [{"name": "Kerosene", "volume": 100, "filled": 50},
                   {"name": "HTP", "volume": 20, "density": 0.0014, "mainEngine": false}],
         "isp": 310, "dry": 0.2, "thrust": 30, "minThrottle": 40}
    ]"#;

    #[test]
    fn loads_stages_bottom_first() {
        let b = read_booster("test", TWO_STAGE.as_bytes()).unwrap();
        assert_eq!(b.stage_count(), 2);
        let lower = &b.stages()[0];
        assert_eq!(lower.props.len(), 2);
        assert!((lower.props[0].density - 0.005).abs() < 1e-12);
        assert_eq!(lower.thrust, Some(200.0));

        let upper = &b.stages()[1];
        assert_eq!(upper.name, "Upper");
        assert!((upper.min_throttle - 0.4).abs() < 1e-12);
        assert_eq!(upper.props[0].filled, 50.0);
        assert!(!upper.props[1].main_engine);
        assert!(b.delta_v().unwrap() > 0.0);
    }

    #[test]
    fn unknown_propellant_without_density_is_an_error() {
        let json = r#"[{"props": [{"name": "Unobtainium", "volume": 1}], "isp": 300, "dry": 1}]"#;
        match read_booster("x", json.as_bytes()) {
            Err(PlannerError::UnknownPropellant(name)) => assert_eq!(name, "Unobtainium"),
            other => panic!("expected unknown propellant, got {:?}", other.map(|b| b.name)),
        }
    }

    #[test]
    fn rejects_bad_stages() {
        assert!(matches!(read_booster("x", "[]".as_bytes()), Err(PlannerError::InvalidBooster(_))));
        let json = r#"[{"props": [], "isp": 0, "dry": 1}]"#;
        assert!(matches!(read_booster("x", json.as_bytes()), Err(PlannerError::InvalidBooster(_))));
        assert!(matches!(read_booster("x", "{".as_bytes()), Err(PlannerError::Json(_))));
    }

    #[test]
    fn events_serialize_by_code() {
        let mut events = EventMap::new();
        events.record(EventKey::Horizontal, || SimState {
            time: 12.0,
            altitude: 500.0,
            downrange: 40.0,
            hs: 0.0,
            vs: -3.0,
            lat: 1.0,
            lon: 2.0,
            height: Some(120.0),
            apoapsis: None,
            periapsis: None,
            inertial: None,
        });
        let mut buf = Vec::new();
        write_events(&mut buf, &events).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["h"]["time"], 12.0);
        assert_eq!(value["h"]["height"], 120.0);
        assert!(value["h"].get("apoapsis").is_none());
    }
}
