use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sim::event::EventMap;
use crate::sim::ground::ElevationMap;

// ---------------------------------------------------------------------------
// Ground elevation map
// ---------------------------------------------------------------------------

/// One raster sample. `row`/`col` are the source grid indices and are not
/// used for lookup.
#[derive(Debug, Deserialize)]
struct ElevationRow {
    #[allow(dead_code)]
    row: i64,
    #[allow(dead_code)]
    col: i64,
    lat: f64,
    lon: f64,
    height: f64,
}

/// Read a headerless `row,col,lat,lon,height` table. Malformed rows are
/// skipped with a warning.
pub fn read_elevation<R: Read>(reader: R) -> Result<ElevationMap> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut map = ElevationMap::new();
    let mut skipped = 0usize;
    for (i, result) in rdr.deserialize::<ElevationRow>().enumerate() {
        match result {
            Ok(row) => map.insert(row.lat, row.lon, row.height),
            Err(e) => {
                warn!("elevation map line {}: {}", i + 1, e);
                skipped += 1;
            }
        }
    }
    debug!("elevation map: {} cells, {} rows skipped", map.len(), skipped);
    Ok(map)
}

pub fn load_elevation(path: impl AsRef<Path>) -> Result<ElevationMap> {
    read_elevation(File::open(path)?)
}

// ---------------------------------------------------------------------------
// Event table
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventRow {
    key: char,
    time: f64,
    altitude: f64,
    downrange: f64,
    hs: f64,
    vs: f64,
    lat: f64,
    lon: f64,
    height: Option<f64>,
    apoapsis: Option<f64>,
    periapsis: Option<f64>,
    dv_spent: Option<f64>,
}

/// One row per captured event, in key order.
pub fn write_events<W: Write>(writer: W, events: &EventMap) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (key, s) in events.iter() {
        wtr.serialize(EventRow {
            key: key.code(),
            time: s.time,
            altitude: s.altitude,
            downrange: s.downrange,
            hs: s.hs,
            vs: s.vs,
            lat: s.lat,
            lon: s.lon,
            height: s.height,
            apoapsis: s.apoapsis,
            periapsis: s.periapsis,
            dv_spent: s.inertial.as_ref().map(|i| i.dv_spent),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_events_file(path: impl AsRef<Path>, events: &EventMap) -> Result<()> {
    write_events(File::create(path)?, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::EventKey;
    use crate::sim::ground::Ground;
    use crate::sim::state::SimState;

    #[test]
    fn loads_half_degree_cells() {
        let data = "\
# row,col,lat,lon,height
0,0,-0.5,10.0,812.5
0,1,-0.5,10.5,790
1,0, 0.0,190.0,12
bad,row
";
        let map = read_elevation(data.as_bytes()).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.height(-0.4, 10.1), Some(812.5));
        // 190°E is stored as 170°W
        assert_eq!(Ground::Map(map).altitude_at(0.1, -170.0), Some(12.0));
    }

    #[test]
    fn event_table_has_header_and_rows() {
        let state = |time| SimState {
            time,
            altitude: 1000.0,
            downrange: 0.0,
            hs: 10.0,
            vs: 0.0,
            lat: 0.0,
            lon: 0.0,
            height: None,
            apoapsis: Some(1500.0),
            periapsis: None,
            inertial: None,
        };
        let mut events = EventMap::new();
        events.record(EventKey::Vertical, || state(5.0));
        events.record(EventKey::Orbital, || state(3.0));

        let mut buf = Vec::new();
        write_events(&mut buf, &events).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("key,time,"));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("o,3.0,"));
        assert!(lines[2].starts_with("v,5.0,"));
    }
}
