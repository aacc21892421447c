use std::env;
use std::path::Path;
use std::process::ExitCode;

use log::{debug, error};

use flight_planner::io;
use flight_planner::orbital::{transfer_window, BodyRegistry, ParentBody};
use flight_planner::sim::{
    run_ascent, run_maneuver, run_retro, Attitude, EventKey, Ground, InertialMode, InertialSim, InertialStart,
    RunResult, SimConfig, SurfaceMode, SurfaceStart,
};
use flight_planner::vehicle::Booster;
use flight_planner::{PlannerError, Result};

const USAGE: &str = "usage: flight-planner <booster.json> [ascent|retro|burn [events.json|events.csv] | transfer <body>]";

/// Optional body configuration file; the stock system is used otherwise.
const BODIES_ENV: &str = "FLIGHT_PLANNER_BODIES";

const RULE: &str = "  ──────────────────────────────────────────────────────────────────";

fn main() -> ExitCode {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(path) = args.first().filter(|_| scenario_args_ok(&args[1..])) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    match run(path, &args[1..]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Whether the arguments after the booster path name a known scenario.
fn scenario_args_ok(rest: &[String]) -> bool {
    match rest.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => true,
        ["ascent" | "retro" | "burn"] | ["ascent" | "retro" | "burn", _] => true,
        ["transfer", _] => true,
        _ => false,
    }
}

fn run(path: &str, rest: &[String]) -> Result<()> {
    let booster = io::load_booster(path)?;
    let bodies = match env::var(BODIES_ENV) {
        Ok(cfg) => io::load_bodies(cfg)?,
        Err(_) => BodyRegistry::stock(),
    };
    debug!("{} bodies available", bodies.len());

    println!();
    println!("====================================================================");
    println!("  FLIGHT PLAN: {}", booster.name);
    println!("====================================================================");
    print_breakdown(&booster);

    let body = |name: &str| -> Result<ParentBody> {
        bodies
            .get(name)
            .map(|b| b.as_parent())
            .ok_or_else(|| PlannerError::UnknownBody(name.to_string()))
    };
    let config = SimConfig::default();

    let result = match rest.first().map(String::as_str) {
        None => None,
        Some("ascent") => {
            // Gravity turn off the pad: hold prograde from an initial kick.
            let start = SurfaceStart { throttle: 1.0, attitude: Attitude::new(80.0, 90.0), ..SurfaceStart::default() };
            Some(("Ascent (Kerbin)", run_ascent(&booster, &start, body("Kerbin")?, &Ground::Constant(0.0), SurfaceMode::Prograde, &config)))
        }
        Some("retro") => {
            let start = SurfaceStart {
                hs: 100.0,
                vs: -10.0,
                altitude: 10_000.0,
                throttle: 1.0,
                attitude: Attitude::new(60.0, 90.0),
                retro: true,
                ..SurfaceStart::default()
            };
            Some(("Descent (Mun)", run_retro(&booster, &start, body("Mun")?, &Ground::Constant(0.0), SurfaceMode::Retrograde, &config)))
        }
        Some("burn") => {
            let kerbin = body("Kerbin")?;
            let (radius, mu) = kerbin.radius.zip(kerbin.mu).ok_or_else(|| PlannerError::UnknownBody("Kerbin".into()))?;
            let start = InertialStart::circular(radius + 100_000.0, mu, 0.0, 0.0)
                .ok_or_else(|| PlannerError::UnknownBody("Kerbin".into()))?;
            let mut sim = InertialSim::setup(&booster, &start, kerbin, InertialMode::Prograde, Attitude::default(), &config)
                .ok_or_else(|| PlannerError::UnknownBody("Kerbin".into()))?;
            Some(("Prograde burn (100 km Kerbin orbit)", run_maneuver(&mut sim, 60.0, 1.0, None, &config)))
        }
        Some("transfer") => {
            if let Some(target) = rest.get(1) {
                print_transfer(&bodies, "Kerbin", target, &booster)?;
            }
            None
        }
        // Rejected by scenario_args_ok before loading anything.
        Some(_) => None,
    };

    if let Some((title, result)) = result {
        print_events(title, &result);
        if let Some(out) = rest.get(1) {
            write_events(Path::new(out), &result)?;
        }
    }
    println!("====================================================================");
    println!();
    Ok(())
}

fn print_breakdown(booster: &Booster) {
    println!();
    println!("  Stages (bottom first)");
    println!("{}", RULE);
    println!(
        "  {:<12} {:>9} {:>9} {:>9} {:>9} {:>8}",
        "stage", "wet (t)", "dry (t)", "pl (t)", "dv (m/s)", "burn (s)"
    );
    for (i, stage) in booster.stages().iter().enumerate() {
        let payload = booster.payload_mass(i);
        let dv = stage.delta_v(payload).map_or("-".to_string(), |v| format!("{:.0}", v));
        let burn = stage
            .burn_time(1.0, &booster.residuals)
            .map_or("-".to_string(), |t| format!("{:.0}", t));
        println!(
            "  {:<12} {:>9.2} {:>9.2} {:>9.2} {:>9} {:>8}",
            stage.name,
            stage.wet(payload),
            stage.dry(payload),
            payload,
            dv,
            burn
        );
    }
    println!();
    println!(
        "  Total mass:    {:>8.2} t     Delta-v:      {:>8} m/s",
        booster.wet_mass(),
        booster.delta_v().map_or("-".to_string(), |v| format!("{:.0}", v))
    );
    println!();
}

fn print_events(title: &str, result: &RunResult) {
    let opt = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.0}", v));

    println!("  {}", title);
    println!("{}", RULE);
    println!(
        "  {:>3} {:>7} {:>9} {:>9} {:>8} {:>8} {:>9} {:>9}",
        "ev", "t (s)", "alt (m)", "dr (m)", "hs", "vs", "apo (m)", "peri (m)"
    );
    for (key, s) in result.events.iter() {
        println!(
            "  {:>3} {:>7.0} {:>9.0} {:>9.0} {:>8.1} {:>8.1} {:>9} {:>9}",
            key.code(),
            s.time,
            s.altitude,
            s.downrange,
            s.hs,
            s.vs,
            opt(s.apoapsis),
            opt(s.periapsis)
        );
    }
    if let Some(spent) = result.events.get(EventKey::Burnout).and_then(|s| s.inertial.as_ref()).map(|i| i.dv_spent) {
        println!("  Delta-v spent: {:>8.1} m/s", spent);
    }
    println!();
    println!("  Run ended: {:?} at t={:.0} s", result.end, result.time);
    println!();
}

fn print_transfer(bodies: &BodyRegistry, origin: &str, target: &str, booster: &Booster) -> Result<()> {
    let unknown = |name: &str| PlannerError::UnknownBody(name.to_string());
    let parent = bodies.parent_of(origin).ok_or_else(|| unknown(origin))?;
    if bodies.parent_of(target).map(|p| p.name.as_str()) != Some(parent.name.as_str()) {
        return Err(unknown(target));
    }
    let from = bodies.elements_at(origin, 0.0).ok_or_else(|| unknown(origin))?;
    let to = bodies.elements_at(target, 0.0).ok_or_else(|| unknown(target))?;
    let window = transfer_window(&from, &to, parent.mu).ok_or_else(|| unknown(target))?;

    println!("  Transfer {} -> {}", origin, target);
    println!("{}", RULE);
    println!(
        "  Phase angle:   {:>8.1} deg   Current:      {:>8.1} deg",
        window.phase_angle.to_degrees(),
        window.current_phase.to_degrees()
    );
    println!(
        "  Window in:     {:>8.1} h     Flight time:  {:>8.1} h",
        window.wait / 3600.0,
        window.transfer.transfer_time / 3600.0
    );
    println!(
        "  Departure dv:  {:>8.0} m/s   Arrival dv:   {:>8.0} m/s",
        window.transfer.dv1, window.transfer.dv2
    );
    if let Some(dv) = booster.delta_v() {
        println!("  Booster dv:    {:>8.0} m/s   Margin:       {:>8.0} m/s", dv, dv - window.transfer.total_dv);
    }
    println!();
    Ok(())
}

fn write_events(out: &Path, result: &RunResult) -> Result<()> {
    match out.extension().and_then(|e| e.to_str()) {
        Some("csv") => io::csv::write_events_file(out, &result.events),
        _ => io::json::write_events_file(out, &result.events),
    }
}
