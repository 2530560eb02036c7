use std::process::ExitCode;
use std::rc::Rc;

use orbit_autopilot::gnc::LaunchToOrbit;
use orbit_autopilot::io::write_flight_log_file;
use orbit_autopilot::sim::{kerbin, FlightLog, FlightRunner, RunnerConfig, SimVessel, StageBuilder};
use orbit_autopilot::vessel::{ManualClock, Telemetry};
use orbit_autopilot::{error, event, info, warn, AutopilotConfig};

/// Usage: orbit-autopilot [config.toml] [flight.csv]
fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match AutopilotConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => AutopilotConfig::default(),
    };
    let csv_path = args.next().unwrap_or_else(|| "flight.csv".to_string());
    match config.to_toml_string() {
        Ok(text) => event!("effective configuration:\n{}", text),
        Err(e) => warn!("cannot render configuration: {}", e),
    }

    // -----------------------------------------------------------------------
    // Vehicle: two-stage orbital launcher
    // -----------------------------------------------------------------------
    let booster = StageBuilder::new("Booster")
        .dry_mass(2_000.0)
        .propellant_mass(6_000.0)
        .thrust(200_000.0)
        .isp(280.0)
        .build();
    let upper = StageBuilder::new("Upper")
        .dry_mass(1_000.0)
        .propellant_mass(4_000.0)
        .thrust(60_000.0)
        .isp(340.0)
        .build();
    let upper_dv = upper.delta_v(0.0);
    let booster_dv = booster.delta_v(upper.total_mass());
    let mut vessel = SimVessel::new(kerbin(), vec![booster, upper]);

    // -----------------------------------------------------------------------
    // Fly
    // -----------------------------------------------------------------------
    let clock = Rc::new(ManualClock::new(0.0));
    let mission = match LaunchToOrbit::new(&mut vessel, Rc::clone(&clock), &config) {
        Ok(mission) => mission,
        Err(e) => {
            error!("cannot start mission: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let result = FlightRunner::new(RunnerConfig::default())
        .with_clock(clock)
        .run(&mut vessel, mission);
    let log = match result {
        Ok(log) => log,
        Err(e) => {
            error!("mission failed at UT {:.1}: {}", vessel.ut(), e);
            return ExitCode::FAILURE;
        }
    };

    // -----------------------------------------------------------------------
    // Report
    // -----------------------------------------------------------------------
    let orbit = vessel.orbit();
    println!();
    println!("====================================================================");
    println!("  LAUNCH TO ORBIT: {}", vessel.body().name);
    println!("====================================================================");
    println!();
    println!(
        "  Stage delta-v:  booster {:>6.0} m/s   upper {:>6.0} m/s",
        booster_dv, upper_dv
    );
    println!(
        "  Final orbit:    {:>8.0} m x {:>8.0} m   e = {:.4}",
        orbit.apoapsis_altitude(),
        orbit.periapsis_altitude(),
        orbit.eccentricity
    );
    println!(
        "  Max Q:          {:>8.0} Pa   Mass left: {:>7.0} kg",
        log.max_dynamic_pressure(),
        vessel.state().mass
    );
    println!("  Mission time:   {:>8.1} s", vessel.ut());
    println!();
    print_table(&log);

    match write_flight_log_file(&csv_path, &log.samples) {
        Ok(()) => info!("Flight log written to {}", csv_path),
        Err(e) => {
            error!("cannot write {}: {}", csv_path, e);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn print_table(log: &FlightLog) {
    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>8}  {:>9}  {:>6}  {:>8}  {:>5}",
        "t (s)", "alt (m)", "v (m/s)", "ap (m)", "pitch", "throttle", "stage"
    );
    println!("  {}", "─".repeat(66));

    let interval = (log.samples.len() / 30).max(1);
    for (i, s) in log.samples.iter().enumerate() {
        if i % interval != 0 && i != log.samples.len() - 1 {
            continue;
        }
        println!(
            "  {:>7.1}  {:>9.0}  {:>8.1}  {:>9.0}  {:>6.1}  {:>8.2}  {:>5}",
            s.time, s.altitude, s.speed, s.apoapsis_altitude, s.pitch_deg, s.throttle, s.stage
        );
    }
    println!();
}
