use std::io::{self, Write};
use std::path::Path;

use crate::sim::FlightSample;

/// Write recorded flight samples as CSV.
///
/// Columns: time, altitude, speed, apoapsis, periapsis, pitch_deg,
///          heading_deg, throttle, dynamic_pressure, mass, stage
pub fn write_flight_log<W: Write>(writer: &mut W, samples: &[FlightSample]) -> io::Result<()> {
    writeln!(
        writer,
        "time,altitude,speed,apoapsis,periapsis,pitch_deg,heading_deg,\
         throttle,dynamic_pressure,mass,stage"
    )?;

    for s in samples {
        writeln!(
            writer,
            "{:.2},{:.1},{:.2},{:.1},{:.1},{:.2},{:.2},\
             {:.3},{:.1},{:.2},{}",
            s.time,
            s.altitude,
            s.speed,
            s.apoapsis_altitude,
            s.periapsis_altitude,
            s.pitch_deg,
            s.heading_deg,
            s.throttle,
            s.dynamic_pressure,
            s.mass,
            s.stage,
        )?;
    }

    Ok(())
}

/// Write flight samples to a CSV file at the given path.
pub fn write_flight_log_file<P: AsRef<Path>>(path: P, samples: &[FlightSample]) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_flight_log(&mut file, samples)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64, altitude: f64, stage: i32) -> FlightSample {
        FlightSample {
            time,
            altitude,
            speed: 120.0,
            apoapsis_altitude: 2_000.0,
            periapsis_altitude: -590_000.0,
            pitch_deg: 90.0,
            heading_deg: 90.0,
            throttle: 1.0,
            dynamic_pressure: 8_000.0,
            mass: 19_000.0,
            stage,
        }
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let samples = vec![sample(0.0, 0.0, 1), sample(0.1, 12.5, 1)];

        let mut buf = Vec::new();
        write_flight_log(&mut buf, &samples).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[0].starts_with("time,"));
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert!(lines[1].starts_with("0.00,"));
        assert!(lines[2].ends_with(",1"));
        let columns = lines[0].split(',').count();
        assert!(lines.iter().all(|l| l.split(',').count() == columns));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flight.csv");
        write_flight_log_file(&path, &[sample(3.0, 40.0, 0)]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().nth(1).unwrap().starts_with("3.00,40.0,"));
    }
}
