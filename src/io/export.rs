//! CSV export for the periodic history samples.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::snapshot::HistorySample;

/// Column header for history export.
const HEADER: &str = "tick,sim_time_s,clock,solar_output,net_load,price,grid_status,\
                      energy_actual_kwh,energy_counterfactual_kwh,total_served,\
                      total_waiting,vehicles_charging,vehicles_platooning";

/// Exports history samples to a CSV file at the given path.
///
/// Writes a header row followed by one row per sample, oldest first.
/// Produces deterministic output for identical inputs.
///
/// # Arguments
///
/// * `samples` - History samples in chronological order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv<'a>(
    samples: impl IntoIterator<Item = &'a HistorySample>,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(samples, buf)
}

/// Writes history samples as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv<'a>(
    samples: impl IntoIterator<Item = &'a HistorySample>,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for s in samples {
        wtr.write_record(&[
            s.tick.to_string(),
            format!("{:.0}", s.sim_time_s),
            s.clock.clone(),
            format!("{:.2}", s.solar_output),
            format!("{:.2}", s.net_load),
            format!("{:.2}", s.price),
            s.grid_status.to_string(),
            format!("{:.4}", s.energy_actual_kwh),
            format!("{:.4}", s.energy_counterfactual_kwh),
            s.total_served.to_string(),
            s.total_waiting.to_string(),
            s.vehicles_charging.to_string(),
            s.vehicles_platooning.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::types::GridStatus;

    fn sample(tick: u64) -> HistorySample {
        HistorySample {
            tick,
            sim_time_s: tick as f64 * 2.0,
            clock: "06:10:00".to_string(),
            solar_output: 12.5,
            net_load: 51.0,
            price: 0.15,
            grid_status: GridStatus::Normal,
            energy_actual_kwh: 1.25,
            energy_counterfactual_kwh: 1.5,
            total_served: 7,
            total_waiting: 3,
            vehicles_charging: 1,
            vehicles_platooning: 2,
        }
    }

    #[test]
    fn header_lists_all_columns() {
        let mut buf = Vec::new();
        write_csv(&[sample(300)], &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let first_line = output.lines().next().unwrap_or("");
        assert_eq!(first_line.split(',').count(), 13);
        assert!(first_line.starts_with("tick,sim_time_s,clock"));
    }

    #[test]
    fn row_count_matches_samples() {
        let samples: Vec<HistorySample> = (1..=5).map(|i| sample(i * 300)).collect();
        let mut buf = Vec::new();
        write_csv(&samples, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(output.lines().count(), 6);
    }

    #[test]
    fn rows_parse_back() {
        let samples = vec![sample(300), sample(600)];
        let mut buf = Vec::new();
        write_csv(&samples, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "600");
        assert_eq!(&rows[0][6], "NORMAL");
        let counterfactual: f64 = rows[0][8].parse().unwrap();
        assert_eq!(counterfactual, 1.5);
    }

    #[test]
    fn empty_history_writes_header_only() {
        let mut buf = Vec::new();
        write_csv(&Vec::<HistorySample>::new(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
