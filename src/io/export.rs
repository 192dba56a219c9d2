//! CSV export for tick records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::TickRecord;

/// Column header for CSV tick export.
const HEADER: &str = "tick,timestamp,active_start,active_end,request_kind,\
                       demand_max,setpoint_kw,charge_kw,soc,reported_soc,\
                       queue_len,retired";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Exports tick records to a CSV file at the given path.
///
/// Writes a header row followed by one data row per tick. Columns without a
/// value on a tick (no active window, no SoC report) are left empty.
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[TickRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

/// Writes tick records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[TickRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.tick.to_string(),
            r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            optional(r.active_start.map(|t| t.format(TIMESTAMP_FORMAT))),
            optional(r.active_end.map(|t| t.format(TIMESTAMP_FORMAT))),
            r.request_kind.unwrap_or_default().to_string(),
            optional(r.demand_max),
            optional(r.setpoint_kw.map(|kw| format!("{kw:.4}"))),
            format!("{:.4}", r.charge_kw),
            format!("{:.4}", r.soc),
            optional(r.reported_soc.map(|soc| format!("{soc:.2}"))),
            r.queue_len.to_string(),
            r.retired.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn optional(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
