//! CSV export for the measurement ledger

use crate::ledger::MeasurementLedger;
use crate::measurement::Origin;
use std::io::Write;

/// Error types for CSV export
#[derive(Debug, thiserror::Error)]
pub enum CsvExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

pub type CsvExportResult<T> = Result<T, CsvExportError>;

/// Configuration for CSV export
#[derive(Debug, Clone)]
pub struct CsvExportConfig {
    /// Include column headers in the output
    pub include_headers: bool,

    /// CSV delimiter character
    pub delimiter: u8,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self {
            include_headers: true,
            delimiter: b',',
        }
    }
}

/// Export measurements to CSV format
///
/// CSV columns:
/// - ID: Unique measurement identifier
/// - Created: Creation time (RFC 3339)
/// - Origin: `live` or `recoveredOffline`
/// - Point A X / Point A Y: First tap in capture pixels
/// - Point B X / Point B Y: Second tap in capture pixels
/// - Pixel Distance: Tapped span in pixels
/// - Physical Distance: Length in the reference unit
/// - Reference Unit: Unit of the reference object used for scaling
/// - Display Distance: Length in the display unit
/// - Display Unit: Unit the measurement is displayed in
pub fn export_measurements_csv<W: Write>(
    writer: W,
    ledger: &MeasurementLedger,
    config: &CsvExportConfig,
) -> CsvExportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .from_writer(writer);

    if config.include_headers {
        csv_writer.write_record([
            "ID",
            "Created",
            "Origin",
            "Point A X",
            "Point A Y",
            "Point B X",
            "Point B Y",
            "Pixel Distance",
            "Physical Distance",
            "Reference Unit",
            "Display Distance",
            "Display Unit",
        ])?;
    }

    for record in ledger.all() {
        let (a, b) = record.points();
        csv_writer.write_record(&[
            record.id().to_string(),
            record.created_at().to_rfc3339(),
            origin_name(record.origin()).to_string(),
            a.x.to_string(),
            a.y.to_string(),
            b.x.to_string(),
            b.y.to_string(),
            format!("{:.3}", record.pixel_distance()),
            format!("{:.4}", record.physical_distance()),
            record.reference_unit().to_string(),
            format!("{:.2}", record.display_distance()),
            record.display_unit().to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn origin_name(origin: Origin) -> &'static str {
    match origin {
        Origin::Live => "live",
        Origin::RecoveredOffline => "recoveredOffline",
    }
}
