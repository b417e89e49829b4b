//! Flat-file release history: quoted CSV with a header row.
//!
//! Columns are `date, version, category, feature, description`. Rows with
//! fewer than five fields are skipped; an empty version falls back to the
//! release date.

use std::path::Path;

use releasebot_core::{ReleaseRecord, ReleasebotError, Result};
use tracing::{debug, warn};

const DEFAULT_HEADER: [&str; 5] = ["date", "version", "category", "feature", "description"];

/// Normalize `YYYY-M-D` / `YYYY/MM/DD` to zero-padded `YYYY/MM/DD`.
///
/// Anything that does not look like a three-part numeric date is returned
/// trimmed but otherwise untouched.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let parts: Vec<&str> = trimmed.split(['/', '-']).collect();
    if parts.len() == 3 {
        if let (Ok(y), Ok(m), Ok(d)) = (
            parts[0].parse::<u32>(),
            parts[1].parse::<u32>(),
            parts[2].parse::<u32>(),
        ) {
            return format!("{:04}/{:02}/{:02}", y, m, d);
        }
    }
    trimmed.to_string()
}

fn csv_error(err: csv::Error) -> ReleasebotError {
    ReleasebotError::Parse(err.to_string())
}

fn record_from_row(row: &csv::StringRecord) -> Option<ReleaseRecord> {
    if row.len() < 5 {
        return None;
    }
    let field = |i: usize| row.get(i).unwrap_or_default();
    Some(ReleaseRecord::new(
        normalize_date(field(0)),
        field(1),
        field(2),
        field(3),
        field(4),
    ))
}

fn reader_for(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)
}

/// Parse the release CSV in file order.
pub fn read_csv(path: &Path) -> Result<Vec<ReleaseRecord>> {
    let mut reader = reader_for(path)?;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line, row) in reader.records().enumerate() {
        match row {
            Ok(row) => match record_from_row(&row) {
                Some(record) => records.push(record),
                None => skipped += 1,
            },
            Err(e) => {
                warn!(line = line + 2, error = %e, "Skipping unreadable CSV row");
                skipped += 1;
            }
        }
    }

    debug!(
        path = %path.display(),
        loaded = records.len(),
        skipped,
        "Parsed release CSV"
    );
    Ok(records)
}

/// Insert `records` directly after the header row, keeping the existing rows
/// below them byte for byte. Creates the file with a default header if it is
/// missing.
///
/// The new file is written next to the original and renamed over it. Any
/// existing row that cannot be read aborts the prepend and leaves the file
/// untouched.
pub fn prepend_records(path: &Path, records: &[ReleaseRecord]) -> Result<()> {
    let (header, existing) = if path.exists() {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;
        let header = reader.byte_headers().map_err(csv_error)?.clone();
        let rows = reader
            .byte_records()
            .collect::<std::result::Result<Vec<csv::ByteRecord>, csv::Error>>()
            .map_err(|e| {
                ReleasebotError::Storage(format!(
                    "Refusing to rewrite {}: unreadable row: {}",
                    path.display(),
                    e
                ))
            })?;
        (header, rows)
    } else {
        (csv::ByteRecord::from(DEFAULT_HEADER.to_vec()), Vec::new())
    };

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_byte_record(&header).map_err(csv_error)?;
    for record in records {
        writer
            .write_record([
                record.date.as_str(),
                record.version.as_str(),
                record.category.as_str(),
                record.feature.as_str(),
                record.description.as_str(),
            ])
            .map_err(csv_error)?;
    }
    for row in &existing {
        writer.write_byte_record(row).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReleasebotError::Storage(e.to_string()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let staging = path.with_extension("csv.tmp");
    std::fs::write(&staging, bytes)?;
    if let Err(e) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }
    debug!(
        path = %path.display(),
        added = records.len(),
        kept = existing.len(),
        "Prepended release rows"
    );
    Ok(())
}
