//! CSV export of stored weather requests.

use crate::record::WeatherRequestRecord;
use crate::request_store::{format_timestamp, RequestStoreError, RequestStoreResult};

pub const CSV_HEADERS: [&str; 11] = [
    "id",
    "location_query",
    "location_name",
    "latitude",
    "longitude",
    "start_date",
    "end_date",
    "units",
    "daily_json",
    "created_at",
    "updated_at",
];

/// Quote a field when it holds a comma, quote or line break; inner quotes are doubled.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn record_fields(record: &WeatherRequestRecord) -> RequestStoreResult<[String; 11]> {
    let daily_json = serde_json::to_string(&record.daily_series)
        .map_err(|e| RequestStoreError::Serialization(e.to_string()))?;

    Ok([
        record.id.to_string(),
        record.location_query.clone(),
        record.location_name.clone(),
        record.latitude.to_string(),
        record.longitude.to_string(),
        record.start_date.format("%Y-%m-%d").to_string(),
        record.end_date.format("%Y-%m-%d").to_string(),
        record.units.to_string(),
        daily_json,
        format_timestamp(record.created_at),
        format_timestamp(record.updated_at),
    ])
}

/// Render records as CSV, header first, lines joined with `\n`.
///
/// The header is present even when `records` is empty.
pub fn to_csv(records: &[WeatherRequestRecord]) -> RequestStoreResult<String> {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));

    for record in records {
        let fields = record_fields(record)?;
        let line = fields.iter().map(|f| escape_field(f)).collect::<Vec<_>>().join(",");
        lines.push(line);
    }

    Ok(lines.join("\n"))
}
