//! Flat preference records: comma-separated unsigned byte fields.
//!
//! Reading is tolerant. Fields are consumed in order and the scan stops at
//! the first missing or malformed field, leaving the remaining targets with
//! whatever they held before.

use tracing::debug;

/// Format fields as `a,b,c`.
pub fn format_fields(fields: &[u8]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Scan `record` into `fields`, returning how many were assigned.
pub fn scan_fields(record: &str, fields: &mut [u8]) -> usize {
    let mut parsed = 0;

    for (target, text) in fields.iter_mut().zip(record.split(',')) {
        match text.trim().parse::<u8>() {
            Ok(value) => {
                *target = value;
                parsed += 1;
            }
            Err(_) => break,
        }
    }

    if parsed < fields.len() {
        debug!(
            "short preference record '{}': {} of {} fields",
            record,
            parsed,
            fields.len()
        );
    }
    parsed
}
