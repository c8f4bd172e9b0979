//! Human-readable byte counts

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count as `"<value> <unit>"` with two decimals: "1.50 KB".
///
/// Divides by 1024 until the value drops below 1024 or the units run out, so
/// anything from 1024^4 upward stays in TB.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = UNITS[0];

    for &next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }

    format!("{:.2} {}", value, unit)
}
