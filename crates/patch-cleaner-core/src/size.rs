const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Formats a byte count with one decimal, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut index = 0;
    while value > 1024.0 && index < UNITS.len() - 1 {
        value /= 1024.0;
        index += 1;
    }
    format!("{:.1} {}", value, UNITS[index])
}
