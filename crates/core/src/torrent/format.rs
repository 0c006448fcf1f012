use chrono::{DateTime, Utc};

const UNITS: [(u64, &str); 5] = [
    (1 << 50, "PiB"),
    (1 << 40, "TiB"),
    (1 << 30, "GiB"),
    (1 << 20, "MiB"),
    (1 << 10, "KiB"),
];

/// Human readable size in binary units, e.g. `1.5 GiB`.
pub fn format_size(bytes: u64) -> String {
    for (unit, name) in UNITS {
        if bytes >= unit {
            return format!("{:.1} {}", bytes as f64 / unit as f64, name);
        }
    }
    format!("{} B", bytes)
}

/// Short publication time, e.g. `25.04.24 12:00`.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%d.%m.%y %H:%M").to_string()
}
