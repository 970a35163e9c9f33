//! Human-readable byte sizes for log lines.

/// One kibibyte.
pub const KIB: u64 = 1024;
/// One mebibyte.
pub const MIB: u64 = 1024 * KIB;
/// One gibibyte.
pub const GIB: u64 = 1024 * MIB;

/// Format a byte count using binary units (e.g. "1.5 GiB").
pub fn format_bytes(bytes: u64) -> String {
    if bytes < KIB {
        return format!("{} B", bytes);
    }

    let units = ['K', 'M', 'G', 'T', 'P', 'E'];
    let mut div = KIB;
    let mut exp = 0;
    let mut n = bytes / KIB;
    while n >= KIB {
        div *= KIB;
        exp += 1;
        n /= KIB;
    }

    format!("{:.1} {}iB", bytes as f64 / div as f64, units[exp])
}
