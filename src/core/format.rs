//! Human-readable sizes and status messages for listings.

/// Default filesize warning threshold in bytes
pub const DEFAULT_FILESIZE_LIMIT: u64 = 5_000_000;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Whether a size is above the warning threshold
pub fn warn_filesize(size: u64, limit: u64) -> bool {
    size > limit
}

/// Format a byte count: B and KB whole, MB and GB to one decimal
pub fn calculate_filesize(size: u64) -> String {
    if size < KB {
        return format!("{} B", size);
    }
    if size < MB {
        return format!("{} KB", size / KB);
    }

    let (factor, unit) = if size < GB { (MB, "MB") } else { (GB, "GB") };
    let value = ((size as f64 / factor as f64) * 10.0).round() / 10.0;
    if value.fract() == 0.0 {
        format!("{:.0} {}", value, unit)
    } else {
        format!("{:.1} {}", value, unit)
    }
}

/// Label describing an item's print flag
pub fn print_message(to_print: Option<bool>) -> &'static str {
    match to_print {
        Some(true) => "Must be printed",
        Some(false) => "Should not be printed",
        None => "Not convertible to a printable format",
    }
}

/// Label describing an item's confidentiality, empty when undeclared
pub fn confidential_message(confidential: Option<bool>) -> &'static str {
    match confidential {
        Some(true) => "Confidential",
        Some(false) => "Not confidential",
        None => "",
    }
}
