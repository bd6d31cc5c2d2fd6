//! Human readable sizes for the progress line
//!
//! Sizes use SI (power of 1000) prefixes and keep at most three significant digits, e.g. 1536
//! bytes is shown as `1.5 kB`.

const SI_PREFIXES: [&str; 7] = ["", "k", "M", "G", "T", "P", "E"];

/// Byte count split into a rounded mantissa and its SI prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiSize {
    pub mantissa: String,
    pub prefix: &'static str,
}

/// Scales `bytes` to the largest SI prefix whose rounded mantissa stays below 1000.
pub fn si(bytes: u64) -> SiSize {
    let mut value = bytes as f64;
    let mut idx = 0;
    // 999.5 and above would round up to "1000"
    while value >= 999.5 && idx + 1 < SI_PREFIXES.len() {
        value /= 1000.0;
        idx += 1;
    }
    let mantissa = if idx > 0 && value < 9.95 {
        let text = format!("{value:.1}");
        match text.strip_suffix(".0") {
            Some(whole) => whole.to_string(),
            None => text,
        }
    } else {
        format!("{value:.0}")
    };
    SiSize {
        mantissa,
        prefix: SI_PREFIXES[idx],
    }
}

/// Formats a byte count, e.g. `1.5 kB`
pub fn bytes(bytes: u64) -> String {
    let size = si(bytes);
    format!("{} {}B", size.mantissa, size.prefix)
}

/// Formats `current` out of `total` bytes, e.g. `12kB/4.5MB`
///
/// When both sides share the same unit it is only printed once: `12/45kB`. An unknown `total`
/// (zero) only shows the current value.
pub fn progress(current: u64, total: u64) -> String {
    let current = si(current);
    if total == 0 {
        return format!("{}{}B", current.mantissa, current.prefix);
    }
    let total = si(total);
    if current.prefix == total.prefix {
        format!("{}/{}{}B", current.mantissa, total.mantissa, total.prefix)
    } else {
        format!(
            "{}{}B/{}{}B",
            current.mantissa, current.prefix, total.mantissa, total.prefix
        )
    }
}

/// Formats completion percentage, `None` when the total size is unknown
///
/// Capped at 100%: the last line of a source may lack the newline that is counted for it.
pub fn percent(current: u64, total: u64) -> Option<String> {
    if total == 0 {
        return None;
    }
    let ratio = (current as f64 / total as f64).min(1.0);
    Some(format!("{:3.0}%", ratio * 100.0))
}
