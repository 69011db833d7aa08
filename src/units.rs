#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! Human readable byte counts.

const UNITS: [(u32, &str); 8] = [
    (10, "kilobytes"),
    (20, "megabytes"),
    (30, "gigabytes"),
    (40, "terabytes"),
    (50, "petabytes"),
    (60, "exabytes"),
    (70, "zettabytes"),
    (80, "yottabytes"),
];

/// Renders `num_bytes` using base-1024 unit names with three decimals.
///
/// A unit is only adopted once the count is strictly greater than ten of
/// that unit, so `2_097_152` stays `"2097152 bytes"` while `11_000_000`
/// becomes `"10.490 megabytes"`.
#[must_use]
pub fn bytes_to_english(num_bytes: u64) -> String {
    let bytes = u128::from(num_bytes);
    let mut out = format!("{num_bytes} bytes");
    for (shift, name) in UNITS {
        let unit = 1u128 << shift;
        if bytes > 10 * unit {
            #[allow(clippy::cast_precision_loss)]
            let value = bytes as f64 / unit as f64;
            out = format!("{value:.3} {name}");
        }
    }
    out
}

/// Groups digits in threes: `3200000000` -> `"3,200,000,000"`.
#[must_use]
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `part` as a percentage of `whole`, 0 when `whole` is 0.
#[must_use]
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = part as f64 / whole as f64 * 100.0;
    pct
}
