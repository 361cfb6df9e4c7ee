//! Duration strings in the `"30s"` / `"5m"` / `"1h30m"` notation used by
//! action timeouts.
//!
//! A duration is one or more `<decimal><unit>` terms. Units are `ns`,
//! `us` (or `µs`), `ms`, `s`, `m` and `h`; decimals may carry a fraction
//! (`"1.5s"`). The bare string `"0"` is accepted as zero. Negative values are
//! rejected since a timeout can never be negative.

use std::time::Duration;

use crate::error::{ExecapiError, Result};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Largest duration representable by the notation (signed 64-bit nanoseconds).
const MAX_NANOS: u128 = i64::MAX as u128;

/// Fraction digits beyond this are ignored; they are below nanosecond precision
/// for every unit.
const MAX_FRACTION_DIGITS: usize = 18;

pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || ExecapiError::InvalidDuration(input.to_string());

    let mut s = input.strip_prefix('+').unwrap_or(input);
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() || s.starts_with('-') {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, rest) = s.split_at(int_len);
        s = rest;

        let mut frac_part = "";
        if let Some(rest) = s.strip_prefix('.') {
            let frac_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &rest[..frac_len];
            s = &rest[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        let (unit, rest) = s.split_at(unit_len);
        s = rest;
        let scale = unit_scale(unit).ok_or_else(invalid)?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let term = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(fraction_nanos(frac_part, scale)))
            .ok_or_else(invalid)?;
        total = total.checked_add(term).ok_or_else(invalid)?;
        if total > MAX_NANOS {
            return Err(invalid());
        }
    }

    Ok(Duration::from_nanos(total as u64))
}

fn unit_scale(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(60 * 60 * NANOS_PER_SEC),
        _ => None,
    }
}

fn fraction_nanos(digits: &str, scale: u128) -> u128 {
    let digits = &digits[..digits.len().min(MAX_FRACTION_DIGITS)];
    if digits.is_empty() {
        return 0;
    }
    // Only ASCII digits reach here, so the parse cannot fail.
    let numerator: u128 = digits.parse().unwrap_or(0);
    numerator * scale / 10u128.pow(digits.len() as u32)
}

/// Render a duration in the same notation `parse_duration` reads, e.g.
/// `"10m0s"`, `"1h0m0s"`, `"1.5s"`, `"250ms"`.
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }

    if d < Duration::from_secs(1) {
        let nanos = d.subsec_nanos();
        return if nanos % 1_000_000 == 0 {
            format!("{}ms", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}µs", nanos / 1_000)
        } else {
            format!("{nanos}ns")
        };
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let mut seconds = (total_secs % 60).to_string();
    let frac = d.subsec_nanos();
    if frac != 0 {
        let digits = format!("{frac:09}");
        seconds.push('.');
        seconds.push_str(digits.trim_end_matches('0'));
    }

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
