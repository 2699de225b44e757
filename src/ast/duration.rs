//! Duration rendering
//!
//! Two textual forms are in play:
//! - range windows and offsets use the compact form (`5m`, `1h30m`, `90d`),
//!   which is how they are written in queries
//! - duration label filter values use the canonical form (`5m0s`, `1.5s`)

use std::time::Duration;

const NS_PER_US: u128 = 1_000;
const NS_PER_MS: u128 = 1_000 * NS_PER_US;
const NS_PER_SECOND: u128 = 1_000 * NS_PER_MS;
const NS_PER_MINUTE: u128 = 60 * NS_PER_SECOND;
const NS_PER_HOUR: u128 = 60 * NS_PER_MINUTE;
const NS_PER_DAY: u128 = 24 * NS_PER_HOUR;
const NS_PER_WEEK: u128 = 7 * NS_PER_DAY;
const NS_PER_YEAR: u128 = 365 * NS_PER_DAY;

/// Render a window/offset in compact form.
///
/// Years and weeks are only used when they divide the duration exactly,
/// so `90d` stays `90d` rather than becoming `12w6d`.
pub fn format_compact(d: Duration) -> String {
    let mut ns = d.as_nanos();
    if ns == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    let units: [(&str, u128, bool); 9] = [
        ("y", NS_PER_YEAR, true),
        ("w", NS_PER_WEEK, true),
        ("d", NS_PER_DAY, false),
        ("h", NS_PER_HOUR, false),
        ("m", NS_PER_MINUTE, false),
        ("s", NS_PER_SECOND, false),
        ("ms", NS_PER_MS, false),
        ("us", NS_PER_US, false),
        ("ns", 1, false),
    ];
    for (unit, mult, exact) in units {
        if exact && ns % mult != 0 {
            continue;
        }
        let v = ns / mult;
        if v > 0 {
            out.push_str(&format!("{v}{unit}"));
            ns -= v * mult;
        }
    }
    out
}

/// Render a duration in canonical form: `1h0m0s`, `2m30s`, `1.5s`, `250ms`, `10µs`
pub fn format_canonical(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < 1_000_000_000 {
        // sub-second: pick the largest unit that keeps the integer part non-zero
        return if nanos < 1_000 {
            format!("{nanos}ns")
        } else if nanos < 1_000_000 {
            format!("{}µs", with_fraction(nanos, 3))
        } else {
            format!("{}ms", with_fraction(nanos, 6))
        };
    }

    let seconds = with_fraction(nanos % 60_000_000_000, 9);
    let total_minutes = nanos / 60_000_000_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `v / 10^prec` rendered with trailing zeros of the fraction removed
fn with_fraction(v: u128, prec: u32) -> String {
    let scale = 10u128.pow(prec);
    let int = v / scale;
    let frac = v % scale;
    if frac == 0 {
        return int.to_string();
    }
    let digits = format!("{:0width$}", frac, width = prec as usize);
    format!("{int}.{}", digits.trim_end_matches('0'))
}
