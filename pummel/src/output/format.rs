use std::time::Duration;

pub(crate) fn format_bytes(b: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    if !b.is_finite() || b < 0.0 {
        return "0B".to_string();
    }
    if b >= GIB {
        return format!("{:.2}GiB", b / GIB);
    }
    if b >= MIB {
        return format!("{:.2}MiB", b / MIB);
    }
    if b >= KIB {
        return format!("{:.2}KiB", b / KIB);
    }

    format!("{b:.0}B")
}

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.2}")
    } else {
        "0.00".to_string()
    }
}

/// Single unit for sub-minute values (`ns`, `us`, `ms`, `s`), `XmY.YYs` above that.
pub(crate) fn format_duration(d: Duration) -> String {
    const NS_PER_US: u128 = 1_000;
    const NS_PER_MS: u128 = 1_000_000;
    const NS_PER_S: u128 = 1_000_000_000;

    let ns = d.as_nanos();
    if ns < NS_PER_US {
        return format!("{ns}ns");
    }
    if ns < NS_PER_MS {
        return format!("{:.2}us", ns as f64 / NS_PER_US as f64);
    }
    if ns < NS_PER_S {
        return format!("{:.2}ms", ns as f64 / NS_PER_MS as f64);
    }

    let secs = d.as_secs();
    if secs < 60 {
        return format!("{:.2}s", d.as_secs_f64());
    }

    let minutes = secs / 60;
    let rest = d.as_secs_f64() - (minutes * 60) as f64;
    if minutes < 60 {
        format!("{minutes}m{rest:.2}s")
    } else {
        format!("{}h{}m{rest:.2}s", minutes / 60, minutes % 60)
    }
}
