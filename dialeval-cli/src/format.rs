//! Text formatting utilities.

use std::time::Duration;

/// Shorten a unit prefix to `max_chars`, keeping its end.
///
/// The metric name is the last segment of `<model>-<dataset>-<metric>`, so
/// long model names are elided from the front.
pub fn shorten_prefix(prefix: &str, max_chars: usize) -> String {
    let count = prefix.chars().count();
    if count <= max_chars {
        return prefix.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let tail: String = prefix.chars().skip(count - keep).collect();
    format!("\u{2026}{}", tail)
}

/// Format a duration as a human-readable string.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let minutes = duration.as_secs() / 60;
        format!("{}m {:02}s", minutes, duration.as_secs() % 60)
    }
}
