use chrono::Duration;

/// This is the standard way of printing an accumulated duration in tabtally.
pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

/// Milliseconds folded into fractional seconds, the unit snapshots report.
pub fn as_seconds(v: Duration) -> f64 {
    v.num_milliseconds() as f64 / 1000.
}
