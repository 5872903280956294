use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Render an ISO-8601 timestamp relative to now, for activity rows.
pub fn format_relative_time(iso_time: &str) -> String {
    match parse_timestamp(iso_time) {
        Some(parsed) => {
            let now = Utc::now();
            let duration = now.signed_duration_since(parsed.with_timezone(&Utc));
            if duration.num_seconds() < 60 {
                "just now".to_string()
            } else if duration.num_minutes() < 60 {
                format!("{} min ago", duration.num_minutes())
            } else if duration.num_hours() < 24 {
                format!("{} h ago", duration.num_hours())
            } else {
                format!("{} d ago", duration.num_days())
            }
        }
        None => iso_time.to_string(),
    }
}

/// Whether a detection timestamp falls on the current local date.
pub fn is_today_local(iso_time: &str) -> bool {
    match parse_timestamp(iso_time) {
        Some(parsed) => parsed.with_timezone(&Local).date_naive() == Local::now().date_naive(),
        None => false,
    }
}

/// Uptime label for the status header: "Nh Mm", or "Mm" under an hour.
pub fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// The backend emits both offset-carrying RFC-3339 timestamps and naive
/// local `datetime.isoformat()` strings; accept either.
fn parse_timestamp(iso_time: &str) -> Option<DateTime<Local>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(iso_time) {
        return Some(parsed.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(iso_time, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).single())
}
