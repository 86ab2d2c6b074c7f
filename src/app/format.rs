use chrono::{DateTime, Local, Utc};

use watchshelf::engine::{NextReason, WatchHistoryEntry, WatchState};

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

/// `h:mm:ss` or `m:ss`.
pub(crate) fn format_seconds(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

pub(crate) fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", (fraction.clamp(0.0, 1.0) * 100.0).floor())
}

pub(crate) fn build_progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub(crate) fn format_progress(entry: &WatchHistoryEntry) -> String {
    format!(
        "{} {} / {}",
        format_percent(entry.progress_fraction()),
        format_seconds(entry.position),
        format_seconds(entry.duration)
    )
}

/// Grid badge: "watched" once completed, a bar while in progress.
pub(crate) fn progress_badge(entry: Option<&WatchHistoryEntry>) -> String {
    match entry {
        Some(entry) if entry.state == WatchState::Completed => "watched".to_string(),
        Some(entry) if entry.state == WatchState::InProgress => {
            format!(
                "{} {}",
                build_progress_bar(entry.progress_fraction(), 10),
                format_percent(entry.progress_fraction())
            )
        }
        _ => String::new(),
    }
}

pub(crate) fn format_updated_at(updated_at_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(updated_at_ms)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M %:z")
                .to_string()
        })
        .unwrap_or_else(|| updated_at_ms.to_string())
}

pub(crate) fn next_reason_label(reason: NextReason) -> &'static str {
    match reason {
        NextReason::ResumeInProgress => "resume",
        NextReason::FirstUnwatched => "start",
    }
}
