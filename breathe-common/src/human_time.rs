//! Human-readable duration formatting
//!
//! Phase and exercise durations are carried as milliseconds internally.
//! These helpers render them for logs and the CLI in a compact form whose
//! shape depends on magnitude.

/// Format selection thresholds (milliseconds)
const SHORT_FORMAT_MAX_MS: u64 = 100_000; // < 100s → X.XXs
const MEDIUM_FORMAT_MAX_MS: u64 = 6_000_000; // < 100m → M:SS.Xs
                                             // >= 100m → H:MM:SS

/// Format a millisecond duration as human-readable text.
///
/// - Short format (`X.XXs`): below 100 seconds
/// - Medium format (`M:SS.Xs`): 100 seconds to 100 minutes
/// - Long format (`H:MM:SS`): 100 minutes and above
///
/// # Examples
///
/// ```
/// use breathe_common::human_time::format_duration_ms;
///
/// assert_eq!(format_duration_ms(4_000), "4.00s");
/// assert_eq!(format_duration_ms(1_250), "1.25s");
/// assert_eq!(format_duration_ms(330_000), "5:30.0s");
/// assert_eq!(format_duration_ms(7_200_000), "2:00:00");
/// ```
pub fn format_duration_ms(ms: u64) -> String {
    if ms < SHORT_FORMAT_MAX_MS {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else if ms < MEDIUM_FORMAT_MAX_MS {
        let minutes = ms / 60_000;
        let secs = (ms % 60_000) as f64 / 1000.0;
        format!("{}:{:04.1}s", minutes, secs)
    } else {
        let total_secs = ms / 1000;
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}
