use crate::collectors::ResourceSnapshot;
use crate::config::ThresholdsConfig;
use crate::rate::NetRates;
use chrono::Local;
use colored::{ColoredString, Colorize};

/// Red above the threshold, yellow within 10 points below it, green
/// otherwise.
pub fn colorize_metric(text: String, value: f64, threshold: f64) -> ColoredString {
    if value > threshold {
        text.red()
    } else if value > threshold - 10.0 {
        text.yellow()
    } else {
        text.green()
    }
}

pub fn status_line(
    snapshot: &ResourceSnapshot,
    rates: NetRates,
    thresholds: &ThresholdsConfig,
) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!(
        "[{timestamp}] CPU: {}% | Mem: {}% | Disk: {}% | Net: ↑{} MB/s ↓{} MB/s",
        colorize_metric(
            format!("{:.1}", snapshot.cpu_percent),
            snapshot.cpu_percent,
            thresholds.cpu_percent
        ),
        colorize_metric(
            format!("{:.1}", snapshot.memory_percent),
            snapshot.memory_percent,
            thresholds.memory_percent
        ),
        colorize_metric(
            format!("{:.1}", snapshot.disk_percent),
            snapshot.disk_percent,
            thresholds.disk_percent
        ),
        colorize_metric(
            format!("{:.2}", rates.sent_mb_s),
            rates.sent_mb_s,
            thresholds.net_sent_mb_s
        ),
        colorize_metric(
            format!("{:.2}", rates.recv_mb_s),
            rates.recv_mb_s,
            thresholds.net_recv_mb_s
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use colored::Color;

    #[test]
    fn color_tracks_distance_to_threshold() {
        assert_eq!(
            colorize_metric("90.0".to_string(), 90.0, 85.0).fgcolor(),
            Some(Color::Red)
        );
        assert_eq!(
            colorize_metric("80.0".to_string(), 80.0, 85.0).fgcolor(),
            Some(Color::Yellow)
        );
        assert_eq!(
            colorize_metric("50.0".to_string(), 50.0, 85.0).fgcolor(),
            Some(Color::Green)
        );
        // The threshold itself is not a breach.
        assert_eq!(
            colorize_metric("85.0".to_string(), 85.0, 85.0).fgcolor(),
            Some(Color::Yellow)
        );
    }
}
