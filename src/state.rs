use crate::collectors::ResourceSnapshot;
use crate::config::ThresholdsConfig;
use crate::rate::NetRates;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
    NetSent,
    NetRecv,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU usage",
            Metric::Memory => "Memory usage",
            Metric::Disk => "Disk usage",
            Metric::NetSent => "Network send rate",
            Metric::NetRecv => "Network receive rate",
        }
    }

    pub fn format_value(self, value: f64) -> String {
        match self {
            Metric::Cpu | Metric::Memory | Metric::Disk => format!("{value:.1}%"),
            Metric::NetSent | Metric::NetRecv => format!("{value:.2} MB/s"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricReading {
    pub metric: Metric,
    pub value: f64,
    pub threshold: f64,
}

impl MetricReading {
    pub fn is_breached(&self) -> bool {
        self.value > self.threshold
    }
}

/// Builds the readings evaluated in one cycle. The first cycle of the
/// process has no previous counters, so the net metrics carry no meaningful
/// rate and are left out of evaluation entirely.
pub fn cycle_readings(
    snapshot: &ResourceSnapshot,
    rates: Option<NetRates>,
    thresholds: &ThresholdsConfig,
) -> Vec<MetricReading> {
    let mut readings = vec![
        MetricReading {
            metric: Metric::Cpu,
            value: snapshot.cpu_percent,
            threshold: thresholds.cpu_percent,
        },
        MetricReading {
            metric: Metric::Memory,
            value: snapshot.memory_percent,
            threshold: thresholds.memory_percent,
        },
        MetricReading {
            metric: Metric::Disk,
            value: snapshot.disk_percent,
            threshold: thresholds.disk_percent,
        },
    ];
    if let Some(rates) = rates {
        readings.push(MetricReading {
            metric: Metric::NetSent,
            value: rates.sent_mb_s,
            threshold: thresholds.net_sent_mb_s,
        });
        readings.push(MetricReading {
            metric: Metric::NetRecv,
            value: rates.recv_mb_s,
            threshold: thresholds.net_recv_mb_s,
        });
    }
    readings
}

#[derive(Debug, Clone, Default)]
struct AlertTrackState {
    breached: bool,
    last_notified_at: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEventKind {
    Breach,
    Repeat,
    Recovered,
}

#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub metric: Metric,
    pub kind: AlertEventKind,
    pub value: f64,
    pub threshold: f64,
}

impl AlertEvent {
    pub fn wants_mail(&self) -> bool {
        matches!(self.kind, AlertEventKind::Breach | AlertEventKind::Repeat)
    }

    pub fn describe(&self) -> String {
        match self.kind {
            AlertEventKind::Breach | AlertEventKind::Repeat => format!(
                "High {}: {} (threshold {})",
                self.metric.label(),
                self.metric.format_value(self.value),
                self.metric.format_value(self.threshold)
            ),
            AlertEventKind::Recovered => format!(
                "{} back below threshold: {} (threshold {})",
                self.metric.label(),
                self.metric.format_value(self.value),
                self.metric.format_value(self.threshold)
            ),
        }
    }
}

/// Per-metric breach tracking across cycles. Breach and recovery follow the
/// threshold strictly; repeat notifications for a metric that stays breached
/// are suppressed until the re-notify cooldown elapses.
#[derive(Debug, Default)]
pub struct ThresholdEvaluator {
    tracking: HashMap<Metric, AlertTrackState>,
}

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        readings: &[MetricReading],
        now_unix: f64,
        renotify_cooldown_secs: f64,
    ) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for reading in readings {
            let entry = self.tracking.entry(reading.metric).or_default();

            if !reading.is_breached() {
                if entry.breached {
                    entry.breached = false;
                    events.push(AlertEvent {
                        metric: reading.metric,
                        kind: AlertEventKind::Recovered,
                        value: reading.value,
                        threshold: reading.threshold,
                    });
                }
                continue;
            }

            if !entry.breached {
                entry.breached = true;
                entry.last_notified_at = Some(now_unix);
                events.push(AlertEvent {
                    metric: reading.metric,
                    kind: AlertEventKind::Breach,
                    value: reading.value,
                    threshold: reading.threshold,
                });
                continue;
            }

            match entry.last_notified_at {
                Some(last) if now_unix - last < renotify_cooldown_secs => {}
                _ => {
                    entry.last_notified_at = Some(now_unix);
                    events.push(AlertEvent {
                        metric: reading.metric,
                        kind: AlertEventKind::Repeat,
                        value: reading.value,
                        threshold: reading.threshold,
                    });
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: f64 = 300.0;

    fn cpu_reading(value: f64) -> Vec<MetricReading> {
        vec![MetricReading {
            metric: Metric::Cpu,
            value,
            threshold: 85.0,
        }]
    }

    #[test]
    fn breach_then_suppress_then_recover() {
        let mut evaluator = ThresholdEvaluator::new();

        let events = evaluator.evaluate(&cpu_reading(80.0), 0.0, COOLDOWN);
        assert!(events.is_empty());

        let events = evaluator.evaluate(&cpu_reading(90.0), 5.0, COOLDOWN);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertEventKind::Breach);

        let events = evaluator.evaluate(&cpu_reading(90.0), 10.0, COOLDOWN);
        assert!(events.is_empty(), "repeat inside cooldown must be suppressed");

        let events = evaluator.evaluate(&cpu_reading(70.0), 15.0, COOLDOWN);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertEventKind::Recovered);
    }

    #[test]
    fn value_equal_to_threshold_does_not_breach() {
        let mut evaluator = ThresholdEvaluator::new();
        let events = evaluator.evaluate(&cpu_reading(85.0), 0.0, COOLDOWN);
        assert!(events.is_empty());
    }

    #[test]
    fn repeat_fires_after_cooldown() {
        let mut evaluator = ThresholdEvaluator::new();

        let events = evaluator.evaluate(&cpu_reading(90.0), 0.0, COOLDOWN);
        assert_eq!(events[0].kind, AlertEventKind::Breach);

        let events = evaluator.evaluate(&cpu_reading(90.0), 299.0, COOLDOWN);
        assert!(events.is_empty());

        let events = evaluator.evaluate(&cpu_reading(90.0), 300.0, COOLDOWN);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertEventKind::Repeat);

        let events = evaluator.evaluate(&cpu_reading(90.0), 301.0, COOLDOWN);
        assert!(events.is_empty(), "cooldown restarts after a repeat");
    }

    #[test]
    fn rebreach_after_recovery_alerts_immediately() {
        let mut evaluator = ThresholdEvaluator::new();

        evaluator.evaluate(&cpu_reading(90.0), 0.0, COOLDOWN);
        evaluator.evaluate(&cpu_reading(50.0), 5.0, COOLDOWN);

        let events = evaluator.evaluate(&cpu_reading(90.0), 10.0, COOLDOWN);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AlertEventKind::Breach);
    }

    #[test]
    fn metrics_are_tracked_independently() {
        let mut evaluator = ThresholdEvaluator::new();
        let readings = vec![
            MetricReading {
                metric: Metric::Cpu,
                value: 90.0,
                threshold: 85.0,
            },
            MetricReading {
                metric: Metric::Memory,
                value: 50.0,
                threshold: 80.0,
            },
            MetricReading {
                metric: Metric::NetRecv,
                value: 12.5,
                threshold: 10.0,
            },
        ];

        let events = evaluator.evaluate(&readings, 0.0, COOLDOWN);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == AlertEventKind::Breach));
        assert!(events.iter().any(|e| e.metric == Metric::Cpu));
        assert!(events.iter().any(|e| e.metric == Metric::NetRecv));
    }

    #[test]
    fn first_cycle_has_no_net_readings() {
        let snapshot = ResourceSnapshot {
            cpu_percent: 10.0,
            memory_percent: 20.0,
            disk_percent: 30.0,
            net_bytes_sent: 1_000_000,
            net_bytes_recv: 1_000_000,
        };
        let thresholds = ThresholdsConfig::default();

        let readings = cycle_readings(&snapshot, None, &thresholds);
        assert_eq!(readings.len(), 3);
        assert!(readings.iter().all(|r| r.metric != Metric::NetSent));

        let readings = cycle_readings(&snapshot, Some(NetRates::default()), &thresholds);
        assert_eq!(readings.len(), 5);
    }
}
