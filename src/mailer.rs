use crate::collectors::ResourceSnapshot;
use crate::config::{EmailConfig, ThresholdsConfig};
use crate::rate::NetRates;
use crate::state::{cycle_readings, AlertEvent, AlertEventKind, Metric, MetricReading};
use chrono::Local;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build alert message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("smtp send timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends one mail per cycle carrying every alert event of that cycle. A
/// failed or timed-out send is reported to the caller and otherwise
/// forgotten; the next breach-producing cycle tries again.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    receiver: Mailbox,
    subject: String,
    hostname: String,
    timeout: Duration,
    interval: Duration,
}

impl Mailer {
    pub fn from_config(
        cfg: &EmailConfig,
        password: String,
        hostname: &str,
        interval: Duration,
    ) -> Result<Self, DispatchError> {
        let timeout = Duration::from_secs(cfg.smtp_timeout_secs);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_server)?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(cfg.username.clone(), password))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            sender: cfg.sender.parse()?,
            receiver: cfg.receiver.parse()?,
            subject: cfg.subject.clone(),
            hostname: hostname.to_string(),
            timeout,
            interval,
        })
    }

    pub async fn send_alerts(
        &self,
        events: &[AlertEvent],
        snapshot: &ResourceSnapshot,
        rates: NetRates,
        thresholds: &ThresholdsConfig,
    ) -> Result<(), DispatchError> {
        let readings = cycle_readings(snapshot, Some(rates), thresholds);
        let message = self.build_message(events, &readings)?;

        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_elapsed) => Err(DispatchError::Timeout(self.timeout)),
        }
    }

    /// Sends one synthetic alert exercising the full rendering and
    /// transport path, for validating the email settings.
    pub async fn send_test(&self, thresholds: &ThresholdsConfig) -> Result<(), DispatchError> {
        let snapshot = ResourceSnapshot {
            cpu_percent: 95.0,
            memory_percent: 85.0,
            disk_percent: 92.5,
            net_bytes_sent: 0,
            net_bytes_recv: 0,
        };
        let rates = NetRates {
            sent_mb_s: 15.3,
            recv_mb_s: 8.7,
        };
        let events = vec![
            AlertEvent {
                metric: Metric::Cpu,
                kind: AlertEventKind::Breach,
                value: snapshot.cpu_percent,
                threshold: thresholds.cpu_percent,
            },
            AlertEvent {
                metric: Metric::Disk,
                kind: AlertEventKind::Breach,
                value: snapshot.disk_percent,
                threshold: thresholds.disk_percent,
            },
            AlertEvent {
                metric: Metric::NetSent,
                kind: AlertEventKind::Breach,
                value: rates.sent_mb_s,
                threshold: thresholds.net_sent_mb_s,
            },
        ];

        self.send_alerts(&events, &snapshot, rates, thresholds).await
    }

    fn build_message(
        &self,
        events: &[AlertEvent],
        readings: &[MetricReading],
    ) -> Result<Message, DispatchError> {
        let subject = format!("{} - {}", self.subject, self.hostname);
        let plain = self.render_plain(events, readings);
        let html = self.render_html(events, readings);

        Ok(Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(plain, html))?)
    }

    fn render_plain(&self, events: &[AlertEvent], readings: &[MetricReading]) -> String {
        let mut text = format!("System alert on {}\n\n", self.hostname);

        text.push_str("Active alerts:\n");
        for event in events {
            text.push_str(" - ");
            text.push_str(&event.describe());
            text.push('\n');
        }

        text.push_str("\nResource metrics:\n");
        for reading in readings {
            text.push_str(&format!(
                "{}: {} (threshold: {})\n",
                reading.metric.label(),
                reading.metric.format_value(reading.value),
                reading.metric.format_value(reading.threshold)
            ));
        }

        text.push_str(&format!(
            "\nGenerated at: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        text.push_str(&format!(
            "Next check in {}\n",
            humantime::format_duration(self.interval)
        ));
        text
    }

    fn render_html(&self, events: &[AlertEvent], readings: &[MetricReading]) -> String {
        let mut alerts = String::new();
        for event in events {
            alerts.push_str(&format!(
                "<li style=\"color: #d9534f;\">{}</li>",
                event.describe()
            ));
        }

        let mut rows = String::new();
        for reading in readings {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                reading.metric.label(),
                reading.metric.format_value(reading.value),
                reading.metric.format_value(reading.threshold),
                status_label(reading.value, reading.threshold)
            ));
        }

        format!(
            "<html><body style=\"font-family: Arial, sans-serif;\">\
             <h2>System Resource Alert</h2>\
             <p><strong>Host:</strong> {host}<br>\
             <strong>Time:</strong> {time}</p>\
             <h3>Active alerts:</h3><ul>{alerts}</ul>\
             <h3>Resource metrics:</h3>\
             <table border=\"1\" cellpadding=\"6\" style=\"border-collapse: collapse;\">\
             <tr><th>Metric</th><th>Value</th><th>Threshold</th><th>Status</th></tr>\
             {rows}\
             </table>\
             <p style=\"color: #6c757d;\">Next check in {next}</p>\
             </body></html>",
            host = self.hostname,
            time = Local::now().format("%Y-%m-%d %H:%M:%S"),
            alerts = alerts,
            rows = rows,
            next = humantime::format_duration(self.interval),
        )
    }
}

fn status_label(value: f64, threshold: f64) -> &'static str {
    if value > threshold {
        "CRITICAL"
    } else if value > threshold - 10.0 {
        "WARNING"
    } else {
        "Normal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mailer() -> Mailer {
        let cfg = EmailConfig {
            enabled: true,
            sender: "monitor@example.com".to_string(),
            receiver: "ops@example.com".to_string(),
            smtp_server: "smtp.example.com".to_string(),
            username: "monitor@example.com".to_string(),
            ..EmailConfig::default()
        };
        Mailer::from_config(&cfg, "secret".to_string(), "testhost", Duration::from_secs(5))
            .expect("mailer must build")
    }

    fn breach(metric: Metric, value: f64, threshold: f64) -> AlertEvent {
        AlertEvent {
            metric,
            kind: AlertEventKind::Breach,
            value,
            threshold,
        }
    }

    #[test]
    fn status_label_boundaries() {
        assert_eq!(status_label(90.1, 90.0), "CRITICAL");
        assert_eq!(status_label(90.0, 90.0), "WARNING");
        assert_eq!(status_label(80.1, 90.0), "WARNING");
        assert_eq!(status_label(80.0, 90.0), "Normal");
    }

    #[tokio::test]
    async fn plain_body_lists_alerts_and_metrics() {
        let mailer = test_mailer();
        let events = vec![breach(Metric::Cpu, 95.0, 85.0)];
        let readings = vec![
            MetricReading {
                metric: Metric::Cpu,
                value: 95.0,
                threshold: 85.0,
            },
            MetricReading {
                metric: Metric::NetSent,
                value: 0.5,
                threshold: 10.0,
            },
        ];

        let body = mailer.render_plain(&events, &readings);
        assert!(body.contains("System alert on testhost"));
        assert!(body.contains(" - High CPU usage: 95.0% (threshold 85.0%)"));
        assert!(body.contains("Network send rate: 0.50 MB/s (threshold: 10.00 MB/s)"));
        assert!(body.contains("Next check in 5s"));
    }

    #[tokio::test]
    async fn unreachable_transport_reports_dispatch_error() {
        let cfg = EmailConfig {
            enabled: true,
            sender: "monitor@example.com".to_string(),
            receiver: "ops@example.com".to_string(),
            smtp_server: "127.0.0.1".to_string(),
            smtp_port: 1,
            username: "monitor@example.com".to_string(),
            smtp_timeout_secs: 2,
            ..EmailConfig::default()
        };
        let mailer =
            Mailer::from_config(&cfg, "secret".to_string(), "testhost", Duration::from_secs(5))
                .expect("mailer must build");

        let result = mailer.send_test(&ThresholdsConfig::default()).await;
        assert!(result.is_err(), "a refused connection must surface as an error");
    }

    #[tokio::test]
    async fn alert_message_builds() {
        let mailer = test_mailer();
        let events = vec![breach(Metric::Memory, 92.0, 80.0)];
        let readings = vec![MetricReading {
            metric: Metric::Memory,
            value: 92.0,
            threshold: 80.0,
        }];

        let message = mailer
            .build_message(&events, &readings)
            .expect("message must build");
        let rendered = String::from_utf8(message.formatted()).expect("utf8 headers");
        assert!(rendered.contains("System Monitor Alert - testhost"));
    }
}
