mod collectors;
mod config;
mod console;
mod logfile;
mod mailer;
mod rate;
mod state;

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use config::Config;
use logfile::RotatingLog;
use mailer::Mailer;
use rate::NetCounters;
use state::{AlertEvent, AlertEventKind, Metric, ThresholdEvaluator};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sysinfo::{System, SystemExt};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sysmond")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "/etc/sysmond.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    /// Send one synthetic alert through the configured transport and exit.
    #[arg(long)]
    test_email: bool,
    #[arg(long, conflicts_with = "email_off")]
    email_on: bool,
    #[arg(long, conflicts_with = "email_on")]
    email_off: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let mut cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };
    if cli.email_on || cli.test_email {
        cfg.email.enabled = true;
    } else if cli.email_off {
        cfg.email.enabled = false;
    }

    let email_password = if cfg.email.enabled {
        match ensure_email_settings(&cfg) {
            Ok(password) => Some(password),
            Err(err) => {
                error!(error = %err, "email configuration incomplete");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let mut system = System::new_all();
    let hostname = cfg
        .general
        .hostname
        .clone()
        .or_else(|| system.host_name())
        .unwrap_or_else(|| "unknown".to_string());
    let interval = Duration::from_secs(cfg.general.interval_secs);

    let mailer = match email_password {
        Some(password) => {
            match Mailer::from_config(&cfg.email, password, &hostname, interval) {
                Ok(mailer) => Some(mailer),
                Err(err) => {
                    error!(error = %err, "failed to initialise mail transport");
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    if cli.test_email {
        match &mailer {
            Some(mailer) => {
                println!("Sending test alert to {}...", cfg.email.receiver);
                if let Err(err) = mailer.send_test(&cfg.thresholds).await {
                    error!(error = %err, "test alert failed");
                    std::process::exit(1);
                }
                println!("Test alert sent");
                return;
            }
            None => {
                error!("email settings are required for --test-email");
                std::process::exit(1);
            }
        }
    }

    let status_log = match RotatingLog::open(
        &cfg.logging.log_file,
        cfg.logging.max_size_mb * 1024 * 1024,
        cfg.logging.backup_count,
    ) {
        Ok(log) => log,
        Err(err) => {
            error!(error = %err, "failed to open status log");
            std::process::exit(1);
        }
    };

    println!(
        "{}",
        format!("Starting system monitor on {hostname}...").cyan()
    );
    info!(
        host = %hostname,
        interval = %humantime::format_duration(interval),
        "monitoring started"
    );
    info!(
        cpu = cfg.thresholds.cpu_percent,
        memory = cfg.thresholds.memory_percent,
        disk = cfg.thresholds.disk_percent,
        net_sent = cfg.thresholds.net_sent_mb_s,
        net_recv = cfg.thresholds.net_recv_mb_s,
        "thresholds"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sampler_task = {
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut evaluator = ThresholdEvaluator::new();
            let mut previous_net: Option<NetCounters> = None;
            let mut status_log = status_log;

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        info!("shutdown signal received, stopping sampler");
                        break;
                    }
                    _ = ticker.tick() => {
                        run_cycle(
                            &cfg,
                            &hostname,
                            &mut system,
                            &mut evaluator,
                            &mut previous_net,
                            &mut status_log,
                            mailer.as_ref(),
                        )
                        .await;
                    }
                }
            }
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c");
    }
    info!("ctrl-c received, shutting down");

    let _ = shutdown_tx.send(true);
    let _ = sampler_task.await;
}

async fn run_cycle(
    cfg: &Config,
    hostname: &str,
    system: &mut System,
    evaluator: &mut ThresholdEvaluator,
    previous_net: &mut Option<NetCounters>,
    status_log: &mut RotatingLog,
    mailer: Option<&Mailer>,
) {
    let snapshot = match collectors::system::sample(system, &cfg.general.disk_path).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(error = %err, "sampling failed, skipping cycle");
            return;
        }
    };

    let now = unix_seconds();
    let current_net = NetCounters {
        bytes_sent: snapshot.net_bytes_sent,
        bytes_recv: snapshot.net_bytes_recv,
        taken_at_unix: now,
    };
    let rates = previous_net.map(|previous| rate::rates_between(previous, current_net));
    *previous_net = Some(current_net);

    let readings = state::cycle_readings(&snapshot, rates, &cfg.thresholds);
    let events = evaluator.evaluate(
        &readings,
        now,
        cfg.email.renotify_cooldown_secs as f64,
    );

    let rates = rates.unwrap_or_default();
    println!("{}", console::status_line(&snapshot, rates, &cfg.thresholds));

    let breached: Vec<Metric> = readings
        .iter()
        .filter(|r| r.is_breached())
        .map(|r| r.metric)
        .collect();
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let record = logfile::status_record(&timestamp, hostname, &snapshot, rates, &breached);
    if let Err(err) = status_log.append(&record) {
        warn!(error = %err, "failed to append status record");
    }

    for event in &events {
        match event.kind {
            AlertEventKind::Recovered => info!("{}", event.describe()),
            AlertEventKind::Breach | AlertEventKind::Repeat => {
                warn!("ALERT: {}", event.describe())
            }
        }
    }

    let mail_events: Vec<AlertEvent> = events.iter().filter(|e| e.wants_mail()).cloned().collect();
    if mail_events.is_empty() {
        return;
    }
    let Some(mailer) = mailer else {
        return;
    };
    match mailer
        .send_alerts(&mail_events, &snapshot, rates, &cfg.thresholds)
        .await
    {
        Ok(()) => info!(alerts = mail_events.len(), "alert email sent"),
        Err(err) => error!(error = %err, "failed to send alert email, monitoring continues"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn resolve_password_from_env(env_name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(env_name) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    None
}

fn ensure_email_settings(cfg: &Config) -> Result<String, String> {
    let email = &cfg.email;
    for (field, value) in [
        ("email.sender", &email.sender),
        ("email.receiver", &email.receiver),
        ("email.smtp_server", &email.smtp_server),
        ("email.username", &email.username),
    ] {
        if value.trim().is_empty() {
            return Err(format!("{field} is required when email is enabled"));
        }
    }

    resolve_password_from_env(&email.password_env).ok_or_else(|| {
        format!(
            "smtp password not found: set '{}' in the environment",
            email.password_env
        )
    })
}
