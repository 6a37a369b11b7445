mod alarm;
mod diagnostics;
mod dispatcher;
mod handler;
mod notification;
mod ui;

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, Local, NaiveDate, NaiveTime, Timelike};
use clap::{Parser, ValueEnum};

use crate::alarm::scheduler::{FileAlarmService, TimeDisplayMode};
use crate::alarm::watcher::{DEFAULT_POLL_MS, run_watch_loop};
use crate::dispatcher::NotificationDispatcher;
use crate::handler::{ScheduleError, ScheduleForm, SchedulingHandler};
use crate::notification::desktop::DesktopNotifier;
use crate::notification::{NotificationChannel, NotificationService};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliClock {
    #[value(name = "24h")]
    Hour24,
    #[value(name = "12h")]
    Hour12,
}

#[derive(Parser, Debug)]
#[command(
    name = "notifyyourself",
    version,
    about = "Schedule a desktop notification for a picked date and time"
)]
struct Cli {
    #[arg(long, default_value = "alarms.json")]
    alarms: PathBuf,

    /// Schedule from the command line instead of opening the window.
    #[arg(long, conflicts_with_all = ["watch", "diagnostics"])]
    schedule: bool,

    #[arg(long, requires = "schedule")]
    title: Option<String>,

    #[arg(long, requires = "schedule")]
    message: Option<String>,

    /// YYYY-MM-DD, defaults to today.
    #[arg(long, requires = "schedule")]
    date: Option<NaiveDate>,

    /// HH:MM, defaults to the current minute.
    #[arg(long, requires = "schedule", value_parser = parse_local_time)]
    time: Option<NaiveTime>,

    /// Deliver due notifications in the foreground without opening the window.
    #[arg(long, conflicts_with = "diagnostics")]
    watch: bool,

    #[arg(long, default_value_t = DEFAULT_POLL_MS)]
    poll_ms: u64,

    #[arg(long)]
    diagnostics: bool,

    #[arg(long, conflicts_with = "revoke_exact_alarms")]
    grant_exact_alarms: bool,

    #[arg(long)]
    revoke_exact_alarms: bool,

    #[arg(long, value_enum)]
    clock: Option<CliClock>,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    if cli.poll_ms == 0 {
        bail!("--poll-ms must be greater than zero");
    }
    let poll_interval = Duration::from_millis(cli.poll_ms);

    let mut service = FileAlarmService::open(&cli.alarms)
        .with_context(|| format!("failed to load {}", cli.alarms.display()))?;

    let settings_changed = apply_settings_flags(&cli, &mut service)?;

    if cli.diagnostics {
        return diagnostics::run_diagnostics(&mut service);
    }
    if cli.schedule {
        return run_schedule_command(&cli, service);
    }
    if cli.watch {
        return run_watch_command(service, poll_interval);
    }
    if settings_changed {
        return Ok(());
    }

    drop(service);
    ui::app::run_gui(cli.alarms, poll_interval)
}

fn apply_settings_flags(cli: &Cli, service: &mut FileAlarmService) -> Result<bool> {
    let mut changed = false;
    if cli.grant_exact_alarms || cli.revoke_exact_alarms {
        let granted = cli.grant_exact_alarms;
        service.set_exact_alarm_grant(granted)?;
        println!(
            "Exact alarm permission {}.",
            if granted { "granted" } else { "revoked" }
        );
        changed = true;
    }
    if let Some(clock) = cli.clock {
        service.set_use_24h(clock == CliClock::Hour24)?;
        println!(
            "Clock format set to {}.",
            match clock {
                CliClock::Hour24 => "24h",
                CliClock::Hour12 => "12h",
            }
        );
        changed = true;
    }
    Ok(changed)
}

fn run_schedule_command(cli: &Cli, service: FileAlarmService) -> Result<()> {
    let now = Local::now();
    let mut form = ScheduleForm::starting_at(now);
    form.title = cli.title.clone().unwrap_or_default();
    form.message = cli.message.clone().unwrap_or_default();
    if let Some(date) = cli.date {
        form.year = date.year();
        form.month = date.month();
        form.day = date.day();
    }
    if let Some(time) = cli.time {
        form.hour = time.hour();
        form.minute = time.minute();
    }

    let mode = TimeDisplayMode::from_settings(service.settings());
    let mut handler = SchedulingHandler::new(service);
    match handler.schedule(&form) {
        Ok(request) => {
            let dialog = request.confirmation(mode);
            println!("{}", dialog.heading());
            println!("{}", dialog.body());
            Ok(())
        }
        Err(ScheduleError::PermissionDenied) => bail!(
            "exact alarm permission is not granted; run again with --grant-exact-alarms, then retry"
        ),
        Err(err) => match err.dialog() {
            Some(dialog) => bail!("{} {}", dialog.heading(), dialog.body()),
            None => Err(err.into()),
        },
    }
}

fn run_watch_command(service: FileAlarmService, poll_interval: Duration) -> Result<()> {
    let mut notifier = DesktopNotifier::new();
    notifier.create_channel(NotificationChannel::reminders());
    let mut dispatcher = NotificationDispatcher::new(notifier);
    let service = Mutex::new(service);
    let stop = AtomicBool::new(false);

    log::info!("watching for due alarms every {} ms", poll_interval.as_millis());
    run_watch_loop(&service, &mut dispatcher, poll_interval, &stop);
    Ok(())
}

fn parse_local_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
        .map_err(|_| anyhow!("invalid time '{input}', expected HH:MM"))
}
