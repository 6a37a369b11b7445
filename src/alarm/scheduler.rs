use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::alarm::model::{
    AlarmStore, PendingAlarm, PlatformSettings, load_alarm_store, lock_alarm_store,
    save_alarm_store,
};

/// The host alarm manager. Holds at most one pending alarm per request id and
/// owns it until it is taken for delivery.
pub trait AlarmService {
    fn requires_exact_alarm_permission(&self) -> bool;

    fn can_schedule_exact_alarms(&self) -> bool;

    /// Registers a one-shot wake-up. An alarm already pending under the same
    /// request id is replaced.
    fn set_exact_and_allow_while_idle(&mut self, alarm: PendingAlarm) -> Result<()>;
}

/// Alarm manager backed by the JSON store on disk. Every operation re-reads the
/// file first so a GUI and a separate `--watch` process see the same slot, and
/// every read-modify-save runs under the store lock.
pub struct FileAlarmService {
    path: PathBuf,
    store: AlarmStore,
}

impl FileAlarmService {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = load_alarm_store(&path)?;
        Ok(Self { path, store })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &PlatformSettings {
        &self.store.settings
    }

    pub fn reload(&mut self) -> Result<()> {
        self.store = load_alarm_store(&self.path)?;
        Ok(())
    }

    pub fn pending(&mut self) -> Result<Option<PendingAlarm>> {
        self.reload()?;
        Ok(self.store.pending.clone())
    }

    /// Removes and returns the pending alarm once its fire time has passed.
    pub fn take_due(&mut self, now: DateTime<Local>) -> Result<Option<PendingAlarm>> {
        let _lock = lock_alarm_store(&self.path)?;
        self.reload()?;
        let due = self
            .store
            .pending
            .as_ref()
            .is_some_and(|pending| pending.fire_at <= now);
        if !due {
            return Ok(None);
        }
        let taken = self.store.pending.take();
        save_alarm_store(&self.path, &self.store)?;
        Ok(taken)
    }

    /// What the system "alarms & reminders" settings screen toggles.
    pub fn set_exact_alarm_grant(&mut self, granted: bool) -> Result<()> {
        let _lock = lock_alarm_store(&self.path)?;
        self.reload()?;
        self.store.settings.exact_alarm_granted = granted;
        save_alarm_store(&self.path, &self.store)
    }

    pub fn set_use_24h(&mut self, use_24h: bool) -> Result<()> {
        let _lock = lock_alarm_store(&self.path)?;
        self.reload()?;
        self.store.settings.use_24h = use_24h;
        save_alarm_store(&self.path, &self.store)
    }
}

impl AlarmService for FileAlarmService {
    fn requires_exact_alarm_permission(&self) -> bool {
        self.store.settings.exact_alarm_permission_required
    }

    fn can_schedule_exact_alarms(&self) -> bool {
        !self.store.settings.exact_alarm_permission_required
            || self.store.settings.exact_alarm_granted
    }

    fn set_exact_and_allow_while_idle(&mut self, alarm: PendingAlarm) -> Result<()> {
        let _lock = lock_alarm_store(&self.path)?;
        self.reload()?;
        if let Some(previous) = &self.store.pending
            && previous.request_id == alarm.request_id
        {
            log::debug!(
                "replacing pending alarm {} due at {}",
                previous.request_id,
                previous.fire_at.to_rfc3339()
            );
        }
        self.store.pending = Some(alarm);
        save_alarm_store(&self.path, &self.store)
    }
}

/// Shared handle used when the watcher thread and the form hold the same store.
impl AlarmService for Arc<Mutex<FileAlarmService>> {
    fn requires_exact_alarm_permission(&self) -> bool {
        self.lock()
            .map(|service| service.requires_exact_alarm_permission())
            .unwrap_or(true)
    }

    fn can_schedule_exact_alarms(&self) -> bool {
        self.lock()
            .map(|service| service.can_schedule_exact_alarms())
            .unwrap_or(false)
    }

    fn set_exact_and_allow_while_idle(&mut self, alarm: PendingAlarm) -> Result<()> {
        self.lock()
            .map_err(|_| anyhow!("failed to lock alarm service"))?
            .set_exact_and_allow_while_idle(alarm)
    }
}

fn resolve_local_datetime<Tz>(timezone: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(first, _second) => Some(first),
        LocalResult::None => None,
    }
}

/// Wall-clock date + hour/minute in `timezone`, seconds zeroed. `None` when the
/// fields do not name a real instant (bad calendar date, DST gap).
pub fn compose_fire_time<Tz>(
    timezone: &Tz,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    resolve_local_datetime(timezone, date.and_time(time))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimeDisplayMode {
    Hour24,
    Hour12,
}

impl TimeDisplayMode {
    pub fn from_settings(settings: &PlatformSettings) -> Self {
        if settings.use_24h {
            TimeDisplayMode::Hour24
        } else {
            TimeDisplayMode::Hour12
        }
    }
}

pub fn format_long_date<Tz>(dt: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    dt.format("%A, %B %-d, %Y").to_string()
}

pub fn format_clock_time<Tz>(dt: &DateTime<Tz>, mode: TimeDisplayMode) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match mode {
        TimeDisplayMode::Hour24 => dt.format("%H:%M").to_string(),
        TimeDisplayMode::Hour12 => dt.format("%-I:%M %p").to_string(),
    }
}

pub fn format_fire_time<Tz>(dt: &DateTime<Tz>, mode: TimeDisplayMode) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{} {}", format_long_date(dt), format_clock_time(dt, mode))
}
