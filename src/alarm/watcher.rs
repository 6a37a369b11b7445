use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::alarm::scheduler::FileAlarmService;
use crate::dispatcher::NotificationDispatcher;
use crate::notification::NotificationService;

pub const DEFAULT_POLL_MS: u64 = 500;

/// Wakes the dispatcher when the pending alarm comes due. Runs on its own
/// thread; dropping the watcher stops and joins it.
pub struct AlarmWatcher {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl AlarmWatcher {
    pub fn start<N>(
        service: Arc<Mutex<FileAlarmService>>,
        dispatcher: NotificationDispatcher<N>,
        poll_interval: Duration,
    ) -> Self
    where
        N: NotificationService + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let join = thread::spawn(move || {
            let mut dispatcher = dispatcher;
            run_watch_loop(&service, &mut dispatcher, poll_interval, &stop_for_thread);
        });
        Self {
            stop,
            join: Some(join),
        }
    }
}

impl Drop for AlarmWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            join.thread().unpark();
            let _ = join.join();
        }
    }
}

/// Foreground variant for `--watch`: blocks until `stop` is set. Between polls
/// the thread parks, so unparking it after setting `stop` ends the loop at once.
pub fn run_watch_loop<N: NotificationService>(
    service: &Mutex<FileAlarmService>,
    dispatcher: &mut NotificationDispatcher<N>,
    poll_interval: Duration,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::Relaxed) {
        if let Err(err) = poll_once(service, dispatcher, Local::now()) {
            log::error!("alarm delivery failed: {err:#}");
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }
        thread::park_timeout(poll_interval);
    }
}

/// Delivers the pending alarm if it is due at `now`. A failed post is not
/// retried: the alarm has already left the store.
pub fn poll_once<N: NotificationService>(
    service: &Mutex<FileAlarmService>,
    dispatcher: &mut NotificationDispatcher<N>,
    now: DateTime<Local>,
) -> Result<bool> {
    let due = {
        let mut guard = service
            .lock()
            .map_err(|_| anyhow::anyhow!("failed to lock alarm service"))?;
        guard.take_due(now)?
    };
    let Some(alarm) = due else {
        return Ok(false);
    };

    log::info!(
        "alarm {} fired (scheduled for {})",
        alarm.request_id,
        alarm.fire_at.to_rfc3339()
    );
    dispatcher.on_receive(&alarm.payload)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use chrono::Duration as ChronoDuration;
    use tempfile::tempdir;

    use super::*;
    use crate::alarm::model::{Payload, PendingAlarm, REQUEST_ID};
    use crate::alarm::scheduler::AlarmService;
    use crate::notification::NotificationChannel;
    use crate::notification::testing::RecordingTray;

    fn pending(title: &str, fire_at: DateTime<Local>) -> PendingAlarm {
        PendingAlarm {
            request_id: REQUEST_ID,
            fire_at,
            payload: Payload {
                title: title.to_string(),
                message: "body".to_string(),
            },
        }
    }

    fn tray_with_channel() -> RecordingTray {
        let mut tray = RecordingTray::default();
        tray.create_channel(NotificationChannel::reminders());
        tray
    }

    #[test]
    fn poll_delivers_only_after_fire_time() {
        let dir = tempdir().expect("tempdir");
        let service = Mutex::new(
            FileAlarmService::open(dir.path().join("alarms.json")).expect("open"),
        );
        let now = Local::now();
        service
            .lock()
            .expect("lock")
            .set_exact_and_allow_while_idle(pending("Meeting", now + ChronoDuration::minutes(5)))
            .expect("register");

        let tray = tray_with_channel();
        let mut dispatcher = NotificationDispatcher::new(tray.clone());

        assert!(!poll_once(&service, &mut dispatcher, now).expect("early"));
        assert!(tray.shown().is_empty());

        let fire = now + ChronoDuration::minutes(5);
        assert!(poll_once(&service, &mut dispatcher, fire).expect("due"));
        assert!(!poll_once(&service, &mut dispatcher, fire).expect("again"));
        assert_eq!(tray.posts(), 1);
        assert_eq!(tray.shown()[0].title, "Meeting");
    }

    #[test]
    fn rescheduled_alarm_delivers_latest_payload_only() {
        let dir = tempdir().expect("tempdir");
        let service = Mutex::new(
            FileAlarmService::open(dir.path().join("alarms.json")).expect("open"),
        );
        let now = Local::now();
        {
            let mut guard = service.lock().expect("lock");
            guard
                .set_exact_and_allow_while_idle(pending("old", now + ChronoDuration::minutes(1)))
                .expect("old");
            guard
                .set_exact_and_allow_while_idle(pending("new", now + ChronoDuration::minutes(2)))
                .expect("new");
        }

        let tray = tray_with_channel();
        let mut dispatcher = NotificationDispatcher::new(tray.clone());
        let later = now + ChronoDuration::minutes(3);
        assert!(poll_once(&service, &mut dispatcher, later).expect("due"));
        assert!(!poll_once(&service, &mut dispatcher, later).expect("drained"));

        assert_eq!(tray.posts(), 1);
        assert_eq!(tray.shown()[0].title, "new");
    }

    #[test]
    fn failed_post_is_not_retried() {
        let dir = tempdir().expect("tempdir");
        let service = Mutex::new(
            FileAlarmService::open(dir.path().join("alarms.json")).expect("open"),
        );
        let now = Local::now();
        service
            .lock()
            .expect("lock")
            .set_exact_and_allow_while_idle(pending("lost", now))
            .expect("register");

        let tray = RecordingTray::default();
        let mut dispatcher = NotificationDispatcher::new(tray.clone());
        assert!(poll_once(&service, &mut dispatcher, now).is_err());
        assert!(!poll_once(&service, &mut dispatcher, now).expect("empty"));
        assert_eq!(tray.posts(), 0);
    }

    #[test]
    fn dropping_watcher_does_not_wait_out_the_poll_interval() {
        let dir = tempdir().expect("tempdir");
        let service = Arc::new(Mutex::new(
            FileAlarmService::open(dir.path().join("alarms.json")).expect("open"),
        ));
        let watcher = AlarmWatcher::start(
            service,
            NotificationDispatcher::new(tray_with_channel()),
            Duration::from_secs(3600),
        );
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        drop(watcher);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn background_watcher_delivers_due_alarm() {
        let dir = tempdir().expect("tempdir");
        let service = Arc::new(Mutex::new(
            FileAlarmService::open(dir.path().join("alarms.json")).expect("open"),
        ));
        service
            .lock()
            .expect("lock")
            .set_exact_and_allow_while_idle(pending("now", Local::now()))
            .expect("register");

        let tray = tray_with_channel();
        let watcher = AlarmWatcher::start(
            Arc::clone(&service),
            NotificationDispatcher::new(tray.clone()),
            Duration::from_millis(10),
        );

        let deadline = Instant::now() + Duration::from_secs(5);
        while tray.posts() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        drop(watcher);

        assert_eq!(tray.posts(), 1);
        assert_eq!(tray.shown()[0].title, "now");
    }
}
