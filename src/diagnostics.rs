use anyhow::Result;

use crate::alarm::scheduler::{AlarmService, FileAlarmService, TimeDisplayMode, format_fire_time};
use crate::notification::NotificationChannel;

pub fn run_diagnostics(service: &mut FileAlarmService) -> Result<()> {
    for line in diagnostics_report(service)? {
        println!("{line}");
    }
    Ok(())
}

pub fn diagnostics_report(service: &mut FileAlarmService) -> Result<Vec<String>> {
    let pending = service.pending()?;
    let settings = service.settings().clone();
    let mode = TimeDisplayMode::from_settings(&settings);
    let channel = NotificationChannel::reminders();

    let mut lines = vec![
        "Notify Yourself diagnostics".to_string(),
        format!("Alarm store: {}", service.path().display()),
        format!(
            "Exact alarm permission required: {}",
            settings.exact_alarm_permission_required
        ),
        format!(
            "Exact alarm permission granted: {}",
            settings.exact_alarm_granted
        ),
        format!(
            "Can schedule exact alarms: {}",
            service.can_schedule_exact_alarms()
        ),
        format!(
            "Notification channel: {} ({}, {:?} importance)",
            channel.id, channel.name, channel.importance
        ),
    ];
    match pending {
        Some(alarm) => {
            lines.push(format!(
                "Pending alarm {}: {}",
                alarm.request_id,
                format_fire_time(&alarm.fire_at, mode)
            ));
            lines.push(format!("  Title: {}", alarm.payload.title));
            lines.push(format!("  Message: {}", alarm.payload.message));
        }
        None => lines.push("Pending alarm: none".to_string()),
    }
    Ok(lines)
}
