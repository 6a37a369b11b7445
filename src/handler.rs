use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use thiserror::Error;

use crate::alarm::model::{Payload, PendingAlarm, REQUEST_ID};
use crate::alarm::scheduler::{AlarmService, TimeDisplayMode, compose_fire_time, format_fire_time};

/// What the user typed and picked when they pressed the button.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduleForm {
    pub title: String,
    pub message: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleForm {
    /// Empty text fields with the pickers on the current minute.
    pub fn starting_at(now: DateTime<Local>) -> Self {
        Self {
            title: String::new(),
            message: String::new(),
            year: now.year(),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduledNotificationRequest {
    pub request_id: u32,
    pub title: String,
    pub message: String,
    pub fire_at: DateTime<Local>,
}

impl ScheduledNotificationRequest {
    pub fn to_pending_alarm(&self) -> PendingAlarm {
        PendingAlarm {
            request_id: self.request_id,
            fire_at: self.fire_at,
            payload: Payload {
                title: self.title.clone(),
                message: self.message.clone(),
            },
        }
    }

    pub fn confirmation(&self, mode: TimeDisplayMode) -> Dialog {
        Dialog::Confirmation {
            title: self.title.clone(),
            message: self.message.clone(),
            when: format_fire_time(&self.fire_at, mode),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum ValidationError {
    #[error("title and message are required")]
    MissingFields,
    #[error("the picked date and time do not exist on this calendar")]
    InvalidDate,
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("permission to schedule exact alarms has not been granted")]
    PermissionDenied,
    #[error("alarm service failed: {0:#}")]
    Alarm(#[from] anyhow::Error),
}

impl ScheduleError {
    /// The blocking dialog for failures the user can fix, if any.
    pub fn dialog(&self) -> Option<Dialog> {
        match self {
            ScheduleError::Validation(err) => Some(Dialog::Validation(*err)),
            ScheduleError::PermissionDenied => Some(Dialog::PermissionRequired),
            ScheduleError::Alarm(_) => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Dialog {
    Validation(ValidationError),
    PermissionRequired,
    Confirmation {
        title: String,
        message: String,
        when: String,
    },
}

impl Dialog {
    pub fn heading(&self) -> &'static str {
        match self {
            Dialog::Validation(_) => "Error!",
            Dialog::PermissionRequired => "Permission Required",
            Dialog::Confirmation { .. } => "Notification Scheduled",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Dialog::Validation(ValidationError::MissingFields) => {
                "Please fill in the required fields.".to_string()
            }
            Dialog::Validation(ValidationError::InvalidDate) => {
                "Please pick a date and time that exists.".to_string()
            }
            Dialog::PermissionRequired => {
                "Allow this app to set alarms and reminders, then press the button again."
                    .to_string()
            }
            Dialog::Confirmation {
                title,
                message,
                when,
            } => format!("Title: {title}\nMessage: {message}\nTime: {when}"),
        }
    }
}

/// Runs one press of the schedule button against the alarm service.
pub struct SchedulingHandler<A> {
    alarms: A,
}

impl<A: AlarmService> SchedulingHandler<A> {
    pub fn new(alarms: A) -> Self {
        Self { alarms }
    }

    #[cfg(test)]
    pub fn alarms(&self) -> &A {
        &self.alarms
    }

    #[cfg(test)]
    pub fn alarms_mut(&mut self) -> &mut A {
        &mut self.alarms
    }

    pub fn schedule(
        &mut self,
        form: &ScheduleForm,
    ) -> Result<ScheduledNotificationRequest, ScheduleError> {
        self.schedule_in(form, &Local)
    }

    /// Same as [`Self::schedule`] with the picked wall-clock time read in `timezone`.
    pub fn schedule_in<Tz>(
        &mut self,
        form: &ScheduleForm,
        timezone: &Tz,
    ) -> Result<ScheduledNotificationRequest, ScheduleError>
    where
        Tz: TimeZone,
        Tz::Offset: Copy,
    {
        if form.title.is_empty() || form.message.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }

        if self.alarms.requires_exact_alarm_permission() && !self.alarms.can_schedule_exact_alarms()
        {
            log::warn!("exact alarm permission missing; routing to settings");
            return Err(ScheduleError::PermissionDenied);
        }

        let fire_at = compose_fire_time(
            timezone,
            form.year,
            form.month,
            form.day,
            form.hour,
            form.minute,
        )
        .ok_or(ValidationError::InvalidDate)?
        .with_timezone(&Local);

        let request = ScheduledNotificationRequest {
            request_id: REQUEST_ID,
            title: form.title.clone(),
            message: form.message.clone(),
            fire_at,
        };
        self.alarms
            .set_exact_and_allow_while_idle(request.to_pending_alarm())?;
        log::info!(
            "scheduled '{}' for {}",
            request.title,
            request.fire_at.to_rfc3339()
        );
        Ok(request)
    }
}
