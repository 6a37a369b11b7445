pub mod desktop;

use thiserror::Error;

pub const NOTIFICATION_ID: u32 = 1;
pub const CHANNEL_ID: &str = "notif_channel_id";
pub const CHANNEL_NAME: &str = "Notification Channel";
pub const CHANNEL_DESCRIPTION: &str = "A Description of the Channel";
pub const DEFAULT_ICON: &str = "appointment-soon";

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Importance {
    Low,
    Default,
    High,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
}

impl NotificationChannel {
    /// The one channel every reminder is posted to.
    pub fn reminders() -> Self {
        Self {
            id: CHANNEL_ID.to_string(),
            name: CHANNEL_NAME.to_string(),
            description: CHANNEL_DESCRIPTION.to_string(),
            importance: Importance::Default,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DisplayedNotification {
    pub id: u32,
    pub channel_id: String,
    pub icon: String,
    pub title: String,
    pub body: String,
}

impl DisplayedNotification {
    /// Starts a post under the fixed notification id and default icon.
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            id: NOTIFICATION_ID,
            channel_id: channel_id.into(),
            icon: DEFAULT_ICON.to_string(),
            title: String::new(),
            body: String::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification channel '{0}' has not been created")]
    UnknownChannel(String),
    #[error("notification server rejected the post: {0}")]
    Post(String),
}

/// The host notification tray.
pub trait NotificationService {
    /// Registers a channel. Creating an existing channel again is a no-op.
    fn create_channel(&mut self, channel: NotificationChannel);

    /// Shows `notification`, replacing whatever is displayed under the same id.
    fn notify(&mut self, notification: DisplayedNotification) -> Result<(), NotificationError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory tray: one visible notification per id, plus a log of posts.
    #[derive(Clone, Default)]
    pub struct RecordingTray {
        inner: Arc<Mutex<TrayState>>,
    }

    #[derive(Default)]
    struct TrayState {
        channels: Vec<NotificationChannel>,
        shown: BTreeMap<u32, DisplayedNotification>,
        posts: usize,
    }

    impl RecordingTray {
        pub fn shown(&self) -> Vec<DisplayedNotification> {
            let state = self.inner.lock().expect("tray lock");
            state.shown.values().cloned().collect()
        }

        pub fn posts(&self) -> usize {
            self.inner.lock().expect("tray lock").posts
        }

        pub fn channels(&self) -> Vec<NotificationChannel> {
            self.inner.lock().expect("tray lock").channels.clone()
        }
    }

    impl NotificationService for RecordingTray {
        fn create_channel(&mut self, channel: NotificationChannel) {
            let mut state = self.inner.lock().expect("tray lock");
            if !state.channels.iter().any(|existing| existing.id == channel.id) {
                state.channels.push(channel);
            }
        }

        fn notify(
            &mut self,
            notification: DisplayedNotification,
        ) -> Result<(), NotificationError> {
            let mut state = self.inner.lock().expect("tray lock");
            if !state
                .channels
                .iter()
                .any(|channel| channel.id == notification.channel_id)
            {
                return Err(NotificationError::UnknownChannel(notification.channel_id));
            }
            state.posts += 1;
            state.shown.insert(notification.id, notification);
            Ok(())
        }
    }

    #[test]
    fn creating_a_channel_twice_keeps_one() {
        let mut tray = RecordingTray::default();
        tray.create_channel(NotificationChannel::reminders());
        tray.create_channel(NotificationChannel::reminders());
        assert_eq!(tray.channels().len(), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_fixed_id_and_icon() {
        let notification = DisplayedNotification::new(CHANNEL_ID)
            .title("Meeting")
            .body("Standup");
        assert_eq!(notification.id, NOTIFICATION_ID);
        assert_eq!(notification.icon, DEFAULT_ICON);
        assert_eq!(notification.channel_id, CHANNEL_ID);
        assert_eq!(notification.title, "Meeting");
        assert_eq!(notification.body, "Standup");
    }

    #[test]
    fn reminder_channel_uses_default_importance() {
        let channel = NotificationChannel::reminders();
        assert_eq!(channel.id, CHANNEL_ID);
        assert_eq!(channel.importance, Importance::Default);
    }
}
