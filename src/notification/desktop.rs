use std::collections::HashMap;

use notify_rust::Notification as NrNotification;

use crate::notification::{
    DisplayedNotification, NotificationChannel, NotificationError, NotificationService,
};

/// Posts through the desktop notification server. Channels only live in this
/// process; the server has no equivalent, so the channel name becomes the app
/// name shown on the bubble.
#[derive(Debug, Default)]
pub struct DesktopNotifier {
    channels: HashMap<String, NotificationChannel>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationService for DesktopNotifier {
    fn create_channel(&mut self, channel: NotificationChannel) {
        self.channels.entry(channel.id.clone()).or_insert(channel);
    }

    fn notify(&mut self, notification: DisplayedNotification) -> Result<(), NotificationError> {
        let channel = self
            .channels
            .get(&notification.channel_id)
            .ok_or_else(|| NotificationError::UnknownChannel(notification.channel_id.clone()))?;

        let mut native = NrNotification::new();
        native
            .summary(&notification.title)
            .body(&notification.body)
            .icon(&notification.icon)
            .appname(&channel.name);

        // Only the freedesktop server supports replacing by id.
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            native.id(notification.id);
            native.urgency(urgency_for(channel.importance));
        }

        native
            .show()
            .map(|_| ())
            .map_err(|err| NotificationError::Post(err.to_string()))
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn urgency_for(importance: crate::notification::Importance) -> notify_rust::Urgency {
    use crate::notification::Importance;

    match importance {
        Importance::Low => notify_rust::Urgency::Low,
        Importance::Default => notify_rust::Urgency::Normal,
        Importance::High => notify_rust::Urgency::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::CHANNEL_ID;

    #[test]
    fn posting_before_channel_creation_is_rejected() {
        let mut notifier = DesktopNotifier::new();
        let err = notifier
            .notify(DisplayedNotification::new(CHANNEL_ID).title("t").body("b"))
            .expect_err("channel missing");
        assert!(matches!(err, NotificationError::UnknownChannel(id) if id == CHANNEL_ID));
    }

    #[test]
    fn channel_creation_is_idempotent() {
        let mut notifier = DesktopNotifier::new();
        notifier.create_channel(NotificationChannel::reminders());
        notifier.create_channel(NotificationChannel::reminders());
        assert_eq!(notifier.channels.len(), 1);
    }
}
