use crate::alarm::model::Payload;
use crate::notification::{CHANNEL_ID, DisplayedNotification, NotificationError, NotificationService};

/// Receives a fired alarm's payload and turns it into a tray notification.
pub struct NotificationDispatcher<N> {
    service: N,
}

impl<N: NotificationService> NotificationDispatcher<N> {
    pub fn new(service: N) -> Self {
        Self { service }
    }

    pub fn on_receive(&mut self, payload: &Payload) -> Result<(), NotificationError> {
        let notification = DisplayedNotification::new(CHANNEL_ID)
            .title(payload.title.as_str())
            .body(payload.message.as_str());
        self.service.notify(notification)?;
        log::info!("posted notification '{}'", payload.title);
        Ok(())
    }
}
