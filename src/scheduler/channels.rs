use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{ChannelKind, DueNotification, User};

/// Contract a delivery channel must implement. Adapters own the transport
/// (SMTP, websocket rooms, ...); the scheduler only decides what goes out
/// and keeps failures isolated per channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn deliver(&self, user: &User, notification: &DueNotification) -> Result<()>;
}

/// In-process in-app delivery. The hosting layer drains the receiver toward
/// whatever realtime transport it runs.
pub struct InAppChannel {
    outbox: mpsc::Sender<DueNotification>,
}

impl InAppChannel {
    pub fn new(outbox: mpsc::Sender<DueNotification>) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl NotificationChannel for InAppChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::InApp
    }

    async fn deliver(&self, _user: &User, notification: &DueNotification) -> Result<()> {
        self.outbox
            .send(notification.clone())
            .await
            .map_err(|_| anyhow!("In-app outbox is closed"))
    }
}
