use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::theme_sync::change_event::ChangeEvent;

/// Inbound change events.
/// `next` is polled inside `select!`, so implementations must be cancel safe:
/// dropping an unfinished `next` future must not lose an event.
#[async_trait]
pub trait EventSource: Send {
    /// `None` once the source is closed for good
    async fn next(&mut self) -> Option<ChangeEvent>;
}

#[async_trait]
impl EventSource for mpsc::Receiver<ChangeEvent> {
    async fn next(&mut self) -> Option<ChangeEvent> {
        self.recv().await
    }
}

#[async_trait]
impl EventSource for mpsc::UnboundedReceiver<ChangeEvent> {
    async fn next(&mut self) -> Option<ChangeEvent> {
        self.recv().await
    }
}
