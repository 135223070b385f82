//! matchgrid-notify — in-process fan-out of scheduler state changes.
//!
//! The scheduler emits one `Notification` per observable state change on
//! one of three logical channels (`runs`, `connections`, `scrimmages`).
//! Observers (a web layer, a metrics exporter, a test harness) subscribe
//! per channel. Delivery is best-effort: events published with no
//! subscribers, or past a lagging subscriber's buffer, are dropped.
//! Ordering is guaranteed within a channel only.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Logical notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Runs,
    Connections,
    Scrimmages,
}

/// Command tag carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    InsertRow,
    DeleteRow,
    StartRun,
    FinishRun,
    MatchFinished,
    AddAssignment,
    RemoveAssignment,
    FinishScrimmage,
}

/// One state-change event: a command tag plus an ordered field list.
///
/// Fields are pre-rendered strings; consumers that need structure parse
/// them positionally per command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: Channel,
    pub command: Command,
    pub fields: Vec<String>,
}

/// Per-channel broadcast fan-out.
#[derive(Clone)]
pub struct NotificationBus {
    runs: broadcast::Sender<Notification>,
    connections: broadcast::Sender<Notification>,
    scrimmages: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create a bus whose per-channel buffers hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (runs, _) = broadcast::channel(capacity);
        let (connections, _) = broadcast::channel(capacity);
        let (scrimmages, _) = broadcast::channel(capacity);
        Self {
            runs,
            connections,
            scrimmages,
        }
    }

    /// Subscribe to one channel.
    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<Notification> {
        self.sender(channel).subscribe()
    }

    /// Publish an event. Never blocks and never fails; an event with no
    /// listeners simply disappears.
    pub fn publish(&self, channel: Channel, command: Command, fields: Vec<String>) {
        trace!(?channel, ?command, ?fields, "notification");
        let _ = self.sender(channel).send(Notification {
            channel,
            command,
            fields,
        });
    }

    fn sender(&self, channel: Channel) -> &broadcast::Sender<Notification> {
        match channel {
            Channel::Runs => &self.runs,
            Channel::Connections => &self.connections,
            Channel::Scrimmages => &self.scrimmages,
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_in_emission_order() {
        let bus = NotificationBus::new(16);
        let mut rx = bus.subscribe(Channel::Runs);

        bus.publish(Channel::Runs, Command::StartRun, vec!["1".into()]);
        bus.publish(Channel::Runs, Command::FinishRun, vec!["1".into()]);

        assert_eq!(rx.recv().await.unwrap().command, Command::StartRun);
        assert_eq!(rx.recv().await.unwrap().command, Command::FinishRun);
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let bus = NotificationBus::new(16);
        let mut runs = bus.subscribe(Channel::Runs);
        let mut conns = bus.subscribe(Channel::Connections);

        bus.publish(Channel::Connections, Command::InsertRow, vec!["w1".into()]);

        let event = conns.recv().await.unwrap();
        assert_eq!(event.channel, Channel::Connections);
        assert!(runs.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let bus = NotificationBus::new(16);
        // Must not panic or block.
        bus.publish(Channel::Scrimmages, Command::FinishScrimmage, vec![]);
    }
}
