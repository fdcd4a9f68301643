use serde::Serialize;
use tokio::sync::mpsc;

pub const EVENT_CELEBRATE: &str = "celebrate";
pub const EVENT_TOAST: &str = "toast";
pub const EVENT_MESSAGES_CHANGED: &str = "messages-changed";
pub const EVENT_BALANCE_CHANGED: &str = "balance-changed";

/// Side effects the client asks the presentation layer to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LiveEvent {
    /// Play the confetti effect.
    Celebrate,
    /// Show a transient notification.
    Toast { title: String, description: String },
    /// The chat message list changed; scroll to the newest entry.
    MessagesChanged { count: usize },
    /// The locally displayed point balance changed.
    BalanceChanged { balance: i64 },
}

impl LiveEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Celebrate => EVENT_CELEBRATE,
            LiveEvent::Toast { .. } => EVENT_TOAST,
            LiveEvent::MessagesChanged { .. } => EVENT_MESSAGES_CHANGED,
            LiveEvent::BalanceChanged { .. } => EVENT_BALANCE_CHANGED,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LiveEvent);
}

impl EventSink for mpsc::UnboundedSender<LiveEvent> {
    fn emit(&self, event: LiveEvent) {
        let name = event.name();
        if let Err(e) = self.send(event) {
            tracing::error!(event = name, error = %e, "Failed to emit event");
        }
    }
}

/// Sink that only logs. Used when nothing renders the events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: LiveEvent) {
        tracing::info!(event = event.name(), payload = ?event, "Live event");
    }
}
