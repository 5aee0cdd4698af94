//! Progress events.
//!
//! The orchestrator is the only producer. Events arrive in the order things
//! happened; `RunFinished` is always last.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::model::{ContentKind, ItemOutcome, SyncReport};

use super::state::SyncPhase;

/// One progress notification.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    PhaseChanged(SyncPhase),
    /// An item finished, successfully or not. Carries the slug and outcome.
    ItemCompleted(ItemOutcome),
    ItemSkipped {
        kind: ContentKind,
        reason: String,
    },
    Warning(String),
    RunFinished(Box<SyncReport>),
}

/// Sending half of the event stream. Events are dropped silently when
/// nobody listens.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<SyncEvent>>,
}

impl EventSink {
    /// A sink that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver only means the caller stopped listening.
            let _ = tx.send(event);
        }
    }
}

/// Create a connected sink and receiver.
#[must_use]
pub fn event_channel() -> (EventSink, UnboundedReceiver<SyncEvent>) {
    let (tx, rx) = unbounded_channel();
    (EventSink { tx: Some(tx) }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (sink, mut rx) = event_channel();
        sink.emit(SyncEvent::PhaseChanged(SyncPhase::BackingUp));
        sink.emit(SyncEvent::Warning("careful".into()));

        assert!(matches!(
            rx.try_recv().unwrap(),
            SyncEvent::PhaseChanged(SyncPhase::BackingUp)
        ));
        assert!(matches!(rx.try_recv().unwrap(), SyncEvent::Warning(w) if w == "careful"));
    }

    #[test]
    fn test_dropped_receiver_is_harmless() {
        let (sink, rx) = event_channel();
        drop(rx);
        sink.emit(SyncEvent::Warning("nobody listens".into()));
        EventSink::disabled().emit(SyncEvent::Warning("nor here".into()));
    }
}
