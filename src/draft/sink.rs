//! Presentation event publishing.

use crate::draft::token::GenerationHandle;
use crate::draft::types::PresentationEvent;
use tokio::sync::mpsc;

/// Sends [`PresentationEvent`]s to the front end, if one is listening.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<PresentationEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<PresentationEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops everything.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Publish an event unconditionally.
    pub fn publish(&self, event: PresentationEvent) {
        if let Some(tx) = &self.tx {
            // a closed receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }

    /// Publish an event of a generation; dropped once the generation is stale.
    pub fn emit(&self, handle: &GenerationHandle, event: PresentationEvent) {
        if handle.is_current() {
            self.publish(event);
        }
    }

    /// Status line for the given generation.
    pub fn status(&self, handle: &GenerationHandle, message: impl Into<String>) {
        self.emit(
            handle,
            PresentationEvent::Status {
                token: handle.token(),
                message: message.into(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::token::GenerationCounter;

    #[test]
    fn test_stale_events_are_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        let counter = GenerationCounter::new();

        let old = counter.advance();
        sink.status(&old, "first");
        let new = counter.advance();
        sink.status(&old, "late");
        sink.status(&new, "second");

        let messages: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                PresentationEvent::Status { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
