//! Progress-event protocol.
//!
//! One unbounded channel per run carries [`WorkflowEvent`]s: any number of
//! progress messages, then exactly one terminal event. Stages never block on
//! a slow or absent consumer.

use std::fmt;

use tokio::sync::mpsc::UnboundedSender;

use crate::orchestrator::ReviewOutcome;

/// A human-readable progress message from the active stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub message: String,

    /// Continues the previous message rather than starting a new line
    pub delta: bool,
}

impl ProgressEvent {
    pub fn line(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            delta: false,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// An event on a run's stream.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    Progress(ProgressEvent),

    /// The run completed; always the last event of a successful run
    Stop(ReviewOutcome),

    /// The run failed; always the last event of a failed run
    Failed { message: String },
}

impl WorkflowEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowEvent::Progress(_))
    }
}

/// Sending half of a run's event stream, shared by the stages.
///
/// Progress is dropped unless verbose. Terminal events are always sent.
/// A dropped receiver is not an error: consuming events is optional.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<UnboundedSender<WorkflowEvent>>,
    verbose: bool,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<WorkflowEvent>, verbose: bool) -> Self {
        Self {
            tx: Some(tx),
            verbose,
        }
    }

    /// A sink that discards everything, for running stages standalone.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            verbose: false,
        }
    }

    pub fn progress(&self, message: impl Into<String>) {
        if self.verbose {
            self.send(WorkflowEvent::Progress(ProgressEvent::line(message)));
        }
    }

    pub(crate) fn finish(&self, event: WorkflowEvent) {
        debug_assert!(event.is_terminal());
        self.send(event);
    }

    fn send(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_quiet_sink_only_sends_terminal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx, false);
        sink.progress(">> Reading contract");
        sink.finish(WorkflowEvent::Failed {
            message: "boom".to_string(),
        });

        let event = rx.try_recv().unwrap();
        assert!(matches!(event, WorkflowEvent::Failed { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_verbose_sink_sends_progress_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx, true);
        sink.progress("one");
        sink.progress("two");

        let messages: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| match e {
                WorkflowEvent::Progress(p) => p.message,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(messages, vec!["one", "two"]);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        EventSink::new(tx, true).progress("nobody listening");
    }
}
