use std::sync::mpsc::Sender;

/// What a run tells whoever is watching it.
///
/// Events are emitted in a strict order:
/// 1. [`Log`](Self::Log) lines announcing the file count and the sort.
/// 2. Per file: [`Log`](Self::Log) lines for each stage, then exactly one
///    [`Progress`](Self::Progress), whether the file succeeded or not.
/// 3. The summary report as a single [`Log`](Self::Log).
/// 4. [`Done`](Self::Done), exactly once, always last.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Log(String),
    Progress { percent: f32, text: String },
    Done(String),
}

/// The producing end of the event channel.
///
/// The run never depends on anybody listening: once the receiver is gone,
/// events are silently dropped.
#[derive(Clone, Debug)]
pub struct EventSink {
    sender: Sender<Event>,
}
impl EventSink {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender }
    }

    pub fn log(&self, message: impl Into<String>) {
        self.send(Event::Log(message.into()));
    }

    /// Reports that `done` of `total` files have been handled.
    pub fn progress(&self, done: usize, total: usize) {
        let percent = if total == 0 { 100.0 } else { done as f32 / total as f32 * 100.0 };
        self.send(Event::Progress { percent, text: format!("{done}/{total} ({percent:.2}%)") });
    }

    pub fn done(&self, message: impl Into<String>) {
        self.send(Event::Done(message.into()));
    }

    fn send(&self, event: Event) {
        _ = self.sender.send(event);
    }
}
