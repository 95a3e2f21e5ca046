//! Progress reporting for long searches
//!
//! Three append-only text channels: what the search is doing, how far it
//! has got, and the best result so far. Purely advisory; nothing reported
//! here feeds back into the search.

use tracing::{debug, info};

pub trait ProgressSink {
    fn status(&mut self, _message: &str) {}
    fn progress(&mut self, _message: &str) {}
    fn best(&mut self, _message: &str) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Forwards every channel to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn status(&mut self, message: &str) {
        info!(channel = "status", "{}", message);
    }

    fn progress(&mut self, message: &str) {
        debug!(channel = "progress", "{}", message);
    }

    fn best(&mut self, message: &str) {
        info!(channel = "best", "{}", message);
    }
}

/// Keeps every message, for tests and for replaying a run to a UI
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub status: Vec<String>,
    pub progress: Vec<String>,
    pub best: Vec<String>,
}

impl ProgressSink for RecordingProgress {
    fn status(&mut self, message: &str) {
        self.status.push(message.to_string());
    }

    fn progress(&mut self, message: &str) {
        self.progress.push(message.to_string());
    }

    fn best(&mut self, message: &str) {
        self.best.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_keeps_channels_apart() {
        let mut sink = RecordingProgress::default();
        sink.status("starting");
        sink.progress("1 of 10");
        sink.progress("2 of 10");
        sink.best("$12.00");

        assert_eq!(sink.status, vec!["starting"]);
        assert_eq!(sink.progress.len(), 2);
        assert_eq!(sink.best, vec!["$12.00"]);
    }

    #[test]
    fn test_no_progress_is_usable_as_trait_object() {
        let mut sink = NoProgress;
        let dyn_sink: &mut dyn ProgressSink = &mut sink;
        dyn_sink.status("ignored");
        dyn_sink.best("ignored");
    }
}
