//! Per-namespace output channels.
//!
//! Commands launched inside a namespace are fire-and-forget, so their
//! output (and any failure) is only observable here. Each namespace gets
//! its own channel, created lazily on first use and released on teardown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Line-oriented sink for one namespace's streamed command output.
///
/// Lines are buffered in arrival order and mirrored to the tracing log at
/// debug level. Reader threads push concurrently; [`lines`](Self::lines)
/// returns a snapshot.
#[derive(Debug)]
pub struct LogChannel {
    name: String,
    lines: Mutex<Vec<String>>,
}

impl LogChannel {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Namespace name this channel belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends one line to the channel.
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(channel = %self.name, "{line}");
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(line);
    }

    /// Snapshot of everything streamed so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Registry of live channels keyed by namespace name.
#[derive(Debug, Default)]
pub struct LogRegistry {
    channels: Mutex<HashMap<String, Arc<LogChannel>>>,
}

impl LogRegistry {
    /// Returns the channel for `name`, creating it on first use.
    pub fn channel(&self, name: &str) -> Arc<LogChannel> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            channels
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(LogChannel::new(name))),
        )
    }

    /// Drops the registry's handle on `name`'s channel.
    ///
    /// Streaming commands still holding their own handle keep writing to it;
    /// the channel itself goes away with the last handle.
    pub fn release(&self, name: &str) -> Option<Arc<LogChannel>> {
        self.channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_snapshot() {
        let channel = LogChannel::new("vpnns-test");
        channel.push("first");
        channel.push("second");
        assert_eq!(channel.lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_registry_creates_lazily_and_reuses() {
        let registry = LogRegistry::default();
        let a = registry.channel("vpnns-a");
        let again = registry.channel("vpnns-a");
        assert!(Arc::ptr_eq(&a, &again));

        a.push("hello");
        assert_eq!(again.lines(), vec!["hello"]);
    }

    #[test]
    fn test_registry_release_detaches_but_keeps_live_handles() {
        let registry = LogRegistry::default();
        let channel = registry.channel("vpnns-b");

        let released = registry.release("vpnns-b");
        assert!(released.is_some());
        assert!(registry.release("vpnns-b").is_none());

        // A fresh lookup after release is a new channel.
        let fresh = registry.channel("vpnns-b");
        assert!(!Arc::ptr_eq(&channel, &fresh));
    }
}
