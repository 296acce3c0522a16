//! Mutable state owned by the connectivity service
//!
//! Every state-changing operation advances `epoch`. Timer tasks capture the
//! epoch they were scheduled under and compare it before acting, so a stale
//! callback that was already running when it got aborted still does nothing.

use aqualink_core::ConnectionStatus;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub(crate) struct LinkState {
    pub status: ConnectionStatus,
    pub epoch: u64,
    pub started: bool,
    /// One-shot transition: startup, connect or reconnect delay
    pending: Option<JoinHandle<()>>,
    /// Periodic telemetry schedule
    stream: Option<JoinHandle<()>>,
    /// In-flight command acknowledgments
    acks: Vec<JoinHandle<()>>,
}

impl LinkState {
    /// Invalidate callbacks scheduled so far and cancel the pending transition
    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub fn set_pending(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.pending.replace(handle) {
            previous.abort();
        }
    }

    pub fn set_stream(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.stream.replace(handle) {
            previous.abort();
        }
    }

    pub fn track_ack(&mut self, handle: JoinHandle<()>) {
        self.acks.retain(|ack| !ack.is_finished());
        self.acks.push(handle);
    }

    /// Abort every task. Returns how many acknowledgments were still pending.
    pub fn cancel_all(&mut self) -> usize {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        if let Some(handle) = self.stream.take() {
            handle.abort();
        }
        let mut dropped = 0;
        for ack in self.acks.drain(..) {
            if !ack.is_finished() {
                dropped += 1;
            }
            ack.abort();
        }
        dropped
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.as_ref().is_some_and(|stream| !stream.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_advance_epoch_invalidates_previous() {
        let mut state = LinkState::default();
        let first = state.epoch;
        let second = state.advance_epoch();
        assert_ne!(first, second);
        assert!(state.is_current(second));
        assert!(!state.is_current(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_aborts_tasks() {
        let mut state = LinkState::default();
        state.set_pending(tokio::spawn(tokio::time::sleep(Duration::from_secs(60))));
        state.set_stream(tokio::spawn(tokio::time::sleep(Duration::from_secs(60))));
        state.track_ack(tokio::spawn(tokio::time::sleep(Duration::from_secs(60))));
        state.track_ack(tokio::spawn(tokio::time::sleep(Duration::from_secs(60))));
        assert!(state.is_streaming());

        assert_eq!(state.cancel_all(), 2);
        assert!(!state.is_streaming());
        assert_eq!(state.cancel_all(), 0);
    }
}
