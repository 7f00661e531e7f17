//! Presence poller: `Stopped` / `Polling`
//!
//! A single loop task per start. Each cycle finishes all its side effects
//! before the next delay is armed. A stop cancels the next cycle, and a
//! cycle still in flight at that point drops its snapshot.

use std::sync::Arc;
use std::time::Duration;

use super::Engine;
use crate::models::PlaybackSnapshot;
use crate::presence::{widget_visible, PresenceEvent};

impl Engine {
    /// `Stopped -> Polling`. The first cycle runs immediately.
    pub fn start_polling(&self) {
        let Some(engine) = self.this.upgrade() else {
            return;
        };
        let epoch = {
            let mut policy = self.policy();
            if policy.active {
                return;
            }
            policy.active = true;
            policy.backoff_level = 0;
            policy.epoch += 1;
            policy.epoch
        };

        tracing::info!("Polling started");
        tokio::spawn(engine.poll_loop(epoch));
    }

    /// `Polling -> Stopped`. An in-flight cycle is allowed to finish.
    pub fn stop_polling(&self) {
        {
            let mut policy = self.policy();
            if !policy.active {
                return;
            }
            policy.active = false;
            policy.epoch += 1;
        }
        self.wake.notify_waiters();
        tracing::info!("Polling stopped");
    }

    pub fn is_polling(&self) -> bool {
        self.policy().active
    }

    pub fn backoff_level(&self) -> u32 {
        self.policy().backoff_level
    }

    fn is_current(&self, epoch: u64) -> bool {
        let policy = self.policy();
        policy.active && policy.epoch == epoch
    }

    async fn poll_loop(self: Arc<Self>, epoch: u64) {
        while self.is_current(epoch) {
            let delay = self.run_cycle(Some(epoch)).await;
            if !self.is_current(epoch) {
                break;
            }

            tracing::debug!("Next poll in {}ms", delay.as_millis());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.wake.notified() => {}
            }
        }
        tracing::debug!("Poll loop {} exited", epoch);
    }

    /// One full cycle outside any loop. Returns the delay before the next one.
    pub(crate) async fn poll_once(&self) -> Duration {
        self.run_cycle(None).await
    }

    /// A loop cycle whose epoch ended while it was awaiting keeps its
    /// backoff bookkeeping but leaves the surfaces alone.
    async fn run_cycle(&self, epoch: Option<u64>) -> Duration {
        let superseded = || epoch.is_some_and(|epoch| !self.is_current(epoch));

        let Some(access_token) = self.tokens.valid_access_token().await else {
            if superseded() {
                return self.timings.idle;
            }
            self.coordinator.hide_widget();
            self.sink.emit(PresenceEvent::NowPlaying(None));
            return self.timings.idle;
        };

        match self.api.now_playing(&access_token).await {
            Ok(snapshot) => {
                self.policy().on_success();
                if superseded() {
                    tracing::debug!("Dropping snapshot of a stopped poll loop");
                    return self.timings.idle;
                }
                self.apply_snapshot(snapshot)
            }
            Err(e) => {
                let delay = self.policy().on_failure(&self.timings);
                tracing::warn!(
                    "Now playing poll failed: {} (backoff {}ms)",
                    e,
                    delay.as_millis()
                );
                if superseded() {
                    return delay;
                }
                self.coordinator.hide_widget();
                self.sink.emit(PresenceEvent::NowPlaying(None));
                self.fullscreen.stop();
                delay
            }
        }
    }

    fn apply_snapshot(&self, snapshot: Option<PlaybackSnapshot>) -> Duration {
        self.set_last_snapshot(snapshot.clone());
        self.lyrics.set_now_playing(snapshot.clone());

        if self.coordinator.lyrics_surface_active() {
            self.spawn_lyrics_update(snapshot.clone());
        }
        self.lyrics.publish();

        let visible = widget_visible(snapshot.as_ref());
        self.sink.emit(PresenceEvent::NowPlaying(snapshot));

        if visible {
            self.coordinator.show_widget();
            self.sink
                .emit(PresenceEvent::Preferences(self.coordinator.preferences()));
            self.fullscreen.start();
            if self.coordinator.show_lyrics_if_enabled() {
                self.lyrics.publish();
            }
            self.timings.playing
        } else {
            self.coordinator.hide_all();
            self.fullscreen.stop();
            self.timings.idle
        }
    }
}
