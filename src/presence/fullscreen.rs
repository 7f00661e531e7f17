//! Fullscreen gate: hides the widget while another app covers the display

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::foreground::is_fullscreen;
use super::{Coordinator, ForegroundProbe, Surface};

/// Runs the foreground probe on its own timer while the widget is shown.
/// It only ever hides the widget.
pub struct FullscreenWatcher {
    probe: Arc<dyn ForegroundProbe>,
    coordinator: Arc<Coordinator>,
    interval: Duration,
    ratio: f64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FullscreenWatcher {
    pub fn new(
        probe: Arc<dyn ForegroundProbe>,
        coordinator: Arc<Coordinator>,
        interval: Duration,
        ratio: f64,
    ) -> Self {
        Self {
            probe,
            coordinator,
            interval,
            ratio,
            task: Mutex::new(None),
        }
    }

    /// No-op if already running, or if the interval is zero.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() || self.interval.is_zero() {
            return;
        }

        let probe = Arc::clone(&self.probe);
        let coordinator = Arc::clone(&self.coordinator);
        let period = self.interval;
        let ratio = self.ratio;

        *task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                check_once(probe.as_ref(), &coordinator, ratio).await;
            }
        }));
        tracing::debug!("Fullscreen watcher started");
    }

    pub fn stop(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
            tracing::debug!("Fullscreen watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Drop for FullscreenWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One tick. Returns true if the widget was hidden.
async fn check_once(probe: &dyn ForegroundProbe, coordinator: &Coordinator, ratio: f64) -> bool {
    let windows = coordinator.windows();
    if !windows.is_visible(Surface::Widget) || !coordinator.preferences().hide_on_fullscreen {
        return false;
    }

    let Some(foreground) = probe.probe().await else {
        return false;
    };

    let display = windows.display_nearest(foreground.bounds.center());
    if !is_fullscreen(&foreground, std::process::id(), &display, ratio) {
        return false;
    }

    tracing::info!("Fullscreen app in front (pid {}), hiding widget", foreground.pid);
    coordinator.hide_widget();
    true
}
