use super::events::{SessionEvent, SessionEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One-shot inactivity timer for a single capture session.
///
/// `arm()` schedules a single silence fire after the configured timeout;
/// `reset()` replaces any pending fire and reschedules from now; `cancel()`
/// disables the timer until re-armed. The post-stop grace guard reuses the
/// same mechanism via `arm_grace()`.
///
/// Fires are never direct callbacks into controller state. Each arming spawns
/// a task that sleeps and then sends a generation-tagged event into the
/// controller queue. The arming id increases monotonically, so a fire from a
/// replaced arming is detectable with [`SilenceTimer::is_current`] even after
/// the event was already queued.
pub struct SilenceTimer {
    timeout: Duration,
    generation: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
    arming: u64,
    handle: Option<JoinHandle<()>>,
}

#[derive(Clone, Copy)]
enum Deadline {
    Silence,
    Grace,
}

impl SilenceTimer {
    pub fn new(
        timeout: Duration,
        generation: u64,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            timeout,
            generation,
            events,
            arming: 0,
            handle: None,
        }
    }

    /// Schedule a single silence fire after the configured timeout.
    ///
    /// Replaces any pending fire; deadlines are never stacked.
    pub fn arm(&mut self) {
        self.schedule(self.timeout, Deadline::Silence);
    }

    /// Cancel any pending fire and reschedule from now.
    pub fn reset(&mut self) {
        self.arm();
    }

    /// Schedule a single grace fire after `grace`, replacing any pending fire.
    pub fn arm_grace(&mut self, grace: Duration) {
        self.schedule(grace, Deadline::Grace);
    }

    /// Disable the timer until re-armed.
    pub fn cancel(&mut self) {
        self.arming = self.arming.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a fire carrying `arming` belongs to the live arming.
    pub fn is_current(&self, arming: u64) -> bool {
        self.arming == arming && self.handle.is_some()
    }

    fn schedule(&mut self, after: Duration, deadline: Deadline) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.arming = self.arming.wrapping_add(1);

        let arming = self.arming;
        let generation = self.generation;
        let events = self.events.clone();

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;

            let kind = match deadline {
                Deadline::Silence => SessionEventKind::SilenceElapsed { arming },
                Deadline::Grace => SessionEventKind::GraceElapsed { arming },
            };

            if events.send(SessionEvent { generation, kind }).is_err() {
                debug!(generation, arming, "timer fired after controller shutdown");
            }
        }));
    }
}

impl Drop for SilenceTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
