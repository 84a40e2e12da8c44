//! ============================================================================
//! Periodic Task - Cancellable fixed-interval scheduling on tokio
//! ============================================================================
//! First run happens one period after spawn. Ticks run one at a time inside
//! the task; a slow tick delays the next one instead of overlapping it.
//! ============================================================================

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Handle to a recurring background job. Dropping it cancels the job.
pub struct PeriodicTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Run `tick` every `period` until it returns `ControlFlow::Break` or the
    /// task is cancelled.
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let (cancel, mut cancelled) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    // Err means the handle was dropped
                    _ = cancelled.changed() => break,
                }
                let stop = *cancelled.borrow();
                if stop {
                    break;
                }
                if tick().await.is_break() {
                    debug!("Periodic task finished by its tick");
                    break;
                }
            }
        });

        Self { cancel, handle }
    }

    /// Stop scheduling further ticks. A tick already running completes.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}
