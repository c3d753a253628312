use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// How a countdown finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Expired,
    Cancelled,
}

/// One-second countdown for a single attempt. Clones share the same countdown.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    remaining_secs: Arc<AtomicU64>,
    cancel: Arc<watch::Sender<bool>>,
}

impl SessionTimer {
    /// Countdown of `duration`, rounded down to whole seconds with a one second floor.
    pub fn new(duration: Duration) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            remaining_secs: Arc::new(AtomicU64::new(duration.as_secs().max(1))),
            cancel: Arc::new(cancel),
        }
    }

    pub fn remaining(&self) -> Duration {
        Duration::from_secs(self.remaining_secs.load(Ordering::Acquire))
    }

    /// Stop decrementing. Idempotent; has no effect once the countdown has expired.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Spawn the countdown. `on_expire` runs at most once, when the count reaches zero without a
    /// prior cancel.
    pub fn start<F, Fut>(&self, on_expire: F) -> JoinHandle<TimerOutcome>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let remaining = self.remaining_secs.clone();
        let mut cancelled = self.cancel.subscribe();

        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if *cancelled.borrow_and_update() {
                    return TimerOutcome::Cancelled;
                }

                tokio::select! {
                    biased;
                    changed = cancelled.changed() => {
                        if changed.is_err() || *cancelled.borrow() {
                            return TimerOutcome::Cancelled;
                        }
                    }
                    _ = ticks.tick() => {
                        let before = remaining.fetch_sub(1, Ordering::AcqRel);
                        if before <= 1 {
                            remaining.store(0, Ordering::Release);
                            on_expire().await;
                            return TimerOutcome::Expired;
                        }
                    }
                }
            }
        })
    }
}
