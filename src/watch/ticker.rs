use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::models::CountdownPhase;
use crate::utils::{Clock, ExpirySource, remaining_seconds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Counting { remaining_secs: i64 },
    Expired,
}

impl CountdownState {
    pub fn phase(&self) -> CountdownPhase {
        match self {
            CountdownState::Idle => CountdownPhase::Idle,
            CountdownState::Counting { .. } => CountdownPhase::Counting,
            CountdownState::Expired => CountdownPhase::Expired,
        }
    }

    pub fn remaining_secs(&self) -> i64 {
        match self {
            CountdownState::Counting { remaining_secs } => *remaining_secs,
            _ => 0,
        }
    }

    pub fn is_counting(&self) -> bool {
        matches!(self, CountdownState::Counting { .. })
    }
}

/// Per-view countdown to a rental's expiry.
///
/// Recomputes the remaining time from the clock on every tick instead of decrementing, so a
/// late tick never drifts. Publishes `Expired` once and then stops ticking.
pub struct Countdown {
    state: Arc<watch::Sender<CountdownState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(CountdownState::Idle);
        Self {
            state: Arc::new(tx),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> CountdownState {
        *self.state.borrow()
    }

    /// Restart the countdown against `source`. Any previous ticking task is aborted first.
    pub fn start(&self, source: ExpirySource, clock: Arc<dyn Clock>, tick: Duration) {
        self.stop();

        let remaining = remaining_seconds(&source, clock.now());
        if remaining <= 0 {
            self.state.send_replace(CountdownState::Expired);
            return;
        }
        self.state.send_replace(CountdownState::Counting {
            remaining_secs: remaining,
        });

        let state = self.state.clone();
        let tick = tick.max(Duration::from_millis(10));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // 第一次 tick 立即返回，初始值已经算过了
            interval.tick().await;

            loop {
                interval.tick().await;
                let remaining = remaining_seconds(&source, clock.now());
                if remaining <= 0 {
                    state.send_replace(CountdownState::Expired);
                    break;
                }
                state.send_replace(CountdownState::Counting {
                    remaining_secs: remaining,
                });
            }
        });

        if let Ok(mut guard) = self.task.lock() {
            *guard = Some(handle);
        }
    }

    /// Abort the ticking task. The last published state is kept.
    pub fn stop(&self) {
        let handle = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    pub fn is_ticking(&self) -> bool {
        match self.task.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|h| !h.is_finished()),
            Err(_) => false,
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}
