use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};

/// Delay an action until its inputs quiesce: every call cancels the pending
/// action and reschedules it, so only the last call in a burst ever runs.
/// Used for the free-text/date filters where each edit would otherwise fire
/// a request.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn call<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let mut slot = self.pending.lock().expect("debounce state poisoned");
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            sleep(delay).await;
            action().await;
        }));
    }
}

struct ThrottleState<T> {
    pending: Option<T>,
    scheduled: bool,
    last_fire: Option<Instant>,
}

/// Coalesce bursts into at most one execution per interval, trailing-edge:
/// the first call of a burst opens a window, calls within the window replace
/// the pending argument, and the single execution happens at the window
/// boundary with the latest argument.
pub struct Throttler<T> {
    interval: Duration,
    state: Arc<Mutex<ThrottleState<T>>>,
}

impl<T: Send + 'static> Throttler<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(ThrottleState {
                pending: None,
                scheduled: false,
                last_fire: None,
            })),
        }
    }

    pub fn call<F, Fut>(&self, arg: T, action: F)
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let fire_at = {
            let mut state = self.state.lock().expect("throttle state poisoned");
            state.pending = Some(arg);
            if state.scheduled {
                return;
            }
            state.scheduled = true;

            let now = Instant::now();
            match state.last_fire {
                // Still inside the window of the previous execution.
                Some(last) if last + self.interval > now => last + self.interval,
                _ => now + self.interval,
            }
        };

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            sleep_until(fire_at).await;
            let latest = {
                let mut state = state.lock().expect("throttle state poisoned");
                state.scheduled = false;
                state.last_fire = Some(Instant::now());
                state.pending.take()
            };
            if let Some(latest) = latest {
                action(latest).await;
            }
        });
    }
}
