use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::camera_client::DashboardApi;
use crate::types::StreamId;

use super::coordinator::SyncCoordinator;
use super::gate::RequestGate;

/// Offset between stream start times so ticks don't land on the same
/// wall-clock instant and pile onto the gate.
const TICK_STAGGER: Duration = Duration::from_millis(750);

/// Page-visibility handle, flipped by the embedding layer. Polling is
/// suspended while hidden; regaining visibility triggers an immediate
/// catch-up refresh since the snapshots are likely stale.
#[derive(Clone)]
pub struct Visibility {
    tx: Arc<watch::Sender<bool>>,
}

impl Visibility {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    pub fn set_visible(&self, visible: bool) {
        // Deduplicated so a repeated report doesn't wake the stream tasks.
        if *self.tx.borrow() != visible {
            self.tx.send_replace(visible);
        }
    }

    pub fn is_visible(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic scheduler: one task per stream, staggered start offsets, gate
/// admission on every tick.
pub struct Poller {
    gate: Arc<RequestGate>,
    visibility: Visibility,
    stagger: Duration,
}

impl Poller {
    pub fn new(gate: Arc<RequestGate>, visibility: Visibility) -> Self {
        Self {
            gate,
            visibility,
            stagger: TICK_STAGGER,
        }
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn spawn<A: DashboardApi>(
        &self,
        coordinator: &Arc<SyncCoordinator<A>>,
    ) -> Vec<JoinHandle<()>> {
        StreamId::ALL
            .iter()
            .enumerate()
            .map(|(idx, &stream)| {
                let gate = Arc::clone(&self.gate);
                let visibility = self.visibility.subscribe();
                let coordinator = Arc::clone(coordinator);
                let offset = self.stagger * idx as u32;
                let period = coordinator.schedule(stream).interval;
                tokio::spawn(poll_stream(
                    gate,
                    visibility,
                    coordinator,
                    stream,
                    period,
                    offset,
                ))
            })
            .collect()
    }
}

async fn poll_stream<A: DashboardApi>(
    gate: Arc<RequestGate>,
    mut visibility: watch::Receiver<bool>,
    coordinator: Arc<SyncCoordinator<A>>,
    stream: StreamId,
    period: Duration,
    offset: Duration,
) {
    let mut ticker = interval_at(Instant::now() + offset, period);
    // A shed or missed tick is never queued; the next tick is evaluated
    // against current gate state.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !*visibility.borrow_and_update() {
                    debug!(stream = %stream, "page hidden, skipping tick");
                    continue;
                }
                run_gated(&gate, &coordinator, stream).await;
            }
            changed = visibility.changed() => {
                if changed.is_err() {
                    break;
                }
                if *visibility.borrow_and_update() {
                    debug!(stream = %stream, "visibility regained, refreshing");
                    run_gated(&gate, &coordinator, stream).await;
                }
            }
        }
    }
}

async fn run_gated<A: DashboardApi>(
    gate: &RequestGate,
    coordinator: &SyncCoordinator<A>,
    stream: StreamId,
) {
    if !gate.try_acquire() {
        debug!(stream = %stream, "request gate saturated, shedding tick");
        return;
    }
    if let Err(err) = coordinator.refresh(stream).await {
        warn!(stream = %stream, error = %err, "refresh failed");
    }
    gate.release();
}
