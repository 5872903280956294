use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::camera_client::{
    ActionResponse, ActivityFeed, DashboardApi, DetectionOverview, DetectionRecord, SystemStatus,
};
use crate::config::{Config, StreamSchedule};
use crate::types::{StreamId, SyncError};

use super::pacing::{Debouncer, Throttler};
use super::retry::{CancelFlag, RetryPolicy};

/// Window for coalescing user-triggered refreshes of the same stream.
const FORCE_REFRESH_WINDOW: Duration = Duration::from_secs(2);
/// Quiescence delay for the date-filter query.
const DATE_FILTER_DEBOUNCE: Duration = Duration::from_millis(300);

/// Reduced, UI-ready result for one stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    Stats(SystemStatus),
    Detections(DetectionOverview),
    Activity(ActivityFeed),
}

/// Latest accepted result for a stream, plus the sequence number of the
/// attempt that produced it. Only ever overwritten by an attempt at least
/// as new, never by a stale reordered response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewSnapshot {
    pub sequence: u64,
    pub payload: Option<StreamPayload>,
    /// Set when the stream exhausted its retries; the last good payload
    /// stays on display instead of blanking the view.
    pub degraded: bool,
}

struct StreamState {
    last_attempt_seq: u64,
    accepted_seq: u64,
    last_success_at: Option<Instant>,
    consecutive_failures: u32,
    inflight: Option<CancelFlag>,
}

struct StreamSlot {
    schedule: StreamSchedule,
    state: Mutex<StreamState>,
    snapshot_tx: watch::Sender<ViewSnapshot>,
    force_throttle: Throttler<StreamId>,
}

/// Owns per-stream refresh state: decides when a result is current,
/// reconciles out-of-order settlements, and fans accepted snapshots out to
/// the rendering layer. Streams fail independently; nothing here is fatal.
pub struct SyncCoordinator<A: DashboardApi> {
    api: Arc<A>,
    retry: RetryPolicy,
    slots: HashMap<StreamId, StreamSlot>,
    date_filter: Debouncer,
    filtered_tx: watch::Sender<Option<Vec<DetectionRecord>>>,
    /// Handle to ourselves for the deferred work spawned by the pacing
    /// primitives.
    self_ref: Weak<Self>,
}

impl<A: DashboardApi> SyncCoordinator<A> {
    pub fn new(api: A, config: &Config) -> Arc<Self> {
        let slots = StreamId::ALL
            .iter()
            .map(|&stream| {
                let (snapshot_tx, _) = watch::channel(ViewSnapshot::default());
                (
                    stream,
                    StreamSlot {
                        schedule: config.schedule(stream),
                        state: Mutex::new(StreamState {
                            last_attempt_seq: 0,
                            accepted_seq: 0,
                            last_success_at: None,
                            consecutive_failures: 0,
                            inflight: None,
                        }),
                        snapshot_tx,
                        force_throttle: Throttler::new(FORCE_REFRESH_WINDOW),
                    },
                )
            })
            .collect();

        Arc::new_cyclic(|self_ref| Self {
            api: Arc::new(api),
            retry: RetryPolicy::new(config.retry_max_attempts, config.retry_backoff()),
            slots,
            date_filter: Debouncer::new(DATE_FILTER_DEBOUNCE),
            filtered_tx: watch::channel(None).0,
            self_ref: self_ref.clone(),
        })
    }

    fn slot(&self, stream: StreamId) -> &StreamSlot {
        &self.slots[&stream]
    }

    #[cfg(test)]
    pub(crate) fn api_for_tests(&self) -> &A {
        &self.api
    }

    pub fn schedule(&self, stream: StreamId) -> StreamSchedule {
        self.slot(stream).schedule
    }

    pub fn get_snapshot(&self, stream: StreamId) -> ViewSnapshot {
        self.slot(stream).snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot changes. The receiver is only woken when the
    /// snapshot value (payload or degraded flag) actually changes.
    pub fn subscribe(&self, stream: StreamId) -> watch::Receiver<ViewSnapshot> {
        self.slot(stream).snapshot_tx.subscribe()
    }

    /// Time since the stream last accepted a successful fetch, if ever.
    pub fn last_success_age(&self, stream: StreamId) -> Option<Duration> {
        self.slot(stream)
            .state
            .lock()
            .expect("stream state poisoned")
            .last_success_at
            .map(|at| at.elapsed())
    }

    /// Fetch a stream now, superseding any outstanding attempt for it.
    ///
    /// The outstanding attempt is cancelled and its eventual settlement
    /// discarded; the sequence check in `settle` also protects against the
    /// cases where cancellation loses the race.
    pub async fn refresh(&self, stream: StreamId) -> Result<(), SyncError> {
        let slot = self.slot(stream);
        let (my_seq, cancel) = {
            let mut state = slot.state.lock().expect("stream state poisoned");
            if let Some(previous) = state.inflight.take() {
                debug!(stream = %stream, "superseding in-flight attempt");
                previous.cancel();
            }
            state.last_attempt_seq += 1;
            let cancel = CancelFlag::new();
            state.inflight = Some(cancel.clone());
            (state.last_attempt_seq, cancel)
        };

        let deadline = slot.schedule.deadline;
        let api = Arc::clone(&self.api);
        let result = self
            .retry
            .run(&cancel, || {
                let api = Arc::clone(&api);
                async move {
                    match timeout(deadline, fetch_stream(api.as_ref(), stream)).await {
                        Ok(result) => result,
                        Err(_) => Err(SyncError::Timeout { stream }),
                    }
                }
            })
            .await;

        self.settle(stream, my_seq, result)
    }

    /// Apply a settled attempt under the acceptance rule: the snapshot is
    /// only updated when the attempt is at least as new as the last
    /// accepted one.
    fn settle(
        &self,
        stream: StreamId,
        my_seq: u64,
        result: Result<StreamPayload, SyncError>,
    ) -> Result<(), SyncError> {
        let slot = self.slot(stream);
        let mut state = slot.state.lock().expect("stream state poisoned");
        if state.last_attempt_seq == my_seq {
            state.inflight = None;
        }

        match result {
            Ok(payload) => {
                if my_seq < state.accepted_seq {
                    debug!(stream = %stream, seq = my_seq, "discarding stale response");
                    return Ok(());
                }
                state.accepted_seq = my_seq;
                state.last_success_at = Some(Instant::now());
                state.consecutive_failures = 0;
                slot.snapshot_tx.send_if_modified(|snapshot| {
                    let value_changed =
                        snapshot.payload.as_ref() != Some(&payload) || snapshot.degraded;
                    snapshot.sequence = my_seq;
                    if value_changed {
                        snapshot.payload = Some(payload);
                        snapshot.degraded = false;
                    }
                    value_changed
                });
                Ok(())
            }
            Err(err) if err.is_superseded() => Ok(()),
            Err(err) => {
                if my_seq < state.accepted_seq {
                    // A newer attempt already delivered fresher data.
                    return Ok(());
                }
                state.consecutive_failures += 1;
                warn!(
                    stream = %stream,
                    failures = state.consecutive_failures,
                    error = %err,
                    "stream degraded, keeping last good snapshot"
                );
                slot.snapshot_tx.send_if_modified(|snapshot| {
                    if snapshot.degraded {
                        false
                    } else {
                        snapshot.degraded = true;
                        true
                    }
                });
                Err(err)
            }
        }
    }

    /// User-triggered refresh. Coalesced per stream so a button mash turns
    /// into one trailing fetch.
    pub fn force_refresh(&self, stream: StreamId) {
        let Some(coordinator) = self.self_ref.upgrade() else {
            return;
        };
        self.slot(stream).force_throttle.call(stream, move |stream| async move {
            if let Err(err) = coordinator.refresh(stream).await {
                warn!(stream = %stream, error = %err, "forced refresh failed");
            }
        });
    }

    /// Debounced detection-history filter; results land in the channel
    /// returned by [`Self::filtered_detections`]. Called on every change of
    /// the date input, only the last value in a burst hits the backend.
    pub fn filter_by_date(&self, date: NaiveDate) {
        let Some(coordinator) = self.self_ref.upgrade() else {
            return;
        };
        self.date_filter.call(move || async move {
            match coordinator.api.fetch_detections_by_date(date).await {
                Ok(response) => {
                    coordinator.filtered_tx.send_replace(Some(response.detections));
                }
                Err(err) => warn!(error = %err, %date, "date filter query failed"),
            }
        });
    }

    pub fn clear_date_filter(&self) {
        self.filtered_tx.send_replace(None);
    }

    pub fn filtered_detections(&self) -> watch::Receiver<Option<Vec<DetectionRecord>>> {
        self.filtered_tx.subscribe()
    }

    pub async fn switch_camera(&self, camera_id: &str) -> Result<ActionResponse, SyncError> {
        let response = self.api.switch_camera(camera_id).await?;
        if response.is_success() {
            self.force_refresh(StreamId::SystemStats);
        }
        Ok(response)
    }

    pub async fn delete_detection(&self, id: i64) -> Result<ActionResponse, SyncError> {
        let response = self.api.delete_detection(id).await?;
        if response.is_success() {
            self.force_refresh(StreamId::Detections);
            self.force_refresh(StreamId::Activity);
        }
        Ok(response)
    }
}

async fn fetch_stream<A: DashboardApi>(
    api: &A,
    stream: StreamId,
) -> Result<StreamPayload, SyncError> {
    match stream {
        StreamId::SystemStats => Ok(StreamPayload::Stats(SystemStatus::from_response(
            api.fetch_system_stats().await?,
        ))),
        StreamId::Detections => Ok(StreamPayload::Detections(DetectionOverview::from_response(
            api.fetch_all_detections().await?,
        ))),
        StreamId::Activity => Ok(StreamPayload::Activity(ActivityFeed::from_response(
            api.fetch_all_detections().await?,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use crate::camera_client::{
        ActionStatus, AllDetectionsResponse, DetectionsByDateResponse, SystemStatsResponse,
    };

    use super::*;

    fn detections_response(total: u64) -> AllDetectionsResponse {
        AllDetectionsResponse {
            total_counts: HashMap::from([("front_gate".to_string(), total), ("total".to_string(), total)]),
            recent_detections: Vec::new(),
        }
    }

    /// Serves canned responses; optionally fails every fetch.
    #[derive(Default)]
    struct CannedApi {
        stats_calls: AtomicU32,
        detection_calls: AtomicU32,
        failing: AtomicBool,
    }

    #[async_trait]
    impl DashboardApi for CannedApi {
        async fn fetch_system_stats(&self) -> Result<SystemStatsResponse, SyncError> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(SyncError::Backend("stats down".to_string()));
            }
            Ok(SystemStatsResponse {
                cpu_percent: 12.0,
                memory_percent: 34.0,
                disk_percent: 56.0,
                active_cameras: 2,
                total_cameras: 4,
                uptime: 600.0,
            })
        }

        async fn fetch_all_detections(&self) -> Result<AllDetectionsResponse, SyncError> {
            self.detection_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(SyncError::Backend("detections down".to_string()));
            }
            Ok(detections_response(7))
        }

        async fn fetch_detections_by_date(
            &self,
            _date: NaiveDate,
        ) -> Result<DetectionsByDateResponse, SyncError> {
            Ok(DetectionsByDateResponse::default())
        }

        async fn switch_camera(&self, _camera_id: &str) -> Result<ActionResponse, SyncError> {
            Ok(ActionResponse {
                status: ActionStatus::Success,
                message: None,
            })
        }

        async fn delete_detection(&self, _id: i64) -> Result<ActionResponse, SyncError> {
            Ok(ActionResponse {
                status: ActionStatus::Success,
                message: None,
            })
        }
    }

    /// Holds every detections fetch until the test resolves it, so settle
    /// order is controlled explicitly.
    #[derive(Default)]
    struct HeldApi {
        pending: Mutex<Vec<oneshot::Sender<Result<AllDetectionsResponse, SyncError>>>>,
    }

    impl HeldApi {
        async fn wait_for_pending(&self, count: usize) {
            while self.pending.lock().expect("pending").len() < count {
                tokio::task::yield_now().await;
            }
        }

        fn resolve(&self, index: usize, response: AllDetectionsResponse) {
            let sender = self.pending.lock().expect("pending").remove(index);
            // The receiver may be gone if the attempt was superseded.
            let _ = sender.send(Ok(response));
        }
    }

    #[async_trait]
    impl DashboardApi for HeldApi {
        async fn fetch_system_stats(&self) -> Result<SystemStatsResponse, SyncError> {
            Ok(SystemStatsResponse::default())
        }

        async fn fetch_all_detections(&self) -> Result<AllDetectionsResponse, SyncError> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().expect("pending").push(tx);
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Backend("test dropped the response".to_string())),
            }
        }

        async fn fetch_detections_by_date(
            &self,
            _date: NaiveDate,
        ) -> Result<DetectionsByDateResponse, SyncError> {
            Ok(DetectionsByDateResponse::default())
        }

        async fn switch_camera(&self, _camera_id: &str) -> Result<ActionResponse, SyncError> {
            Ok(ActionResponse {
                status: ActionStatus::Success,
                message: None,
            })
        }

        async fn delete_detection(&self, _id: i64) -> Result<ActionResponse, SyncError> {
            Ok(ActionResponse {
                status: ActionStatus::Success,
                message: None,
            })
        }
    }

    fn fast_config() -> Config {
        Config {
            retry_backoff_ms: 10,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn accepted_fetch_publishes_a_snapshot() {
        let coordinator = SyncCoordinator::new(CannedApi::default(), &fast_config());
        let mut rx = coordinator.subscribe(StreamId::SystemStats);

        coordinator.refresh(StreamId::SystemStats).await.expect("refresh");

        assert!(rx.has_changed().expect("channel open"));
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.sequence, 1);
        assert!(!snapshot.degraded);
        match snapshot.payload {
            Some(StreamPayload::Stats(stats)) => assert_eq!(stats.camera_label(), "2/4"),
            other => panic!("expected stats payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn identical_payload_does_not_wake_subscribers() {
        let coordinator = SyncCoordinator::new(CannedApi::default(), &fast_config());
        let mut rx = coordinator.subscribe(StreamId::Detections);

        coordinator.refresh(StreamId::Detections).await.expect("refresh");
        assert!(rx.has_changed().expect("channel open"));
        rx.borrow_and_update();

        coordinator.refresh(StreamId::Detections).await.expect("refresh");
        assert!(!rx.has_changed().expect("channel open"));
        // The sequence still advances; only the notification is suppressed.
        assert_eq!(coordinator.get_snapshot(StreamId::Detections).sequence, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_stream_keeps_last_good_payload_and_degrades() {
        let coordinator = SyncCoordinator::new(CannedApi::default(), &fast_config());
        let mut rx = coordinator.subscribe(StreamId::Detections);

        coordinator.refresh(StreamId::Detections).await.expect("refresh");
        rx.borrow_and_update();

        let api = Arc::clone(&coordinator.api);
        api.failing.store(true, Ordering::SeqCst);
        let result = coordinator.refresh(StreamId::Detections).await;
        assert!(matches!(result, Err(SyncError::RetriesExhausted { attempts: 3, .. })));

        assert!(rx.has_changed().expect("channel open"));
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.degraded);
        match &snapshot.payload {
            Some(StreamPayload::Detections(overview)) => assert_eq!(overview.total, 7),
            other => panic!("expected last good payload, got {other:?}"),
        }

        // Recovery on the next scheduled poll clears the flag.
        api.failing.store(false, Ordering::SeqCst);
        coordinator.refresh(StreamId::Detections).await.expect("refresh");
        let snapshot = rx.borrow_and_update().clone();
        assert!(!snapshot.degraded);
    }

    #[tokio::test]
    async fn stale_settlement_never_overwrites_a_newer_snapshot() {
        let coordinator = SyncCoordinator::new(HeldApi::default(), &fast_config());
        let mut rx = coordinator.subscribe(StreamId::Detections);

        // Attempt 1 settles late, after attempt 2 already delivered B.
        let value_b = StreamPayload::Detections(DetectionOverview::from_response(
            detections_response(2),
        ));
        let value_a = StreamPayload::Detections(DetectionOverview::from_response(
            detections_response(1),
        ));
        {
            let mut state = coordinator.slot(StreamId::Detections).state.lock().expect("state");
            state.last_attempt_seq = 2;
        }
        coordinator.settle(StreamId::Detections, 2, Ok(value_b.clone())).expect("settle");
        coordinator.settle(StreamId::Detections, 1, Ok(value_a)).expect("settle");

        let snapshot = coordinator.get_snapshot(StreamId::Detections);
        assert_eq!(snapshot.payload, Some(value_b));
        assert_eq!(snapshot.sequence, 2);

        // Exactly one visible change: the stale settlement stayed silent.
        assert!(rx.has_changed().expect("channel open"));
        rx.borrow_and_update();
        assert!(!rx.has_changed().expect("channel open"));
    }

    #[tokio::test]
    async fn superseded_attempt_is_discarded_silently() {
        let coordinator = SyncCoordinator::new(HeldApi::default(), &fast_config());
        let mut rx = coordinator.subscribe(StreamId::Detections);

        let first = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh(StreamId::Detections).await })
        };
        coordinator.api.wait_for_pending(1).await;

        let second = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh(StreamId::Detections).await })
        };
        coordinator.api.wait_for_pending(2).await;

        // Resolve the newer attempt; the older one was cancelled and its
        // response (index 0) is dropped on the floor.
        coordinator.api.resolve(1, detections_response(9));
        second.await.expect("join").expect("refresh");
        first.await.expect("join").expect("superseded refresh is silent");

        coordinator.api.resolve(0, detections_response(1));
        tokio::task::yield_now().await;

        let snapshot = coordinator.get_snapshot(StreamId::Detections);
        match &snapshot.payload {
            Some(StreamPayload::Detections(overview)) => assert_eq!(overview.total, 9),
            other => panic!("expected the newer payload, got {other:?}"),
        }
        assert_eq!(snapshot.sequence, 2);

        assert!(rx.has_changed().expect("channel open"));
        rx.borrow_and_update();
        assert!(!rx.has_changed().expect("channel open"));
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_backend_times_out_and_exhausts() {
        let coordinator = SyncCoordinator::new(HeldApi::default(), &fast_config());

        let result = coordinator.refresh(StreamId::Detections).await;
        match result {
            Err(SyncError::RetriesExhausted { attempts: 3, source }) => {
                assert!(matches!(*source, SyncError::Timeout { stream: StreamId::Detections }));
            }
            other => panic!("expected timeout exhaustion, got {other:?}"),
        }
        assert!(coordinator.get_snapshot(StreamId::Detections).degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_commands_schedule_throttled_refreshes() {
        let coordinator = SyncCoordinator::new(CannedApi::default(), &fast_config());

        let response = coordinator.delete_detection(41).await.expect("delete");
        assert!(response.is_success());
        assert_eq!(coordinator.api.detection_calls.load(Ordering::SeqCst), 0);

        // The refresh is trailing-throttled, not immediate.
        tokio::time::sleep(FORCE_REFRESH_WINDOW + Duration::from_millis(50)).await;
        // Detections and activity each re-read the detections endpoint.
        assert_eq!(coordinator.api.detection_calls.load(Ordering::SeqCst), 2);

        coordinator.switch_camera("front_gate").await.expect("switch");
        tokio::time::sleep(FORCE_REFRESH_WINDOW + Duration::from_millis(50)).await;
        assert_eq!(coordinator.api.stats_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn date_filter_is_debounced_to_the_last_value() {
        let coordinator = SyncCoordinator::new(CannedApi::default(), &fast_config());
        let mut rx = coordinator.filtered_detections();

        for day in 1..=3 {
            coordinator.filter_by_date(
                NaiveDate::from_ymd_opt(2025, 6, day).expect("valid date"),
            );
        }
        tokio::time::sleep(DATE_FILTER_DEBOUNCE + Duration::from_millis(50)).await;

        assert!(rx.has_changed().expect("channel open"));
        assert!(rx.borrow_and_update().is_some());

        coordinator.clear_date_filter();
        assert!(rx.borrow_and_update().is_none());
    }
}
