//! Data-refresh and synchronization core: bounded-concurrency polling of the
//! backend streams, burst pacing, capped retries, and out-of-order response
//! reconciliation into per-stream view snapshots.

mod coordinator;
mod gate;
mod pacing;
mod poller;
mod retry;

pub use coordinator::{StreamPayload, SyncCoordinator, ViewSnapshot};
pub use gate::RequestGate;
pub use pacing::{Debouncer, Throttler};
pub use poller::{Poller, Visibility};
pub use retry::{CancelFlag, RetryPolicy};
