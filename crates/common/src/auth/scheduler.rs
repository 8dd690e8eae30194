//! Single-slot refresh timer
//!
//! Arms at most one pending refresh per process. Re-arming replaces the
//! pending task; a task that has begun firing is never aborted by its own
//! re-arm.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing pending
    Idle,
    /// A refresh is pending
    Armed,
    /// The refresh callback is running
    Fired,
}

struct Slot {
    state: SchedulerState,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    fires_at: Option<Instant>,
}

/// Compute how long to wait before refreshing a token that expires in
/// `expires_in_secs`
///
/// Fires `lead_secs` before expiry, never sooner than `min_delay_secs`.
#[must_use]
pub fn refresh_delay(expires_in_secs: i64, lead_secs: i64, min_delay_secs: i64) -> Duration {
    let secs = expires_in_secs.saturating_sub(lead_secs).max(min_delay_secs).max(0);
    Duration::from_secs(u64::try_from(secs).unwrap_or(0))
}

/// Refresh timer shared by clones
#[derive(Clone)]
pub struct RefreshScheduler {
    slot: Arc<Mutex<Slot>>,
    lead_secs: i64,
    min_delay_secs: i64,
}

impl RefreshScheduler {
    #[must_use]
    pub fn new(lead_secs: i64, min_delay_secs: i64) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                state: SchedulerState::Idle,
                generation: 0,
                pending: None,
                fires_at: None,
            })),
            lead_secs,
            min_delay_secs,
        }
    }

    /// Delay this scheduler would use for a token expiring in
    /// `expires_in_secs`
    #[must_use]
    pub fn delay_for(&self, expires_in_secs: i64) -> Duration {
        refresh_delay(expires_in_secs, self.lead_secs, self.min_delay_secs)
    }

    /// Arm the refresh, replacing any pending one
    ///
    /// `on_fire` runs once the delay elapses unless the scheduler is re-armed
    /// or cancelled first. Must be called from within a Tokio runtime.
    pub fn arm<F>(&self, expires_in_secs: i64, on_fire: F) -> Duration
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay_for(expires_in_secs);
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        let shared = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            if !begin_fire(&shared, generation) {
                return;
            }
            info!("Refresh timer fired");
            on_fire.await;
            finish_fire(&shared, generation);
        });

        slot.pending = Some(handle);
        slot.state = SchedulerState::Armed;
        slot.fires_at = Some(Instant::now() + delay);
        debug!(delay_secs = delay.as_secs(), generation, "Refresh armed");
        delay
    }

    /// Drop any pending refresh and return to idle
    pub fn cancel(&self) {
        let mut slot = self.slot.lock();
        if let Some(pending) = slot.pending.take() {
            pending.abort();
            debug!("Pending refresh cancelled");
        }
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SchedulerState::Idle;
        slot.fires_at = None;
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.slot.lock().state
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state() == SchedulerState::Armed
    }

    /// Time left until the pending refresh fires
    #[must_use]
    pub fn time_until_fire(&self) -> Option<Duration> {
        let slot = self.slot.lock();
        match slot.state {
            SchedulerState::Armed => {
                slot.fires_at.map(|at| at.saturating_duration_since(Instant::now()))
            }
            SchedulerState::Idle | SchedulerState::Fired => None,
        }
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("state", &self.state())
            .field("lead_secs", &self.lead_secs)
            .field("min_delay_secs", &self.min_delay_secs)
            .finish()
    }
}

// Takes the slot for a firing task. The handle is released rather than
// aborted so the task survives a re-arm issued from inside `on_fire`.
fn begin_fire(slot: &Mutex<Slot>, generation: u64) -> bool {
    let mut slot = slot.lock();
    if slot.generation != generation {
        return false;
    }
    slot.pending = None;
    slot.fires_at = None;
    slot.state = SchedulerState::Fired;
    true
}

fn finish_fire(slot: &Mutex<Slot>, generation: u64) {
    let mut slot = slot.lock();
    if slot.generation == generation && slot.state == SchedulerState::Fired {
        slot.state = SchedulerState::Idle;
    }
}
