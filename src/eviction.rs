//! Idle cache eviction.
//!
//! An [`EvictionTimer`] clears a target's caches once it has gone unused for
//! the idle interval. Every access re-arms the timer.
//!
//! When a tokio runtime is available the timer spawns a task that sleeps
//! until the deadline. Without one only the deadline is recorded and the
//! owner sweeps with [`EvictionTimer::take_expired`] on its next access.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default idle interval before caches are cleared.
pub const DEFAULT_IDLE: Duration = Duration::from_secs(60);

/// A value whose caches can be dropped.
pub trait Evictable: Send + Sync + 'static {
    /// Clear all cached state.
    fn evict(&self);
}

#[derive(Default)]
struct TimerState {
    /// Bumped whenever a task is spawned or stopped; a task only acts for its own value
    seq: u64,
    deadline: Option<Instant>,
    task: Option<JoinHandle<()>>,
    #[cfg(test)]
    spawned: usize,
}

/// What a woken timer task does next.
enum Wake {
    Sleep(Instant),
    Fire,
    Stop,
}

impl TimerState {
    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Cancelable idle timer.
pub struct EvictionTimer {
    idle: Duration,
    state: Arc<Mutex<TimerState>>,
}

impl EvictionTimer {
    /// Create a disarmed timer.
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            state: Arc::new(Mutex::new(TimerState::default())),
        }
    }

    /// Idle interval.
    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// Start or restart the idle countdown for `target`.
    ///
    /// A pending task is kept and only its deadline moves.
    pub fn arm<T: Evictable>(&self, target: Weak<T>) {
        let deadline = Instant::now() + self.idle;
        let mut state = self.state.lock();
        state.deadline = Some(deadline);

        if state.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        state.seq += 1;
        state.task = None;

        if let Ok(handle) = Handle::try_current() {
            let seq = state.seq;
            let timer = Arc::downgrade(&self.state);
            state.task = Some(handle.spawn(run(timer, seq, deadline, target)));
            #[cfg(test)]
            {
                state.spawned += 1;
            }
        }
    }

    /// Stop the countdown without evicting.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.seq += 1;
        state.deadline = None;
        state.abort_task();
    }

    /// Check if a countdown is pending.
    pub fn is_armed(&self) -> bool {
        self.state.lock().deadline.is_some()
    }

    /// Disarm and return `true` if the deadline has passed.
    ///
    /// Owners call this before touching their caches so that eviction also
    /// happens when no runtime drove the timer task.
    pub fn take_expired(&self) -> bool {
        let mut state = self.state.lock();
        match state.deadline {
            Some(deadline) if deadline <= Instant::now() => {
                state.seq += 1;
                state.deadline = None;
                state.abort_task();
                true
            }
            _ => false,
        }
    }
}

impl Drop for EvictionTimer {
    fn drop(&mut self) {
        self.state.lock().abort_task();
    }
}

impl std::fmt::Debug for EvictionTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionTimer")
            .field("idle", &self.idle)
            .field("armed", &self.is_armed())
            .finish()
    }
}

async fn run<T: Evictable>(
    timer: Weak<Mutex<TimerState>>,
    seq: u64,
    mut wake_at: Instant,
    target: Weak<T>,
) {
    loop {
        tokio::time::sleep_until(wake_at).await;
        match next_wake(&timer, seq) {
            Wake::Sleep(deadline) => wake_at = deadline,
            Wake::Stop => return,
            Wake::Fire => break,
        }
    }
    if let Some(target) = target.upgrade() {
        log::debug!("Idle interval elapsed, evicting caches");
        target.evict();
    }
}

fn next_wake(timer: &Weak<Mutex<TimerState>>, seq: u64) -> Wake {
    let Some(state) = timer.upgrade() else {
        return Wake::Stop;
    };
    let mut state = state.lock();
    if state.seq != seq {
        return Wake::Stop;
    }
    match state.deadline {
        Some(deadline) if deadline > Instant::now() => Wake::Sleep(deadline),
        Some(_) => {
            state.deadline = None;
            state.task = None;
            Wake::Fire
        }
        None => Wake::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Evictable for Counter {
        fn evict(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_idle() {
        let target = Arc::new(Counter::default());
        let timer = EvictionTimer::new(Duration::from_secs(60));

        timer.arm(Arc::downgrade(&target));
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(target.0.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(target.0.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_postpones() {
        let target = Arc::new(Counter::default());
        let timer = EvictionTimer::new(Duration::from_secs(60));

        timer.arm(Arc::downgrade(&target));
        tokio::time::sleep(Duration::from_secs(40)).await;
        timer.arm(Arc::downgrade(&target));
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(target.0.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(target.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_reuses_pending_task() {
        let target = Arc::new(Counter::default());
        let timer = EvictionTimer::new(Duration::from_secs(60));

        for _ in 0..10 {
            timer.arm(Arc::downgrade(&target));
        }
        assert_eq!(timer.state.lock().spawned, 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(target.0.load(Ordering::SeqCst), 1);

        // A fired timer spawns a fresh task on the next arm
        timer.arm(Arc::downgrade(&target));
        assert_eq!(timer.state.lock().spawned, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let target = Arc::new(Counter::default());
        let timer = EvictionTimer::new(Duration::from_secs(10));

        timer.arm(Arc::downgrade(&target));
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(target.0.load(Ordering::SeqCst), 0);
        assert!(!timer.take_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_target_is_ignored() {
        let target = Arc::new(Counter::default());
        let timer = EvictionTimer::new(Duration::from_secs(1));
        timer.arm(Arc::downgrade(&target));
        drop(target);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_sweep_without_runtime() {
        let target = Arc::new(Counter::default());
        let timer = EvictionTimer::new(Duration::ZERO);

        timer.arm(Arc::downgrade(&target));
        assert!(timer.is_armed());
        assert!(timer.take_expired());
        assert!(!timer.take_expired());
        assert!(!timer.is_armed());
    }
}
