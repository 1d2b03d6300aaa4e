use chrono::Utc;
use cinehold_core::Countdown;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

type ExpiryCallback = Box<dyn Fn() + Send + Sync>;

struct TimerState {
    countdown: Option<Countdown>,
    enabled: bool,
    display: Option<u32>,
}

struct Shared {
    state: Mutex<TimerState>,
    wake: Notify,
    on_expired: ExpiryCallback,
}

impl Shared {
    /// The one code path that recomputes remaining time, used by the periodic
    /// tick, by `wake` (visibility restore), and after every state change.
    fn resync_now(&self) {
        let expired = {
            let Ok(mut state) = self.state.lock() else { return };
            if !state.enabled {
                return;
            }
            let Some(countdown) = state.countdown.as_mut() else { return };

            let poll = countdown.poll(Utc::now());
            state.display = Some(poll.remaining);
            poll.expired_now
        };

        // Callback outside the lock; the Countdown guard makes this fire at
        // most once per baseline.
        if expired {
            tracing::info!("hold countdown reached zero");
            (self.on_expired)();
        }
    }
}

/// Suspension-aware driver around [`Countdown`].
///
/// A background tick recomputes the display every second, but because the
/// value is always re-derived from the wall clock, a throttled or suspended
/// tick only delays the update, never skews it. Hosts that were suspended
/// call [`HoldCountdown::wake`] on resume to refresh immediately.
pub struct HoldCountdown {
    shared: Arc<Shared>,
    ticker: tokio::task::JoinHandle<()>,
}

impl HoldCountdown {
    pub fn new(on_expired: impl Fn() + Send + Sync + 'static) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState { countdown: None, enabled: false, display: None }),
            wake: Notify::new(),
            on_expired: Box::new(on_expired),
        });

        let tick_shared = Arc::clone(&shared);
        let ticker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
                    _ = tick_shared.wake.notified() => {}
                }
                tick_shared.resync_now();
            }
        });

        Self { shared, ticker }
    }

    /// Start (or restart) the countdown from a fresh TTL.
    ///
    /// A restart rebaselines the existing countdown instead of replacing it,
    /// so resync stamps captured before the restart no longer match.
    pub fn start(&self, ttl_seconds: u32) {
        if let Ok(mut state) = self.shared.state.lock() {
            let now = Utc::now();
            match state.countdown.as_mut() {
                Some(countdown) => countdown.rebaseline(ttl_seconds, now),
                None => state.countdown = Some(Countdown::start(ttl_seconds, now)),
            }
            state.enabled = true;
            state.display = Some(ttl_seconds);
        }
        self.shared.wake.notify_one();
    }

    /// Stamp to capture before issuing an async TTL refresh; `None` when no
    /// countdown is running
    pub fn begin_resync(&self) -> Option<u64> {
        let state = self.shared.state.lock().ok()?;
        state.countdown.as_ref().map(Countdown::baseline)
    }

    /// Apply a TTL refresh captured at `stamp`. A response that raced with a
    /// newer rebaseline is stale and is discarded.
    pub fn apply_resync(&self, stamp: u64, ttl_seconds: u32) {
        if let Ok(mut state) = self.shared.state.lock() {
            match state.countdown.as_mut() {
                Some(countdown) if countdown.baseline() == stamp => {
                    countdown.rebaseline(ttl_seconds, Utc::now());
                    state.display = Some(ttl_seconds);
                }
                Some(_) => {
                    tracing::debug!(stamp, "stale ttl resync discarded");
                    return;
                }
                None => return,
            }
        }
        self.shared.wake.notify_one();
    }

    /// Host became visible again after being hidden: refresh immediately
    pub fn wake(&self) {
        self.shared.wake.notify_one();
    }

    /// Disabling suspends ticking but keeps the last displayed value;
    /// re-enable with a fresh [`HoldCountdown::start`]
    pub fn set_enabled(&self, enabled: bool) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.enabled = enabled;
        }
        if enabled {
            self.shared.wake.notify_one();
        }
    }

    /// Current display value; `None` means no countdown was started. A "no
    /// active hold" placeholder is the caller's presentation concern and is
    /// never stored here.
    pub fn seconds_remaining(&self) -> Option<u32> {
        self.shared.state.lock().ok().and_then(|state| state.display)
    }
}

impl Drop for HoldCountdown {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}
