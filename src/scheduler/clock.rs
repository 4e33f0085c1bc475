//! Time sources for slice budgeting

use std::cell::Cell;

/// Monotonic millisecond clock
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by `instant` (performance.now() on wasm32)
#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    origin: instant::Instant,
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl InstantClock {
    pub fn new() -> Self {
        Self {
            origin: instant::Instant::now(),
        }
    }
}

impl Clock for InstantClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Deterministic clock that advances by a fixed tick on every read
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Cell<f64>,
    tick: f64,
}

impl ManualClock {
    pub fn new(tick_ms: f64) -> Self {
        Self {
            now: Cell::new(0.0),
            tick: tick_ms,
        }
    }

    /// Jump forward without reading
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        let t = self.now.get();
        self.now.set(t + self.tick);
        t
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}
