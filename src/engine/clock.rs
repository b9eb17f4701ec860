//! Interval clocks for the master and per-track loops.
//!
//! Time is a `Duration` since the engine's epoch, supplied by the caller, so
//! the same code runs against the wall clock or a simulated one.

use std::time::Duration;

/// Slowest tempo the engine accepts.
pub const MIN_BPM: f64 = 1.0;
/// Fastest tempo the engine accepts.
pub const MAX_BPM: f64 = 999.0;

/// Shortest interval a loop will run at.
const MIN_INTERVAL: Duration = Duration::from_micros(1);

/// Whether `bpm` is a tempo the clocks can run at.
pub fn is_valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && (MIN_BPM..=MAX_BPM).contains(&bpm)
}

/// One sixteenth note at `bpm`: `(60000 / bpm) / 4` ms.
///
/// `bpm` is clamped into `MIN_BPM..=MAX_BPM`; NaN runs at `MIN_BPM`.
pub fn tick_interval(bpm: f64) -> Duration {
    let bpm = if bpm.is_nan() { MIN_BPM } else { bpm.clamp(MIN_BPM, MAX_BPM) };
    Duration::from_secs_f64(60.0 / bpm / 4.0)
}

/// Repeating timer with a wrapping step counter.
///
/// The first tick is due one interval after start and reports step 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickLoop {
    interval: Duration,
    next_due: Duration,
    counter: u32,
    modulus: u32,
    last_step: Option<u32>,
    ticks: u64,
}

impl TickLoop {
    /// A zero interval is raised to one microsecond so the loop always
    /// moves forward.
    pub fn start(now: Duration, interval: Duration, modulus: u32) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        Self {
            interval,
            next_due: now + interval,
            counter: 0,
            modulus: modulus.max(1),
            last_step: None,
            ticks: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    pub fn is_due(&self, now: Duration) -> bool {
        self.next_due <= now
    }

    /// How far behind `now` the next tick is.
    pub fn lag(&self, now: Duration) -> Duration {
        now.saturating_sub(self.next_due)
    }

    /// Step reported by the most recent tick.
    pub fn last_step(&self) -> Option<u32> {
        self.last_step
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Consume the due tick, returning its step.
    pub fn fire(&mut self) -> u32 {
        let step = self.counter;
        self.counter = (self.counter + 1) % self.modulus;
        self.last_step = Some(step);
        self.ticks += 1;
        self.next_due += self.interval;
        step
    }

    /// Drop missed ticks: the next tick is due one interval after `now`.
    pub fn resync(&mut self, now: Duration) {
        self.next_due = now + self.interval;
    }
}
