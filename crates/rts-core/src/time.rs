//! Fixed-step simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing `Tick` counter driven by one fixed-step
//! simulation thread.  The mapping to simulated seconds lives in `SimClock`:
//!
//!   elapsed_secs = tick / tick_hz
//!
//! Timers inside the movement core (pause, block recheck, unpatience) are
//! plain `f32` seconds decremented by [`SimClock::dt`] each tick, so they stay
//! correct if an application changes the tick rate.

use std::fmt;

use crate::{CoreError, CoreResult};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Converts between tick counts and simulated seconds.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Fixed steps per simulated second.
    pub tick_hz: u32,
    /// Advanced by `SimClock::advance()` once per iteration.
    pub current_tick: Tick,
}

impl SimClock {
    /// Create a clock at tick 0.  A zero rate is treated as 1 Hz.
    pub fn new(tick_hz: u32) -> Self {
        Self {
            tick_hz: tick_hz.max(1),
            current_tick: Tick::ZERO,
        }
    }

    /// Seconds covered by one tick.
    #[inline]
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }

    /// Advance the clock by one tick.
    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = Tick(self.current_tick.0 + 1);
    }

    /// Elapsed simulated seconds since tick 0.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.current_tick.0 as f64 / self.tick_hz as f64
    }

    /// How many ticks span `secs` seconds? (rounds up)
    #[inline]
    pub fn ticks_for_secs(&self, secs: f32) -> u64 {
        (secs.max(0.0) * self.tick_hz as f32).ceil() as u64
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2}s)", self.current_tick, self.elapsed_secs())
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level simulation configuration.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Fixed steps per simulated second.  Default: 30.
    pub tick_hz: u32,

    /// Total ticks `Sim::run` will simulate.
    pub total_ticks: u64,

    /// Master RNG seed.  The same seed always produces identical results when
    /// searches complete inline.
    pub seed: u64,

    /// Worker threads for the path-solver pool.  `None` uses all logical cores.
    pub solver_threads: Option<usize>,

    /// Position in a networked game.
    pub role: crate::NetRole,
}

impl SimConfig {
    /// The tick at which the simulation ends (exclusive upper bound).
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.total_ticks)
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.tick_hz)
    }

    /// Reject configurations the tick loop cannot run.
    pub fn validate(&self) -> CoreResult<()> {
        if self.tick_hz == 0 {
            return Err(CoreError::Config("tick_hz must be at least 1".into()));
        }
        if self.solver_threads == Some(0) {
            return Err(CoreError::Config("solver_threads must be at least 1 when set".into()));
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz:        30,
            total_ticks:    30 * 60,
            seed:           0,
            solver_threads: None,
            role:           crate::NetRole::Standalone,
        }
    }
}
