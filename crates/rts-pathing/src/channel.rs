//! Lock-free hand-off of solved waypoints from a solver thread to one agent.
//!
//! # Protocol
//!
//! Each agent owns one [`SolutionChannel`] behind an `Arc`.  A search is
//! identified by a *generation*:
//!
//! 1. The agent calls [`begin_search`](SolutionChannel::begin_search), which
//!    drains anything left in the queue and opens a new generation in the
//!    `Pending` status.
//! 2. The solver (the only producer for that generation) pushes tagged
//!    waypoints and then flips the status to `Found` or `NotFound`.
//! 3. The agent observes the status on its next tick and collects the
//!    waypoints tagged with its generation.
//!
//! Generation and status share one `AtomicU64` word (`generation << 2 |
//! status`).  The producer flips the status with a compare-exchange against
//! `(its generation, Pending)`, so a result that arrives after the agent has
//! moved on to a newer search can never overwrite the newer status.  Stale
//! waypoints still in the queue are filtered by their tag.
//!
//! The status store uses `Release` and every status load uses `Acquire`: once
//! the agent sees `Found`, every waypoint pushed before it is visible.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::SegQueue;
use glam::Vec3;

#[cfg(feature = "debug-trace")]
use std::sync::Mutex;

#[cfg(feature = "debug-trace")]
use rts_grid::GridCoord;

/// Pops tried before [`SolutionChannel::try_dequeue`] starts yielding.
const SPINS_BEFORE_YIELD: u32 = 16;
/// Upper bound on pop attempts while the queue claims to be non-empty.
const MAX_DEQUEUE_ATTEMPTS: u32 = 64;

const STATUS_BITS: u64 = 2;
const STATUS_MASK: u64 = (1 << STATUS_BITS) - 1;

/// Outcome of the search identified by a generation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SearchStatus {
    /// No search with that generation is current.
    Idle,
    Pending,
    Found,
    NotFound,
}

impl SearchStatus {
    fn to_bits(self) -> u64 {
        match self {
            SearchStatus::Idle     => 0,
            SearchStatus::Pending  => 1,
            SearchStatus::Found    => 2,
            SearchStatus::NotFound => 3,
        }
    }

    fn from_bits(bits: u64) -> Self {
        match bits & STATUS_MASK {
            1 => SearchStatus::Pending,
            2 => SearchStatus::Found,
            3 => SearchStatus::NotFound,
            _ => SearchStatus::Idle,
        }
    }
}

#[inline]
fn pack(generation: u64, status: SearchStatus) -> u64 {
    (generation << STATUS_BITS) | status.to_bits()
}

#[inline]
fn generation_of(word: u64) -> u64 {
    word >> STATUS_BITS
}

/// Single-consumer, single-producer-per-generation waypoint queue.
#[derive(Debug, Default)]
pub struct SolutionChannel {
    queue: SegQueue<(u64, Vec3)>,
    word:  AtomicU64,
    #[cfg(feature = "debug-trace")]
    explored: Mutex<Vec<GridCoord>>,
}

impl SolutionChannel {
    /// Empty channel at generation 0, `Idle`.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Consumer side ─────────────────────────────────────────────────────

    /// Drain the queue and open a new generation in `Pending`.
    ///
    /// Only the owning agent calls this, so the load/store pair does not
    /// race with another generation bump.
    pub fn begin_search(&self) -> u64 {
        self.drain();
        let generation = generation_of(self.word.load(Ordering::Acquire)) + 1;
        self.word.store(pack(generation, SearchStatus::Pending), Ordering::Release);
        generation
    }

    /// Close the current generation without waiting for its result.
    pub fn cancel(&self) {
        self.drain();
        let generation = generation_of(self.word.load(Ordering::Acquire)) + 1;
        self.word.store(pack(generation, SearchStatus::Idle), Ordering::Release);
    }

    /// Status of `generation`; `Idle` once a newer generation has opened.
    pub fn status(&self, generation: u64) -> SearchStatus {
        let word = self.word.load(Ordering::Acquire);
        if generation_of(word) != generation {
            return SearchStatus::Idle;
        }
        SearchStatus::from_bits(word)
    }

    /// Generation most recently opened.
    pub fn generation(&self) -> u64 {
        generation_of(self.word.load(Ordering::Acquire))
    }

    /// Pop one waypoint of `generation`, discarding stale entries.
    ///
    /// Spins briefly, then yields, while the queue reports items that a pop
    /// has not yet observed.  Gives up as soon as the queue is empty.
    pub fn try_dequeue(&self, generation: u64) -> Option<Vec3> {
        let mut attempts = 0;
        while attempts < MAX_DEQUEUE_ATTEMPTS {
            match self.queue.pop() {
                Some((tag, node)) if tag == generation => return Some(node),
                Some(_) => continue,
                None if self.queue.is_empty() => return None,
                None => {
                    attempts += 1;
                    if attempts < SPINS_BEFORE_YIELD {
                        std::hint::spin_loop();
                    } else {
                        std::thread::yield_now();
                    }
                }
            }
        }
        None
    }

    /// Every waypoint of `generation`, in publication order.
    pub fn collect(&self, generation: u64) -> Vec<Vec3> {
        let mut nodes = Vec::with_capacity(self.queue.len());
        while let Some(node) = self.try_dequeue(generation) {
            nodes.push(node);
        }
        nodes
    }

    /// Discard everything queued.  Returns the number of items dropped.
    /// Safe to call on an empty queue, any number of times.
    pub fn drain(&self) -> usize {
        let mut dropped = 0;
        while self.queue.pop().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Items queued across all generations.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    // ── Producer side ─────────────────────────────────────────────────────

    /// Push a solution for `generation` and mark it `Found`.
    ///
    /// Returns `false` (and publishes nothing visible) if the generation is
    /// no longer current.
    pub fn publish<I>(&self, generation: u64, nodes: I) -> bool
    where
        I: IntoIterator<Item = Vec3>,
    {
        if self.status(generation) != SearchStatus::Pending {
            return false;
        }
        for node in nodes {
            self.queue.push((generation, node));
        }
        self.finish(generation, SearchStatus::Found)
    }

    /// Mark `generation` as `NotFound`.
    pub fn fail(&self, generation: u64) -> bool {
        self.finish(generation, SearchStatus::NotFound)
    }

    fn finish(&self, generation: u64, status: SearchStatus) -> bool {
        self.word
            .compare_exchange(
                pack(generation, SearchStatus::Pending),
                pack(generation, status),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    // ── Debug trace ───────────────────────────────────────────────────────

    /// Keep the node set the latest search expanded.
    #[cfg(feature = "debug-trace")]
    pub fn record_explored(&self, explored: Vec<GridCoord>) {
        if let Ok(mut slot) = self.explored.lock() {
            *slot = explored;
        }
    }

    /// Nodes expanded by the most recent completed search.
    #[cfg(feature = "debug-trace")]
    pub fn explored(&self) -> Vec<GridCoord> {
        self.explored.lock().map(|v| v.clone()).unwrap_or_default()
    }
}
