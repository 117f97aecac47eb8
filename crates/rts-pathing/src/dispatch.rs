//! Running searches: inline on the simulation thread or on a worker pool.
//!
//! A dispatcher receives an owned [`SearchRequest`] plus a [`SearchTicket`]
//! and must eventually call [`SearchTicket::complete`].  Dropping a ticket
//! without completing it reports `NotFound`, so an agent can never wait on a
//! search that was lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace};

use rts_core::PathNodeType;
use rts_grid::{GridResult, PathSolver, SearchRequest, SolvedPath};

use crate::{PathingError, PathingResult, SolutionChannel};

// ── QueueCounters ─────────────────────────────────────────────────────────────

/// Searches in flight, per node type.
#[derive(Debug, Default)]
pub struct QueueCounters {
    ground: AtomicUsize,
    air:    AtomicUsize,
}

impl QueueCounters {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, node_type: PathNodeType) -> &AtomicUsize {
        match node_type {
            PathNodeType::Ground => &self.ground,
            PathNodeType::Air    => &self.air,
        }
    }

    /// Searches currently running for `node_type`.
    pub fn in_flight(&self, node_type: PathNodeType) -> usize {
        self.slot(node_type).load(Ordering::Acquire)
    }

    /// Searches currently running across both node types.
    pub fn total(&self) -> usize {
        self.in_flight(PathNodeType::Ground) + self.in_flight(PathNodeType::Air)
    }

    fn begin(&self, node_type: PathNodeType) {
        self.slot(node_type).fetch_add(1, Ordering::AcqRel);
    }

    fn end(&self, node_type: PathNodeType) {
        self.slot(node_type).fetch_sub(1, Ordering::AcqRel);
    }
}

// ── SearchTicket ──────────────────────────────────────────────────────────────

/// Right to publish the result of one search generation.
#[derive(Debug)]
pub struct SearchTicket {
    channel:    Arc<SolutionChannel>,
    generation: u64,
    node_type:  PathNodeType,
    counters:   Arc<QueueCounters>,
    completed:  bool,
}

impl SearchTicket {
    /// Take the right to publish `generation` into `channel`.  Counts the
    /// search as in flight until the ticket is completed or dropped.
    pub fn new(
        channel:    Arc<SolutionChannel>,
        generation: u64,
        node_type:  PathNodeType,
        counters:   Arc<QueueCounters>,
    ) -> Self {
        counters.begin(node_type);
        Self { channel, generation, node_type, counters, completed: false }
    }

    /// Generation this ticket publishes into.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Publish a solver result into the agent's channel.
    pub fn complete(mut self, result: GridResult<SolvedPath>) {
        match result {
            Ok(path) => {
                #[cfg(feature = "debug-trace")]
                self.channel.record_explored(path.explored);
                let nodes = path.waypoints.len();
                let fresh = self.channel.publish(self.generation, path.waypoints);
                trace!(generation = self.generation, nodes, fresh, "search_published");
            }
            Err(e) => {
                debug!(generation = self.generation, error = %e, "search_failed");
                self.channel.fail(self.generation);
            }
        }
        self.completed = true;
    }
}

impl Drop for SearchTicket {
    fn drop(&mut self) {
        if !self.completed {
            self.channel.fail(self.generation);
        }
        self.counters.end(self.node_type);
    }
}

// ── SearchDispatcher ──────────────────────────────────────────────────────────

/// Where searches run.
pub trait SearchDispatcher {
    fn dispatch(&self, request: SearchRequest, ticket: SearchTicket);
}

/// Solves on the calling thread.  Results are visible before `dispatch`
/// returns, which keeps tests and replays fully deterministic.
#[derive(Debug, Default)]
pub struct InlineDispatcher<S: PathSolver> {
    solver: S,
}

impl<S: PathSolver> InlineDispatcher<S> {
    /// Wrap `solver`; every dispatch runs it on the calling thread.
    pub fn new(solver: S) -> Self {
        Self { solver }
    }
}

impl<S: PathSolver> SearchDispatcher for InlineDispatcher<S> {
    fn dispatch(&self, request: SearchRequest, ticket: SearchTicket) {
        ticket.complete(self.solver.solve(&request));
    }
}

/// Solves on a dedicated rayon pool; agents poll their channel each tick.
pub struct PooledDispatcher<S: PathSolver> {
    solver: Arc<S>,
    pool:   ThreadPool,
}

impl<S: PathSolver> PooledDispatcher<S> {
    /// `threads = None` lets rayon pick one thread per core.
    pub fn new(solver: S, threads: Option<usize>) -> PathingResult<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("path-solver-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n.max(1));
        }
        let pool = builder
            .build()
            .map_err(|e| PathingError::SolverPool(e.to_string()))?;
        debug!(threads = pool.current_num_threads(), "solver_pool_ready");
        Ok(Self { solver: Arc::new(solver), pool })
    }

    /// Worker threads in the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl<S: PathSolver> SearchDispatcher for PooledDispatcher<S> {
    fn dispatch(&self, request: SearchRequest, ticket: SearchTicket) {
        let solver = Arc::clone(&self.solver);
        self.pool.spawn(move || ticket.complete(solver.solve(&request)));
    }
}

impl<D: SearchDispatcher + ?Sized> SearchDispatcher for Box<D> {
    fn dispatch(&self, request: SearchRequest, ticket: SearchTicket) {
        (**self).dispatch(request, ticket)
    }
}
