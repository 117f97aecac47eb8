//! skirmish: two armies cross a walled map on a host while a client mirrors
//! them from relayed move commands.
//!
//! The host searches on a worker pool, negotiates occupancy, and relays every
//! move decision.  The client never searches; it replays the relayed moves
//! in lockstep.  At the end the demo reports how far the two drifted apart.
//!
//! Run with:
//!   RUST_LOG=info cargo run -p skirmish --release
//!
//! Overrides: `SKIRMISH_UNITS`, `SKIRMISH_TICKS`, `SKIRMISH_SEED`.

use std::str::FromStr;
use std::time::Instant;

use anyhow::Result;
use glam::{Vec2, Vec3};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rts_core::{NetRole, PlayerId, SimConfig, SimRng, Tick, UnitId};
use rts_grid::{GridSettings, GridSolver, Obstacle};
use rts_pathing::{
    CommandQueueRelay, EntityKind, InlineDispatcher, NoopRelay, PathEvent, PathingError, PooledDispatcher,
};
use rts_sim::{SimBuilder, SimObserver, TickStats, TracingObserver, UnitSpec};

// ── Constants ─────────────────────────────────────────────────────────────────

const MAP_SIZE:      u32 = 64;
const TICK_HZ:       u32 = 30;
const DEFAULT_UNITS: usize = 48;
const DEFAULT_TICKS: u64 = 90 * TICK_HZ as u64;
const DEFAULT_SEED:  u64 = 42;
const HQ_FOOTPRINT:  u8  = 3;

// ── Setup helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

fn node(x: i32, z: i32) -> Vec3 {
    Vec3::new(x as f32 + 0.5, 0.0, z as f32 + 0.5)
}

/// Two wall segments down the middle leave three gaps to funnel through.
fn walls() -> [Obstacle; 2] {
    [
        Obstacle::from_center(Vec3::new(32.0, 0.0, 18.0), Vec2::new(1.0, 9.0)),
        Obstacle::from_center(Vec3::new(32.0, 0.0, 46.0), Vec2::new(1.0, 9.0)),
    ]
}

/// Base column range of `player`.
fn base_columns(player: u16) -> std::ops::Range<i32> {
    if player == 0 { 2..12 } else { 52..62 }
}

fn army(units: usize, rng: &mut SimRng) -> Vec<UnitSpec> {
    let mut specs = Vec::with_capacity(units + 2);
    for player in 0..2u16 {
        let hq_x = if player == 0 { 3 } else { 58 };
        specs.push(UnitSpec::new(
            PlayerId(player),
            EntityKind::Building { footprint: HQ_FOOTPRINT },
            node(hq_x, 30),
            0.0,
        ));
    }
    for i in 0..units {
        let player = (i % 2) as u16;
        let position = node(rng.gen_range(base_columns(player)), rng.gen_range(4..60));
        let spec = match i {
            i if i % 10 == 9 => UnitSpec::new(PlayerId(player), EntityKind::Aircraft, position + Vec3::Y * 4.0, 7.0),
            i if i % 8 == 7  => UnitSpec::new(PlayerId(player), EntityKind::Vehicle, position, 5.0).with_radius(0.45),
            _                => UnitSpec::new(PlayerId(player), EntityKind::Infantry, position, 3.5),
        };
        specs.push(spec);
    }
    specs
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// Tallies the run while forwarding everything to `tracing`.
#[derive(Default)]
struct Scoreboard {
    goals:          usize,
    claims:         usize,
    violations:     usize,
    peak_in_flight: usize,
    peak_paused:    usize,
}

impl SimObserver for Scoreboard {
    fn on_path_event(&mut self, tick: Tick, event: &PathEvent) {
        if matches!(event, PathEvent::GoalCompleted { .. }) {
            self.goals += 1;
        }
        TracingObserver.on_path_event(tick, event);
    }

    fn on_invariant_violation(&mut self, tick: Tick, unit: UnitId, error: &PathingError) {
        self.violations += 1;
        TracingObserver.on_invariant_violation(tick, unit, error);
    }

    fn on_tick_end(&mut self, tick: Tick, stats: &TickStats) {
        self.claims += stats.claims;
        self.peak_in_flight = self.peak_in_flight.max(stats.in_flight);
        self.peak_paused = self.peak_paused.max(stats.paused);
        if tick.0 % (10 * TICK_HZ as u64) == 0 {
            info!(
                %tick,
                moving = stats.moving,
                calculating = stats.calculating,
                paused = stats.paused,
                resting = stats.resting,
                "progress"
            );
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_tracing();

    let units: usize = env_or("SKIRMISH_UNITS", DEFAULT_UNITS);
    let ticks: u64 = env_or("SKIRMISH_TICKS", DEFAULT_TICKS);
    let seed: u64 = env_or("SKIRMISH_SEED", DEFAULT_SEED);
    info!(units, ticks, seed, "skirmish_start");

    let config = |role: NetRole| SimConfig {
        tick_hz: TICK_HZ,
        total_ticks: ticks,
        seed,
        solver_threads: None,
        role,
    };
    let grid = GridSettings { width: MAP_SIZE, height: MAP_SIZE, ..GridSettings::default() };

    let mut rng = SimRng::new(seed);
    let specs = army(units, &mut rng);

    // ── Host ──────────────────────────────────────────────────────────────
    let host_config = config(NetRole::Host);
    let pool = PooledDispatcher::new(GridSolver::default(), host_config.solver_threads)?;
    info!(threads = pool.threads(), "solver_pool");
    let [wall_a, wall_b] = walls();
    let mut host = SimBuilder::new(host_config, pool, CommandQueueRelay::new())
        .grid(grid.clone())
        .obstacle(wall_a)
        .obstacle(wall_b)
        .units(specs.iter().cloned())
        .build()?;

    // ── Client ────────────────────────────────────────────────────────────
    // Spawned where the host actually placed each unit.
    let mirrored = specs
        .iter()
        .zip(&host.bodies)
        .map(|(spec, body)| UnitSpec { position: body.position, ..spec.clone() });
    let [wall_a, wall_b] = walls();
    let mut client = SimBuilder::new(
        config(NetRole::Client),
        InlineDispatcher::new(GridSolver::default()),
        NoopRelay,
    )
    .grid(grid)
    .obstacle(wall_a)
    .obstacle(wall_b)
    .units(mirrored)
    .build()?;

    // ── Orders ────────────────────────────────────────────────────────────
    let enemy_hq = |player: u16| if player == 0 { node(59, 31) } else { node(4, 31) };
    for i in 0..host.agents.len() {
        if !host.bodies[i].kind.is_mobile() {
            continue;
        }
        let id = host.agents[i].unit;
        let player = host.agents[i].player.0;
        let far_side = base_columns(1 - player);
        let goal = node(rng.gen_range(far_side), rng.gen_range(4..60));
        host.add_waypoint_goal(id, goal, false)?;
        if rng.gen_bool(0.3) {
            let rally = node(rng.gen_range(24..40), rng.gen_range(28..36));
            host.add_waypoint_goal(id, rally, true)?;
        }
        if player == 1 && i % 4 == 0 {
            host.set_attack_target(id, Some(enemy_hq(player)))?;
        }
    }

    // ── Lockstep run ──────────────────────────────────────────────────────
    let started = Instant::now();
    let mut score = Scoreboard::default();
    let mut relayed = 0usize;
    for _ in 0..ticks {
        host.run_ticks(1, &mut score)?;
        for command in host.relay.drain() {
            client.apply_move_command(&command)?;
            relayed += 1;
        }
        client.run_ticks(1, &mut TracingObserver)?;
    }
    TracingObserver.on_sim_end(host.clock.current_tick);

    // ── Summary ───────────────────────────────────────────────────────────
    let drift: Vec<f32> = host
        .bodies
        .iter()
        .zip(&client.bodies)
        .filter(|(h, _)| h.kind.is_mobile())
        .map(|(h, c)| rts_core::planar::distance(h.position, c.position))
        .collect();
    let max_drift = drift.iter().copied().fold(0.0f32, f32::max);
    let mean_drift = if drift.is_empty() { 0.0 } else { drift.iter().sum::<f32>() / drift.len() as f32 };

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        sim_secs = host.clock.elapsed_secs(),
        goals = score.goals,
        claims = score.claims,
        relayed,
        violations = score.violations,
        peak_in_flight = score.peak_in_flight,
        peak_paused = score.peak_paused,
        reservations = host.grid.reservation_count(),
        mean_drift,
        max_drift,
        "skirmish_done"
    );
    Ok(())
}
