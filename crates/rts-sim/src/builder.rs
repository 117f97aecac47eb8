//! Fluent builder for constructing a [`Sim`].

use std::sync::Arc;

use glam::Vec3;
use tracing::info;

use rts_core::{PlayerId, SimConfig};
use rts_grid::{GridSettings, NeighborTransforms, Obstacle, ObstacleSet, OccupancyGrid};
use rts_pathing::{
    EntityKind, EventLog, ForceBehavior, NetworkRelay, PathingConfig, QueueCounters, SearchDispatcher, Seek,
};

use crate::{Sim, SimError, SimResult};

/// Everything needed to put one unit on the map.
#[derive(Clone, Debug)]
pub struct UnitSpec {
    pub player:                  PlayerId,
    pub kind:                    EntityKind,
    pub position:                Vec3,
    pub max_speed:               f32,
    pub collision_radius:        f32,
    /// Footprint edge in nodes.
    pub scale:                   u8,
    pub ignore_occupied_by_flag: bool,
    pub can_pass_over_blocked:   bool,
}

impl UnitSpec {
    /// Unit of `kind` for `player`.  Buildings take their footprint as scale.
    pub fn new(player: PlayerId, kind: EntityKind, position: Vec3, max_speed: f32) -> Self {
        let scale = match kind {
            EntityKind::Building { footprint } => footprint.max(1),
            _                                  => 1,
        };
        Self {
            player,
            kind,
            position,
            max_speed,
            collision_radius:        0.4,
            scale,
            ignore_occupied_by_flag: false,
            can_pass_over_blocked:   false,
        }
    }

    /// Collision radius used by the non-penetration pass.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.collision_radius = radius;
        self
    }

    /// Footprint edge in nodes.  Clamped to at least 1.
    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale.max(1);
        self
    }

    /// Peers may ask this unit to step aside at once.
    pub fn deferring(mut self) -> Self {
        self.ignore_occupied_by_flag = true;
        self
    }

    /// Ground unit that walks over blocked terrain.
    pub fn passing_blocked(mut self) -> Self {
        self.can_pass_over_blocked = true;
        self
    }
}

/// Fluent builder for [`Sim<D, N, F>`].
///
/// # Required inputs
///
/// - [`SimConfig`]: tick rate, length, seed, network role
/// - `D: SearchDispatcher`: where searches run (inline or pooled)
/// - `N: NetworkRelay`: where host move commands go
///
/// # Optional inputs (have defaults)
///
/// | Method              | Default                         |
/// |---------------------|---------------------------------|
/// | `.grid(s)`          | `GridSettings::default()`       |
/// | `.pathing(c)`       | `PathingConfig::default()`      |
/// | `.obstacle(o)`      | none                            |
/// | `.blocked(x, z, n)` | none                            |
/// | `.unit(spec)`       | none                            |
/// | `.behavior(f)`      | `Seek::default()`               |
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = InlineDispatcher::new(GridSolver::default());
/// let mut sim = SimBuilder::new(config, dispatcher, NoopRelay)
///     .grid(GridSettings { width: 32, height: 32, ..Default::default() })
///     .unit(UnitSpec::new(PlayerId(0), EntityKind::Infantry, pos, 3.0))
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder<D: SearchDispatcher, N: NetworkRelay, F: ForceBehavior = Seek> {
    config:     SimConfig,
    dispatcher: D,
    relay:      N,
    behavior:   F,
    settings:   GridSettings,
    pathing:    PathingConfig,
    obstacles:  ObstacleSet,
    blocked:    Vec<(i32, i32, u32)>,
    units:      Vec<UnitSpec>,
}

impl<D: SearchDispatcher, N: NetworkRelay> SimBuilder<D, N, Seek> {
    /// Create a builder with all required inputs.
    pub fn new(config: SimConfig, dispatcher: D, relay: N) -> Self {
        Self {
            config,
            dispatcher,
            relay,
            behavior:  Seek::default(),
            settings:  GridSettings::default(),
            pathing:   PathingConfig::default(),
            obstacles: ObstacleSet::new(),
            blocked:   Vec::new(),
            units:     Vec::new(),
        }
    }
}

impl<D: SearchDispatcher, N: NetworkRelay, F: ForceBehavior> SimBuilder<D, N, F> {
    /// Grid dimensions and placement.
    pub fn grid(mut self, settings: GridSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Movement-core timers and constants.
    pub fn pathing(mut self, pathing: PathingConfig) -> Self {
        self.pathing = pathing;
        self
    }

    /// Static scene obstacle.  Its footprint is stamped as blocked terrain
    /// and it occludes path smoothing.
    pub fn obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    /// Block a `size`×`size` terrain footprint anchored at `(x, z)`.
    pub fn blocked(mut self, x: i32, z: i32, size: u32) -> Self {
        self.blocked.push((x, z, size));
        self
    }

    /// Spawn one unit at build time.
    pub fn unit(mut self, spec: UnitSpec) -> Self {
        self.units.push(spec);
        self
    }

    /// Spawn several units at build time, in order.
    pub fn units(mut self, specs: impl IntoIterator<Item = UnitSpec>) -> Self {
        self.units.extend(specs);
        self
    }

    /// Replace the steering force source.
    pub fn behavior<G: ForceBehavior>(self, behavior: G) -> SimBuilder<D, N, G> {
        SimBuilder {
            config:     self.config,
            dispatcher: self.dispatcher,
            relay:      self.relay,
            behavior,
            settings:   self.settings,
            pathing:    self.pathing,
            obstacles:  self.obstacles,
            blocked:    self.blocked,
            units:      self.units,
        }
    }

    /// Validate inputs, stamp terrain, place units, and return a ready-to-run
    /// [`Sim`].
    pub fn build(self) -> SimResult<Sim<D, N, F>> {
        self.config.validate()?;
        for (name, value) in [
            ("pause_secs", self.pathing.pause_secs),
            ("friction", self.pathing.friction),
            ("unpatience_limit_secs", self.pathing.unpatience_limit_secs),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(SimError::Config(format!("{name} must be non-negative, got {value}")));
            }
        }
        let blend = self.pathing.heading_smoothing;
        if blend.is_nan() || blend <= 0.0 || blend > 1.0 {
            return Err(SimError::Config("heading_smoothing must lie in (0, 1]".into()));
        }

        // ── Terrain ───────────────────────────────────────────────────────
        let mut grid = OccupancyGrid::new(&self.settings)?;
        for &(x, z, size) in &self.blocked {
            grid.set_cost(x, z, rts_grid::BLOCKED, size);
        }
        self.obstacles.stamp(&mut grid);

        let mut sim = Sim {
            clock:      self.config.make_clock(),
            config:     self.config,
            transforms: NeighborTransforms::new(self.pathing.goal_search_radius),
            pathing:    self.pathing,
            grid,
            obstacles:  self.obstacles,
            agents:     Vec::new(),
            bodies:     Vec::new(),
            dispatcher: self.dispatcher,
            relay:      self.relay,
            behavior:   self.behavior,
            counters:   Arc::new(QueueCounters::new()),
            events:     EventLog::new(),
            violations: 0,
        };

        // ── Units ─────────────────────────────────────────────────────────
        for spec in self.units {
            sim.spawn_unit(spec)?;
        }
        info!(
            units = sim.agents.len(),
            width = sim.grid.field().width(),
            height = sim.grid.field().height(),
            role = ?sim.config.role,
            "sim_built"
        );
        Ok(sim)
    }
}
