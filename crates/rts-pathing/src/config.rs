//! Tuning knobs for the movement core.

/// Timers, steering constants, and search radii shared by all agents.
///
/// All durations are simulated seconds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PathingConfig {
    /// How long `PausePathfinding` lasts before the claim is retried.
    pub pause_secs:            f32,
    /// Interval of the "resting on blocked terrain" check.
    pub block_recheck_secs:    f32,
    /// Interval of the alternate attack-stance search.
    pub alt_goal_recheck_secs: f32,
    /// Time spent paused behind a peer before the agent repaths.
    pub unpatience_limit_secs: f32,
    /// Exponential velocity decay per second.
    pub friction:              f32,
    /// Gain of the default seek behaviour.
    pub steering_gain:         f32,
    /// Blend factor of the smoothed heading per integration step, in `(0, 1]`.
    pub heading_smoothing:     f32,
    /// Drop collinear waypoints after each successful search.
    pub smooth_paths:          bool,
    /// Radius, in nodes, of the free-node spiral search.
    pub goal_search_radius:    u32,
    /// A repath target this close to the original goal's node centre means
    /// "nowhere better to go"; the agent gives up.
    pub give_up_epsilon:       f32,
    /// Distance from the target at which attack stances are sought.
    pub attack_range:          f32,
    /// Upcoming path nodes an evading unit must not step onto.
    pub lookahead_nodes:       usize,
    /// Squared speed below which positions are not integrated.
    pub min_speed_sq:          f32,
}

impl Default for PathingConfig {
    fn default() -> Self {
        Self {
            pause_secs:            0.5,
            block_recheck_secs:    3.0,
            alt_goal_recheck_secs: 2.0,
            unpatience_limit_secs: 2.0,
            friction:              2.0,
            steering_gain:         8.0,
            heading_smoothing:     0.2,
            smooth_paths:          true,
            goal_search_radius:    6,
            give_up_epsilon:       0.5,
            attack_range:          3.0,
            lookahead_nodes:       4,
            min_speed_sq:          0.1,
        }
    }
}
