//! Per-agent life-cycle state.

/// Where an agent is in its pathfinding life cycle.
///
/// Every state has a defined transition on every tick, including self-loops;
/// the state machine never gets stuck in a state it cannot leave.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathState {
    /// Idle.  Dispatches the next stacked or queued goal, if any.
    #[default]
    Resting,
    /// A search is in flight; waiting on the solution channel.
    PathFindingCalc,
    /// A solution is loaded; the next node has not been claimed yet.
    PathFindingReady,
    /// Walking toward a claimed node.
    PathFindingMoving,
    /// Yielding to a peer for a fixed interval.
    PausePathfinding,
    /// Like `PathFindingReady`, but the solution leads to a detour waypoint.
    PathFindingTempGoal,
    /// Generic motion, used for "move out of the way" maneuvers and relayed
    /// client moves.
    Moving,
    /// Escort/helper unit driven by external logic; never negotiates.
    BotHelper,
}

impl PathState {
    /// `true` for the two states that integrate steering.
    #[inline]
    pub fn is_moving(self) -> bool {
        matches!(self, PathState::Moving | PathState::PathFindingMoving)
    }

    /// `true` if the agent is parked and can be asked to step aside.
    #[inline]
    pub fn is_parked(self) -> bool {
        matches!(self, PathState::Resting)
    }

    /// Short name used in logs and `Display`.
    pub fn as_str(self) -> &'static str {
        match self {
            PathState::Resting             => "resting",
            PathState::PathFindingCalc     => "calc",
            PathState::PathFindingReady    => "ready",
            PathState::PathFindingMoving   => "path_moving",
            PathState::PausePathfinding    => "paused",
            PathState::PathFindingTempGoal => "temp_goal",
            PathState::Moving              => "moving",
            PathState::BotHelper           => "bot_helper",
        }
    }
}

impl std::fmt::Display for PathState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
