//! Path-node classification and network role, shared by every crate that
//! touches the occupancy grid.

/// Which occupancy sub-grid a unit lives in.
///
/// Fixed at unit creation.  Air units never collide-check against ground
/// occupancy and ignore blocked terrain.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathNodeType {
    #[default]
    Ground,
    Air,
}

impl PathNodeType {
    /// `true` if units of this type are stopped by blocked terrain.
    #[inline]
    pub fn respects_terrain(self) -> bool {
        matches!(self, PathNodeType::Ground)
    }

    /// Lower-case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            PathNodeType::Ground => "ground",
            PathNodeType::Air    => "air",
        }
    }
}

impl std::fmt::Display for PathNodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where this simulation sits in a networked game.
///
/// Only the host computes paths, mutates occupancy, and broadcasts move
/// commands.  Clients apply received commands and never search.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetRole {
    /// Single-player: authoritative, nothing is relayed.
    #[default]
    Standalone,
    /// Authoritative host: computes and relays.
    Host,
    /// Receptive client: applies host commands only.
    Client,
}

impl NetRole {
    /// `true` if this simulation owns path search and occupancy.
    #[inline]
    pub fn is_authoritative(self) -> bool {
        !matches!(self, NetRole::Client)
    }

    /// `true` if move decisions must be forwarded to clients.
    #[inline]
    pub fn relays(self) -> bool {
        matches!(self, NetRole::Host)
    }
}
