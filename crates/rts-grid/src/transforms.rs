//! Precomputed neighbour offset tables.

/// The eight neighbours of a node, counter-clockwise from +X.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Node offsets within a disc of `radius` nodes, sorted by distance from the
/// centre (a spiral walk).  `(0, 0)` comes first.
///
/// Ties are broken by `(dz, dx)` so the order, and therefore which free node
/// a search settles on, is the same on every machine.
#[derive(Clone, Debug)]
pub struct NeighborTransforms {
    offsets: Vec<(i32, i32)>,
    radius:  u32,
}

impl NeighborTransforms {
    /// Build the spiral for a disc of `radius` nodes.
    pub fn new(radius: u32) -> Self {
        let r = radius as i32;
        let mut offsets: Vec<(i32, i32)> = (-r..=r)
            .flat_map(|dz| (-r..=r).map(move |dx| (dx, dz)))
            .filter(|&(dx, dz)| dx * dx + dz * dz <= r * r)
            .collect();
        offsets.sort_by_key(|&(dx, dz)| (dx * dx + dz * dz, dz, dx));
        Self { offsets, radius }
    }

    /// Disc radius in nodes.
    #[inline]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offsets `(dx, dz)`, nearest first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.offsets.iter().copied()
    }
}
