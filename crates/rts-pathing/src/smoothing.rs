//! Line-of-sight waypoint pruning.

use glam::Vec3;
use rts_grid::LineOfSight;

/// A sight test that is always clear.  Used for air units.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unobstructed;

impl LineOfSight for Unobstructed {
    fn is_clear(&self, _from: Vec3, _to: Vec3) -> bool {
        true
    }
}

/// Drop every waypoint `b` in a run `a, b, c` where `a` sees `c`.
///
/// Passes repeat until nothing more can be removed, so the result is a fixed
/// point: smoothing it again returns it unchanged.  Endpoints are always
/// kept.
pub fn smooth_path<L: LineOfSight + ?Sized>(nodes: &[Vec3], sight: &L) -> Vec<Vec3> {
    let mut path = nodes.to_vec();
    loop {
        let before = path.len();
        path = smooth_pass(&path, sight);
        if path.len() == before {
            return path;
        }
    }
}

fn smooth_pass<L: LineOfSight + ?Sized>(nodes: &[Vec3], sight: &L) -> Vec<Vec3> {
    if nodes.len() <= 2 {
        return nodes.to_vec();
    }
    let mut out = Vec::with_capacity(nodes.len());
    let mut anchor = 0;
    out.push(nodes[0]);
    let mut i = 1;
    while i < nodes.len() - 1 {
        if sight.is_clear(nodes[anchor], nodes[i + 1]) {
            i += 1;
            continue;
        }
        out.push(nodes[i]);
        anchor = i;
        i += 1;
    }
    out.push(nodes[nodes.len() - 1]);
    out
}
