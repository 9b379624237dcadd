use glam::Vec3;

use crate::bounds::Aabb;

/// Stable index of a fish in the school's transform arrays.
pub type FishId = u32;

type NodeId = usize;

/// A fish that moved less than this since its last index update keeps its
/// node — avoids tree churn from sub-visual jitter.
const MOVE_THRESHOLD: f32 = 0.1;
const MOVE_THRESHOLD_SQ: f32 = MOVE_THRESHOLD * MOVE_THRESHOLD;

/// One indexed fish: id plus the position it was indexed at.
#[derive(Debug, Clone, Copy)]
struct Entry {
    id: FishId,
    pos: Vec3,
}

struct Node {
    bounds: Aabb,
    parent: Option<NodeId>,
    /// Fish held directly by this node. Non-empty on internal nodes only
    /// for the float-edge fallback case where no child contains the point.
    entries: Vec<Entry>,
    children: Option<[NodeId; 8]>,
}

/// Recursive octree over fish positions.
///
/// Nodes live in an arena with a free list so subdivide/collapse cycles
/// don't thrash the allocator. A side-table maps each fish to its holding
/// node for O(1) removal and move updates.
pub struct Octree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    /// FishId -> holding node. `None` means the fish is un-indexed
    /// (outside the root bounds).
    locator: Vec<Option<NodeId>>,
    max_occupancy: usize,
    min_node_size: f32,
    len: usize,
}

impl Octree {
    pub fn new(bounds: Aabb, max_occupancy: usize, min_node_size: f32) -> Self {
        Self {
            nodes: vec![Node {
                bounds,
                parent: None,
                entries: Vec::new(),
                children: None,
            }],
            free: Vec::new(),
            locator: Vec::new(),
            max_occupancy,
            min_node_size,
            len: 0,
        }
    }

    /// Number of fish currently indexed. Can be less than the school size
    /// when fish sit outside the root bounds.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    pub fn contains(&self, fish: FishId) -> bool {
        matches!(self.locator.get(fish as usize), Some(Some(_)))
    }

    /// Insert a fish at `pos`. Silently a no-op when `pos` is outside the
    /// root bounds; the fish just stays un-indexed until it comes back.
    pub fn insert(&mut self, fish: FishId, pos: Vec3) {
        if !self.nodes[0].bounds.contains(pos) {
            return;
        }
        self.ensure_locator(fish);
        debug_assert!(self.locator[fish as usize].is_none(), "double insert");

        let mut node = 0;
        while let Some(children) = self.nodes[node].children {
            // Children exactly partition the volume, so at most one child
            // matches. A point on a shared face can miss all eight; keep
            // it in the current node rather than lose it.
            match children
                .iter()
                .find(|&&c| self.nodes[c].bounds.contains(pos))
            {
                Some(&child) => node = child,
                None => break,
            }
        }

        self.nodes[node].entries.push(Entry { id: fish, pos });
        self.locator[fish as usize] = Some(node);
        self.len += 1;
        self.maybe_subdivide(node);
    }

    /// Insert many fish at once (bulk spawn path).
    pub fn insert_batch(&mut self, batch: impl IntoIterator<Item = (FishId, Vec3)>) {
        for (fish, pos) in batch {
            self.insert(fish, pos);
        }
    }

    /// Remove a fish from the index. No-op if it was never indexed.
    pub fn remove(&mut self, fish: FishId) {
        let Some(Some(node)) = self.locator.get(fish as usize).copied() else {
            return;
        };
        let slot = self.nodes[node]
            .entries
            .iter()
            .position(|e| e.id == fish)
            .expect("locator points at a node that does not hold the fish");
        self.nodes[node].entries.swap_remove(slot);
        self.locator[fish as usize] = None;
        self.len -= 1;

        // Collapse cascade: the emptied node first (it may be internal in
        // the fallback case), then every ancestor that qualifies, so a
        // fully drained subtree folds back into a bare root.
        let mut cur = Some(node);
        while let Some(n) = cur {
            self.try_collapse(n);
            cur = self.nodes[n].parent;
        }
    }

    /// Re-index a fish after it moved. The position it was last indexed at
    /// serves as "previous": sub-threshold motion skips the update entirely,
    /// so jitter never churns the tree but slow drift still accumulates
    /// until it crosses the threshold. Relocation only happens when the
    /// holding node no longer contains the new position. Un-indexed fish
    /// that are back inside the root bounds get re-inserted here
    /// (self-healing after a boundary excursion).
    pub fn update_position(&mut self, fish: FishId, pos: Vec3) {
        let node = match self.locator.get(fish as usize).copied().flatten() {
            Some(n) => n,
            None => {
                self.ensure_locator(fish);
                self.insert(fish, pos);
                return;
            }
        };
        let slot = self.nodes[node]
            .entries
            .iter()
            .position(|e| e.id == fish)
            .expect("locator points at a node that does not hold the fish");
        if (pos - self.nodes[node].entries[slot].pos).length_squared() < MOVE_THRESHOLD_SQ {
            return;
        }
        if self.nodes[node].bounds.contains(pos) {
            // Same node; just refresh the cached position.
            self.nodes[node].entries[slot].pos = pos;
            return;
        }
        self.remove(fish);
        self.insert(fish, pos);
    }

    /// Collect every indexed fish within `radius` of `point` into `out`.
    /// `out` is cleared first; reuse the buffer across calls.
    pub fn query_neighbors(&self, point: Vec3, radius: f32, out: &mut Vec<FishId>) {
        out.clear();
        if radius < 0.0 {
            return;
        }
        self.query_node(0, point, radius * radius, out);
    }

    fn query_node(&self, node: NodeId, point: Vec3, radius_sq: f32, out: &mut Vec<FishId>) {
        let n = &self.nodes[node];
        if n.bounds.dist_sq(point) > radius_sq {
            return;
        }
        // Internal nodes can hold fallback fish, so always scan contents.
        for e in &n.entries {
            if e.pos.distance_squared(point) <= radius_sq {
                out.push(e.id);
            }
        }
        if let Some(children) = n.children {
            for child in children {
                self.query_node(child, point, radius_sq, out);
            }
        }
    }

    /// Walk every live node. Callback gets (bounds, depth, direct occupancy).
    pub fn visit_nodes(&self, mut f: impl FnMut(&Aabb, usize, usize)) {
        self.visit(0, 0, &mut f);
    }

    fn visit(&self, node: NodeId, depth: usize, f: &mut impl FnMut(&Aabb, usize, usize)) {
        let n = &self.nodes[node];
        f(&n.bounds, depth, n.entries.len());
        if let Some(children) = n.children {
            for child in children {
                self.visit(child, depth + 1, f);
            }
        }
    }

    fn ensure_locator(&mut self, fish: FishId) {
        let idx = fish as usize;
        if idx >= self.locator.len() {
            self.locator.resize(idx + 1, None);
        }
    }

    fn maybe_subdivide(&mut self, node: NodeId) {
        if self.nodes[node].children.is_some() {
            return;
        }
        if self.nodes[node].entries.len() <= self.max_occupancy {
            return;
        }
        if self.nodes[node].bounds.size_x() <= self.min_node_size * 2.0 {
            return;
        }

        let bounds = self.nodes[node].bounds;
        let mut children = [0; 8];
        for (i, child) in children.iter_mut().enumerate() {
            *child = self.alloc_node(bounds.octant(i), Some(node));
        }
        self.nodes[node].children = Some(children);

        // Redistribute; entries on a shared face stay in the parent.
        let entries = std::mem::take(&mut self.nodes[node].entries);
        for e in entries {
            let target = children
                .iter()
                .copied()
                .find(|&c| self.nodes[c].bounds.contains(e.pos));
            match target {
                Some(c) => {
                    self.nodes[c].entries.push(e);
                    self.locator[e.id as usize] = Some(c);
                }
                None => self.nodes[node].entries.push(e),
            }
        }
        for child in children {
            self.maybe_subdivide(child);
        }
    }

    fn try_collapse(&mut self, node: NodeId) {
        let Some(children) = self.nodes[node].children else {
            return;
        };
        // Only the deepest internal nodes collapse.
        if children.iter().any(|&c| self.nodes[c].children.is_some()) {
            return;
        }
        let combined: usize = self.nodes[node].entries.len()
            + children
                .iter()
                .map(|&c| self.nodes[c].entries.len())
                .sum::<usize>();
        if combined > self.max_occupancy {
            return;
        }
        for child in children {
            let entries = std::mem::take(&mut self.nodes[child].entries);
            for e in &entries {
                self.locator[e.id as usize] = Some(node);
            }
            self.nodes[node].entries.extend(entries);
            self.free_node(child);
        }
        self.nodes[node].children = None;
    }

    fn alloc_node(&mut self, bounds: Aabb, parent: Option<NodeId>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                let n = &mut self.nodes[id];
                n.bounds = bounds;
                n.parent = parent;
                n.entries.clear();
                n.children = None;
                id
            }
            None => {
                self.nodes.push(Node {
                    bounds,
                    parent,
                    entries: Vec::new(),
                    children: None,
                });
                self.nodes.len() - 1
            }
        }
    }

    fn free_node(&mut self, id: NodeId) {
        self.nodes[id].entries.clear();
        self.nodes[id].children = None;
        self.free.push(id);
    }

    /// Test-only structural audit: every indexed fish appears in exactly
    /// one node, and the locator agrees with where it actually sits.
    #[cfg(test)]
    fn check_invariants(&self) {
        let mut seen = std::collections::HashMap::new();
        let mut stack = vec![0usize];
        while let Some(node) = stack.pop() {
            for e in &self.nodes[node].entries {
                assert!(
                    seen.insert(e.id, node).is_none(),
                    "fish {} indexed twice",
                    e.id
                );
                assert!(
                    self.nodes[node].bounds.contains(e.pos)
                        || self.nodes[node].parent.is_none(),
                    "fish {} cached outside its node",
                    e.id
                );
            }
            if let Some(children) = self.nodes[node].children {
                stack.extend(children);
            }
        }
        assert_eq!(seen.len(), self.len, "len out of sync with contents");
        for (i, loc) in self.locator.iter().enumerate() {
            match loc {
                Some(node) => assert_eq!(seen.get(&(i as FishId)), Some(node)),
                None => assert!(!seen.contains_key(&(i as FishId))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Octree {
        Octree::new(Aabb::cube(Vec3::ZERO, 10.0), 4, 0.5)
    }

    fn random_point(rng: &mut fastrand::Rng, half: f32) -> Vec3 {
        Vec3::new(
            (rng.f32() * 2.0 - 1.0) * half,
            (rng.f32() * 2.0 - 1.0) * half,
            (rng.f32() * 2.0 - 1.0) * half,
        )
    }

    #[test]
    fn self_query_hits() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut t = tree();
        let mut points = Vec::new();
        for i in 0..200 {
            let p = random_point(&mut rng, 10.0);
            t.insert(i, p);
            points.push(p);
        }
        let mut out = Vec::new();
        for (i, &p) in points.iter().enumerate() {
            t.query_neighbors(p, 0.0, &mut out);
            assert!(out.contains(&(i as FishId)), "fish {i} missing at r=0");
        }
    }

    #[test]
    fn out_of_bounds_insert_is_noop() {
        let mut t = tree();
        t.insert(0, Vec3::new(11.0, 0.0, 0.0));
        t.insert(1, Vec3::new(0.0, -200.0, 0.0));
        assert_eq!(t.len(), 0);
        assert!(!t.contains(0));
        t.check_invariants();
    }

    #[test]
    fn subdivide_collapse_round_trip() {
        let mut t = tree();
        // Cluster in one octant to force subdivision.
        for i in 0..20 {
            t.insert(i, Vec3::new(5.0, 5.0, 5.0) + Vec3::splat(i as f32 * 0.01));
        }
        let mut max_depth = 0;
        t.visit_nodes(|_, depth, _| max_depth = max_depth.max(depth));
        assert!(max_depth > 0, "expected subdivision");
        t.check_invariants();

        for i in 0..20 {
            t.remove(i);
        }
        assert_eq!(t.len(), 0);
        let mut nodes = 0;
        t.visit_nodes(|_, _, _| nodes += 1);
        assert_eq!(nodes, 1, "tree should collapse back to a bare root");
    }

    #[test]
    fn randomized_ops_keep_invariants() {
        let mut rng = fastrand::Rng::with_seed(42);
        let mut t = tree();
        let mut alive: Vec<Option<Vec3>> = vec![None; 300];
        for step in 0..3000 {
            let id = rng.u32(0..300);
            match alive[id as usize] {
                None => {
                    let p = random_point(&mut rng, 10.0);
                    t.insert(id, p);
                    alive[id as usize] = Some(p);
                }
                Some(_) => {
                    if rng.f32() < 0.4 {
                        t.remove(id);
                        alive[id as usize] = None;
                    } else {
                        let p = random_point(&mut rng, 10.0);
                        t.update_position(id, p);
                        alive[id as usize] = Some(p);
                    }
                }
            }
            if step % 500 == 0 {
                t.check_invariants();
            }
        }
        t.check_invariants();
        assert_eq!(t.len(), alive.iter().flatten().count());
    }

    #[test]
    fn radius_query_matches_brute_force() {
        let mut rng = fastrand::Rng::with_seed(9);
        let mut t = tree();
        let mut points = Vec::new();
        for i in 0..500 {
            let p = random_point(&mut rng, 10.0);
            t.insert(i, p);
            points.push(p);
        }
        let mut out = Vec::new();
        for _ in 0..50 {
            let center = random_point(&mut rng, 10.0);
            let radius = rng.f32() * 6.0;
            t.query_neighbors(center, radius, &mut out);
            let mut got: Vec<FishId> = out.clone();
            got.sort_unstable();
            let mut want: Vec<FishId> = points
                .iter()
                .enumerate()
                .filter(|(_, p)| p.distance_squared(center) <= radius * radius)
                .map(|(i, _)| i as FishId)
                .collect();
            want.sort_unstable();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn update_position_relocates_across_nodes() {
        let mut rng = fastrand::Rng::with_seed(5);
        let mut t = tree();
        for i in 0..50 {
            t.insert(i, random_point(&mut rng, 10.0));
        }
        // Drag one fish corner to corner; queries must follow it.
        t.remove(0);
        t.insert(0, Vec3::new(-9.0, -9.0, -9.0));
        let dest = Vec3::new(9.0, 9.0, 9.0);
        t.update_position(0, dest);
        let mut out = Vec::new();
        t.query_neighbors(dest, 0.1, &mut out);
        assert!(out.contains(&0));
        t.check_invariants();
    }

    #[test]
    fn out_of_bounds_fish_reenters_via_update() {
        let mut t = tree();
        t.insert(0, Vec3::new(50.0, 0.0, 0.0)); // dropped
        assert!(!t.contains(0));
        t.update_position(0, Vec3::new(3.0, 0.0, 0.0));
        assert!(t.contains(0));
        assert_eq!(t.len(), 1);
    }
}
