use std::collections::BTreeSet;

use nohash_hasher::IntMap;

use crate::treap::{Id, Treap};

#[inline(always)]
pub(crate) fn pack(u: u32, v: u32) -> u64 {
    (u as u64) << 32 | v as u64
}

#[cfg(test)]
#[inline(always)]
pub(crate) fn unpack(key: u64) -> (u32, u32) {
    ((key >> 32) as u32, key as u32)
}

/// Spanning forest of one level: Euler tours with one self-node per vertex
/// and two directed arc nodes per tree edge, plus the per-vertex sets of
/// non-tree neighbors whose edge level equals this forest's level.
pub(crate) struct EulerTourForest {
    level: u32,
    seq: Treap,
    // (v, v) self-pairs and both directed arcs of each tree edge.
    occurrence: IntMap<u64, Id>,
    incident: Vec<BTreeSet<u32>>,
}

impl EulerTourForest {
    pub(crate) fn new(n: usize, level: u32, seed: u64) -> Self {
        let mut seq = Treap::new(n.saturating_mul(3), seed);
        let mut occurrence = IntMap::default();
        for v in 0..n as u32 {
            let x = seq.alloc((v, v), false, false);
            occurrence.insert(pack(v, v), x);
        }
        Self {
            level,
            seq,
            occurrence,
            incident: vec![BTreeSet::new(); n],
        }
    }

    #[inline(always)]
    fn self_node(&self, v: u32) -> Id {
        self.occurrence[&pack(v, v)]
    }

    pub(crate) fn is_connected(&self, u: u32, v: u32) -> bool {
        u == v || self.seq.root_of(self.self_node(u)) == self.seq.root_of(self.self_node(v))
    }

    pub(crate) fn tree_root(&self, v: u32) -> Id {
        self.seq.root_of(self.self_node(v))
    }

    pub(crate) fn tree_size(&self, root: Id) -> usize {
        self.seq.len_of(root)
    }

    /// Rotate the tour of `v`'s tree so that `v`'s self-node comes first.
    fn reroot(&mut self, v: u32) -> Id {
        let x = self.self_node(v);
        let root = self.seq.root_of(x);
        let k = self.seq.position(x);
        if k == 0 {
            return root;
        }
        let (prefix, rest) = self.seq.split(root, k);
        self.seq.merge(rest, prefix)
    }

    /// Join the trees of `u` and `v`; they must be different. The canonical
    /// arc is flagged iff `edge_level` is this forest's own level.
    pub(crate) fn add_tree_edge(&mut self, u: u32, v: u32, edge_level: u32) {
        debug_assert!(u != v);
        debug_assert!(!self.is_connected(u, v));
        let tu = self.reroot(u);
        let tv = self.reroot(v);
        let at_level = edge_level == self.level;
        let e_uv = self.seq.alloc((u, v), at_level && u < v, false);
        let e_vu = self.seq.alloc((v, u), at_level && v < u, false);
        self.occurrence.insert(pack(u, v), e_uv);
        self.occurrence.insert(pack(v, u), e_vu);
        let t = self.seq.merge(tu, e_uv);
        let t = self.seq.merge(t, tv);
        self.seq.merge(t, e_vu);
        log::trace!("level {}: linked {u}-{v} (edge level {edge_level})", self.level);
    }

    /// Cut tree edge `{u, v}`, leaving the two sides as separate tours.
    pub(crate) fn delete_tree_edge(&mut self, u: u32, v: u32) -> bool {
        let (Some(&e_uv), Some(&e_vu)) = (
            self.occurrence.get(&pack(u, v)),
            self.occurrence.get(&pack(v, u)),
        ) else {
            return false;
        };
        self.reroot(u);
        let root = self.seq.root_of(e_uv);
        let p1 = self.seq.position(e_uv);
        let p2 = self.seq.position(e_vu);
        debug_assert!(0 < p1 && p1 < p2);

        // prefix . e_uv . v-subtour . e_vu . suffix
        let (prefix, rest) = self.seq.split(root, p1);
        let (first, rest) = self.seq.split(rest, 1);
        let (_v_tour, rest) = self.seq.split(rest, p2 - p1 - 1);
        let (second, suffix) = self.seq.split(rest, 1);
        debug_assert_eq!(first, e_uv);
        debug_assert_eq!(second, e_vu);
        self.seq.merge(prefix, suffix);

        self.occurrence.remove(&pack(u, v));
        self.occurrence.remove(&pack(v, u));
        self.seq.release(e_uv);
        self.seq.release(e_vu);
        log::trace!("level {}: cut {u}-{v}", self.level);
        true
    }

    pub(crate) fn insert_nontree(&mut self, u: u32, v: u32) {
        self.link_incident(u, v);
        self.link_incident(v, u);
    }

    fn link_incident(&mut self, u: u32, v: u32) {
        let set = &mut self.incident[u as usize];
        let was_empty = set.is_empty();
        let inserted = set.insert(v);
        debug_assert!(inserted);
        if was_empty {
            let x = self.self_node(u);
            self.seq.set_has_incident(x, true);
        }
    }

    pub(crate) fn remove_nontree(&mut self, u: u32, v: u32) -> bool {
        if !self.unlink_incident(u, v) {
            return false;
        }
        let other = self.unlink_incident(v, u);
        debug_assert!(other);
        true
    }

    fn unlink_incident(&mut self, u: u32, v: u32) -> bool {
        let set = &mut self.incident[u as usize];
        if !set.remove(&v) {
            return false;
        }
        if set.is_empty() {
            let x = self.self_node(u);
            self.seq.set_has_incident(x, false);
        }
        true
    }

    /// Take the first own-level tree edge inside the tour of `root`, clearing
    /// its flag. The tour is not rotated, so `root` stays valid across calls.
    pub(crate) fn pop_tree_edge_at_level(&mut self, root: Id) -> Option<(u32, u32)> {
        let x = self.seq.first_tree_arc(root)?;
        self.seq.set_tree_at_level(x, false);
        Some(self.seq.key(x))
    }

    pub(crate) fn first_incident_vertex(&self, root: Id) -> Option<u32> {
        self.seq.first_incident_self(root).map(|x| self.seq.key(x).0)
    }

    pub(crate) fn first_neighbor(&self, v: u32) -> Option<u32> {
        self.incident[v as usize].iter().next().copied()
    }
}

#[cfg(test)]
impl EulerTourForest {
    pub(crate) fn arc_flag(&self, u: u32, v: u32) -> Option<bool> {
        let (a, b) = if u < v { (u, v) } else { (v, u) };
        self.occurrence.get(&pack(a, b)).map(|&x| self.seq.tree_flag(x))
    }

    pub(crate) fn has_nontree(&self, u: u32, v: u32) -> bool {
        self.incident[u as usize].contains(&v)
    }

    pub(crate) fn audit(&self) {
        let n = self.incident.len() as u32;
        let mut roots = BTreeSet::new();
        for v in 0..n {
            roots.insert(self.seq.root_of(self.self_node(v)));
        }
        for &root in &roots {
            self.seq.audit_tree(root);
            self.audit_tour(root);
        }
        for v in 0..n {
            let empty = self.incident[v as usize].is_empty();
            assert_eq!(
                self.seq.incident_flag(self.self_node(v)),
                !empty,
                "incidence flag out of sync for vertex {v}"
            );
        }
    }

    fn audit_tour(&self, root: Id) {
        let order = self.seq.in_order(root);
        let mut open: Vec<(u32, u32)> = Vec::new();
        let mut selves = BTreeSet::new();
        for &x in &order {
            let (a, b) = self.seq.key(x);
            if a == b {
                assert!(selves.insert(a), "self-node {a} appears twice in tour");
                continue;
            }
            assert_eq!(self.occurrence[&pack(a, b)], x);
            if open.last() == Some(&(b, a)) {
                open.pop();
            } else {
                open.push((a, b));
            }
        }
        assert!(open.is_empty(), "unbalanced arcs in tour: {open:?}");
        // A tree on k vertices has k self-nodes and 2(k - 1) arc nodes.
        assert_eq!(order.len(), 3 * selves.len() - 2);
        for v in &selves {
            assert_eq!(self.seq.root_of(self.self_node(*v)), root);
        }
    }
}
