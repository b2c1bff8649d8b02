use nohash_hasher::IntMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::ett::{EulerTourForest, pack};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("edge {u}-{v} is not present")]
    EdgeNotPresent { u: usize, v: usize },
    #[error("vertex {v} out of range for a graph on {n} vertices")]
    VertexOutOfRange { v: usize, n: usize },
    #[error("self-loop at vertex {v}")]
    SelfLoop { v: usize },
}

/// Fully dynamic connectivity over an undirected simple graph on a fixed
/// vertex set. One Euler-tour forest per edge level; a deleted tree edge
/// triggers a replacement search that promotes edges upward, keeping every
/// level-ℓ component within n / 2^ℓ vertices.
pub struct DynamicGraph {
    n: usize,
    forests: Vec<EulerTourForest>,
    // Canonical pair -> level, one map per edge class.
    tree_level: IntMap<u64, u32>,
    non_tree_level: IntMap<u64, u32>,
    components: usize,
    max_level: u32,
    rng: StdRng,
}

impl DynamicGraph {
    pub fn new(n: usize) -> Self {
        Self::with_seed(n, rand::rng().random())
    }

    /// Deterministic variant: every treap priority derives from `seed`.
    pub fn with_seed(n: usize, seed: u64) -> Self {
        debug_assert!(n < u32::MAX as usize);
        let mut rng = StdRng::seed_from_u64(seed);
        let forest_seed = rng.random();
        Self {
            n,
            forests: vec![EulerTourForest::new(n, 0, forest_seed)],
            tree_level: IntMap::default(),
            non_tree_level: IntMap::default(),
            components: n,
            max_level: 0,
            rng,
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn edge_count(&self) -> usize {
        self.tree_level.len() + self.non_tree_level.len()
    }

    pub fn contains_edge(&self, u: usize, v: usize) -> bool {
        if u >= self.n || v >= self.n || u == v {
            return false;
        }
        let key = Self::edge_key(u, v);
        self.tree_level.contains_key(&key) || self.non_tree_level.contains_key(&key)
    }

    pub fn component_count(&self) -> usize {
        self.components
    }

    /// Highest level any edge has reached so far; never exceeds ⌊log₂ n⌋.
    pub fn max_level(&self) -> usize {
        self.max_level as usize
    }

    pub fn is_connected(&self, u: usize, v: usize) -> Result<bool, GraphError> {
        self.check_vertex(u)?;
        self.check_vertex(v)?;
        Ok(self.forests[0].is_connected(u as u32, v as u32))
    }

    /// Insert edge `{u, v}` at level 0. Inserting an edge that is already
    /// present is a no-op returning `Ok(false)`.
    pub fn add_edge(&mut self, u: usize, v: usize) -> Result<bool, GraphError> {
        self.check_edge_args(u, v)?;
        let key = Self::edge_key(u, v);
        if self.tree_level.contains_key(&key) || self.non_tree_level.contains_key(&key) {
            return Ok(false);
        }
        let (u, v) = (u as u32, v as u32);
        if self.forests[0].is_connected(u, v) {
            self.non_tree_level.insert(key, 0);
            self.forests[0].insert_nontree(u, v);
        } else {
            self.tree_level.insert(key, 0);
            self.forests[0].add_tree_edge(u, v, 0);
            self.components -= 1;
        }
        Ok(true)
    }

    /// Delete edge `{u, v}`. Fails with [`GraphError::EdgeNotPresent`] when
    /// the edge is absent, leaving the graph untouched.
    pub fn remove_edge(&mut self, u: usize, v: usize) -> Result<(), GraphError> {
        self.check_edge_args(u, v)?;
        let key = Self::edge_key(u, v);
        if let Some(level) = self.non_tree_level.remove(&key) {
            let removed = self.forests[level as usize].remove_nontree(u as u32, v as u32);
            debug_assert!(removed);
            return Ok(());
        }
        let Some(level) = self.tree_level.remove(&key) else {
            return Err(GraphError::EdgeNotPresent { u, v });
        };
        let (u, v) = (u as u32, v as u32);
        for l in (0..=level).rev() {
            let cut = self.forests[l as usize].delete_tree_edge(u, v);
            debug_assert!(cut);
        }
        if !self.reconnect(u, v, level) {
            self.components += 1;
            log::trace!("cut {u}-{v}: no replacement, components now {}", self.components);
        }
        Ok(())
    }

    /// Replacement search after tree edge `{u, v}` of level `top` has been
    /// cut everywhere. Returns whether a replacement was linked.
    fn reconnect(&mut self, u: u32, v: u32, top: u32) -> bool {
        let mut level = top;
        loop {
            let forest = &self.forests[level as usize];
            let ru = forest.tree_root(u);
            let rv = forest.tree_root(v);
            debug_assert_ne!(ru, rv);
            // Smaller side by sequence size; ties keep the u side. Promoting
            // within the smaller side is what preserves the level-size bound.
            let root = if forest.tree_size(ru) <= forest.tree_size(rv) {
                ru
            } else {
                rv
            };

            // Tree edges still at this level inside the scanned side move up
            // before any non-tree edge does. Flag clearing does not rotate
            // the tour, so `root` stays valid throughout the level.
            while let Some((a, b)) = self.forests[level as usize].pop_tree_edge_at_level(root) {
                self.promote_tree_edge(a, b, level);
            }

            while let Some(x) = self.forests[level as usize].first_incident_vertex(root) {
                while let Some(w) = self.forests[level as usize].first_neighbor(x) {
                    if self.forests[0].is_connected(x, w) {
                        // Both endpoints on the scanned side.
                        self.promote_nontree_edge(x, w, level);
                    } else {
                        self.attach_replacement(x, w, level);
                        return true;
                    }
                }
            }

            if level == 0 {
                return false;
            }
            level -= 1;
        }
    }

    fn promote_tree_edge(&mut self, u: u32, v: u32, level: u32) {
        let next = level + 1;
        self.ensure_level(next);
        self.forests[next as usize].add_tree_edge(u, v, next);
        let key = Self::edge_key(u as usize, v as usize);
        *self
            .tree_level
            .get_mut(&key)
            .expect("promoted tree edge missing from level map") = next;
        self.max_level = self.max_level.max(next);
        log::debug!("tree edge {u}-{v} promoted to level {next}");
    }

    fn promote_nontree_edge(&mut self, u: u32, v: u32, level: u32) {
        let next = level + 1;
        self.ensure_level(next);
        let removed = self.forests[level as usize].remove_nontree(u, v);
        debug_assert!(removed);
        self.forests[next as usize].insert_nontree(u, v);
        let key = Self::edge_key(u as usize, v as usize);
        *self
            .non_tree_level
            .get_mut(&key)
            .expect("promoted non-tree edge missing from level map") = next;
        self.max_level = self.max_level.max(next);
        log::debug!("non-tree edge {u}-{v} promoted to level {next}");
    }

    // The replacement keeps its level and is linked into every forest below.
    fn attach_replacement(&mut self, u: u32, v: u32, level: u32) {
        let key = Self::edge_key(u as usize, v as usize);
        let removed = self.forests[level as usize].remove_nontree(u, v);
        debug_assert!(removed);
        self.non_tree_level.remove(&key);
        self.tree_level.insert(key, level);
        for l in (0..=level).rev() {
            self.forests[l as usize].add_tree_edge(u, v, level);
        }
        log::trace!("replacement edge {u}-{v} linked at level {level}");
    }

    fn ensure_level(&mut self, level: u32) {
        while self.forests.len() <= level as usize {
            let new_level = self.forests.len() as u32;
            let seed = self.rng.random();
            self.forests.push(EulerTourForest::new(self.n, new_level, seed));
        }
    }

    #[inline]
    fn edge_key(u: usize, v: usize) -> u64 {
        let (a, b) = if u < v { (u, v) } else { (v, u) };
        pack(a as u32, b as u32)
    }

    fn check_vertex(&self, v: usize) -> Result<(), GraphError> {
        if v >= self.n {
            return Err(GraphError::VertexOutOfRange { v, n: self.n });
        }
        Ok(())
    }

    fn check_edge_args(&self, u: usize, v: usize) -> Result<(), GraphError> {
        self.check_vertex(u)?;
        self.check_vertex(v)?;
        if u == v {
            return Err(GraphError::SelfLoop { v: u });
        }
        Ok(())
    }
}

#[cfg(test)]
impl DynamicGraph {
    pub(crate) fn audit(&self) {
        use crate::ett::unpack;

        for forest in &self.forests {
            forest.audit();
        }
        assert_eq!(self.components, self.n - self.tree_level.len());
        assert!(self.max_level as usize <= self.n.max(1).ilog2() as usize);

        for (&key, &level) in &self.tree_level {
            let (u, v) = unpack(key);
            for l in 0..=level {
                let forest = &self.forests[l as usize];
                assert!(forest.is_connected(u, v), "tree edge {u}-{v} not spanning at {l}");
                assert_eq!(
                    forest.arc_flag(u, v),
                    Some(l == level),
                    "flag misplaced for {u}-{v} at level {l}"
                );
            }
            if (level as usize) < self.forests.len() - 1 {
                assert_eq!(self.forests[level as usize + 1].arc_flag(u, v), None);
            }
        }
        for (&key, &level) in &self.non_tree_level {
            let (u, v) = unpack(key);
            for (l, forest) in self.forests.iter().enumerate() {
                assert_eq!(forest.has_nontree(u, v), l == level as usize);
            }
            assert!(self.forests[level as usize].is_connected(u, v));
        }
    }
}
