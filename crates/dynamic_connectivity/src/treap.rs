use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub(crate) type Id = u32;
pub(crate) const NIL: Id = Id::MAX;

#[inline(always)]
fn idx(x: Id) -> usize {
    x as usize
}

#[derive(Clone, Copy, Debug)]
struct Node {
    ch: [Id; 2],
    parent: Id,
    size: u32,
    prio: u64,
    // (v, v) is the self-node of vertex v, (u, v) a directed tree-edge arc.
    key: (u32, u32),
    // Own flags plus their subtree-OR aggregates.
    tree_at_level: bool,
    has_incident: bool,
    any_tree_at_level: bool,
    any_incident: bool,
}

/// Arena of implicit-position treaps with parent links; each tour of one
/// forest level is a treap rooted at a node with a `NIL` parent.
pub(crate) struct Treap {
    nodes: Vec<Node>,
    free: Vec<Id>,
    rng: StdRng,
}

impl Treap {
    pub(crate) fn new(capacity: usize, seed: u64) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn alloc(&mut self, key: (u32, u32), tree_at_level: bool, has_incident: bool) -> Id {
        let node = Node {
            ch: [NIL, NIL],
            parent: NIL,
            size: 1,
            prio: self.rng.random(),
            key,
            tree_at_level,
            has_incident,
            any_tree_at_level: tree_at_level,
            any_incident: has_incident,
        };
        if let Some(x) = self.free.pop() {
            self.nodes[idx(x)] = node;
            return x;
        }
        debug_assert!(self.nodes.len() < NIL as usize);
        let x = self.nodes.len() as Id;
        self.nodes.push(node);
        x
    }

    pub(crate) fn release(&mut self, x: Id) {
        debug_assert_eq!(self.nodes[idx(x)].parent, NIL);
        debug_assert_eq!(self.nodes[idx(x)].ch, [NIL, NIL]);
        self.free.push(x);
    }

    #[inline(always)]
    pub(crate) fn key(&self, x: Id) -> (u32, u32) {
        self.nodes[idx(x)].key
    }

    #[inline(always)]
    pub(crate) fn len_of(&self, root: Id) -> usize {
        self.size(root) as usize
    }

    #[inline(always)]
    fn size(&self, x: Id) -> u32 {
        if x == NIL { 0 } else { self.nodes[idx(x)].size }
    }

    pub(crate) fn root_of(&self, mut x: Id) -> Id {
        while self.nodes[idx(x)].parent != NIL {
            x = self.nodes[idx(x)].parent;
        }
        x
    }

    /// 0-based position of `x` in its tour.
    pub(crate) fn position(&self, x: Id) -> usize {
        let mut ord = self.size(self.nodes[idx(x)].ch[0]) as usize;
        let mut cur = x;
        let mut p = self.nodes[idx(x)].parent;
        while p != NIL {
            let pn = &self.nodes[idx(p)];
            if pn.ch[1] == cur {
                ord += self.size(pn.ch[0]) as usize + 1;
            }
            cur = p;
            p = pn.parent;
        }
        ord
    }

    fn pull(&mut self, x: Id) {
        let n = self.nodes[idx(x)];
        let mut size = 1;
        let mut any_tree = n.tree_at_level;
        let mut any_inc = n.has_incident;
        for c in n.ch {
            if c != NIL {
                let cn = &self.nodes[idx(c)];
                size += cn.size;
                any_tree |= cn.any_tree_at_level;
                any_inc |= cn.any_incident;
            }
        }
        let n = &mut self.nodes[idx(x)];
        n.size = size;
        n.any_tree_at_level = any_tree;
        n.any_incident = any_inc;
    }

    fn update_up(&mut self, mut x: Id) {
        while x != NIL {
            self.pull(x);
            x = self.nodes[idx(x)].parent;
        }
    }

    pub(crate) fn set_tree_at_level(&mut self, x: Id, value: bool) {
        self.nodes[idx(x)].tree_at_level = value;
        self.update_up(x);
    }

    pub(crate) fn set_has_incident(&mut self, x: Id, value: bool) {
        self.nodes[idx(x)].has_incident = value;
        self.update_up(x);
    }

    /// Concatenate two tours; the higher-priority root wins, ties keep `l`.
    pub(crate) fn merge(&mut self, l: Id, r: Id) -> Id {
        if l == NIL {
            if r != NIL {
                self.nodes[idx(r)].parent = NIL;
            }
            return r;
        }
        if r == NIL {
            self.nodes[idx(l)].parent = NIL;
            return l;
        }
        let root = if self.nodes[idx(l)].prio >= self.nodes[idx(r)].prio {
            let m = self.merge(self.nodes[idx(l)].ch[1], r);
            self.nodes[idx(l)].ch[1] = m;
            self.nodes[idx(m)].parent = l;
            self.pull(l);
            l
        } else {
            let m = self.merge(l, self.nodes[idx(r)].ch[0]);
            self.nodes[idx(r)].ch[0] = m;
            self.nodes[idx(m)].parent = r;
            self.pull(r);
            r
        };
        self.nodes[idx(root)].parent = NIL;
        root
    }

    /// Split off the first `k` nodes; both returned roots get cleared parents.
    pub(crate) fn split(&mut self, root: Id, k: usize) -> (Id, Id) {
        if root == NIL {
            debug_assert_eq!(k, 0);
            return (NIL, NIL);
        }
        debug_assert!(k <= self.size(root) as usize);
        let left = self.nodes[idx(root)].ch[0];
        if self.size(left) as usize >= k {
            let (a, b) = self.split(left, k);
            self.nodes[idx(root)].ch[0] = b;
            if b != NIL {
                self.nodes[idx(b)].parent = root;
            }
            self.pull(root);
            self.nodes[idx(root)].parent = NIL;
            if a != NIL {
                self.nodes[idx(a)].parent = NIL;
            }
            (a, root)
        } else {
            let k = k - self.size(left) as usize - 1;
            let (a, b) = self.split(self.nodes[idx(root)].ch[1], k);
            self.nodes[idx(root)].ch[1] = a;
            if a != NIL {
                self.nodes[idx(a)].parent = root;
            }
            self.pull(root);
            self.nodes[idx(root)].parent = NIL;
            if b != NIL {
                self.nodes[idx(b)].parent = NIL;
            }
            (root, b)
        }
    }

    /// First node in tour order whose `tree_at_level` flag is set, skipping
    /// subtrees whose aggregate is clear.
    pub(crate) fn first_tree_arc(&self, root: Id) -> Option<Id> {
        let mut x = root;
        if x == NIL || !self.nodes[idx(x)].any_tree_at_level {
            return None;
        }
        loop {
            let n = &self.nodes[idx(x)];
            let l = n.ch[0];
            if l != NIL && self.nodes[idx(l)].any_tree_at_level {
                x = l;
                continue;
            }
            if n.tree_at_level {
                return Some(x);
            }
            x = n.ch[1];
            debug_assert!(x != NIL && self.nodes[idx(x)].any_tree_at_level);
        }
    }

    /// Same search over the `has_incident` flag.
    pub(crate) fn first_incident_self(&self, root: Id) -> Option<Id> {
        let mut x = root;
        if x == NIL || !self.nodes[idx(x)].any_incident {
            return None;
        }
        loop {
            let n = &self.nodes[idx(x)];
            let l = n.ch[0];
            if l != NIL && self.nodes[idx(l)].any_incident {
                x = l;
                continue;
            }
            if n.has_incident {
                return Some(x);
            }
            x = n.ch[1];
            debug_assert!(x != NIL && self.nodes[idx(x)].any_incident);
        }
    }
}

#[cfg(test)]
impl Treap {
    pub(crate) fn tree_flag(&self, x: Id) -> bool {
        self.nodes[idx(x)].tree_at_level
    }

    pub(crate) fn incident_flag(&self, x: Id) -> bool {
        self.nodes[idx(x)].has_incident
    }

    pub(crate) fn in_order(&self, root: Id) -> Vec<Id> {
        let mut out = Vec::new();
        self.collect(root, &mut out);
        out
    }

    fn collect(&self, x: Id, out: &mut Vec<Id>) {
        if x == NIL {
            return;
        }
        self.collect(self.nodes[idx(x)].ch[0], out);
        out.push(x);
        self.collect(self.nodes[idx(x)].ch[1], out);
    }

    pub(crate) fn audit_tree(&self, root: Id) {
        assert_ne!(root, NIL);
        assert_eq!(self.nodes[idx(root)].parent, NIL, "root parent must be NIL");
        self.audit_node(root);
    }

    fn audit_node(&self, x: Id) -> (u32, bool, bool) {
        let n = &self.nodes[idx(x)];
        let mut size = 1;
        let mut any_tree = n.tree_at_level;
        let mut any_inc = n.has_incident;
        for c in n.ch {
            if c == NIL {
                continue;
            }
            let cn = &self.nodes[idx(c)];
            assert_eq!(cn.parent, x, "child {c} does not point back at {x}");
            assert!(cn.prio <= n.prio, "heap order violated at {x}");
            let (s, t, i) = self.audit_node(c);
            size += s;
            any_tree |= t;
            any_inc |= i;
        }
        assert_eq!(n.size, size, "stale size at {x}");
        assert_eq!(n.any_tree_at_level, any_tree, "stale tree aggregate at {x}");
        assert_eq!(n.any_incident, any_inc, "stale incidence aggregate at {x}");
        (size, any_tree, any_inc)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::{Id, NIL, Treap};

    fn build(treap: &mut Treap, n: u32) -> (Id, Vec<Id>) {
        let mut ids = Vec::with_capacity(n as usize);
        let mut root = NIL;
        for v in 0..n {
            let x = treap.alloc((v, v), false, false);
            ids.push(x);
            root = treap.merge(root, x);
        }
        (root, ids)
    }

    #[test]
    fn split_merge_matches_vec_model() {
        let mut rng = StdRng::seed_from_u64(0x7EA9_2026);
        let mut treap = Treap::new(64, 11);
        let (mut root, _) = build(&mut treap, 40);
        let mut model: Vec<u32> = (0..40).collect();

        for _ in 0..500 {
            // Rotate by a random cut, the same way reroot does.
            let k = rng.random_range(0..=model.len());
            let (a, b) = treap.split(root, k);
            root = treap.merge(b, a);
            model.rotate_left(k);

            let got: Vec<u32> = treap
                .in_order(root)
                .into_iter()
                .map(|x| treap.key(x).0)
                .collect();
            assert_eq!(got, model);
            treap.audit_tree(root);
        }
    }

    #[test]
    fn position_agrees_with_in_order_rank() {
        let mut rng = StdRng::seed_from_u64(0xBEEF);
        let mut treap = Treap::new(64, 3);
        let (mut root, ids) = build(&mut treap, 33);

        for _ in 0..50 {
            let k = rng.random_range(0..=treap.len_of(root));
            let (a, b) = treap.split(root, k);
            root = treap.merge(b, a);

            let order = treap.in_order(root);
            for (rank, &x) in order.iter().enumerate() {
                assert_eq!(treap.position(x), rank);
                assert_eq!(treap.root_of(x), root);
            }
            assert_eq!(order.len(), ids.len());
        }
    }

    #[test]
    fn flag_search_finds_leftmost_flagged_node() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut treap = Treap::new(64, 9);
        let (root, ids) = build(&mut treap, 25);
        let mut flagged = vec![false; ids.len()];

        for _ in 0..300 {
            let i = rng.random_range(0..ids.len());
            flagged[i] = !flagged[i];
            treap.set_tree_at_level(ids[i], flagged[i]);

            let expected = treap
                .in_order(root)
                .into_iter()
                .find(|&x| flagged[ids.iter().position(|&y| y == x).unwrap()]);
            assert_eq!(treap.first_tree_arc(root), expected);
            treap.audit_tree(root);
        }
    }

    #[test]
    fn incident_flag_search_is_independent_of_tree_flag() {
        let mut treap = Treap::new(16, 5);
        let (root, ids) = build(&mut treap, 8);

        treap.set_tree_at_level(ids[2], true);
        assert_eq!(treap.first_incident_self(root), None);

        let order = treap.in_order(root);
        treap.set_has_incident(order[5], true);
        treap.set_has_incident(order[3], true);
        assert_eq!(treap.first_incident_self(root), Some(order[3]));

        treap.set_has_incident(order[3], false);
        assert_eq!(treap.first_incident_self(root), Some(order[5]));
        treap.audit_tree(root);
    }

    #[test]
    fn released_slots_are_recycled() {
        let mut treap = Treap::new(8, 1);
        let a = treap.alloc((0, 1), false, false);
        treap.release(a);
        let b = treap.alloc((2, 3), false, false);
        assert_eq!(a, b);
        assert_eq!(treap.key(b), (2, 3));
    }
}
