//! Fully dynamic connectivity for undirected simple graphs.
//!
//! Maintains a spanning-forest hierarchy in the style of
//! Holm–Lichtenberg–Thorup: every edge carries a level, each level keeps a
//! spanning forest of the edges at or above it as balanced Euler tours, and a
//! deleted tree edge is repaired by scanning the smaller side of the cut while
//! promoting the edges it touches one level up. Insertions and connectivity
//! queries are O(log n) expected, deletions O(log² n) amortized.
//!
//! ```
//! use dynamic_connectivity::DynamicGraph;
//!
//! let mut g = DynamicGraph::new(4);
//! g.add_edge(0, 1).unwrap();
//! g.add_edge(1, 2).unwrap();
//! g.add_edge(2, 0).unwrap();
//! assert!(g.is_connected(0, 2).unwrap());
//!
//! g.remove_edge(2, 0).unwrap();
//! assert!(g.is_connected(0, 2).unwrap()); // still reachable via 1
//! assert_eq!(g.component_count(), 2); // vertex 3 is isolated
//! ```

mod ett;
mod graph;
mod treap;

pub use graph::{DynamicGraph, GraphError};
