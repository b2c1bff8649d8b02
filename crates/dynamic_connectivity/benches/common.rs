use std::time::Duration;

use criterion::BenchmarkGroup;
use criterion::measurement::Measurement;
use rand::Rng;
use rand::rngs::StdRng;

pub const SIZES: [usize; 3] = [256, 1_024, 4_096];
pub const OPS_PER_SIZE: usize = 5_000;
pub const RNG_SEED: u64 = 0xD1C0_BE9C;

/// Deletion-heavy scripts get slower per op as n grows (replacement searches
/// dominate), so the largest size gets a longer measurement window.
pub fn configure_group<M: Measurement>(size: usize, group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(10);
    if size >= 4_096 {
        group.warm_up_time(Duration::from_millis(500));
        group.measurement_time(Duration::from_millis(1_500));
    } else {
        group.warm_up_time(Duration::from_millis(200));
        group.measurement_time(Duration::from_millis(600));
    }
}

#[derive(Clone, Copy, Debug)]
pub enum GraphOp {
    Add { u: usize, v: usize },
    Remove { u: usize, v: usize },
    Query { u: usize, v: usize },
}

#[derive(Clone, Debug)]
pub struct GraphCase {
    pub n: usize,
    pub warmup: Vec<(usize, usize)>,
    pub ops: Vec<GraphOp>,
}

/// Script of adds, removes and queries in which every remove names a present
/// edge and every add names an absent one, tracked by a mirror edge set.
pub fn generate_graph_case(rng: &mut StdRng, n: usize) -> GraphCase {
    let mut present: Vec<(usize, usize)> = Vec::new();

    // Sparse random warmup, roughly one edge per vertex.
    while present.len() < n {
        let u = rng.random_range(0..n);
        let v = rng.random_range(0..n);
        if u == v || contains(&present, u, v) {
            continue;
        }
        present.push(key(u, v));
    }
    let warmup = present.clone();

    let mut ops = Vec::with_capacity(OPS_PER_SIZE);
    for _ in 0..OPS_PER_SIZE {
        let roll = rng.random_range(0..100_u32);
        if roll < 40 {
            let u = rng.random_range(0..n);
            let v = rng.random_range(0..n);
            ops.push(GraphOp::Query { u, v });
        } else if roll < 70 || present.is_empty() {
            let u = rng.random_range(0..n);
            let v = rng.random_range(0..n);
            if u == v || contains(&present, u, v) {
                ops.push(GraphOp::Query { u, v });
                continue;
            }
            present.push(key(u, v));
            ops.push(GraphOp::Add { u, v });
        } else {
            let i = rng.random_range(0..present.len());
            let (u, v) = present.swap_remove(i);
            ops.push(GraphOp::Remove { u, v });
        }
    }

    GraphCase { n, warmup, ops }
}

fn key(u: usize, v: usize) -> (usize, usize) {
    if u < v { (u, v) } else { (v, u) }
}

fn contains(present: &[(usize, usize)], u: usize, v: usize) -> bool {
    present.contains(&key(u, v))
}
