//! Shared helpers for `oto` tests and benchmarks.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use oto::{Digraph, Edge, Error, OnlineTopo, Vertex};
use oto::validate::validate_topo;

/// A deterministic RNG for reproducible tests and benchmarks.
pub fn seeded_rng(seed: u64) -> StdRng {
  StdRng::seed_from_u64(seed)
}

/// Create a temporary directory for file round-trip tests.
pub fn create_temp_dir() -> TempDir {
  tempfile::tempdir().expect("failed to create temporary directory")
}

/// Build a graph over `n` vertices from an edge list, through the raw store.
pub fn graph_from_edges(n: u32, edges: &[Edge]) -> Digraph {
  let mut graph = Digraph::new(n);
  for &(tail, head) in edges {
    graph.add_edge(tail, head);
  }
  graph
}

/// Assert that an algorithm instance maintains a valid topological order.
pub fn assert_valid_order<T: OnlineTopo>(topo: &T) {
  assert!(validate_topo(topo), "maintained order contradicts reachability");
}

/// Per-edge outcome of feeding a stream through [`OnlineTopo::add_edge`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeOutcome {
  /// Newly inserted.
  Added,
  /// Already present, no-op.
  Duplicate,
  /// Rejected as cycle-creating.
  Rejected,
}

/// Feed `edges` one by one, collecting each edge's outcome.
pub fn feed_edges<T: OnlineTopo>(topo: &mut T, edges: &[Edge]) -> Vec<EdgeOutcome> {
  edges
    .iter()
    .map(|&(tail, head)| match topo.add_edge(tail, head) {
      Ok(true) => EdgeOutcome::Added,
      Ok(false) => EdgeOutcome::Duplicate,
      Err(Error::CycleDetected) => EdgeOutcome::Rejected,
      Err(err) => panic!("unexpected add_edge failure: {err}"),
    })
    .collect()
}

/// A fixed mixed stream over 20 vertices: mostly a DAG, with a couple of cycle-creating edges and
/// one duplicate thrown in. Exercises every [`EdgeOutcome`].
pub fn mixed_stream() -> (u32, Vec<Edge>) {
  let edges = vec![
    (0, 5), (5, 10), (10, 15), (15, 19), (3, 5), (7, 10), (12, 15),
    (19, 0), // closes 0 -> 19
    (0, 5),  // duplicate
    (1, 2), (2, 4), (4, 8), (8, 16), (16, 17),
    (17, 1), // closes 1 -> 17
    (18, 9), (9, 6), (6, 11), (11, 13), (13, 14),
    (14, 18), // closes 18 -> 14
    (2, 1),   // closes 1 -> 2
    (6, 18),  // closes 18 -> 6
    (5, 0),   // closes 0 -> 5
    (3, 19), (12, 0), (7, 14),
  ];
  (20, edges)
}

/// The canonical vertex ordering of `vertices` under `topo`'s order: a vector whose indexes are
/// vertices and whose values sort consistently with `order_cmp`.
pub fn order_snapshot<T: OnlineTopo>(topo: &T) -> Vec<Vertex> {
  let n = topo.graph().num_vertices();
  let mut vertices: Vec<Vertex> = (0..n).collect();
  vertices.sort_by(|&u, &v| topo.order_cmp(u, v));
  vertices
}
