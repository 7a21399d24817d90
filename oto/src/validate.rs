//! Full validation of a maintained order against reachability.
//!
//! The ground truth for every algorithm: for any two vertices, whichever is ordered earlier must
//! not be reachable from the later one, and vertices sharing a priority must not be connected at
//! all. Quadratic in the number of vertices; meant for checking experiments, not for production
//! paths.

use std::cmp::Ordering;

use log::warn;
use oto_graph::{Digraph, Vertex};

use crate::OnlineTopo;

/// Check `order_cmp` against the paths of `graph`. Returns `false` on the first violation, after
/// logging the offending pair.
pub fn validate(graph: &Digraph, order_cmp: impl Fn(Vertex, Vertex) -> Ordering) -> bool {
  let n = graph.num_vertices();
  for u in 0..n {
    for v in u + 1..n {
      match order_cmp(u, v) {
        Ordering::Less => {
          if graph.has_path(v, u) {
            warn!("order violation: {u} < {v} but a path {v} ->* {u} exists");
            return false;
          }
        }
        Ordering::Greater => {
          if graph.has_path(u, v) {
            warn!("order violation: {v} < {u} but a path {u} ->* {v} exists");
            return false;
          }
        }
        Ordering::Equal => {
          if graph.has_path(u, v) || graph.has_path(v, u) {
            warn!("order violation: {u} and {v} share a priority but are connected");
            return false;
          }
        }
      }
    }
  }
  true
}

/// [`validate`] an algorithm instance against its own graph.
pub fn validate_topo<T: OnlineTopo>(topo: &T) -> bool {
  validate(topo.graph(), |u, v| topo.order_cmp(u, v))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_a_consistent_order() {
    let mut graph = Digraph::new(3);
    graph.add_edge(0, 1);
    graph.add_edge(1, 2);
    assert!(validate(&graph, |u, v| u.cmp(&v)));
  }

  #[test]
  fn rejects_an_order_against_an_edge() {
    let mut graph = Digraph::new(2);
    graph.add_edge(1, 0);
    assert!(!validate(&graph, |u, v| u.cmp(&v)));
  }

  #[test]
  fn rejects_shared_priorities_on_connected_vertices() {
    let mut graph = Digraph::new(2);
    graph.add_edge(0, 1);
    assert!(!validate(&graph, |_, _| Ordering::Equal));
  }

  #[test]
  fn accepts_shared_priorities_on_unconnected_vertices() {
    let graph = Digraph::new(2);
    assert!(validate(&graph, |_, _| Ordering::Equal));
  }
}
