//! Offline topological sort, used to compute every algorithm's initial order.

use oto_graph::{Digraph, Vertex};

use crate::Error;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
  Unvisited,
  Active,
  Done,
}

/// Compute a topological order of `graph` as a depth-first reverse post-order.
///
/// Returns the vertices such that for every edge `(u, v)`, `u` appears before `v`. Returns
/// [`Error::CycleDetected`] if the graph contains a cycle (a DFS back edge).
pub fn topological_sort(graph: &Digraph) -> Result<Vec<Vertex>, Error> {
  let n = graph.num_vertices();
  let mut state = vec![Visit::Unvisited; n as usize];
  let mut postorder = Vec::with_capacity(n as usize);
  let mut stack: Vec<(Vertex, usize)> = Vec::new();

  for root in 0..n {
    if state[root as usize] != Visit::Unvisited {
      continue;
    }
    state[root as usize] = Visit::Active;
    stack.push((root, 0));
    while let Some((v, i)) = stack.last().copied() {
      if i < graph.out_degree(v) {
        stack.last_mut().expect("stack is non-empty").1 += 1;
        let w = graph.out_edges(v)[i];
        match state[w as usize] {
          Visit::Unvisited => {
            state[w as usize] = Visit::Active;
            stack.push((w, 0));
          }
          Visit::Active => return Err(Error::CycleDetected),
          Visit::Done => {}
        }
      } else {
        state[v as usize] = Visit::Done;
        postorder.push(v);
        stack.pop();
      }
    }
  }

  postorder.reverse();
  Ok(postorder)
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_matches::assert_matches;

  fn graph(n: u32, edges: &[(Vertex, Vertex)]) -> Digraph {
    let mut graph = Digraph::new(n);
    for &(t, h) in edges {
      graph.add_edge(t, h);
    }
    graph
  }

  fn assert_topological(graph: &Digraph, order: &[Vertex]) {
    assert_eq!(order.len(), graph.num_vertices() as usize);
    let mut position = vec![0; order.len()];
    for (i, &v) in order.iter().enumerate() {
      position[v as usize] = i;
    }
    for (u, v) in graph.edges() {
      assert!(position[u as usize] < position[v as usize], "edge ({u}, {v}) violates {order:?}");
    }
  }

  #[test]
  fn sorts_a_dag() {
    let graph = graph(6, &[(5, 0), (5, 2), (4, 0), (4, 1), (2, 3), (3, 1)]);
    let order = topological_sort(&graph).unwrap();
    assert_topological(&graph, &order);
  }

  #[test]
  fn sorts_an_edgeless_graph() {
    let graph = graph(4, &[]);
    let order = topological_sort(&graph).unwrap();
    assert_topological(&graph, &order);
  }

  #[test]
  fn rejects_a_cycle() {
    let graph = graph(3, &[(0, 1), (1, 2), (2, 0)]);
    assert_matches!(topological_sort(&graph), Err(Error::CycleDetected));
  }

  #[test]
  fn rejects_a_self_loop() {
    let graph = graph(2, &[(0, 1), (1, 1)]);
    assert_matches!(topological_sort(&graph), Err(Error::CycleDetected));
  }
}
