//! The MNR online topological order algorithm.
//!
//! Priorities are the dense integers `0..n`, kept together with their inverse map (position to
//! vertex). An invalidating insertion `(t, h)` is repaired by a forward search from `h` bounded by
//! `ord[t]`, followed by a shift over the affected positions: unreached vertices keep their
//! relative order and slide down, reached vertices move after them. First published by
//! Marchetti-Spaccamela, Nanni and Rohnert, "On-Line Graph Algorithms for Incremental
//! Compilation", Information Processing Letters, 1996.

use std::cmp::Ordering;

use log::trace;
use oto_graph::{Digraph, Vertex};

use crate::{Error, Metrics, OnlineTopo};
use crate::sort::topological_sort;

/// Online topological order with dense integer priorities and reorder-by-shift.
#[derive(Clone, Debug)]
pub struct MnrTopo {
  graph: Digraph,
  /// Priority of each vertex.
  ord: Vec<u32>,
  /// Inverse of `ord`: the vertex at each position.
  pos: Vec<Vertex>,
  /// Scratch, indexed by *position*; always all-false between calls.
  visited: Vec<bool>,
  metrics: Metrics,
}

impl MnrTopo {
  /// The priority of every vertex, indexed by vertex id.
  pub fn ord(&self) -> &[u32] { &self.ord }

  /// The vertex at every priority, indexed by position.
  pub fn pos(&self) -> &[Vertex] { &self.pos }

  /// Forward search from `h` over positions below `ub`, marking reached positions. Returns `true`
  /// if a vertex at position `ub` is reached, which means the pending edge closes a cycle.
  fn dfs(&mut self, h: Vertex, lb: usize, ub: usize) -> bool {
    let mut worklist = Vec::with_capacity(ub - lb + 1);
    self.visited[lb] = true;
    worklist.push(h);
    while let Some(n) = worklist.pop() {
      self.metrics.search_steps += 1;
      for &w in self.graph.out_edges(n) {
        self.metrics.search_steps += 1;
        let w_ord = self.ord[w as usize] as usize;
        if w_ord == ub {
          return true;
        }
        if w_ord < ub && !self.visited[w_ord] {
          self.visited[w_ord] = true;
          worklist.push(w);
        }
      }
    }
    false
  }

  /// Repack positions `lb..=ub`: unmarked vertices keep their relative order and slide to the low
  /// end, marked vertices follow them. Clears the marks it consumes.
  fn shift(&mut self, lb: usize, ub: usize) {
    let mut shift = 0;
    let mut reached: Vec<Vertex> = Vec::new();
    for i in lb..=ub {
      let w = self.pos[i];
      if self.visited[i] {
        reached.push(w);
        shift += 1;
        self.visited[i] = false;
      } else {
        self.pos[i - shift] = w;
        self.ord[w as usize] = (i - shift) as u32;
      }
    }
    let base = ub + 1 - shift;
    for (j, &w) in reached.iter().enumerate() {
      self.pos[base + j] = w;
      self.ord[w as usize] = (base + j) as u32;
    }
  }
}

impl OnlineTopo for MnrTopo {
  fn with_graph(graph: Digraph) -> Result<Self, Error> {
    let pos = topological_sort(&graph)?;
    let n = graph.num_vertices() as usize;
    let mut ord = vec![0; n];
    for (i, &v) in pos.iter().enumerate() {
      ord[v as usize] = i as u32;
    }
    Ok(Self { graph, ord, pos, visited: vec![false; n], metrics: Metrics::default() })
  }

  fn graph(&self) -> &Digraph { &self.graph }

  fn add_edge(&mut self, tail: Vertex, head: Vertex) -> Result<bool, Error> {
    if tail == head {
      return Err(Error::CycleDetected);
    }
    if !self.graph.add_edge(tail, head) {
      return Ok(false);
    }
    let lb = self.ord[head as usize] as usize;
    let ub = self.ord[tail as usize] as usize;
    if lb < ub {
      trace!("edge ({tail}, {head}) invalidates positions {lb}..={ub}");
      if self.dfs(head, lb, ub) {
        for i in lb..=ub {
          self.visited[i] = false;
        }
        self.graph.remove_edge(tail, head);
        return Err(Error::CycleDetected);
      }
      self.shift(lb, ub);
      self.metrics.invalidations += 1;
      self.metrics.affected_region += (ub - lb + 1) as u64;
    }
    Ok(true)
  }

  fn order_cmp(&self, u: Vertex, v: Vertex) -> Ordering {
    self.ord[u as usize].cmp(&self.ord[v as usize])
  }

  fn metrics(&self) -> &Metrics { &self.metrics }

  fn reset_metrics(&mut self) { self.metrics.clear() }
}
