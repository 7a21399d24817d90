//! The PK online topological order algorithm (POTO1).
//!
//! Priorities are the dense integers `0..n` without an inverse map. An invalidating insertion
//! `(t, h)` is repaired by two bounded searches: forward from `h` collecting the vertices it
//! reaches below `ord[t]`, backward from `t` collecting the vertices reaching it above `ord[h]`.
//! Both sets are sorted by current priority and receive, as a whole, the same multiset of
//! priorities they held before, with the backward set taking the smaller ones. Published by
//! Pearce and Kelly, "A dynamic topological sort algorithm for directed acyclic graphs", JEA 2007.

use std::cmp::Ordering;

use log::trace;
use oto_graph::{Digraph, Vertex};

use crate::{Error, Metrics, OnlineTopo};
use crate::sort::topological_sort;

/// Online topological order with dense integer priorities and reorder by index merge.
#[derive(Clone, Debug)]
pub struct PkTopo {
  graph: Digraph,
  /// Priority of each vertex.
  ord: Vec<u32>,
  /// Scratch, indexed by vertex; always all-false between calls.
  visited: Vec<bool>,
  metrics: Metrics,
}

impl PkTopo {
  /// The priority of every vertex, indexed by vertex id.
  pub fn ord(&self) -> &[u32] { &self.ord }

  /// Forward search from `start`, collecting visited vertices with priority below `ub` into
  /// `reachable`. Returns `true` if a vertex at priority `ub` is reached, which means the pending
  /// edge closes a cycle; the marks of everything in `reachable` are then still set.
  fn forward_dfs(&mut self, start: Vertex, ub: u32, reachable: &mut Vec<Vertex>) -> bool {
    let mut stack = vec![start];
    self.visited[start as usize] = true;
    reachable.push(start);
    while let Some(n) = stack.pop() {
      self.metrics.search_steps += 1;
      for &w in self.graph.out_edges(n) {
        self.metrics.search_steps += 1;
        let w_ord = self.ord[w as usize];
        if w_ord == ub {
          return true;
        }
        if w_ord < ub && !self.visited[w as usize] {
          self.visited[w as usize] = true;
          reachable.push(w);
          stack.push(w);
        }
      }
    }
    false
  }

  /// Backward search from `start`, collecting visited vertices with priority above `lb` into
  /// `reaching`.
  fn backward_dfs(&mut self, start: Vertex, lb: u32, reaching: &mut Vec<Vertex>) {
    let mut stack = vec![start];
    self.visited[start as usize] = true;
    reaching.push(start);
    while let Some(n) = stack.pop() {
      self.metrics.search_steps += 1;
      for &w in self.graph.in_edges(n) {
        self.metrics.search_steps += 1;
        if self.ord[w as usize] > lb && !self.visited[w as usize] {
          self.visited[w as usize] = true;
          reaching.push(w);
          stack.push(w);
        }
      }
    }
  }

  /// Reassign priorities: the union of both sets receives its own priorities back, in ascending
  /// order, with all of `reaching` before all of `reachable`. Clears the visit marks.
  fn reorder(&mut self, reachable: &[Vertex], reaching: &[Vertex]) {
    let mut pool = Vec::with_capacity(reachable.len() + reaching.len());
    let (mut i, mut j) = (0, 0);
    while i < reachable.len() || j < reaching.len() {
      let take_reachable = j == reaching.len()
        || (i < reachable.len()
          && self.ord[reachable[i] as usize] < self.ord[reaching[j] as usize]);
      if take_reachable {
        pool.push(self.ord[reachable[i] as usize]);
        i += 1;
      } else {
        pool.push(self.ord[reaching[j] as usize]);
        j += 1;
      }
    }
    for (slot, &v) in reaching.iter().chain(reachable.iter()).enumerate() {
      self.visited[v as usize] = false;
      self.ord[v as usize] = pool[slot];
    }
  }
}

impl OnlineTopo for PkTopo {
  fn with_graph(graph: Digraph) -> Result<Self, Error> {
    let order = topological_sort(&graph)?;
    let n = graph.num_vertices() as usize;
    let mut ord = vec![0; n];
    for (i, &v) in order.iter().enumerate() {
      ord[v as usize] = i as u32;
    }
    Ok(Self { graph, ord, visited: vec![false; n], metrics: Metrics::default() })
  }

  fn graph(&self) -> &Digraph { &self.graph }

  fn add_edge(&mut self, tail: Vertex, head: Vertex) -> Result<bool, Error> {
    if tail == head {
      return Err(Error::CycleDetected);
    }
    if !self.graph.add_edge(tail, head) {
      return Ok(false);
    }
    let lb = self.ord[head as usize];
    let ub = self.ord[tail as usize];
    if lb < ub {
      trace!("edge ({tail}, {head}) invalidates priorities {lb}..={ub}");
      let mut reachable = Vec::new();
      let mut reaching = Vec::new();
      if self.forward_dfs(head, ub, &mut reachable) {
        for &v in &reachable {
          self.visited[v as usize] = false;
        }
        self.graph.remove_edge(tail, head);
        return Err(Error::CycleDetected);
      }
      self.backward_dfs(tail, lb, &mut reaching);
      reachable.sort_unstable_by_key(|&v| self.ord[v as usize]);
      reaching.sort_unstable_by_key(|&v| self.ord[v as usize]);
      self.metrics.invalidations += 1;
      self.metrics.reassigned += (reachable.len() + reaching.len()) as u64;
      self.reorder(&reachable, &reaching);
    }
    Ok(true)
  }

  fn order_cmp(&self, u: Vertex, v: Vertex) -> Ordering {
    self.ord[u as usize].cmp(&self.ord[v as usize])
  }

  fn metrics(&self) -> &Metrics { &self.metrics }

  fn reset_metrics(&mut self) { self.metrics.clear() }
}
