//! Offline baseline: recompute the whole order whenever an insertion invalidates it.
//!
//! Useful as a control in experiments: the online algorithms must beat this on sparse update
//! streams to be worth their complexity.

use std::cmp::Ordering;

use log::trace;
use oto_graph::{Digraph, Vertex};

use crate::{Error, Metrics, OnlineTopo};
use crate::sort::topological_sort;

/// Topological order maintained by full recomputation.
#[derive(Clone, Debug)]
pub struct StandardTopo {
  graph: Digraph,
  ord: Vec<u32>,
  metrics: Metrics,
}

impl StandardTopo {
  /// The priority of every vertex, indexed by vertex id.
  pub fn ord(&self) -> &[u32] { &self.ord }

  fn assign(&mut self, order: &[Vertex]) {
    for (i, &v) in order.iter().enumerate() {
      self.ord[v as usize] = i as u32;
    }
  }
}

impl OnlineTopo for StandardTopo {
  fn with_graph(graph: Digraph) -> Result<Self, Error> {
    let order = topological_sort(&graph)?;
    let n = graph.num_vertices() as usize;
    let mut topo = Self { graph, ord: vec![0; n], metrics: Metrics::default() };
    topo.assign(&order);
    Ok(topo)
  }

  fn graph(&self) -> &Digraph { &self.graph }

  fn add_edge(&mut self, tail: Vertex, head: Vertex) -> Result<bool, Error> {
    if tail == head {
      return Err(Error::CycleDetected);
    }
    if !self.graph.add_edge(tail, head) {
      return Ok(false);
    }
    if self.ord[head as usize] < self.ord[tail as usize] {
      trace!("edge ({tail}, {head}) invalidates the order, re-sorting");
      match topological_sort(&self.graph) {
        Ok(order) => {
          self.assign(&order);
          self.metrics.invalidations += 1;
          self.metrics.search_steps +=
            self.graph.num_vertices() as u64 + self.graph.num_edges() as u64;
        }
        Err(_) => {
          self.graph.remove_edge(tail, head);
          return Err(Error::CycleDetected);
        }
      }
    }
    Ok(true)
  }

  fn order_cmp(&self, u: Vertex, v: Vertex) -> Ordering {
    self.ord[u as usize].cmp(&self.ord[v as usize])
  }

  fn metrics(&self) -> &Metrics { &self.metrics }

  fn reset_metrics(&mut self) { self.metrics.clear() }
}
