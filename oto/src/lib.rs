//! Online topological order (OTO) testbed.
//!
//! Maintains a topological order of a directed acyclic graph under a stream of edge insertions:
//! on each insertion the order is repaired exactly when the new edge violates it, and an insertion
//! that would close a cycle is rejected without leaving partial state behind.
//!
//! Three online algorithms are implemented behind the [`OnlineTopo`] trait:
//!
//! - [`mnr::MnrTopo`]: dense integer priorities with an inverse map, repaired by a bounded forward
//!   search and a shift over the affected region (Marchetti-Spaccamela, Nanni and Rohnert).
//! - [`pk::PkTopo`]: dense integer priorities repaired by a two-way bounded search and an index
//!   merge (Pearce and Kelly).
//! - [`ahrsz::AhrszTopo`]: ordered-list priorities repaired by ceiling/floor reassignment over a
//!   minimal discovery region (Alpern, Hoover, Rosen, Sweeney and Zadeck), generic over the
//!   [`oto_pspace`] priority spaces.
//!
//! [`standard::StandardTopo`] recomputes the order from scratch and serves as the offline
//! baseline. The [`harness`] module drives any of these over generated or loaded edge streams,
//! validates the maintained order against reachability, and reports work metrics.

use std::cmp::Ordering;
use std::fmt;

pub use oto_graph::{Digraph, Edge, Vertex};
pub use oto_pspace::{ListStats, OrderedList, PrioritySpace, TwoLevelList};

pub mod metrics;
pub mod sort;
pub mod mnr;
pub mod pk;
pub mod ahrsz;
pub mod standard;
pub mod validate;
pub mod generate;
pub mod edgelist;
pub mod range;
pub mod harness;

pub use crate::metrics::Metrics;

/// Failures surfaced by the algorithms and the harness.
#[derive(Debug)]
pub enum Error {
  /// The inserted edge would close a cycle. The insertion has been rolled back; graph and order
  /// are unchanged.
  CycleDetected,
  /// An input (file or edge pool) is shorter or shaped differently than announced.
  CorruptInput(String),
  /// A malformed or impossible request, such as an unparsable range or an edge count that exceeds
  /// the universe of the requested graph class.
  InvalidArgument(String),
  /// An underlying I/O failure.
  Io(std::io::Error),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::CycleDetected => write!(f, "edge insertion would create a cycle"),
      Error::CorruptInput(msg) => write!(f, "corrupt input: {}", msg),
      Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
      Error::Io(err) => write!(f, "i/o failure: {}", err),
    }
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Error::Io(err) => Some(err),
      _ => None,
    }
  }
}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Self { Error::Io(err) }
}

/// An algorithm maintaining a topological order of a [`Digraph`] under online edge insertion.
///
/// The universal invariant, kept between any two calls: for every edge `(u, v)` of the graph,
/// `order_cmp(u, v) == Less`, and the order is total over the vertices.
pub trait OnlineTopo: Sized {
  /// Take ownership of `graph` and compute an initial topological order for it.
  ///
  /// Returns [`Error::CycleDetected`] if `graph` is cyclic.
  fn with_graph(graph: Digraph) -> Result<Self, Error>;

  /// Create an instance over an edgeless graph with vertices `0..n`.
  fn new(n: u32) -> Self {
    Self::with_graph(Digraph::new(n)).expect("an edgeless graph cannot be cyclic")
  }

  /// The underlying graph store.
  fn graph(&self) -> &Digraph;

  /// Insert the edge `tail -> head`, repairing the order if the edge invalidates it.
  ///
  /// Returns `Ok(true)` when the edge was inserted, `Ok(false)` when it was already present (a
  /// no-op), and [`Error::CycleDetected`] when it would close a cycle, in which case the
  /// insertion is rolled back and neither the graph nor the order changes.
  fn add_edge(&mut self, tail: Vertex, head: Vertex) -> Result<bool, Error>;

  /// Insert a batch of edges sequentially, returning how many were rejected as cycle-creating.
  fn add_edges(&mut self, edges: &[Edge]) -> usize {
    edges.iter().filter(|&&(tail, head)| self.add_edge(tail, head).is_err()).count()
  }

  /// Compare the priorities of `u` and `v`. `Equal` for `u != v` means the algorithm keeps both
  /// at the same priority, which is only permitted when no path connects them.
  fn order_cmp(&self, u: Vertex, v: Vertex) -> Ordering;

  /// Work counters accumulated since construction or the last [`reset_metrics`](Self::reset_metrics).
  fn metrics(&self) -> &Metrics;

  /// Ordered-list work counters, for algorithms backed by a priority space.
  fn list_stats(&self) -> ListStats { ListStats::default() }

  /// Reset all work counters.
  fn reset_metrics(&mut self);
}
