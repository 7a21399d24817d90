//! Experiment harness.
//!
//! Drives an online algorithm over an edge pool: a prefix of the pool becomes the initial DAG
//! (built through the raw store, bypassing order maintenance), the rest is fed online in batches.
//! After each batch the maintained order can be validated against reachability. Work metrics are
//! sampled from the algorithm after the run; wall-clock time covers only the online insertions.

use std::time::{Duration, Instant};

use log::debug;

use oto_graph::{Digraph, Edge};
use oto_pspace::{ListStats, OrderedList, TwoLevelList};

use crate::{Error, OnlineTopo};
use crate::ahrsz::AhrszTopo;
use crate::mnr::MnrTopo;
use crate::pk::PkTopo;
use crate::standard::StandardTopo;
use crate::validate::validate_topo;

/// Parameters of one experiment run.
#[derive(Clone, Copy, Debug)]
pub struct Experiment {
  /// Number of vertices `V`.
  pub vertices: u32,
  /// Number of edges `E` taken from the pool.
  pub edges: usize,
  /// How many of those are fed online, `O <= E`. The first `E - O` form the initial DAG.
  pub online: usize,
  /// Batch size `B` for the online feed.
  pub batch: usize,
  /// Validate the order against reachability after every batch.
  pub checking: bool,
}

/// Outcome of one experiment run.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExperimentResults {
  /// Online edges inserted (possibly after a repair).
  pub accepted: usize,
  /// Online edges rejected as cycle-creating.
  pub rejected: usize,
  /// Online edges that were already present.
  pub duplicates: usize,
  /// Insertions that invalidated the order.
  pub invalidations: u64,
  /// Wall-clock spent inserting, divided by the number of online edges.
  pub time_per_insertion: Duration,
  /// Search work per online edge.
  pub search_steps_per_insertion: f64,
  /// Affected-region size per online edge (MNR only).
  pub affected_region_per_insertion: f64,
  /// Reassigned vertices per online edge (PK and AHRSZ).
  pub reassigned_per_insertion: f64,
  /// Ordered-list work during the online feed (AHRSZ only).
  #[cfg_attr(feature = "serde", serde(skip))]
  pub list: ListStats,
  /// Batches after which validation failed. Zero unless the algorithm is broken.
  pub check_failures: u32,
}

/// Run one experiment over `edges`, which must hold at least `experiment.edges` entries.
pub fn run<T: OnlineTopo>(
  experiment: &Experiment,
  edges: &[Edge],
) -> Result<ExperimentResults, Error> {
  let Experiment { vertices, edges: e, online, batch, checking } = *experiment;
  if online > e {
    return Err(Error::InvalidArgument(format!(
      "{online} online edges requested out of {e} total"
    )));
  }
  if batch == 0 {
    return Err(Error::InvalidArgument("batch size must be positive".into()));
  }
  if edges.len() < e {
    return Err(Error::CorruptInput(format!(
      "edge pool holds {} edges, {e} requested",
      edges.len()
    )));
  }
  if let Some(&(tail, head)) = edges[..e].iter().find(|&&(t, h)| t >= vertices || h >= vertices) {
    return Err(Error::CorruptInput(format!(
      "edge ({tail}, {head}) is out of range for {vertices} vertices"
    )));
  }

  let (initial, online_edges) = edges[..e].split_at(e - online);
  debug!(
    "experiment: V={vertices} E={e} O={online} B={batch}, {} initial edges",
    initial.len()
  );

  let mut graph = Digraph::new(vertices);
  for &(tail, head) in initial {
    graph.add_edge(tail, head);
  }
  // Warm-up: push every online edge through the raw store and take it out again, so adjacency
  // vectors are pre-sized and allocation noise stays out of the measured loop.
  let mut warmed = Vec::with_capacity(online_edges.len());
  for &(tail, head) in online_edges {
    if graph.add_edge(tail, head) {
      warmed.push((tail, head));
    }
  }
  for &(tail, head) in &warmed {
    graph.remove_edge(tail, head);
  }

  let mut topo = T::with_graph(graph)?;
  topo.reset_metrics();

  let mut results = ExperimentResults::default();
  if checking && !validate_topo(&topo) {
    results.check_failures += 1;
  }

  let mut elapsed = Duration::ZERO;
  for chunk in online_edges.chunks(batch) {
    let batch_start = Instant::now();
    for &(tail, head) in chunk {
      match topo.add_edge(tail, head) {
        Ok(true) => results.accepted += 1,
        Ok(false) => results.duplicates += 1,
        Err(Error::CycleDetected) => results.rejected += 1,
        Err(err) => return Err(err),
      }
    }
    elapsed += batch_start.elapsed();
    if checking && !validate_topo(&topo) {
      results.check_failures += 1;
    }
  }

  let per_edge = online.max(1) as u32;
  let per_edge_f = online.max(1) as f64;
  let metrics = topo.metrics();
  results.invalidations = metrics.invalidations;
  results.time_per_insertion = elapsed / per_edge;
  results.search_steps_per_insertion = metrics.search_steps as f64 / per_edge_f;
  results.affected_region_per_insertion = metrics.affected_region as f64 / per_edge_f;
  results.reassigned_per_insertion = metrics.reassigned as f64 / per_edge_f;
  results.list = topo.list_stats();
  Ok(results)
}

/// The algorithms the harness can run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Algorithm {
  /// MNR, dense integer priorities with reorder-by-shift.
  Mnr,
  /// PK, dense integer priorities with reorder by index merge.
  Pk,
  /// AHRSZ over the two-level ordered list.
  Ahrsz,
  /// AHRSZ over the single-level ordered list.
  AhrszSingle,
  /// Offline recomputation baseline.
  Standard,
}

impl Algorithm {
  /// Run `experiment` over `edges` with this algorithm.
  pub fn run(self, experiment: &Experiment, edges: &[Edge]) -> Result<ExperimentResults, Error> {
    match self {
      Algorithm::Mnr => run::<MnrTopo>(experiment, edges),
      Algorithm::Pk => run::<PkTopo>(experiment, edges),
      Algorithm::Ahrsz => run::<AhrszTopo<TwoLevelList<()>>>(experiment, edges),
      Algorithm::AhrszSingle => run::<AhrszTopo<OrderedList<()>>>(experiment, edges),
      Algorithm::Standard => run::<StandardTopo>(experiment, edges),
    }
  }
}

impl std::fmt::Display for Algorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Algorithm::Mnr => "MNR",
      Algorithm::Pk => "PK",
      Algorithm::Ahrsz => "AHRSZ",
      Algorithm::AhrszSingle => "AHRSZ-single",
      Algorithm::Standard => "STD",
    };
    write!(f, "{name}")
  }
}

/// A streaming mean.
#[derive(Default, Clone, Copy, Debug)]
pub struct Average {
  value: f64,
  count: u32,
}

impl Average {
  /// Fold `sample` into the mean.
  pub fn add(&mut self, sample: f64) {
    self.value = (self.value * self.count as f64) / (self.count as f64 + 1.0);
    self.value += sample / (self.count as f64 + 1.0);
    self.count += 1;
  }

  /// The mean of all samples so far; zero when empty.
  pub fn value(&self) -> f64 { self.value }

  /// How many samples were folded in.
  pub fn count(&self) -> u32 { self.count }
}

/// Averaged results over several runs of the same experiment on different graphs.
#[derive(Default, Clone, Copy, Debug)]
pub struct Summary {
  /// Mean wall-clock per insertion, in seconds.
  pub time_per_insertion: Average,
  /// Mean invalidations per run.
  pub invalidations: Average,
  /// Mean search work per insertion.
  pub search_steps_per_insertion: Average,
  /// Mean affected-region size per insertion.
  pub affected_region_per_insertion: Average,
  /// Mean reassigned vertices per insertion.
  pub reassigned_per_insertion: Average,
  /// Total validation failures over all runs.
  pub check_failures: u32,
}

impl Summary {
  /// Fold one run's results into the summary.
  pub fn accumulate(&mut self, results: &ExperimentResults) {
    self.time_per_insertion.add(results.time_per_insertion.as_secs_f64());
    self.invalidations.add(results.invalidations as f64);
    self.search_steps_per_insertion.add(results.search_steps_per_insertion);
    self.affected_region_per_insertion.add(results.affected_region_per_insertion);
    self.reassigned_per_insertion.add(results.reassigned_per_insertion);
    self.check_failures += results.check_failures;
  }
}
