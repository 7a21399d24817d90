use std::error::Error;

use assert_matches::assert_matches;
use rstest::rstest;

use dev_shared::{
  assert_valid_order, feed_edges, graph_from_edges, mixed_stream, order_snapshot, seeded_rng,
  EdgeOutcome,
};
use oto::{Digraph, Edge, OnlineTopo};
use oto::ahrsz::{Ahrsz, AhrszSingle};
use oto::generate::{random_acyclic_edges, random_edges};
use oto::harness::{Algorithm, Experiment};
use oto::mnr::MnrTopo;
use oto::pk::PkTopo;
use oto::standard::StandardTopo;

fn trivial_chain<T: OnlineTopo>() {
  let mut topo = T::new(3);
  assert_matches!(topo.add_edge(0, 1), Ok(true));
  assert_matches!(topo.add_edge(1, 2), Ok(true));
  assert_valid_order(&topo);
}

#[test]
fn s1_trivial_chain_is_accepted_by_every_algorithm() {
  trivial_chain::<MnrTopo>();
  trivial_chain::<PkTopo>();
  trivial_chain::<Ahrsz>();
  trivial_chain::<AhrszSingle>();
  trivial_chain::<StandardTopo>();

  let mut mnr = MnrTopo::new(3);
  mnr.add_edges(&[(0, 1), (1, 2)]);
  assert_eq!(mnr.ord(), &[0, 1, 2]);
}

fn immediate_cycle<T: OnlineTopo>() {
  let mut topo = T::new(2);
  assert_matches!(topo.add_edge(0, 1), Ok(true));
  let before = order_snapshot(&topo);
  assert_matches!(topo.add_edge(1, 0), Err(oto::Error::CycleDetected));
  assert!(!topo.graph().has_edge(1, 0));
  assert_eq!(order_snapshot(&topo), before);
  assert_valid_order(&topo);
}

#[test]
fn s2_immediate_cycle_is_rejected_without_side_effects() {
  immediate_cycle::<MnrTopo>();
  immediate_cycle::<PkTopo>();
  immediate_cycle::<Ahrsz>();
  immediate_cycle::<AhrszSingle>();
  immediate_cycle::<StandardTopo>();

  let mut mnr = MnrTopo::new(2);
  mnr.add_edges(&[(0, 1)]);
  assert_eq!(mnr.add_edges(&[(1, 0)]), 1);
  assert_eq!(mnr.ord(), &[0, 1]);
}

fn forced_reorder<T: OnlineTopo>() {
  let mut topo = T::new(4);
  assert_matches!(topo.add_edge(3, 1), Ok(true));
  assert_matches!(topo.order_cmp(3, 1), std::cmp::Ordering::Less);
  assert_valid_order(&topo);
}

#[test]
fn s3_reordering_insertion_is_repaired_by_every_algorithm() {
  forced_reorder::<MnrTopo>();
  forced_reorder::<PkTopo>();
  forced_reorder::<Ahrsz>();
  forced_reorder::<AhrszSingle>();
  forced_reorder::<StandardTopo>();

  // MNR specifically: the reached vertex moves after the preserved rest of the window.
  let mut mnr = MnrTopo::new(4);
  assert_matches!(mnr.add_edge(3, 1), Ok(true));
  assert_eq!(mnr.ord(), &[0, 3, 1, 2]);
  assert_eq!(mnr.pos(), &[0, 2, 3, 1]);
}

fn fan_scenario<T: OnlineTopo>() {
  let mut topo = T::new(5);
  for (t, h) in [(0, 2), (1, 2), (2, 3), (2, 4)] {
    assert_matches!(topo.add_edge(t, h), Ok(true));
    assert_valid_order(&topo);
  }
}

#[test]
fn s4_fan_insertions_keep_every_algorithm_valid() {
  fan_scenario::<MnrTopo>();
  fan_scenario::<PkTopo>();
  fan_scenario::<Ahrsz>();
  fan_scenario::<AhrszSingle>();
  fan_scenario::<StandardTopo>();
}

#[rstest]
#[case::mnr(Algorithm::Mnr)]
#[case::pk(Algorithm::Pk)]
#[case::ahrsz(Algorithm::Ahrsz)]
#[case::ahrsz_single(Algorithm::AhrszSingle)]
#[case::standard(Algorithm::Standard)]
fn s5_batch_size_does_not_change_outcomes(#[case] algorithm: Algorithm) -> Result<(), Box<dyn Error>> {
  let mut rng = seeded_rng(0x5eed5);
  let edges = random_acyclic_edges(20, 100, &mut rng)?;
  let experiment = |batch| Experiment { vertices: 20, edges: 100, online: 40, batch, checking: true };

  let baseline = algorithm.run(&experiment(1), &edges)?;
  assert_eq!(baseline.check_failures, 0);
  for batch in [4, 40] {
    let results = algorithm.run(&experiment(batch), &edges)?;
    assert_eq!(results.accepted, baseline.accepted, "batch size {batch}");
    assert_eq!(results.rejected, baseline.rejected, "batch size {batch}");
    assert_eq!(results.duplicates, baseline.duplicates, "batch size {batch}");
    assert_eq!(results.check_failures, 0);
  }
  Ok(())
}

/// The three online algorithms and the baseline must accept and reject exactly the same edges of
/// any stream, even though their final orders may differ.
fn outcomes_for_stream(n: u32, edges: &[Edge]) -> Vec<Vec<EdgeOutcome>> {
  let mut mnr = MnrTopo::new(n);
  let mut pk = PkTopo::new(n);
  let mut ahrsz = Ahrsz::new(n);
  let mut ahrsz_single = AhrszSingle::new(n);
  let mut standard = StandardTopo::new(n);

  let outcomes = vec![
    feed_edges(&mut mnr, edges),
    feed_edges(&mut pk, edges),
    feed_edges(&mut ahrsz, edges),
    feed_edges(&mut ahrsz_single, edges),
    feed_edges(&mut standard, edges),
  ];
  assert_valid_order(&mnr);
  assert_valid_order(&pk);
  assert_valid_order(&ahrsz);
  assert_valid_order(&ahrsz_single);
  assert_valid_order(&standard);
  outcomes
}

#[test]
fn algorithms_agree_on_a_mixed_stream() {
  let (n, edges) = mixed_stream();
  let outcomes = outcomes_for_stream(n, &edges);
  assert!(outcomes[0].contains(&EdgeOutcome::Added));
  assert!(outcomes[0].contains(&EdgeOutcome::Duplicate));
  assert!(outcomes[0].contains(&EdgeOutcome::Rejected));
  for other in &outcomes[1..] {
    assert_eq!(*other, outcomes[0]);
  }
}

#[rstest]
#[case::sparse(17, 40, 1)]
#[case::dense(12, 100, 2)]
#[case::very_dense(9, 70, 3)]
fn algorithms_agree_on_random_streams(
  #[case] n: u32,
  #[case] e: usize,
  #[case] seed: u64,
) -> Result<(), Box<dyn Error>> {
  let mut rng = seeded_rng(seed);
  let edges = random_edges(n, e, &mut rng)?;
  let outcomes = outcomes_for_stream(n, &edges);
  for other in &outcomes[1..] {
    assert_eq!(*other, outcomes[0]);
  }
  Ok(())
}

fn noop_insertion_preserves_order<T: OnlineTopo>() {
  let graph = graph_from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
  let mut topo = T::with_graph(graph).unwrap();
  let before = order_snapshot(&topo);
  // Both endpoints already ordered correctly: no repair may happen.
  assert_matches!(topo.add_edge(0, 3), Ok(true));
  assert_eq!(order_snapshot(&topo), before);
  // And a duplicate is a full no-op.
  assert_matches!(topo.add_edge(0, 3), Ok(false));
  assert_eq!(order_snapshot(&topo), before);
}

#[test]
fn noop_insertions_do_not_modify_the_order() {
  noop_insertion_preserves_order::<MnrTopo>();
  noop_insertion_preserves_order::<PkTopo>();
  noop_insertion_preserves_order::<Ahrsz>();
  noop_insertion_preserves_order::<AhrszSingle>();
  noop_insertion_preserves_order::<StandardTopo>();
}

fn random_dag_stays_valid<T: OnlineTopo>(seed: u64) -> Result<(), Box<dyn Error>> {
  let mut rng = seeded_rng(seed);
  let edges = random_acyclic_edges(50, 300, &mut rng)?;
  let (initial, online) = edges.split_at(200);
  let mut topo = T::with_graph(graph_from_edges(50, initial))?;
  for &(t, h) in online {
    assert_matches!(topo.add_edge(t, h), Ok(true));
  }
  assert_valid_order(&topo);
  Ok(())
}

#[test]
fn random_dag_streams_stay_valid() -> Result<(), Box<dyn Error>> {
  random_dag_stays_valid::<MnrTopo>(11)?;
  random_dag_stays_valid::<PkTopo>(12)?;
  random_dag_stays_valid::<Ahrsz>(13)?;
  random_dag_stays_valid::<AhrszSingle>(14)?;
  random_dag_stays_valid::<StandardTopo>(15)?;
  Ok(())
}

#[test]
fn initial_cycle_is_reported_at_construction() {
  let graph = graph_from_edges(3, &[(0, 1), (1, 2), (2, 0)]);
  assert_matches!(MnrTopo::with_graph(graph.clone()), Err(oto::Error::CycleDetected));
  assert_matches!(PkTopo::with_graph(graph.clone()), Err(oto::Error::CycleDetected));
  assert_matches!(Ahrsz::with_graph(graph.clone()), Err(oto::Error::CycleDetected));
  assert_matches!(StandardTopo::with_graph(graph), Err(oto::Error::CycleDetected));
}

#[test]
fn duplicate_initial_edges_do_not_confuse_the_store() {
  let mut graph = Digraph::new(3);
  assert!(graph.add_edge(0, 1));
  assert!(!graph.add_edge(0, 1));
  let mut topo = PkTopo::with_graph(graph).unwrap();
  assert_matches!(topo.add_edge(0, 1), Ok(false));
  assert_valid_order(&topo);
}
