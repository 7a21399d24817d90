use std::error::Error;
use std::fs::File;
use std::io::BufReader;

use assert_matches::assert_matches;
use rstest::rstest;

use dev_shared::{create_temp_dir, seeded_rng};
use oto::edgelist;
use oto::generate::{random_acyclic_edges, random_edges};
use oto::harness::{Algorithm, Experiment, Summary};
use oto::range::Range;

const ALGORITHMS: [Algorithm; 5] = [
  Algorithm::Mnr,
  Algorithm::Pk,
  Algorithm::Ahrsz,
  Algorithm::AhrszSingle,
  Algorithm::Standard,
];

#[rstest]
#[case::mnr(Algorithm::Mnr)]
#[case::pk(Algorithm::Pk)]
#[case::ahrsz(Algorithm::Ahrsz)]
#[case::ahrsz_single(Algorithm::AhrszSingle)]
#[case::standard(Algorithm::Standard)]
fn acyclic_experiment_accepts_everything(#[case] algorithm: Algorithm) -> Result<(), Box<dyn Error>> {
  let mut rng = seeded_rng(31);
  let edges = random_acyclic_edges(30, 150, &mut rng)?;
  let experiment = Experiment { vertices: 30, edges: 150, online: 60, batch: 7, checking: true };

  let results = algorithm.run(&experiment, &edges)?;
  assert_eq!(results.accepted, 60);
  assert_eq!(results.rejected, 0);
  assert_eq!(results.duplicates, 0);
  assert_eq!(results.check_failures, 0);
  Ok(())
}

#[test]
fn cyclic_streams_are_handled_identically_by_all_algorithms() -> Result<(), Box<dyn Error>> {
  let mut rng = seeded_rng(32);
  // A general digraph stream: cycle-creating edges must be rejected, the rest accepted. The
  // initial prefix is empty so that construction cannot fail.
  let edges = random_edges(15, 80, &mut rng)?;
  let experiment = Experiment { vertices: 15, edges: 80, online: 80, batch: 5, checking: true };

  let baseline = ALGORITHMS[0].run(&experiment, &edges)?;
  assert_eq!(baseline.accepted + baseline.rejected + baseline.duplicates, 80);
  assert!(baseline.rejected > 0, "seeded digraph stream should contain cycles");
  for algorithm in &ALGORITHMS[1..] {
    let results = algorithm.run(&experiment, &edges)?;
    assert_eq!(results.accepted, baseline.accepted, "{algorithm}");
    assert_eq!(results.rejected, baseline.rejected, "{algorithm}");
    assert_eq!(results.check_failures, 0, "{algorithm}");
  }
  Ok(())
}

#[test]
fn work_metrics_are_reported_per_insertion() -> Result<(), Box<dyn Error>> {
  let mut rng = seeded_rng(33);
  let edges = random_acyclic_edges(40, 200, &mut rng)?;
  let experiment = Experiment { vertices: 40, edges: 200, online: 100, batch: 1, checking: false };

  let mnr = Algorithm::Mnr.run(&experiment, &edges)?;
  assert!(mnr.invalidations > 0);
  assert!(mnr.affected_region_per_insertion > 0.0);

  let pk = Algorithm::Pk.run(&experiment, &edges)?;
  assert!(pk.reassigned_per_insertion > 0.0);

  let ahrsz = Algorithm::Ahrsz.run(&experiment, &edges)?;
  assert!(ahrsz.reassigned_per_insertion > 0.0);
  // Construction and warm-up work is excluded: list counters only cover the online feed, and
  // every repair creates at most one priority per wave plus the odd sublist boundary.
  assert!(ahrsz.list.created <= ahrsz.invalidations * 44);
  Ok(())
}

#[test]
fn malformed_experiments_are_rejected() {
  let edges = vec![(0, 1), (1, 2)];
  let base = Experiment { vertices: 3, edges: 2, online: 1, batch: 1, checking: false };

  let too_many_online = Experiment { online: 3, ..base };
  assert_matches!(
    Algorithm::Pk.run(&too_many_online, &edges),
    Err(oto::Error::InvalidArgument(_))
  );

  let zero_batch = Experiment { batch: 0, ..base };
  assert_matches!(Algorithm::Pk.run(&zero_batch, &edges), Err(oto::Error::InvalidArgument(_)));

  let short_pool = Experiment { edges: 5, online: 1, ..base };
  assert_matches!(Algorithm::Pk.run(&short_pool, &edges), Err(oto::Error::CorruptInput(_)));

  let wrong_vertices = Experiment { vertices: 2, ..base };
  assert_matches!(
    Algorithm::Pk.run(&wrong_vertices, &edges),
    Err(oto::Error::CorruptInput(_))
  );
}

#[test]
fn experiments_run_from_a_binary_edge_list_file() -> Result<(), Box<dyn Error>> {
  let temp_dir = create_temp_dir();
  let path = temp_dir.path().join("graph-v25-e120-n1.dat");

  let mut rng = seeded_rng(34);
  let edges = random_acyclic_edges(25, 120, &mut rng)?;
  edgelist::write_binary(&mut File::create(&path)?, 25, &edges)?;

  let (vertices, loaded) = edgelist::read_binary(&mut BufReader::new(File::open(&path)?))?;
  assert_eq!(vertices, 25);
  assert_eq!(loaded, edges);

  let experiment =
    Experiment { vertices, edges: loaded.len(), online: 30, batch: 3, checking: true };
  let results = Algorithm::Ahrsz.run(&experiment, &loaded)?;
  assert_eq!(results.accepted, 30);
  assert_eq!(results.check_failures, 0);
  Ok(())
}

#[test]
fn sweeps_aggregate_into_a_summary() -> Result<(), Box<dyn Error>> {
  let batches: Range<usize> = "1:9:4".parse()?;
  let mut summary = Summary::default();

  for (i, batch) in batches.values().enumerate() {
    let mut rng = seeded_rng(40 + i as u64);
    let edges = random_acyclic_edges(20, 80, &mut rng)?;
    let experiment = Experiment { vertices: 20, edges: 80, online: 40, batch, checking: true };
    summary.accumulate(&Algorithm::Pk.run(&experiment, &edges)?);
  }

  assert_eq!(summary.invalidations.count(), 3);
  assert_eq!(summary.check_failures, 0);
  assert!(summary.search_steps_per_insertion.value() > 0.0);
  Ok(())
}
