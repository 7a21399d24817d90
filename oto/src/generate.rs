//! Random edge-list generation.
//!
//! Both generators sample uniformly *without replacement* over the legal edge universe and return
//! the sample in random order, which is what the harness feeds as an insertion stream.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use oto_graph::{Edge, Vertex};

use crate::Error;

/// Generate `e` distinct edges of a uniformly random DAG over `v` vertices.
///
/// A random permutation of the vertices serves as a hidden topological order; edges are sampled
/// from the `v * (v - 1) / 2` pairs respecting it. Returns [`Error::InvalidArgument`] when `v` is
/// zero or `e` is not strictly below the pair universe.
pub fn random_acyclic_edges(v: u32, e: usize, rng: &mut impl Rng) -> Result<Vec<Edge>, Error> {
  if v == 0 {
    return Err(Error::InvalidArgument("graph needs at least one vertex".into()));
  }
  let universe = v as u64 * (v as u64 - 1) / 2;
  if e as u64 >= universe {
    return Err(Error::InvalidArgument(format!(
      "{e} edges requested but an acyclic graph over {v} vertices has fewer than {universe}"
    )));
  }

  let mut order: Vec<Vertex> = (0..v).collect();
  order.shuffle(rng);

  let mut picked = HashSet::with_capacity(e);
  let mut edges = Vec::with_capacity(e);
  while edges.len() < e {
    let index = rng.gen_range(0..universe);
    if picked.insert(index) {
      let (i, j) = decode_pair(index, v);
      edges.push((order[i as usize], order[j as usize]));
    }
  }
  edges.shuffle(rng);
  Ok(edges)
}

/// Generate `e` distinct edges of a uniformly random digraph over `v` vertices. Self-loops are
/// part of the universe. Returns [`Error::InvalidArgument`] when `v` is zero or `e` is not
/// strictly below `v * v`.
pub fn random_edges(v: u32, e: usize, rng: &mut impl Rng) -> Result<Vec<Edge>, Error> {
  if v == 0 {
    return Err(Error::InvalidArgument("graph needs at least one vertex".into()));
  }
  let universe = v as u64 * v as u64;
  if e as u64 >= universe {
    return Err(Error::InvalidArgument(format!(
      "{e} edges requested but a digraph over {v} vertices has fewer than {universe}"
    )));
  }

  let mut picked = HashSet::with_capacity(e);
  let mut edges = Vec::with_capacity(e);
  while edges.len() < e {
    let index = rng.gen_range(0..universe);
    if picked.insert(index) {
      edges.push(((index / v as u64) as Vertex, (index % v as u64) as Vertex));
    }
  }
  edges.shuffle(rng);
  Ok(edges)
}

/// Decode an index in `[0, v * (v - 1) / 2)` into the pair `(i, j)` with `i < j`, enumerating row
/// by row: `(0, 1), (0, 2), .., (0, v-1), (1, 2), ..`.
fn decode_pair(mut index: u64, v: u32) -> (Vertex, Vertex) {
  let mut row = 0u32;
  loop {
    let row_len = (v - row - 1) as u64;
    if index < row_len {
      return (row, row + 1 + index as u32);
    }
    index -= row_len;
    row += 1;
  }
}
