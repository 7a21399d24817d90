//! The AHRSZ online topological order algorithm.
//!
//! Priorities are handles into an ordered list ([`PrioritySpace`]), so new priorities can be
//! created between any two existing ones. An invalidating insertion `(t, h)` is repaired in two
//! stages: *discovery* runs a forward search from `h` and a backward search from `t`
//! simultaneously, spending the same edge budget on both, until the frontiers pass each other in
//! priority order; the committed vertices form a minimal region `K` whose priorities must change.
//! *Reassignment* gives every vertex of `K` a priority strictly between the priorities of its
//! non-`K` in-neighbours (its floor) and its non-`K` out-neighbours and `K`-successors (its
//! ceiling), processing `K` in waves of equal floor so that each wave shares one freshly chosen
//! priority. First described by Alpern, Hoover, Rosen, Sweeney and Zadeck, "Incremental
//! Evaluation of Computational Circuits", SODA 1990.
//!
//! Unlike the integer-priority algorithms, two unrelated vertices may end up *sharing* a
//! priority; the maintained order stays total over priorities and strict along every edge.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use log::trace;
use oto_graph::{Digraph, Vertex};
use oto_pspace::{ListStats, OrderedList, PrioritySpace, TwoLevelList};

use crate::{Error, Metrics, OnlineTopo};
use crate::sort::topological_sort;

/// AHRSZ over the two-level ordered list: O(1) amortized priority creation.
pub type Ahrsz = AhrszTopo<TwoLevelList<()>>;

/// AHRSZ over the single-level ordered list: O(log n) amortized priority creation.
pub type AhrszSingle = AhrszTopo<OrderedList<()>>;

/// A priority extended with `-∞` and `+∞`, used for floors and ceilings during reassignment.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExtPriority<H> {
  /// Below every priority.
  MinusInf,
  /// An actual priority in the space.
  At(H),
  /// Above every priority.
  PlusInf,
}

/// Integer order snapshot of a vertex's priority, used as a heap key while the space is fixed.
fn priority_key<P: PrioritySpace>(space: &P, ord: &[P::Handle], v: Vertex) -> u64 {
  space.order(ord[v as usize])
}

fn ext_lt<P: PrioritySpace>(
  space: &P,
  a: &ExtPriority<P::Handle>,
  b: &ExtPriority<P::Handle>,
) -> bool {
  use ExtPriority::*;
  match (a, b) {
    (MinusInf, other) => !matches!(other, MinusInf),
    (_, MinusInf) => false,
    (other, PlusInf) => !matches!(other, PlusInf),
    (PlusInf, _) => false,
    (At(x), At(y)) => x != y && space.order_lt(*x, *y),
  }
}

fn ext_min<P: PrioritySpace>(
  space: &P,
  a: ExtPriority<P::Handle>,
  b: ExtPriority<P::Handle>,
) -> ExtPriority<P::Handle> {
  if ext_lt(space, &b, &a) { b } else { a }
}

fn ext_max<P: PrioritySpace>(
  space: &P,
  a: ExtPriority<P::Handle>,
  b: ExtPriority<P::Handle>,
) -> ExtPriority<P::Handle> {
  if ext_lt(space, &a, &b) { b } else { a }
}

/// Which reassignment strategy to run over the discovery region.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reassignment {
  /// Process `K` in waves of equal floor; every wave shares one new priority, so the number of
  /// priorities created is bounded by the number of distinct floors, not `|K|`.
  Waves,
  /// Assign every vertex of `K` independently in reverse topological order. Simpler, but creates
  /// more priorities.
  Simple,
}

/// Discovery frontier membership. Ordinary `visited` marks cannot be used here because the two
/// searches must notice when they touch: a vertex reachable from `h` that also reaches `t` proves
/// the pending edge `(t, h)` closes a cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mark {
  Clear,
  Forward,
  Backward,
}

/// Min-heap of `(vertex, floor)` entries ordered by floor.
///
/// Floors hold list handles, and the list is mutated between queue operations (new priorities are
/// created mid-reassignment). Tag snapshots would go stale across relabels, so entries are
/// compared *live* through the priority space; relative handle order never changes, which keeps
/// the heap invariant intact across insertions.
struct WaveQueue<H> {
  heap: Vec<(Vertex, ExtPriority<H>)>,
}

impl<H> WaveQueue<H> {
  fn new() -> Self { Self { heap: Vec::new() } }

  fn peek(&self) -> Option<&(Vertex, ExtPriority<H>)> { self.heap.first() }

  fn push<P: PrioritySpace<Handle = H>>(&mut self, entry: (Vertex, ExtPriority<H>), space: &P) {
    self.heap.push(entry);
    let mut i = self.heap.len() - 1;
    while i > 0 {
      let parent = (i - 1) / 2;
      if ext_lt(space, &self.heap[i].1, &self.heap[parent].1) {
        self.heap.swap(i, parent);
        i = parent;
      } else {
        break;
      }
    }
  }

  fn pop<P: PrioritySpace<Handle = H>>(&mut self, space: &P) -> Option<(Vertex, ExtPriority<H>)> {
    if self.heap.is_empty() {
      return None;
    }
    let last = self.heap.len() - 1;
    self.heap.swap(0, last);
    let entry = self.heap.pop();
    let mut i = 0;
    loop {
      let (left, right) = (2 * i + 1, 2 * i + 2);
      let mut smallest = i;
      if left < self.heap.len() && ext_lt(space, &self.heap[left].1, &self.heap[smallest].1) {
        smallest = left;
      }
      if right < self.heap.len() && ext_lt(space, &self.heap[right].1, &self.heap[smallest].1) {
        smallest = right;
      }
      if smallest == i {
        break;
      }
      self.heap.swap(i, smallest);
      i = smallest;
    }
    entry
  }
}

/// Online topological order with ordered-list priorities, generic over the priority space.
#[derive(Clone, Debug)]
pub struct AhrszTopo<P: PrioritySpace> {
  graph: Digraph,
  space: P,
  /// Priority of each vertex. Not injective: waves share priorities.
  ord: Vec<P::Handle>,
  /// Scratch for the reassignment stage; all entries `MinusInf` between calls.
  ceiling: Vec<ExtPriority<P::Handle>>,
  /// Scratch for the ceiling DFS; all-false between calls.
  visited: Vec<bool>,
  /// Scratch marking membership in the discovery region; all-false between calls.
  in_k: Vec<bool>,
  /// Scratch counting in-edges from inside the region; all-zero between calls.
  indegree_k: Vec<u32>,
  /// Scratch marking discovery frontier membership; all-`Clear` between calls.
  mark: Vec<Mark>,
  mode: Reassignment,
  metrics: Metrics,
}

impl<P: PrioritySpace> AhrszTopo<P> {
  /// Like [`OnlineTopo::with_graph`], but choosing the reassignment strategy.
  pub fn with_reassignment(graph: Digraph, mode: Reassignment) -> Result<Self, Error> {
    let order = topological_sort(&graph)?;
    let n = graph.num_vertices() as usize;
    let mut space = P::default();
    let mut handles: Vec<Option<P::Handle>> = vec![None; n];
    // Pushing in reverse topological order leaves the list in topological order.
    for &v in order.iter().rev() {
      handles[v as usize] = Some(space.push_front());
    }
    let ord = handles.into_iter().map(|h| h.expect("every vertex was ordered")).collect();
    Ok(Self {
      graph,
      space,
      ord,
      ceiling: vec![ExtPriority::MinusInf; n],
      visited: vec![false; n],
      in_k: vec![false; n],
      indegree_k: vec![0; n],
      mark: vec![Mark::Clear; n],
      mode,
      metrics: Metrics::default(),
    })
  }

  /// The priority space backing this instance.
  pub fn space(&self) -> &P { &self.space }

  /// Symmetric search for the discovery region `K` of the invalidating edge `(tail, head)`.
  ///
  /// The forward frontier expands from `head` in ascending priority order, the backward frontier
  /// from `tail` in descending order, and each step spends the same edge budget on both, so the
  /// committed region is within a constant factor of the smallest region covering the
  /// invalidation. `K` receives the committed vertices in commit order. Fails without committing
  /// anything when one frontier touches the other, which proves a path `head ->* tail`.
  fn discovery(&mut self, tail: Vertex, head: Vertex, k: &mut Vec<Vertex>) -> Result<(), Error> {
    // Priorities do not change during discovery, so integer snapshots are stable heap keys here.
    let mut forward: BinaryHeap<Reverse<(u64, Vertex)>> = BinaryHeap::new();
    let mut backward: BinaryHeap<(u64, Vertex)> = BinaryHeap::new();
    self.mark[head as usize] = Mark::Forward;
    self.mark[tail as usize] = Mark::Backward;
    forward.push(Reverse((priority_key(&self.space, &self.ord, head), head)));
    backward.push((priority_key(&self.space, &self.ord, tail), tail));

    let mut f = head;
    let mut b = tail;
    let mut forward_edges = self.graph.out_degree(head);
    let mut backward_edges = self.graph.in_degree(tail);

    let mut result = Ok(());
    'search: while !forward.is_empty()
      && !backward.is_empty()
      && !self.space.order_lt(self.ord[b as usize], self.ord[f as usize])
    {
      let budget = forward_edges.min(backward_edges);
      forward_edges -= budget;
      backward_edges -= budget;

      if forward_edges == 0 {
        k.push(f);
        forward.pop();
        self.metrics.search_steps += 1;
        for &w in self.graph.out_edges(f) {
          self.metrics.search_steps += 1;
          match self.mark[w as usize] {
            Mark::Clear => {
              self.mark[w as usize] = Mark::Forward;
              forward.push(Reverse((priority_key(&self.space, &self.ord, w), w)));
            }
            Mark::Forward => {}
            Mark::Backward => {
              result = Err(Error::CycleDetected);
              break 'search;
            }
          }
        }
        f = match forward.peek() {
          Some(&Reverse((_, v))) => v,
          None => tail,
        };
        forward_edges = self.graph.out_degree(f);
      }

      if backward_edges == 0 {
        k.push(b);
        backward.pop();
        self.metrics.search_steps += 1;
        for &w in self.graph.in_edges(b) {
          self.metrics.search_steps += 1;
          match self.mark[w as usize] {
            Mark::Clear => {
              self.mark[w as usize] = Mark::Backward;
              backward.push((priority_key(&self.space, &self.ord, w), w));
            }
            Mark::Backward => {}
            Mark::Forward => {
              result = Err(Error::CycleDetected);
              break 'search;
            }
          }
        }
        b = match backward.peek() {
          Some(&(_, v)) => v,
          None => head,
        };
        backward_edges = self.graph.in_degree(b);
      }
    }

    // Unmark everything still on a frontier; committed marks are cleared by reassignment, or here
    // on the failure path.
    while let Some(Reverse((_, v))) = forward.pop() {
      self.mark[v as usize] = Mark::Clear;
    }
    while let Some((_, v)) = backward.pop() {
      self.mark[v as usize] = Mark::Clear;
    }
    if result.is_err() {
      for &v in k.iter() {
        self.mark[v as usize] = Mark::Clear;
      }
      k.clear();
    }
    result
  }

  /// Reassign the priorities of `k` and clear every scratch entry the repair touched.
  fn reassignment(&mut self, k: &[Vertex]) {
    for &x in k {
      self.ceiling[x as usize] = ExtPriority::PlusInf;
      self.in_k[x as usize] = true;
    }

    // Ceiling pass over the subgraph induced by `k`, collecting a post-order as a side product.
    let mut postorder = Vec::with_capacity(k.len());
    for &x in k {
      if !self.visited[x as usize] {
        self.compute_ceiling(x, &mut postorder);
      }
    }

    match self.mode {
      Reassignment::Simple => {
        // Reverse post-order is a topological order of the region, so every floor reads already
        // reassigned predecessors.
        for &x in postorder.iter().rev() {
          let floor = self.compute_floor(x);
          let priority = self.compute_priority(floor, self.ceiling[x as usize]);
          self.ord[x as usize] = priority;
        }
      }
      Reassignment::Waves => self.reassign_in_waves(k),
    }

    for &x in k {
      self.visited[x as usize] = false;
      self.in_k[x as usize] = false;
      self.mark[x as usize] = Mark::Clear;
      self.ceiling[x as usize] = ExtPriority::MinusInf;
      self.indegree_k[x as usize] = 0;
    }
  }

  /// Kahn-style relaxation: repeatedly take all pending vertices of minimal floor as one wave and
  /// give them a single new priority strictly between the wave's floor and ceiling.
  fn reassign_in_waves(&mut self, k: &[Vertex]) {
    let mut queue = WaveQueue::new();
    for &x in k {
      let mut floor = ExtPriority::MinusInf;
      let mut k_indegree = 0;
      for &s in self.graph.in_edges(x) {
        if self.in_k[s as usize] {
          k_indegree += 1;
        }
        floor = ext_max(&self.space, floor, ExtPriority::At(self.ord[s as usize]));
      }
      self.indegree_k[x as usize] = k_indegree;
      if k_indegree == 0 {
        queue.push((x, floor), &self.space);
      }
    }

    let mut wave: Vec<Vertex> = Vec::new();
    while let Some((first, wave_floor)) = queue.pop(&self.space) {
      wave.clear();
      wave.push(first);
      let mut wave_ceiling = self.ceiling[first as usize];
      while queue.peek().map_or(false, |&(_, floor)| floor == wave_floor) {
        let (x, _) = queue.pop(&self.space).expect("peeked entry must pop");
        wave_ceiling = ext_min(&self.space, wave_ceiling, self.ceiling[x as usize]);
        wave.push(x);
      }

      let priority = self.compute_priority(wave_floor, wave_ceiling);
      for &z in &wave {
        self.ord[z as usize] = priority;
      }
      for &z in &wave {
        for &y in self.graph.out_edges(z) {
          if self.in_k[y as usize] {
            self.indegree_k[y as usize] -= 1;
            if self.indegree_k[y as usize] == 0 {
              // Recompute against current priorities: all of y's region predecessors are assigned.
              let floor = self.compute_floor(y);
              queue.push((y, floor), &self.space);
            }
          }
        }
      }
    }
  }

  /// Compute `ceiling[n]` bottom-up over the region: the minimum over out-edges of the successor's
  /// ceiling (inside the region) or its priority (outside). Iterative DFS; the region can be as
  /// deep as the graph and must not recurse. Appends finished vertices to `postorder`.
  fn compute_ceiling(&mut self, n: Vertex, postorder: &mut Vec<Vertex>) {
    self.visited[n as usize] = true;
    let mut stack: Vec<(Vertex, usize)> = vec![(n, 0)];
    while let Some((v, i)) = stack.last().copied() {
      if i < self.graph.out_degree(v) {
        stack.last_mut().expect("stack is non-empty").1 += 1;
        let y = self.graph.out_edges(v)[i];
        if self.in_k[y as usize] {
          if !self.visited[y as usize] {
            self.visited[y as usize] = true;
            stack.push((y, 0));
          } else {
            // Cross edge to a finished region vertex: its ceiling is final.
            let c = self.ceiling[y as usize];
            self.ceiling[v as usize] = ext_min(&self.space, self.ceiling[v as usize], c);
          }
        } else {
          let c = ExtPriority::At(self.ord[y as usize]);
          self.ceiling[v as usize] = ext_min(&self.space, self.ceiling[v as usize], c);
        }
      } else {
        stack.pop();
        postorder.push(v);
        if let Some(&(parent, _)) = stack.last() {
          let c = self.ceiling[v as usize];
          self.ceiling[parent as usize] = ext_min(&self.space, self.ceiling[parent as usize], c);
        }
      }
    }
  }

  /// The greatest lower bound a new priority for `v` must respect: the maximum priority over all
  /// in-neighbours, `-∞` when there are none.
  fn compute_floor(&self, v: Vertex) -> ExtPriority<P::Handle> {
    let mut floor = ExtPriority::MinusInf;
    for &s in self.graph.in_edges(v) {
      floor = ext_max(&self.space, floor, ExtPriority::At(self.ord[s as usize]));
    }
    floor
  }

  /// Pick a priority strictly between `floor` and `ceiling`, reusing an existing one when it
  /// fits and creating a new list entry otherwise.
  fn compute_priority(
    &mut self,
    floor: ExtPriority<P::Handle>,
    ceiling: ExtPriority<P::Handle>,
  ) -> P::Handle {
    debug_assert!(ext_lt(&self.space, &floor, &ceiling));
    let candidate = match floor {
      ExtPriority::MinusInf => match self.space.front() {
        Some(front) if ext_lt(&self.space, &ExtPriority::At(front), &ceiling) => front,
        _ => self.space.push_front(),
      },
      ExtPriority::At(handle) => match self.space.successor(handle) {
        Some(next) if ext_lt(&self.space, &ExtPriority::At(next), &ceiling) => next,
        _ => self.space.insert_after(handle),
      },
      ExtPriority::PlusInf => unreachable!("a floor can never be +infinity"),
    };
    debug_assert!(ext_lt(&self.space, &floor, &ExtPriority::At(candidate)));
    debug_assert!(ext_lt(&self.space, &ExtPriority::At(candidate), &ceiling));
    candidate
  }
}

impl<P: PrioritySpace> OnlineTopo for AhrszTopo<P> {
  fn with_graph(graph: Digraph) -> Result<Self, Error> {
    Self::with_reassignment(graph, Reassignment::Waves)
  }

  fn graph(&self) -> &Digraph { &self.graph }

  fn add_edge(&mut self, tail: Vertex, head: Vertex) -> Result<bool, Error> {
    if tail == head {
      return Err(Error::CycleDetected);
    }
    if !self.graph.add_edge(tail, head) {
      return Ok(false);
    }
    if self.space.order_lt(self.ord[tail as usize], self.ord[head as usize]) {
      return Ok(true);
    }
    trace!("edge ({tail}, {head}) invalidates the order, discovering region");
    let mut k = Vec::new();
    if let Err(err) = self.discovery(tail, head, &mut k) {
      self.graph.remove_edge(tail, head);
      return Err(err);
    }
    self.metrics.invalidations += 1;
    self.metrics.reassigned += k.len() as u64;
    self.reassignment(&k);
    Ok(true)
  }

  fn order_cmp(&self, u: Vertex, v: Vertex) -> Ordering {
    let (a, b) = (self.ord[u as usize], self.ord[v as usize]);
    if a == b {
      Ordering::Equal
    } else if self.space.order_lt(a, b) {
      Ordering::Less
    } else {
      Ordering::Greater
    }
  }

  fn metrics(&self) -> &Metrics { &self.metrics }

  fn list_stats(&self) -> ListStats { self.space.stats() }

  fn reset_metrics(&mut self) {
    self.metrics.clear();
    self.space.clear_stats();
  }
}
