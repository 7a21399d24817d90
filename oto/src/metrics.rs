//! Work counters attached to each algorithm instance.

/// Counters describing the work an algorithm performed. Which fields are meaningful depends on the
/// algorithm; unused fields stay zero.
#[derive(Default, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Metrics {
  /// Insertions that invalidated the order and required a repair.
  pub invalidations: u64,
  /// Vertices and edges touched while searching for the affected vertices.
  pub search_steps: u64,
  /// Total size of the affected priority regions scanned during repairs (MNR only).
  pub affected_region: u64,
  /// Total number of vertices whose priority was reassigned (the `δ` sets for PK, the discovery
  /// regions `K` for AHRSZ).
  pub reassigned: u64,
}

impl Metrics {
  /// Reset all counters to zero.
  pub fn clear(&mut self) {
    *self = Metrics::default();
  }
}
