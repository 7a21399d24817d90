//! Single-level ordered list.
//!
//! A singly linked list whose nodes carry 32-bit tags. Tags increase strictly along the list when
//! read *cyclically* from the front item's tag, so the position of an item is the wrapping
//! difference between its tag and the front tag. Insertion picks the midpoint of the surrounding
//! tag gap; when the gap is exhausted, a window of successors is relabelled. The window grows
//! until its tag span exceeds four times the span of its first half, which yields O(log n)
//! amortized insertion cost.

use slotmap::{DefaultKey, SlotMap};

use crate::{ListStats, M};

/// Stable handle to an item of an [`OrderedList`]. Remains valid across relabels; invalidated only
/// by erasing the item itself.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ItemId(DefaultKey);

#[derive(Clone, Debug)]
struct Node<T> {
  tag: u32,
  next: Option<DefaultKey>,
  value: T,
}

/// Ordered singly linked list with O(1) order comparison and O(log n) amortized insertion.
///
/// # Examples
///
/// ```
/// use oto_pspace::OrderedList;
///
/// let mut list = OrderedList::new();
/// let b = list.push_front("b");
/// let a = list.push_front("a");
/// let c = list.insert_after(b, "c");
///
/// assert!(list.order_lt(a, b));
/// assert!(list.order_lt(b, c));
/// assert_eq!(list.iter().map(|id| *list.value(id)).collect::<Vec<_>>(), vec!["a", "b", "c"]);
/// ```
#[derive(Clone, Debug)]
pub struct OrderedList<T> {
  nodes: SlotMap<DefaultKey, Node<T>>,
  head: Option<DefaultKey>,
  last: Option<DefaultKey>,
  stats: ListStats,
}

impl<T> Default for OrderedList<T> {
  fn default() -> Self { Self::new() }
}

impl<T> OrderedList<T> {
  /// Create an empty list.
  pub fn new() -> Self {
    Self { nodes: SlotMap::new(), head: None, last: None, stats: ListStats::default() }
  }

  /// Create a list of `n` default values with evenly distributed tags.
  pub fn with_len(n: usize) -> Self
  where T: Default {
    let mut list = Self::new();
    if n == 0 {
      return list;
    }
    let gap = (M / n as u64) as u32;
    let mut val = gap;
    let mut prev: Option<DefaultKey> = None;
    for _ in 0..n {
      let key = list.nodes.insert(Node { tag: val, next: None, value: T::default() });
      match prev {
        None => list.head = Some(key),
        Some(p) => list.nodes[p].next = Some(key),
      }
      prev = Some(key);
      val = val.wrapping_add(gap);
    }
    list.last = prev;
    list.stats.created += n as u64;
    list
  }

  /// Number of items in the list.
  #[inline]
  pub fn len(&self) -> usize { self.nodes.len() }

  /// Returns `true` if the list is empty.
  #[inline]
  pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

  /// The first item, if any.
  #[inline]
  pub fn front(&self) -> Option<ItemId> { self.head.map(ItemId) }

  /// The item after `id`, if any.
  #[inline]
  pub fn successor(&self, id: ItemId) -> Option<ItemId> { self.nodes[id.0].next.map(ItemId) }

  /// The value stored at `id`.
  #[inline]
  pub fn value(&self, id: ItemId) -> &T { &self.nodes[id.0].value }

  /// Mutable access to the value stored at `id`.
  #[inline]
  pub fn value_mut(&mut self, id: ItemId) -> &mut T { &mut self.nodes[id.0].value }

  /// Position of `id`: the wrapping tag distance from the front item. Monotonically increasing
  /// along the list, but stale once the list is mutated again.
  #[inline]
  pub fn order(&self, id: ItemId) -> u32 { self.vb(id.0) as u32 }

  /// Returns `true` if `id` comes strictly before `other` in the list.
  #[inline]
  pub fn order_lt(&self, id: ItemId, other: ItemId) -> bool { self.vb(id.0) < self.vb(other.0) }

  /// Work counters accumulated so far.
  #[inline]
  pub fn stats(&self) -> &ListStats { &self.stats }

  /// Reset the work counters.
  #[inline]
  pub fn clear_stats(&mut self) { self.stats.clear() }

  /// Iterate over the items in list order.
  pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
    let mut cursor = self.head;
    std::iter::from_fn(move || {
      let key = cursor?;
      cursor = self.nodes[key].next;
      Some(ItemId(key))
    })
  }

  /// Insert `value` before the current first item and return its handle.
  pub fn push_front(&mut self, value: T) -> ItemId {
    self.stats.created += 1;
    let Some(head) = self.head else {
      let key = self.nodes.insert(Node { tag: 0, next: None, value });
      self.head = Some(key);
      self.last = Some(key);
      return ItemId(key);
    };
    // The new front goes "after the last item" in the cyclic tag space: halfway between the last
    // tag and the wrap-around position of the front tag.
    let last = self.last.expect("non-empty list must have a last item");
    let mut vb_last = self.vb(last);
    if vb_last + 1 == M {
      self.relabel(last);
      vb_last = self.vb(last);
    }
    let tag = (((M + vb_last) / 2) as u32).wrapping_add(self.nodes[head].tag);
    let key = self.nodes.insert(Node { tag, next: Some(head), value });
    self.head = Some(key);
    ItemId(key)
  }

  /// Insert `value` between `pos` and its successor and return its handle.
  pub fn insert_after(&mut self, pos: ItemId, value: T) -> ItemId {
    let mut vb_x = self.vb(pos.0);
    let mut vbs_x = self.vbs(pos.0);
    if vb_x + 1 >= vbs_x {
      self.relabel(pos.0);
      vb_x = self.vb(pos.0);
      vbs_x = self.vbs(pos.0);
      debug_assert!(vb_x + 1 < vbs_x);
    }
    let head = self.head.expect("insert_after requires a non-empty list");
    let tag = (((vbs_x + vb_x) / 2) as u32).wrapping_add(self.nodes[head].tag);
    let key = self.nodes.insert(Node { tag, next: self.nodes[pos.0].next, value });
    self.nodes[pos.0].next = Some(key);
    if self.last == Some(pos.0) {
      self.last = Some(key);
    }
    self.stats.created += 1;
    ItemId(key)
  }

  /// Remove the successor of `pos`, returning its value, or `None` if `pos` is the last item.
  pub fn erase_after(&mut self, pos: ItemId) -> Option<T> {
    let succ = self.nodes[pos.0].next?;
    self.nodes[pos.0].next = self.nodes[succ].next;
    if self.last == Some(succ) {
      self.last = Some(pos.0);
    }
    Some(self.nodes.remove(succ).expect("successor must be present").value)
  }

  /// Remove the first item, returning its value, or `None` if the list is empty.
  pub fn pop_front(&mut self) -> Option<T> {
    let head = self.head?;
    self.head = self.nodes[head].next;
    if self.last == Some(head) {
      self.last = None;
    }
    Some(self.nodes.remove(head).expect("front must be present").value)
  }

  /// Tag distance from the front item, in `[0, M)`.
  fn vb(&self, key: DefaultKey) -> u64 {
    let front_tag = self.nodes[self.head.expect("vb requires a non-empty list")].tag;
    self.nodes[key].tag.wrapping_sub(front_tag) as u64
  }

  /// Tag distance of the successor of `key`, taking past-the-end as distance `M`.
  fn vbs(&self, key: DefaultKey) -> u64 {
    match self.nodes[key].next {
      None => M,
      Some(next) => self.vb(next),
    }
  }

  /// The `n`-th successor of `key`, wrapping past the end of the list to the front.
  fn advance(&self, mut key: DefaultKey, mut n: usize) -> DefaultKey {
    while n > 0 {
      key = match self.nodes[key].next {
        Some(next) => next,
        None => self.head.expect("non-empty list must have a head"),
      };
      n -= 1;
    }
    key
  }

  /// Tag distance from `v0` to the item `x` at window index `index`, where a full cycle counts as
  /// distance `M`.
  fn w(&self, index: usize, x: DefaultKey, v0: u32) -> u64 {
    if index == self.len() {
      M
    } else {
      self.nodes[x].tag.wrapping_sub(v0) as u64
    }
  }

  /// Redistribute the tags of a window of successors of `pos`.
  ///
  /// `pos` is the item whose successor gap is exhausted; its own tag is not touched. The window
  /// `[1, j]` of successors grows (doubling `j`) until its span exceeds four times the span of its
  /// first half, then the `j - 1` items strictly inside the window are spaced evenly.
  fn relabel(&mut self, pos: DefaultKey) {
    let v0 = self.nodes[pos].tag;
    let mut i = 1usize;
    let mut j = 2usize;
    let mut ip = self.advance(pos, 1);
    let mut jp = self.advance(pos, 2);

    while self.w(j, jp, v0) <= 4 * self.w(i, ip, v0) {
      i += 1;
      let nj = (2 * i).min(self.len());
      ip = self.advance(ip, 1);
      jp = self.advance(jp, nj - j);
      j = nj;
    }

    let gap = (self.w(j, jp, v0) / j as u64) as u32;
    let mut val = gap;
    let mut ip = self.advance(pos, 1);
    while ip != jp {
      self.nodes[ip].tag = val.wrapping_add(v0);
      val = val.wrapping_add(gap);
      ip = self.advance(ip, 1);
    }
    self.stats.relabels += 1;
  }
}
