//! Two-level ordered list.
//!
//! Items are grouped into *sublists* of at most `log2 M = 32` items. Each item carries a 32-bit
//! inner tag, unique within its sublist; each sublist boundary carries its own tag in a nested
//! single-level [`OrderedList`]. An item's position is the pair (sublist position, inner tag),
//! compared lexicographically in O(1).
//!
//! Inner relabels touch at most one sublist (at most 32 items), and a sublist that reaches the
//! size limit is split in two, renumbering both halves and inserting one boundary into the outer
//! list. Since the outer list only grows by one entry per ~16 item insertions, the amortized cost
//! per insertion is O(1).

use slotmap::{DefaultKey, SlotMap};

use crate::{ListStats, M};
use crate::single::{self, OrderedList};

/// Maximum number of items per sublist: `log2` of the tag universe size.
const LOG2_M: usize = 32;

/// Stable handle to an item of a [`TwoLevelList`]. Remains valid across relabels, renumberings and
/// splits; invalidated only by erasing the item itself.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ItemId(DefaultKey);

#[derive(Clone, Debug)]
struct Item<T> {
  inner: u32,
  sublist: single::ItemId,
  next: Option<DefaultKey>,
  value: T,
}

#[derive(Clone, Debug)]
struct Sublist {
  first: DefaultKey,
  len: usize,
}

/// Ordered list with O(1) order comparison and O(1) amortized insertion.
///
/// # Examples
///
/// ```
/// use oto_pspace::TwoLevelList;
///
/// let mut list = TwoLevelList::new();
/// let b = list.push_front("b");
/// let a = list.push_front("a");
/// let c = list.insert_after(b, "c");
///
/// assert!(list.order_lt(a, b));
/// assert!(list.order_lt(b, c));
/// ```
#[derive(Clone, Debug)]
pub struct TwoLevelList<T> {
  items: SlotMap<DefaultKey, Item<T>>,
  sublists: OrderedList<Sublist>,
  head: Option<DefaultKey>,
  stats: ListStats,
}

impl<T> Default for TwoLevelList<T> {
  fn default() -> Self { Self::new() }
}

impl<T> TwoLevelList<T> {
  /// Create an empty list.
  pub fn new() -> Self {
    Self { items: SlotMap::new(), sublists: OrderedList::new(), head: None, stats: ListStats::default() }
  }

  /// Create a list of `n` default values, chunked into full sublists with evenly distributed
  /// inner tags.
  pub fn with_len(n: usize) -> Self
  where T: Default {
    let mut list = Self::new();
    let mut remaining = n;
    let mut prev_item: Option<DefaultKey> = None;
    let mut prev_sublist: Option<single::ItemId> = None;
    while remaining > 0 {
      let chunk = remaining.min(LOG2_M);
      remaining -= chunk;
      let sublist = match prev_sublist {
        None => list.sublists.push_front(Sublist { first: DefaultKey::default(), len: chunk }),
        Some(p) => list.sublists.insert_after(p, Sublist { first: DefaultKey::default(), len: chunk }),
      };
      let gap = (M / (chunk as u64 + 1)) as u32;
      let mut val = gap;
      for i in 0..chunk {
        let key = list.items.insert(Item { inner: val, sublist, next: None, value: T::default() });
        match prev_item {
          None => list.head = Some(key),
          Some(p) => list.items[p].next = Some(key),
        }
        if i == 0 {
          list.sublists.value_mut(sublist).first = key;
        }
        prev_item = Some(key);
        val = val.wrapping_add(gap);
      }
      prev_sublist = Some(sublist);
    }
    list.stats.created += n as u64;
    list
  }

  /// Number of items in the list.
  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  /// Returns `true` if the list is empty.
  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// The first item, if any.
  #[inline]
  pub fn front(&self) -> Option<ItemId> { self.head.map(ItemId) }

  /// The item after `id`, if any.
  #[inline]
  pub fn successor(&self, id: ItemId) -> Option<ItemId> { self.items[id.0].next.map(ItemId) }

  /// The value stored at `id`.
  #[inline]
  pub fn value(&self, id: ItemId) -> &T { &self.items[id.0].value }

  /// Mutable access to the value stored at `id`.
  #[inline]
  pub fn value_mut(&mut self, id: ItemId) -> &mut T { &mut self.items[id.0].value }

  /// Position of `id`: the outer position of its sublist in the high 32 bits, the inner tag
  /// distance in the low 32 bits. Monotonically increasing along the list, but stale once the
  /// list is mutated again.
  pub fn order(&self, id: ItemId) -> u64 {
    let sublist = self.items[id.0].sublist;
    ((self.sublists.order(sublist) as u64) << 32) | self.vb(id.0)
  }

  /// Returns `true` if `id` comes strictly before `other` in the list.
  pub fn order_lt(&self, id: ItemId, other: ItemId) -> bool {
    let sa = self.items[id.0].sublist;
    let sb = self.items[other.0].sublist;
    if sa == sb {
      self.vb(id.0) < self.vb(other.0)
    } else {
      self.sublists.order_lt(sa, sb)
    }
  }

  /// Work counters, merged over the items and the outer boundary list.
  pub fn stats(&self) -> ListStats {
    self.stats + *self.sublists.stats()
  }

  /// Reset the work counters.
  pub fn clear_stats(&mut self) {
    self.stats.clear();
    self.sublists.clear_stats();
  }

  /// Iterate over the items in list order.
  pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
    let mut cursor = self.head;
    std::iter::from_fn(move || {
      let key = cursor?;
      cursor = self.items[key].next;
      Some(ItemId(key))
    })
  }

  /// Insert `value` before the current first item and return its handle.
  pub fn push_front(&mut self, value: T) -> ItemId {
    self.stats.created += 1;
    let Some(head) = self.head else {
      let sublist = self.sublists.push_front(Sublist { first: DefaultKey::default(), len: 1 });
      let key = self.items.insert(Item { inner: 0, sublist, next: None, value });
      self.sublists.value_mut(sublist).first = key;
      self.head = Some(key);
      return ItemId(key);
    };
    // The new front joins the first sublist, labelled "after its last item" in the cyclic inner
    // tag space, which places it before the current first.
    let sublist = self.sublists.front().expect("non-empty list must have a sublist");
    let last = self.last_of(sublist);
    let inner = self.compute_label(last, sublist);
    let key = self.items.insert(Item { inner, sublist, next: Some(head), value });
    self.head = Some(key);
    let sub = self.sublists.value_mut(sublist);
    sub.first = key;
    sub.len += 1;
    if self.sublists.value(sublist).len >= LOG2_M {
      self.split(sublist);
    }
    ItemId(key)
  }

  /// Insert `value` between `pos` and its successor and return its handle.
  pub fn insert_after(&mut self, pos: ItemId, value: T) -> ItemId {
    let sublist = self.items[pos.0].sublist;
    let inner = self.compute_label(pos.0, sublist);
    let key = self.items.insert(Item { inner, sublist, next: self.items[pos.0].next, value });
    self.items[pos.0].next = Some(key);
    self.sublists.value_mut(sublist).len += 1;
    if self.sublists.value(sublist).len >= LOG2_M {
      self.split(sublist);
    }
    self.stats.created += 1;
    ItemId(key)
  }

  /// Remove the successor of `pos`, returning its value, or `None` if `pos` is the last item.
  /// A sublist emptied by the removal is dropped from the outer list.
  pub fn erase_after(&mut self, pos: ItemId) -> Option<T> {
    let succ = self.items[pos.0].next?;
    let succ_next = self.items[succ].next;
    let sublist = self.items[succ].sublist;
    self.items[pos.0].next = succ_next;
    if self.sublists.value(sublist).len == 1 {
      self.remove_sublist(sublist);
    } else {
      let sub = self.sublists.value_mut(sublist);
      sub.len -= 1;
      if sub.first == succ {
        sub.first = succ_next.expect("a sublist with items left must have a next item");
      }
    }
    Some(self.items.remove(succ).expect("successor must be present").value)
  }

  /// Drop `sublist`'s entry from the outer list.
  fn remove_sublist(&mut self, sublist: single::ItemId) {
    if self.sublists.front() == Some(sublist) {
      self.sublists.pop_front();
      return;
    }
    // The outer list is singly linked, so walk to the predecessor. Erasing is rare; the walk is
    // acceptable.
    let mut prev = self.sublists.front().expect("outer list cannot be empty here");
    while self.sublists.successor(prev) != Some(sublist) {
      prev = self.sublists.successor(prev).expect("sublist must be reachable from the front");
    }
    self.sublists.erase_after(prev);
  }

  /// Inner tag distance from the first item of `key`'s sublist, in `[0, M)`.
  fn vb(&self, key: DefaultKey) -> u64 {
    let first = self.sublists.value(self.items[key].sublist).first;
    self.items[key].inner.wrapping_sub(self.items[first].inner) as u64
  }

  /// Inner tag distance of the successor of `key` within its sublist, taking past-the-sublist as
  /// distance `M`.
  fn vbs(&self, key: DefaultKey) -> u64 {
    if self.is_last_in_sublist(key) {
      M
    } else {
      self.vb(self.items[key].next.expect("non-last item must have a next item"))
    }
  }

  fn is_last_in_sublist(&self, key: DefaultKey) -> bool {
    match self.items[key].next {
      None => true,
      Some(next) => self.items[next].sublist != self.items[key].sublist,
    }
  }

  /// The last item of `sublist`.
  fn last_of(&self, sublist: single::ItemId) -> DefaultKey {
    let sub = self.sublists.value(sublist);
    self.walk(sub.first, sub.len - 1)
  }

  /// The `n`-th successor of `key` within one sublist (no wrapping).
  fn walk(&self, mut key: DefaultKey, n: usize) -> DefaultKey {
    for _ in 0..n {
      key = self.items[key].next.expect("walk must stay within the list");
    }
    key
  }

  /// The `n`-th successor of `key`, wrapping from the last item of `sublist` to its first.
  fn advance_in(&self, mut key: DefaultKey, mut n: usize, sublist: single::ItemId) -> DefaultKey {
    while n > 0 {
      key = if self.is_last_in_sublist(key) {
        self.sublists.value(sublist).first
      } else {
        self.items[key].next.expect("non-last item must have a next item")
      };
      n -= 1;
    }
    key
  }

  /// Inner tag distance from `v0` to the item `x` at window index `index` of `sublist`, where a
  /// full cycle counts as distance `M`.
  fn w(&self, index: usize, x: DefaultKey, sublist: single::ItemId, v0: u32) -> u64 {
    if index == self.sublists.value(sublist).len {
      M
    } else {
      self.items[x].inner.wrapping_sub(v0) as u64
    }
  }

  /// Compute an inner tag for a new item directly after `x`, relabelling `x`'s sublist first if
  /// the tag gap is exhausted.
  fn compute_label(&mut self, x: DefaultKey, sublist: single::ItemId) -> u32 {
    let mut vb_x = self.vb(x);
    let mut vbs_x = self.vbs(x);
    if vb_x + 1 == vbs_x {
      self.relabel(x, sublist);
      vb_x = self.vb(x);
      vbs_x = self.vbs(x);
      debug_assert!(vb_x + 1 < vbs_x);
    }
    let first = self.sublists.value(sublist).first;
    (((vbs_x + vb_x) / 2) as u32).wrapping_add(self.items[first].inner)
  }

  /// Redistribute inner tags of a window of successors of `pos` within its sublist. Same window
  /// rule as the single-level list, but bounded by the sublist, so at most `log2 M` items move.
  fn relabel(&mut self, pos: DefaultKey, sublist: single::ItemId) {
    let v0 = self.items[pos].inner;
    let len = self.sublists.value(sublist).len;
    let mut i = 1usize;
    let mut j = 2usize;
    let mut ip = self.advance_in(pos, 1, sublist);
    let mut jp = self.advance_in(pos, 2, sublist);

    while self.w(j, jp, sublist, v0) <= 4 * self.w(i, ip, sublist, v0) {
      i += 1;
      let nj = (2 * i).min(len);
      ip = self.advance_in(ip, 1, sublist);
      jp = self.advance_in(jp, nj - j, sublist);
      j = nj;
    }

    let gap = (self.w(j, jp, sublist, v0) / j as u64) as u32;
    let mut val = gap;
    let mut ip = self.advance_in(pos, 1, sublist);
    while ip != jp {
      self.items[ip].inner = val.wrapping_add(v0);
      val = val.wrapping_add(gap);
      ip = self.advance_in(ip, 1, sublist);
    }
    self.stats.relabels += 1;
  }

  /// Evenly renumber the inner tags of `sublist` and refresh its items' back pointers.
  fn renumber(&mut self, sublist: single::ItemId) {
    let sub = self.sublists.value(sublist);
    let chunk = sub.len;
    let mut key = sub.first;
    let gap = (M / (chunk as u64 + 1)) as u32;
    let mut val = gap;
    for i in 0..chunk {
      let item = &mut self.items[key];
      item.sublist = sublist;
      item.inner = val;
      val = val.wrapping_add(gap);
      if i + 1 < chunk {
        key = item.next.expect("renumber must stay within the sublist");
      }
    }
    self.stats.renumbers += 1;
  }

  /// Split `sublist` into two halves, inserting the new half directly after it in the outer list.
  fn split(&mut self, sublist: single::ItemId) {
    let total = self.sublists.value(sublist).len;
    let count = total / 2;
    let first = self.sublists.value(sublist).first;
    let mid = self.walk(first, count - 1);
    let rest_first = self.items[mid].next.expect("split requires a non-empty second half");
    let new_sublist = self.sublists.insert_after(sublist, Sublist { first: rest_first, len: total - count });
    self.sublists.value_mut(sublist).len = count;
    self.renumber(sublist);
    self.renumber(new_sublist);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_invariants<T>(list: &TwoLevelList<T>) {
    // Orders strictly increase along the traversal.
    let orders: Vec<u64> = list.iter().map(|id| list.order(id)).collect();
    for pair in orders.windows(2) {
      assert!(pair[0] < pair[1], "orders not strictly increasing");
    }
    // Every sublist holds 1..=32 items, its back pointers are consistent, and the sublist
    // partition covers the whole list in order.
    let mut cursor = list.head;
    let mut total = 0;
    let mut outer = list.sublists.front();
    while let Some(sublist) = outer {
      let sub = list.sublists.value(sublist);
      assert!(sub.len >= 1 && sub.len <= LOG2_M, "sublist size {} out of bounds", sub.len);
      assert_eq!(Some(sub.first), cursor);
      for _ in 0..sub.len {
        let key = cursor.expect("sublist runs past the end of the list");
        assert_eq!(list.items[key].sublist, sublist);
        cursor = list.items[key].next;
        total += 1;
      }
      outer = list.sublists.successor(sublist);
    }
    assert_eq!(cursor, None);
    assert_eq!(total, list.len());
  }

  #[test]
  fn empty_list() {
    let list = TwoLevelList::<()>::new();
    assert!(list.is_empty());
    assert_eq!(list.front(), None);
  }

  #[test]
  fn with_len_is_ordered() {
    let list = TwoLevelList::<()>::with_len(100);
    assert_eq!(list.len(), 100);
    assert_invariants(&list);
    // 100 items plus one outer boundary per sublist.
    assert_eq!(list.stats().created, 104);
  }

  #[test]
  fn push_front_prepends() {
    let mut list = TwoLevelList::new();
    for v in 0..200 {
      let id = list.push_front(v);
      assert_eq!(list.front(), Some(id));
    }
    assert_invariants(&list);
    let values: Vec<i32> = list.iter().map(|id| *list.value(id)).collect();
    assert_eq!(values, (0..200).rev().collect::<Vec<_>>());
  }

  #[test]
  fn repeated_insert_after_splits_sublists() {
    let mut list = TwoLevelList::new();
    let first = list.push_front(0u32);
    let mut ids = vec![first];
    for v in 1..500 {
      ids.push(list.insert_after(first, v));
    }
    assert_invariants(&list);
    assert!(list.sublists.len() > 1);
    assert!(list.stats().renumbers > 0);
    // Handles survive splits and renumberings.
    for (v, id) in ids.iter().enumerate() {
      assert_eq!(*list.value(*id), v as u32);
    }
  }

  #[test]
  fn insert_at_back_extends_list() {
    let mut list = TwoLevelList::new();
    let mut at = list.push_front(0);
    for v in 1..300 {
      at = list.insert_after(at, v);
    }
    assert_invariants(&list);
    let values: Vec<i32> = list.iter().map(|id| *list.value(id)).collect();
    assert_eq!(values, (0..300).collect::<Vec<_>>());
  }

  #[test]
  fn erase_after_unlinks_and_drops_empty_sublists() {
    let mut list = TwoLevelList::new();
    let mut at = list.push_front(0);
    for v in 1..100 {
      at = list.insert_after(at, v);
    }
    let front = list.front().unwrap();
    // Eat through the list from just behind the front; this empties and drops every sublist
    // except the first.
    while list.len() > 1 {
      assert!(list.erase_after(front).is_some());
      assert_invariants(&list);
    }
    assert_eq!(list.sublists.len(), 1);
    assert_eq!(list.erase_after(front), None);
  }

  #[test]
  fn random_operations_stay_ordered() {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xd1e72);
    let mut list = TwoLevelList::<()>::new();
    let mut ids: Vec<ItemId> = Vec::new();

    for step in 0..10_000 {
      if list.is_empty() || rng.gen_bool(0.5) {
        ids.push(list.push_front(()));
      } else {
        let at = ids[rng.gen_range(0..ids.len())];
        ids.push(list.insert_after(at, ()));
      }
      if step % 500 == 0 {
        assert_invariants(&list);
      }
    }
    assert_eq!(list.len(), 10_000);
    assert_invariants(&list);
  }
}
