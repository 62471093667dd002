//! Traversal: borrowing iterators and the mutating cursor.
//!
//! All three walk the bucket array directly, bucket-major and slot-minor,
//! skipping unused slots. Nothing is snapshotted, so the order is only
//! meaningful until the next resize.

use core::iter::FusedIterator;
use core::slice;

use crate::allocator::{Global, RawAlloc};
use crate::bucket::{Bucket, Entry};
use crate::table::Table;

/// Iterator over `(&K, &V)`; see [`Table::iter`].
pub struct Iter<'a, K, V> {
    buckets: slice::Iter<'a, Bucket<K, V>>,
    entries: slice::Iter<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(buckets: &'a [Bucket<K, V>], len: usize) -> Self {
        Self {
            buckets: buckets.iter(),
            entries: Default::default(),
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.entries.by_ref().find_map(Entry::get) {
                self.remaining -= 1;
                return Some(pair);
            }
            self.entries = self.buckets.next()?.entries().iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)`; see [`Table::iter_mut`].
pub struct IterMut<'a, K, V> {
    buckets: slice::IterMut<'a, Bucket<K, V>>,
    entries: slice::IterMut<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(buckets: &'a mut [Bucket<K, V>], len: usize) -> Self {
        Self {
            buckets: buckets.iter_mut(),
            entries: Default::default(),
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.entries.by_ref().find_map(Entry::get_mut) {
                self.remaining -= 1;
                return Some(pair);
            }
            self.entries = self.buckets.next()?.entries_mut().iter_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Position {
    NotStarted,
    At { bucket: usize, slot: usize },
    Exhausted,
}

/// Forward cursor that can remove or rewrite the entry it stands on.
///
/// Obtained from [`Table::cursor`]. The cursor borrows the table mutably,
/// so structural changes other than [`Cursor::remove_current`] are ruled
/// out at compile time until it is dropped. Removing through the cursor
/// never shrinks the table, which keeps the position valid.
pub struct Cursor<'a, K, V, O, A: RawAlloc = Global> {
    table: &'a mut Table<K, V, O, A>,
    pos: Position,
}

impl<'a, K, V, O, A: RawAlloc> Cursor<'a, K, V, O, A> {
    pub(crate) fn new(table: &'a mut Table<K, V, O, A>) -> Self {
        Self {
            table,
            pos: Position::NotStarted,
        }
    }

    /// Advance to the next used entry. Once this returns `None` it keeps
    /// returning `None`.
    pub fn next_entry(&mut self) -> Option<(&K, &V)> {
        let (mut bucket, mut slot) = match self.pos {
            Position::NotStarted => (0, 0),
            Position::At { bucket, slot } => (bucket, slot + 1),
            Position::Exhausted => return None,
        };
        let buckets = self.table.buckets.as_slice();
        loop {
            let Some(entries) = buckets.get(bucket).map(Bucket::entries) else {
                self.pos = Position::Exhausted;
                return None;
            };
            match entries.get(slot) {
                Some(entry) if entry.is_used() => {
                    self.pos = Position::At { bucket, slot };
                    return entry.get();
                }
                Some(_) => slot += 1,
                None => {
                    bucket += 1;
                    slot = 0;
                }
            }
        }
    }

    /// The entry under the cursor, unless it was removed or the cursor is
    /// not on an entry.
    pub fn current(&self) -> Option<(&K, &V)> {
        match self.pos {
            Position::At { bucket, slot } => {
                self.table.buckets.as_slice()[bucket].entries()[slot].get()
            }
            _ => None,
        }
    }

    /// Remove the entry under the cursor and return it. Does nothing when
    /// there is no current entry.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        let pair = self.current_entry_mut()?.take()?;
        self.table.note_removed();
        Some(pair)
    }

    /// Replace the value of the current entry, returning the old one. The
    /// key is left alone. Without a current entry `value` is handed back
    /// as the error.
    pub fn set_value_current(&mut self, value: V) -> Result<V, V> {
        match self.current_entry_mut().and_then(Entry::get_mut) {
            Some((_, slot)) => Ok(core::mem::replace(slot, value)),
            None => Err(value),
        }
    }

    /// Read-only view of the table, e.g. for lookups during traversal.
    pub fn table(&self) -> &Table<K, V, O, A> {
        &*self.table
    }

    fn current_entry_mut(&mut self) -> Option<&mut Entry<K, V>> {
        match self.pos {
            Position::At { bucket, slot } => {
                Some(&mut self.table.buckets.as_mut_slice()[bucket].entries_mut()[slot])
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::hash::{FnOps, Int32Ops, KeyOps};
    use crate::Table;
    use std::collections::BTreeSet;

    fn filled(n: i32) -> Table<i32, i32, Int32Ops> {
        let mut t = Table::with_ops(Int32Ops).unwrap();
        for i in 0..n {
            t.insert(i, i * 10).unwrap();
        }
        t
    }

    #[test]
    fn iter_is_exact_and_complete() {
        let t = filled(37);
        let it = t.iter();
        assert_eq!(it.len(), 37);
        let keys: BTreeSet<i32> = it.map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..37).collect());
    }

    #[test]
    fn iter_mut_updates_values() {
        let mut t = filled(10);
        for (_, v) in &mut t {
            *v += 1;
        }
        assert!((0..10).all(|i| t.get(&i) == Some(&(i * 10 + 1))));
    }

    #[test]
    fn cursor_matches_iter_order() {
        let mut t = filled(20);
        let expected: Vec<i32> = t.iter().map(|(k, _)| *k).collect();
        let mut seen = Vec::new();
        let mut c = t.cursor();
        while let Some((k, _)) = c.next_entry() {
            seen.push(*k);
        }
        assert_eq!(seen, expected);
    }

    #[test]
    fn cursor_on_empty_table_is_exhausted_immediately() {
        let mut t = filled(0);
        let mut c = t.cursor();
        assert!(c.next_entry().is_none());
        assert!(c.next_entry().is_none());
        assert!(c.current().is_none());
        assert!(c.remove_current().is_none());
        assert_eq!(c.set_value_current(5), Err(5));
    }

    #[test]
    fn removing_twice_at_same_position_counts_once() {
        let mut t = filled(3);
        let mut c = t.cursor();
        let (k, _) = c.next_entry().map(|(k, v)| (*k, *v)).unwrap();
        assert_eq!(c.remove_current().map(|(k, _)| k), Some(k));
        assert!(c.remove_current().is_none());
        assert!(c.current().is_none());
        assert_eq!(c.set_value_current(1), Err(1));
        drop(c);
        assert_eq!(t.len(), 2);
        assert!(!t.contains_key(&k));
    }

    #[test]
    fn cursor_removal_never_shrinks() {
        let mut t = filled(64);
        assert_eq!(t.bucket_count(), 64);
        let mut c = t.cursor();
        while c.next_entry().is_some() {
            c.remove_current();
        }
        assert_eq!(c.table().len(), 0);
        drop(c);
        assert_eq!(t.bucket_count(), 64);
    }

    #[test]
    fn cursor_walks_a_single_long_chain() {
        let ops = FnOps::new(|_: &i32| 3, |a: &i32, b: &i32| a == b);
        let mut t: Table<i32, i32, _> = Table::with_ops(ops).unwrap();
        for i in 0..3 {
            t.insert(i, i).unwrap();
        }
        assert_eq!(KeyOps::<i32>::hash(t.ops(), &0), 3);
        let mut c = t.cursor();
        c.next_entry();
        c.next_entry();
        assert_eq!(c.set_value_current(100), Ok(1));
        assert_eq!(c.current(), Some((&1, &100)));
        let mut rest = 0;
        while c.next_entry().is_some() {
            rest += 1;
        }
        assert_eq!(rest, 1);
        drop(c);
        assert_eq!(t.get(&1), Some(&100));
        assert_eq!(t.get(&0), Some(&0));
    }
}
