//! Table: bucket array, CRUD and the resize policy.

use core::fmt;
use core::mem;

use tracing::{debug, trace, warn};

use crate::allocator::{Global, RawAlloc};
use crate::bucket::{Buckets, UNUSED_HASH};
use crate::error::Result;
use crate::hash::{FnOps, KeyOps};
use crate::iter::{Cursor, Iter, IterMut};

/// Bucket count of a fresh table; the table never shrinks below it.
pub const MIN_BUCKETS: usize = 4;

/// Outcome of [`Table::insert`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Insertion {
    /// The key was absent; a new entry was created.
    Inserted,
    /// An equal key was present; its value was overwritten.
    Updated,
}

/// Hash table with separate chaining.
///
/// Every bucket is a growable array of entries; an entry caches the hash
/// of its key so rehashing never calls back into `O`. The table doubles
/// its bucket count before an insertion once `len() >= bucket_count()` and
/// halves it after a removal that leaves it at most 25% loaded.
///
/// `O` supplies hashing and equality for `K`; `A` provides all storage.
pub struct Table<K, V, O, A: RawAlloc = Global> {
    len: usize,
    pub(crate) buckets: Buckets<K, V>,
    ops: O,
    alloc: A,
}

impl<K, V, H, E> Table<K, V, FnOps<H, E>>
where
    H: Fn(&K) -> u32,
    E: Fn(&K, &K) -> bool,
{
    /// Create an empty table from a hash function and an equality function.
    pub fn new(hash: H, equal: E) -> Result<Self> {
        Self::with_ops(FnOps::new(hash, equal))
    }
}

impl<K, V, O> Table<K, V, O>
where
    O: KeyOps<K>,
{
    pub fn with_ops(ops: O) -> Result<Self> {
        Self::with_ops_in(ops, Global)
    }
}

impl<K, V, O, A> Table<K, V, O, A>
where
    O: KeyOps<K>,
    A: RawAlloc,
{
    pub fn with_ops_in(ops: O, alloc: A) -> Result<Self> {
        let buckets = Buckets::new_in(MIN_BUCKETS, &alloc).map_err(|e| {
            debug!("table creation failed: {e}");
            e
        })?;
        Ok(Self {
            len: 0,
            buckets,
            ops,
            alloc,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Drop every entry but keep all bucket and entry storage for reuse.
    pub fn clear(&mut self) {
        self.buckets.drop_entries();
        self.len = 0;
    }

    /// Insert `key -> value`, overwriting the value of an equal key.
    ///
    /// On update the stored key is kept and `key` is dropped along with the
    /// previous value. Use [`Table::replace`] to get both back instead. On
    /// error the table is unchanged and `key`/`value` are dropped.
    pub fn insert(&mut self, key: K, value: V) -> Result<Insertion> {
        let hash = self.hash_of(&key);

        if self.len >= self.buckets.len() {
            self.resize(self.buckets.len() * 2)?;
        }

        let idx = bucket_index(hash, self.buckets.len());
        let bucket = &mut self.buckets.as_mut_slice()[idx];

        // A later slot may still hold an equal key, so the scan always runs
        // to the end; the first free slot is remembered for the insertion.
        let mut free = None;
        for (i, entry) in bucket.entries_mut().iter_mut().enumerate() {
            if !entry.is_used() {
                if free.is_none() {
                    free = Some(i);
                }
                continue;
            }
            if entry.hash != hash {
                continue;
            }
            if let Some((k, v)) = entry.pair_mut() {
                if self.ops.equal(&key, k) {
                    *v = value;
                    return Ok(Insertion::Updated);
                }
            }
        }

        let slot = match free {
            Some(i) => &mut bucket.entries_mut()[i],
            None => bucket.push_slot(&self.alloc).map_err(|e| {
                debug!("bucket {idx} growth failed: {e}");
                e
            })?,
        };
        slot.fill(hash, key, value);
        self.len += 1;
        Ok(Insertion::Inserted)
    }

    /// Insert `key -> value`, returning the previous pair if an equal key
    /// was present. Unlike [`Table::insert`] both the key and the value are
    /// swapped in place.
    pub fn replace(&mut self, key: K, value: V) -> Result<Option<(K, V)>> {
        if let Some((b, s)) = self.locate(&key) {
            let entry = &mut self.buckets.as_mut_slice()[b].entries_mut()[s];
            if let Some((k, v)) = entry.pair_mut() {
                return Ok(Some((mem::replace(k, key), mem::replace(v, value))));
            }
        }
        self.insert(key, value).map(|_| None)
    }

    /// Remove the entry for `key`; returns whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Remove the entry for `key` and hand back its stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let (b, s) = self.locate(key)?;
        let pair = self.buckets.as_mut_slice()[b].entries_mut()[s].take()?;
        self.len -= 1;
        self.shrink_if_sparse();
        Some(pair)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let (b, s) = self.locate(key)?;
        self.buckets.as_slice()[b].entries()[s].get().map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let (b, s) = self.locate(key)?;
        self.buckets.as_slice()[b].entries()[s].get()
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (b, s) = self.locate(key)?;
        self.buckets.as_mut_slice()[b].entries_mut()[s]
            .get_mut()
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    /// Cursor over the entries that can remove or rewrite the current one.
    ///
    /// The cursor holds the table exclusively: no insertion, removal or
    /// clear can happen until it is dropped.
    pub fn cursor(&mut self) -> Cursor<'_, K, V, O, A> {
        Cursor::new(self)
    }

    /// Rebuild the bucket array with `new_count` buckets.
    ///
    /// All or nothing: if any allocation fails the table is left exactly as
    /// it was.
    fn resize(&mut self, new_count: usize) -> Result<()> {
        trace!(
            "rehash {} -> {} buckets ({} entries)",
            self.buckets.len(),
            new_count,
            self.len
        );
        let mut fresh: Buckets<K, V> = Buckets::new_in(new_count, &self.alloc).map_err(|e| {
            debug!("rehash to {new_count} buckets failed: {e}");
            e
        })?;

        // Entries are copied bitwise; until the swap below the old array is
        // still the owner, so a failure only frees the new storage.
        for bucket in self.buckets.as_slice() {
            for entry in bucket.entries().iter().filter(|e| e.is_used()) {
                let target = &mut fresh.as_mut_slice()[bucket_index(entry.hash, new_count)];
                match target.free_slot(&self.alloc) {
                    Ok(slot) => unsafe { core::ptr::copy_nonoverlapping(entry, slot, 1) },
                    Err(e) => {
                        debug!("rehash to {new_count} buckets failed: {e}");
                        unsafe { fresh.release(&self.alloc) };
                        return Err(e);
                    }
                }
            }
        }

        let mut old = mem::replace(&mut self.buckets, fresh);
        unsafe { old.release(&self.alloc) };
        Ok(())
    }

    fn shrink_if_sparse(&mut self) {
        let count = self.buckets.len();
        if count > MIN_BUCKETS && self.len * 4 <= count {
            // The removal already happened; an under-loaded table is still
            // a valid one.
            if let Err(e) = self.resize(count / 2) {
                warn!("keeping {count} buckets after removal: {e}");
            }
        }
    }

    #[inline]
    fn hash_of(&self, key: &K) -> u32 {
        match self.ops.hash(key) {
            UNUSED_HASH => UNUSED_HASH + 1,
            h => h,
        }
    }

    /// (bucket, slot) of the used entry whose key equals `key`.
    fn locate(&self, key: &K) -> Option<(usize, usize)> {
        let hash = self.hash_of(key);
        let idx = bucket_index(hash, self.buckets.len());
        self.buckets.as_slice()[idx]
            .entries()
            .iter()
            .position(|e| {
                e.hash == hash && e.get().is_some_and(|(k, _)| self.ops.equal(key, k))
            })
            .map(|slot| (idx, slot))
    }
}

impl<K, V, O, A: RawAlloc> Table<K, V, O, A> {
    /// Visit entries in bucket order. The order is unrelated to insertion
    /// order and changes whenever the table resizes.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.buckets.as_slice(), self.len)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let len = self.len;
        IterMut::new(self.buckets.as_mut_slice(), len)
    }

    pub(crate) fn note_removed(&mut self) {
        self.len -= 1;
    }
}

impl<K: fmt::Debug, V: fmt::Debug, O, A: RawAlloc> Table<K, V, O, A> {
    /// Write the raw bucket layout, one line per slot. Informational only;
    /// the format is not stable.
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(out, "entries: {}", self.len)?;
        writeln!(out, "buckets: {}", self.buckets.len())?;
        for (b, bucket) in self.buckets.as_slice().iter().enumerate() {
            writeln!(out, "bucket {b:04}")?;
            for (e, entry) in bucket.entries().iter().enumerate() {
                write!(out, "  entry {e:02}  ")?;
                if let Some((k, v)) = entry.get() {
                    write!(out, "key={k:?} value={v:?} hash={}", entry.hash)?;
                }
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, O, A: RawAlloc> fmt::Debug for Table<K, V, O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, O, A: RawAlloc> IntoIterator for &'a Table<K, V, O, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, O, A: RawAlloc> IntoIterator for &'a mut Table<K, V, O, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, O, A: RawAlloc> Drop for Table<K, V, O, A> {
    fn drop(&mut self) {
        self.buckets.drop_entries();
        unsafe { self.buckets.release(&self.alloc) };
    }
}

#[inline]
fn bucket_index(hash: u32, bucket_count: usize) -> usize {
    hash as usize % bucket_count
}
