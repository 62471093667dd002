//! Entry and bucket storage.
//!
//! Each bucket owns a growable array of entries carved directly from the
//! table's [`RawAlloc`]. Entries are never removed from that array, only
//! marked unused, so a bucket's capacity only grows. An entry is in use iff
//! its cached hash differs from [`UNUSED_HASH`]; the table bumps real hashes
//! of 0 to 1 before storing them.
//!
//! All-zero memory is meaningful at both levels: a zeroed bucket is an
//! unallocated empty bucket and a zeroed entry is an unused slot. This is
//! what lets the bucket array come straight from `allocate_zeroed`.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

use crate::allocator::RawAlloc;
use crate::error::{Result, TableError};

pub(crate) const UNUSED_HASH: u32 = 0;

pub(crate) struct Entry<K, V> {
    pub(crate) hash: u32,
    key: MaybeUninit<K>,
    value: MaybeUninit<V>,
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub(crate) fn is_used(&self) -> bool {
        self.hash != UNUSED_HASH
    }

    #[inline]
    pub(crate) fn get(&self) -> Option<(&K, &V)> {
        if !self.is_used() {
            return None;
        }
        unsafe { Some((self.key.assume_init_ref(), self.value.assume_init_ref())) }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self) -> Option<(&K, &mut V)> {
        if !self.is_used() {
            return None;
        }
        unsafe { Some((self.key.assume_init_ref(), self.value.assume_init_mut())) }
    }

    #[inline]
    pub(crate) fn pair_mut(&mut self) -> Option<(&mut K, &mut V)> {
        if !self.is_used() {
            return None;
        }
        unsafe { Some((self.key.assume_init_mut(), self.value.assume_init_mut())) }
    }

    /// Occupy an unused slot.
    #[inline]
    pub(crate) fn fill(&mut self, hash: u32, key: K, value: V) {
        debug_assert!(!self.is_used(), "filling a used slot would leak it");
        debug_assert_ne!(hash, UNUSED_HASH);
        self.key.write(key);
        self.value.write(value);
        self.hash = hash;
    }

    /// Mark the slot unused and hand back its contents.
    #[inline]
    pub(crate) fn take(&mut self) -> Option<(K, V)> {
        if !self.is_used() {
            return None;
        }
        self.hash = UNUSED_HASH;
        unsafe { Some((self.key.assume_init_read(), self.value.assume_init_read())) }
    }

    /// Drop the contents in place, if any.
    #[inline]
    pub(crate) fn clear(&mut self) {
        drop(self.take());
    }
}

pub(crate) struct Bucket<K, V> {
    entries: Option<NonNull<Entry<K, V>>>,
    capacity: usize,
}

impl<K, V> Bucket<K, V> {
    #[inline]
    pub(crate) fn entries(&self) -> &[Entry<K, V>] {
        match self.entries {
            Some(p) => unsafe { core::slice::from_raw_parts(p.as_ptr(), self.capacity) },
            None => &[],
        }
    }

    #[inline]
    pub(crate) fn entries_mut(&mut self) -> &mut [Entry<K, V>] {
        match self.entries {
            Some(p) => unsafe { core::slice::from_raw_parts_mut(p.as_ptr(), self.capacity) },
            None => &mut [],
        }
    }

    /// Append one unused slot, allocating the array on first use.
    pub(crate) fn push_slot<A: RawAlloc>(&mut self, alloc: &A) -> Result<&mut Entry<K, V>> {
        let new_cap = self.capacity + 1;
        let new_layout = Layout::array::<Entry<K, V>>(new_cap)?;
        let grown = match self.entries {
            None => alloc
                .allocate_zeroed(new_layout)
                .ok_or(TableError::AllocFailed {
                    what: "entries",
                    layout: new_layout,
                })?,
            Some(p) => {
                let old_layout = Layout::array::<Entry<K, V>>(self.capacity)?;
                unsafe { alloc.reallocate(p.cast(), old_layout, new_layout.size()) }.ok_or(
                    TableError::AllocFailed {
                        what: "entries",
                        layout: new_layout,
                    },
                )?
            }
        };
        let base = grown.cast::<Entry<K, V>>();
        let slot = unsafe { base.as_ptr().add(self.capacity) };
        unsafe { ptr::addr_of_mut!((*slot).hash).write(UNUSED_HASH) };
        self.entries = Some(base);
        self.capacity = new_cap;
        Ok(unsafe { &mut *slot })
    }

    /// First unused slot, growing the array when every slot is taken.
    pub(crate) fn free_slot<A: RawAlloc>(&mut self, alloc: &A) -> Result<&mut Entry<K, V>> {
        if let Some(i) = self.entries().iter().position(|e| !e.is_used()) {
            return Ok(&mut self.entries_mut()[i]);
        }
        self.push_slot(alloc)
    }

    pub(crate) fn drop_entries(&mut self) {
        self.entries_mut().iter_mut().for_each(Entry::clear);
    }

    /// Free the entry array without dropping any entry.
    ///
    /// # Safety
    ///
    /// `alloc` must be the allocator the array came from, and every used
    /// entry must already have been dropped or moved elsewhere.
    pub(crate) unsafe fn release<A: RawAlloc>(&mut self, alloc: &A) {
        if let Some(p) = self.entries.take() {
            // The layout was valid when the array was grown to this size.
            let layout = Layout::array::<Entry<K, V>>(self.capacity).unwrap_unchecked();
            alloc.deallocate(p.cast(), layout);
        }
        self.capacity = 0;
    }
}

/// Fixed-length array of buckets.
pub(crate) struct Buckets<K, V> {
    ptr: NonNull<Bucket<K, V>>,
    len: usize,
    _owns: PhantomData<(K, V)>,
}

impl<K, V> Buckets<K, V> {
    pub(crate) fn new_in<A: RawAlloc>(len: usize, alloc: &A) -> Result<Self> {
        debug_assert!(len > 0);
        let layout = Layout::array::<Bucket<K, V>>(len)?;
        let ptr = alloc
            .allocate_zeroed(layout)
            .ok_or(TableError::AllocFailed {
                what: "buckets",
                layout,
            })?;
        Ok(Self {
            ptr: ptr.cast(),
            len,
            _owns: PhantomData,
        })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[Bucket<K, V>] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [Bucket<K, V>] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn drop_entries(&mut self) {
        self.as_mut_slice().iter_mut().for_each(Bucket::drop_entries);
    }

    /// Free every entry array and the bucket array itself, dropping nothing.
    ///
    /// # Safety
    ///
    /// Same contract as [`Bucket::release`]; `self` must not be used again.
    pub(crate) unsafe fn release<A: RawAlloc>(&mut self, alloc: &A) {
        for bucket in self.as_mut_slice() {
            bucket.release(alloc);
        }
        let layout = Layout::array::<Bucket<K, V>>(self.len).unwrap_unchecked();
        alloc.deallocate(self.ptr.cast(), layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Global;
    use std::rc::Rc;

    #[test]
    fn zeroed_buckets_are_empty() {
        let mut b: Buckets<u32, u32> = Buckets::new_in(8, &Global).unwrap();
        assert_eq!(b.len(), 8);
        assert!(b.as_slice().iter().all(|bk| bk.entries().is_empty()));
        unsafe { b.release(&Global) };
    }

    #[test]
    fn push_fill_take_cycle() {
        let mut b: Buckets<&str, i32> = Buckets::new_in(4, &Global).unwrap();
        let bucket = &mut b.as_mut_slice()[1];
        bucket.push_slot(&Global).unwrap().fill(7, "a", 1);
        bucket.push_slot(&Global).unwrap().fill(9, "b", 2);
        assert_eq!(bucket.entries().len(), 2);
        assert_eq!(bucket.entries()[1].get(), Some((&"b", &2)));

        assert_eq!(bucket.entries_mut()[0].take(), Some(("a", 1)));
        assert!(bucket.entries_mut()[0].take().is_none());

        // The freed slot is reused before the array grows.
        bucket.free_slot(&Global).unwrap().fill(11, "c", 3);
        assert_eq!(bucket.entries().len(), 2);
        assert_eq!(bucket.entries()[0].get(), Some((&"c", &3)));

        b.drop_entries();
        unsafe { b.release(&Global) };
    }

    #[test]
    fn drop_entries_drops_contents_once() {
        let probe = Rc::new(());
        let mut b: Buckets<u8, Rc<()>> = Buckets::new_in(4, &Global).unwrap();
        for i in 0..3u8 {
            let bucket = &mut b.as_mut_slice()[usize::from(i)];
            bucket.push_slot(&Global).unwrap().fill(1, i, probe.clone());
        }
        assert_eq!(Rc::strong_count(&probe), 4);
        b.drop_entries();
        assert_eq!(Rc::strong_count(&probe), 1);
        // Capacity survives a clear.
        assert_eq!(b.as_slice()[0].entries().len(), 1);
        unsafe { b.release(&Global) };
    }
}
