//! chained-hashtable: a single-threaded hash table with pluggable hash and
//! equality functions, separate chaining through per-bucket arrays, and a
//! cursor that can remove or rewrite entries mid-traversal.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small, predictable table engine with a fixed layout and resize
//!   policy, so callers can reason about cost and about what a failed
//!   allocation leaves behind.
//! - Layers:
//!   - `RawAlloc`: four-operation allocator (allocate, zeroed allocate,
//!     reallocate, deallocate); `Global` forwards to `std::alloc`.
//!   - `Entry`/`Bucket`: a bucket is a growable array of entries; an entry
//!     is a key, a value and the cached hash of the key. Hash 0 marks an
//!     unused slot.
//!   - `Table<K, V, O, A>`: the bucket array, entry count, key ops and
//!     allocator. Owns storage; keys and values are whatever the caller
//!     moves in.
//!   - `Cursor`: position (bucket, slot) over a table held exclusively.
//!
//! Hashing
//! - `O: KeyOps<K>` supplies a 32-bit hash and an equality test. A hash of
//!   0 is bumped to 1 before use, which frees 0 to mark empty slots; keys
//!   hashing to 0 and 1 share buckets.
//! - `FnOps` adapts a closure pair; `Int32Ops` and `StrOps` are DJB2-based
//!   defaults for `i32` and string-like keys.
//! - Indexing uses the cached hash, so resizing never calls `O`.
//!
//! Resize policy
//! - Fresh tables have `MIN_BUCKETS` (4) buckets.
//! - Before an insertion, if `len >= bucket_count` the bucket count doubles,
//!   keeping the average chain at or below one entry.
//! - After a direct removal, if `bucket_count > 4` and
//!   `len * 4 <= bucket_count`, the bucket count halves. Removal through a
//!   `Cursor` skips this so the cursor position stays valid.
//! - A resize allocates a complete new bucket array and moves every entry
//!   over. If anything fails the new storage is discarded and the table is
//!   untouched.
//!
//! Slots
//! - Entries are never removed from a bucket's array, only marked unused;
//!   insertion reuses the first unused slot before growing the array by
//!   one. `clear` marks every slot unused and keeps all storage.
//!
//! Errors
//! - Only allocation can fail: construction, insertion and the resize it may
//!   trigger. These return `TableError`. Lookups and removals never fail; a
//!   shrink that cannot allocate is logged and skipped.
//!
//! Traversal and mutation
//! - `iter`/`iter_mut` borrow the table; `cursor` borrows it mutably and
//!   supports `remove_current` and `set_value_current`. While any of them
//!   is alive the borrow checker rejects insert/remove/clear/drop, which is
//!   the whole of the iterator guard.
//!
//! Notes and non-goals
//! - Single-threaded: the table holds raw pointers and is `!Send`/`!Sync`.
//! - Iteration order is bucket-major, unrelated to insertion order, and
//!   changes across resizes.

pub mod allocator;
mod bucket;
pub mod error;
pub mod hash;
pub mod iter;
mod table;
mod table_proptest;

// Public surface
pub use allocator::{Global, RawAlloc};
pub use error::TableError;
pub use hash::{djb2, hash_int32, hash_str, FnOps, Int32Ops, KeyOps, StrOps};
pub use iter::{Cursor, Iter, IterMut};
pub use table::{Insertion, Table, MIN_BUCKETS};
