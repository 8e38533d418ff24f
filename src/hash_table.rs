use alloc::alloc::handle_alloc_error;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

/// Sentinel index marking the end of a bucket chain and the end of the free
/// list.
///
/// Slot indices are `u32`, so a table can address slightly under `u32::MAX`
/// entries; the all-ones pattern is reserved as the terminator. Keeping the
/// sentinel all-ones also lets a fresh bucket array be initialized with a
/// single byte fill.
const EOL: u32 = u32::MAX;

/// Number of entry slots usable at a given bucket count.
///
/// The table keeps a fixed 3/4 load factor: every resize recomputes the slot
/// capacity from the bucket count, and growth triggers when the slots are
/// exhausted rather than when some probe length degrades.
#[inline(always)]
fn slot_capacity(buckets: usize) -> usize {
    ((buckets as u128 * 3) / 4) as usize
}

/// Smallest power-of-two bucket count whose slot capacity holds `capacity`
/// entries.
#[inline(always)]
fn buckets_for_capacity(capacity: usize) -> usize {
    if capacity == 0 {
        0
    } else {
        (((capacity as u128 * 4).div_ceil(3)) as usize).next_power_of_two()
    }
}

#[inline(always)]
fn prefetch<T>(ptr: *const T) {
    #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
    unsafe {
        use core::arch::x86_64::*;
        _mm_prefetch(ptr as *const i8, _MM_HINT_T0);
    }
}

#[derive(Debug)]
struct DataLayout {
    layout: Layout,
    heads_offset: usize,
    links_offset: usize,
    entries_offset: usize,
}

impl DataLayout {
    fn new<V>(buckets: usize, slots: usize) -> Self {
        assert!(slots < EOL as usize, "allocation size overflow");

        let heads_layout = Layout::array::<u32>(buckets).expect("allocation size overflow");
        let links_layout = Layout::array::<u32>(slots).expect("allocation size overflow");
        // Entry storage starts on a 16 byte boundary regardless of the entry
        // type's own alignment.
        let entries_layout = Layout::array::<MaybeUninit<V>>(slots)
            .expect("allocation size overflow")
            .align_to(16)
            .expect("allocation size overflow");

        let (layout, heads_offset) = Layout::new::<()>().extend(heads_layout).unwrap();
        let (layout, links_offset) = layout.extend(links_layout).unwrap();
        let (layout, entries_offset) = layout.extend(entries_layout).unwrap();

        DataLayout {
            layout,
            heads_offset,
            links_offset,
            entries_offset,
        }
    }
}

/// Chain statistics for hash table analysis.
///
/// Test-only: compiled only with `cfg(test)`.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ChainStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of buckets in the table
    pub buckets: usize,
    /// Number of entry slots allocated
    pub slots: usize,
    /// Number of buckets with at least one entry
    pub occupied_buckets: usize,
    /// Length of the longest bucket chain
    pub longest_chain: usize,
    /// Number of slots currently unused
    pub free_slots: usize,
    /// Total memory in bytes used by the table
    pub total_bytes: usize,
}

/// A low-level hash table storing entries in bucket chains threaded through a
/// single contiguous allocation.
///
/// The allocation holds three arrays: one `u32` head index per bucket, one
/// `u32` link index per entry slot, and the entry storage itself. A bucket's
/// entries form a singly linked chain starting at its head index and connected
/// through the link array, terminated by a sentinel. Because linkage uses slot
/// indices rather than pointers, the whole allocation can be replaced on
/// growth without walking any entries twice.
///
/// The table does not store hashes and does not own a hasher. Every operation
/// that needs to place an entry takes the hash directly, plus closures for
/// equality and for re-deriving an entry's hash when entries must be
/// relocated. This keeps the table fully generic over how keys are embedded in
/// entries; the [`HashMap`](crate::HashMap) and [`HashSet`](crate::HashSet)
/// wrappers supply the closures from a standard `BuildHasher`.
///
/// # Reclamation modes
///
/// The `COMPACT` parameter selects what happens to an entry slot on removal:
///
/// - `COMPACT = false` (default): the slot is pushed onto a free list threaded
///   through the link array. Entries never move once inserted, so slot indices
///   are stable across removals, and the occupied slots may be sparse.
/// - `COMPACT = true`: the last live entry is relocated into the vacated slot
///   and the single chain cell referencing its old index is repaired. Live
///   entries always occupy the dense index range `[0, len)`, which
///   [`as_slice`](HashTable::as_slice) exposes directly. Removal in this mode
///   needs the hash closure to find the relocated entry's chain.
///
/// # Performance Characteristics
///
/// - **Lookup**: one bucket head read plus a short chain walk. Slot capacity
///   is fixed at three quarters of the bucket count, so chains average under
///   one entry.
/// - **Insert**: chain walk to check for duplicates, then a head insertion
///   into a free slot. Growth relinks every entry but moves each exactly
///   once.
/// - **Memory**: 4 bytes per bucket plus 4 bytes per slot of overhead, all in
///   a single allocation with no per-entry boxes.
///
/// # Examples
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use chain_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table: HashTable<Person> = HashTable::with_capacity(100);
/// let hash = hash_id(123);
///
/// // Insert a person
/// match table.entry(hash, |p: &Person| p.id == 123, |p| hash_id(p.id)) {
///     chain_hash::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     chain_hash::hash_table::Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(
///     table.find(hash, |p| p.id == 123).map(|p| p.name.as_str()),
///     Some("Alice")
/// );
/// ```
pub struct HashTable<V, const COMPACT: bool = false> {
    layout: DataLayout,
    alloc: NonNull<u8>,

    buckets: usize,
    slots: usize,
    len: usize,
    // Head of the free list threaded through the link array. Unused when
    // compacting, where the next free slot is always `len`.
    free_head: u32,
    // Bumped by every structural mutation. Cursors record it to keep their
    // own bookkeeping honest; see `CursorMut`.
    generation: u64,

    _phantom: core::marker::PhantomData<V>,
}

// SAFETY: The table owns its allocation and entries outright, like Vec<V>;
// nothing is shared internally.
unsafe impl<V: Send, const COMPACT: bool> Send for HashTable<V, COMPACT> {}
// SAFETY: Shared references only permit reads of the entries.
unsafe impl<V: Sync, const COMPACT: bool> Sync for HashTable<V, COMPACT> {}

impl<V, const COMPACT: bool> Debug for HashTable<V, COMPACT> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;
        use alloc::string::ToString;

        if self.buckets == 0 {
            return f
                .debug_struct("HashTable")
                .field("len", &self.len)
                .field("buckets", &self.buckets)
                .field("compacting", &COMPACT)
                .finish();
        }

        let mut chains: Vec<String> = Vec::with_capacity(self.buckets);
        // SAFETY: Only chain indices are read, and those are always in bounds
        // for the links array.
        unsafe {
            for bucket in 0..self.buckets {
                let mut parts: Vec<String> = Vec::new();
                let mut index = *self.heads_ptr().as_ref().get_unchecked(bucket);
                while index != EOL {
                    parts.push(index.to_string());
                    index = *self.links_ptr().as_ref().get_unchecked(index as usize);
                }
                if parts.is_empty() {
                    chains.push(".".to_string());
                } else {
                    chains.push(parts.join(" -> "));
                }
            }
        }

        f.debug_struct("HashTable")
            .field("len", &self.len)
            .field("buckets", &self.buckets)
            .field("slots", &self.slots)
            .field("compacting", &COMPACT)
            .field("chains", &chains)
            .finish()
    }
}

impl<V, const COMPACT: bool> Clone for HashTable<V, COMPACT>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        let mut new_table = Self::with_buckets(self.buckets);
        if self.buckets == 0 {
            return new_table;
        }

        // SAFETY: Both tables share the same geometry, so the head and link
        // arrays can be copied wholesale and every live slot index is valid
        // in the new table. `new_table.len` stays zero until all values are
        // written, so an unwinding clone never exposes uninitialized slots to
        // the destructor.
        unsafe {
            core::ptr::copy_nonoverlapping(
                self.heads_ptr().cast::<u32>().as_ptr(),
                new_table.heads_ptr().cast::<u32>().as_ptr(),
                self.buckets,
            );
            core::ptr::copy_nonoverlapping(
                self.links_ptr().cast::<u32>().as_ptr(),
                new_table.links_ptr().cast::<u32>().as_ptr(),
                self.slots,
            );

            if COMPACT {
                for index in 0..self.len {
                    let value = self
                        .entries_ptr()
                        .as_ref()
                        .get_unchecked(index)
                        .assume_init_ref()
                        .clone();
                    new_table
                        .entries_ptr()
                        .as_mut()
                        .get_unchecked_mut(index)
                        .write(value);
                }
            } else {
                for bucket in 0..self.buckets {
                    let mut index = *self.heads_ptr().as_ref().get_unchecked(bucket);
                    while index != EOL {
                        let value = self
                            .entries_ptr()
                            .as_ref()
                            .get_unchecked(index as usize)
                            .assume_init_ref()
                            .clone();
                        new_table
                            .entries_ptr()
                            .as_mut()
                            .get_unchecked_mut(index as usize)
                            .write(value);
                        index = *self.links_ptr().as_ref().get_unchecked(index as usize);
                    }
                }
            }
        }

        new_table.len = self.len;
        new_table.free_head = self.free_head;
        new_table
    }
}

impl<V, const COMPACT: bool> Drop for HashTable<V, COMPACT> {
    fn drop(&mut self) {
        // SAFETY: Live entries are dropped exactly once via the chain walk,
        // then the single backing allocation is released.
        unsafe {
            if core::mem::needs_drop::<V>() && self.len > 0 {
                self.drop_live();
            }

            if self.layout.layout.size() != 0 {
                alloc::alloc::dealloc(self.alloc.as_ptr(), self.layout.layout);
            }
        }
    }
}

impl<V, const COMPACT: bool> Default for HashTable<V, COMPACT> {
    fn default() -> Self {
        Self::new()
    }
}

// Restores a valid empty structure unless disarmed with `mem::forget`.
// Wraps the windows where a caller-supplied closure runs while entries are
// mid-move: a panic there leaks the contents instead of leaving chains
// pointing at moved-out slots.
struct ResetOnUnwind<'a, V, const COMPACT: bool>(&'a mut HashTable<V, COMPACT>);

impl<V, const COMPACT: bool> Drop for ResetOnUnwind<'_, V, COMPACT> {
    fn drop(&mut self) {
        self.0.reset_no_drop();
    }
}

impl<V, const COMPACT: bool> HashTable<V, COMPACT> {
    /// Creates a new, empty hash table.
    ///
    /// No memory is allocated until the first insertion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<i32> = HashTable::new();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_buckets(0)
    }

    /// Creates a new hash table that can hold at least `capacity` entries
    /// without growing.
    ///
    /// The bucket count is the smallest power of two whose slot capacity
    /// covers the request, so the actual capacity may be larger than asked
    /// for. A request of zero allocates nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// // Create a table that can hold at least 100 items without resizing
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert!(table.capacity().is_power_of_two());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_buckets(buckets_for_capacity(capacity))
    }

    fn with_buckets(buckets: usize) -> Self {
        debug_assert!(buckets == 0 || buckets.is_power_of_two());

        let slots = slot_capacity(buckets);
        let layout = DataLayout::new::<V>(buckets, slots);
        let alloc = if layout.layout.size() == 0 {
            // Dangling placeholder aligned for the layout, so pointers
            // derived from it at the array offsets stay aligned.
            NonNull::new(core::ptr::without_provenance_mut(layout.layout.align())).unwrap()
        } else {
            // SAFETY: We have validated that the layout size is non-zero. The
            // `alloc` function returns a valid pointer, and we handle
            // allocation errors if it returns null. The byte fill writes the
            // EOL sentinel into every bucket head.
            unsafe {
                let raw_alloc = alloc::alloc::alloc(layout.layout);
                if raw_alloc.is_null() {
                    handle_alloc_error(layout.layout);
                }

                core::ptr::write_bytes(raw_alloc, 0xff, layout.links_offset);

                NonNull::new_unchecked(raw_alloc)
            }
        };

        let mut table = Self {
            layout,
            alloc,
            buckets,
            slots,
            len: 0,
            free_head: EOL,
            generation: 0,
            _phantom: core::marker::PhantomData,
        };
        table.link_free_range(0, slots);
        table
    }

    fn heads_ptr(&self) -> NonNull<[u32]> {
        // SAFETY: Allocation is valid and properly sized for the bucket head
        // slice.
        unsafe {
            NonNull::slice_from_raw_parts(
                self.alloc.add(self.layout.heads_offset).cast(),
                self.buckets,
            )
        }
    }

    fn links_ptr(&self) -> NonNull<[u32]> {
        // SAFETY: Allocation is valid and properly sized for the link slice.
        unsafe {
            NonNull::slice_from_raw_parts(
                self.alloc.add(self.layout.links_offset).cast(),
                self.slots,
            )
        }
    }

    fn entries_ptr(&self) -> NonNull<[MaybeUninit<V>]> {
        // SAFETY: Allocation is valid and properly sized for the entry slice.
        unsafe {
            NonNull::slice_from_raw_parts(
                self.alloc.add(self.layout.entries_offset).cast(),
                self.slots,
            )
        }
    }

    #[inline(always)]
    fn bucket_of(&self, hash: u64) -> usize {
        debug_assert!(self.buckets.is_power_of_two());
        hash as usize & (self.buckets - 1)
    }

    /// Reads the index stored in a chain cell. A cell is either the head of
    /// `bucket` (when `prev` is the sentinel) or the link of the predecessor
    /// entry `prev`.
    ///
    /// # Safety
    ///
    /// `bucket` must be within the bucket array, and `prev` must either be
    /// the sentinel or within the link array.
    #[inline(always)]
    unsafe fn cell_get(&self, bucket: usize, prev: u32) -> u32 {
        // SAFETY: Caller guarantees the coordinates are in bounds.
        unsafe {
            if prev == EOL {
                *self.heads_ptr().as_ref().get_unchecked(bucket)
            } else {
                *self.links_ptr().as_ref().get_unchecked(prev as usize)
            }
        }
    }

    /// Writes an index into a chain cell.
    ///
    /// # Safety
    ///
    /// Same requirements as [`cell_get`](Self::cell_get).
    #[inline(always)]
    unsafe fn cell_set(&mut self, bucket: usize, prev: u32, value: u32) {
        // SAFETY: Caller guarantees the coordinates are in bounds.
        unsafe {
            if prev == EOL {
                *self.heads_ptr().as_mut().get_unchecked_mut(bucket) = value;
            } else {
                *self.links_ptr().as_mut().get_unchecked_mut(prev as usize) = value;
            }
        }
    }

    /// Threads the slot range `[start, end)` onto the free list, preserving
    /// anything already on it. Does nothing in compacting mode, where the
    /// free slots are implied by `len`.
    fn link_free_range(&mut self, start: usize, end: usize) {
        if COMPACT || start == end {
            return;
        }
        // SAFETY: `start..end` lies within the link array.
        unsafe {
            let links = self.links_ptr().as_mut();
            for index in start..end - 1 {
                *links.get_unchecked_mut(index) = index as u32 + 1;
            }
            *links.get_unchecked_mut(end - 1) = self.free_head;
        }
        self.free_head = start as u32;
    }

    /// Rebuilds an empty chain structure over the current allocation without
    /// dropping any entry. Everything stored becomes unreachable.
    fn reset_no_drop(&mut self) {
        if self.layout.layout.size() != 0 {
            // SAFETY: The byte fill covers exactly the bucket head region.
            unsafe {
                core::ptr::write_bytes(self.alloc.as_ptr(), 0xff, self.layout.links_offset);
            }
        }
        self.len = 0;
        self.free_head = EOL;
        self.link_free_range(0, self.slots);
        self.generation += 1;
    }

    /// Takes a free slot, links it at the head of the bucket for `hash`, and
    /// moves `value` into it.
    ///
    /// # Safety
    ///
    /// The caller must ensure a free slot exists (`len < slots`).
    #[inline(always)]
    unsafe fn claim_and_link(&mut self, hash: u64, value: V) -> u32 {
        debug_assert!(self.len < self.slots);

        // SAFETY: A free slot exists, so the claimed index is in bounds, and
        // the bucket index is masked to the bucket array.
        unsafe {
            let index = if COMPACT {
                self.len as u32
            } else {
                let index = self.free_head;
                debug_assert!(index != EOL);
                self.free_head = *self.links_ptr().as_ref().get_unchecked(index as usize);
                index
            };

            let bucket = self.bucket_of(hash);
            *self.links_ptr().as_mut().get_unchecked_mut(index as usize) =
                *self.heads_ptr().as_ref().get_unchecked(bucket);
            *self.heads_ptr().as_mut().get_unchecked_mut(bucket) = index;
            self.entries_ptr()
                .as_mut()
                .get_unchecked_mut(index as usize)
                .write(value);

            self.len += 1;
            self.generation += 1;
            index
        }
    }

    /// Unlinks the entry a chain cell points at and moves its value out. The
    /// slot is not reclaimed; the caller follows up with
    /// [`release_slot`](Self::release_slot) or
    /// [`compact_slot`](Self::compact_slot).
    ///
    /// # Safety
    ///
    /// The cell at `(bucket, prev)` must currently hold the index of a live
    /// entry.
    #[inline(always)]
    unsafe fn unlink_cell(&mut self, bucket: usize, prev: u32) -> (u32, V) {
        // SAFETY: Caller guarantees the cell addresses a live chain position.
        unsafe {
            let index = self.cell_get(bucket, prev);
            debug_assert!(index != EOL);
            let next = *self.links_ptr().as_ref().get_unchecked(index as usize);
            self.cell_set(bucket, prev, next);
            let value = self
                .entries_ptr()
                .as_ref()
                .get_unchecked(index as usize)
                .assume_init_read();
            self.len -= 1;
            self.generation += 1;
            (index, value)
        }
    }

    /// Pushes a vacated slot onto the free list.
    ///
    /// # Safety
    ///
    /// `index` must have just been unlinked and must be in bounds. Only
    /// valid when not compacting.
    #[inline(always)]
    unsafe fn release_slot(&mut self, index: u32) {
        debug_assert!(!COMPACT);
        // SAFETY: `index` is in bounds for the link array.
        unsafe {
            *self.links_ptr().as_mut().get_unchecked_mut(index as usize) = self.free_head;
        }
        self.free_head = index;
    }

    /// Relocates the last live entry into a vacated slot and repairs the one
    /// chain cell that referenced its old index, keeping live entries dense
    /// in `[0, len)`.
    ///
    /// # Safety
    ///
    /// `index` must have just been unlinked (so `len` already excludes it),
    /// and the table must be in compacting mode.
    unsafe fn compact_slot(&mut self, index: u32, hasher: &impl Fn(&V) -> u64) {
        debug_assert!(COMPACT);

        let last = self.len as u32;
        if index == last {
            return;
        }

        // SAFETY: Slot `last` held a live entry before the unlink decremented
        // `len`, and slot `index` was vacated by that unlink. The moved
        // entry's chain still contains `last`, so the repair walk terminates.
        unsafe {
            let moved = self
                .entries_ptr()
                .as_ref()
                .get_unchecked(last as usize)
                .assume_init_read();
            let bucket = self.bucket_of(hasher(&moved));
            self.entries_ptr()
                .as_mut()
                .get_unchecked_mut(index as usize)
                .write(moved);
            *self.links_ptr().as_mut().get_unchecked_mut(index as usize) =
                *self.links_ptr().as_ref().get_unchecked(last as usize);

            let mut prev = EOL;
            loop {
                let current = self.cell_get(bucket, prev);
                debug_assert!(current != EOL);
                if current == last {
                    self.cell_set(bucket, prev, index);
                    break;
                }
                prev = current;
            }
        }
    }

    /// Walks the chain for `hash` and returns the coordinates of the cell
    /// pointing at the first matching entry, plus that entry's index.
    fn find_cell(&self, hash: u64, eq: &impl Fn(&V) -> bool) -> Option<(usize, u32, u32)> {
        if self.len == 0 {
            return None;
        }

        let bucket = self.bucket_of(hash);
        // SAFETY: Chain indices are always in bounds for the link and entry
        // arrays, and chain membership implies the slot is initialized.
        unsafe {
            let mut prev = EOL;
            let mut index = self.cell_get(bucket, prev);
            while index != EOL {
                let entry = self
                    .entries_ptr()
                    .as_ref()
                    .get_unchecked(index as usize)
                    .assume_init_ref();
                if eq(entry) {
                    return Some((bucket, prev, index));
                }
                prev = index;
                index = *self.links_ptr().as_ref().get_unchecked(index as usize);
            }
        }
        None
    }

    /// Returns a reference to the first entry matching the predicate under
    /// the given hash, or `None` if no entry matches.
    ///
    /// Read-only: never grows the table and never moves entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_u64(1), |&n: &u64| n == 1, |&n| hash_u64(n))
    ///     .or_insert(1);
    ///
    /// assert_eq!(table.find(hash_u64(1), |&n| n == 1), Some(&1));
    /// assert_eq!(table.find(hash_u64(2), |&n| n == 2), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        if self.len == 0 {
            return None;
        }

        let bucket = self.bucket_of(hash);
        // SAFETY: Chain indices are always in bounds, and chain membership
        // implies the slot is initialized.
        unsafe {
            let mut index = *self.heads_ptr().as_ref().get_unchecked(bucket);
            while index != EOL {
                let entry = self
                    .entries_ptr()
                    .as_ref()
                    .get_unchecked(index as usize)
                    .assume_init_ref();
                let next = *self.links_ptr().as_ref().get_unchecked(index as usize);
                if next != EOL {
                    prefetch(
                        self.entries_ptr()
                            .as_ref()
                            .get_unchecked(next as usize)
                            .as_ptr(),
                    );
                }
                if eq(entry) {
                    return Some(entry);
                }
                index = next;
            }
        }
        None
    }

    /// Returns a mutable reference to the first entry matching the predicate
    /// under the given hash.
    ///
    /// Mutating the entry so that its hash or equality changes leaves it
    /// unreachable by later lookups; that is a logic error, not a safety
    /// issue.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<(u64, i32)> = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_u64(1), |v: &(u64, i32)| v.0 == 1, |v| hash_u64(v.0))
    ///     .or_insert((1, 10));
    ///
    /// if let Some(v) = table.find_mut(hash_u64(1), |v| v.0 == 1) {
    ///     v.1 += 1;
    /// }
    /// assert_eq!(table.find(hash_u64(1), |v| v.0 == 1), Some(&(1, 11)));
    /// ```
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let (_, _, index) = self.find_cell(hash, &eq)?;
        // SAFETY: `find_cell` returned the index of a live entry.
        unsafe {
            Some(
                self.entries_ptr()
                    .as_mut()
                    .get_unchecked_mut(index as usize)
                    .assume_init_mut(),
            )
        }
    }

    /// Looks up the entry for `hash` and the equality predicate, preparing
    /// an insertion slot if no entry matches.
    ///
    /// When the probe misses and the table is full, the table grows before
    /// the [`VacantEntry`] is handed out, so a following
    /// [`insert`](VacantEntry::insert) cannot fail or reallocate. The
    /// `hasher` closure re-derives hashes for existing entries during that
    /// growth; it must be consistent with `hash` for equal entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::Entry;
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<String> = HashTable::with_capacity(10);
    /// let hash = hash_str("key");
    ///
    /// match table.entry(hash, |s: &String| s == "key", |s| hash_str(s)) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("key".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// assert!(matches!(
    ///     table.entry(hash, |s: &String| s == "key", |s| hash_str(s)),
    ///     Entry::Occupied(_)
    /// ));
    /// ```
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Entry<'_, V, COMPACT> {
        match self.find_cell(hash, &eq) {
            Some((bucket, prev, index)) => Entry::Occupied(OccupiedEntry {
                table: self,
                bucket,
                prev,
                index,
            }),
            None => {
                if self.len == self.slots {
                    self.grow(&hasher);
                }
                Entry::Vacant(VacantEntry { table: self, hash })
            }
        }
    }

    /// Inserts a value without checking whether an equal entry already
    /// exists, and returns a mutable reference to it.
    ///
    /// This skips the probe that [`entry`](Self::entry) performs, which is
    /// useful when rebuilding a table from entries already known to be
    /// distinct. Inserting a duplicate this way is a logic error: both
    /// entries stay in the table and which one later lookups see is
    /// unspecified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// for n in 0..4u64 {
    ///     table.insert_unique(hash_u64(n), n, |&v| hash_u64(v));
    /// }
    /// assert_eq!(table.len(), 4);
    /// ```
    pub fn insert_unique(&mut self, hash: u64, value: V, hasher: impl Fn(&V) -> u64) -> &mut V {
        if self.len == self.slots {
            self.grow(&hasher);
        }
        // SAFETY: The grow above guarantees a free slot, and the claimed
        // index stays in bounds.
        unsafe {
            let index = self.claim_and_link(hash, value);
            self.entries_ptr()
                .as_mut()
                .get_unchecked_mut(index as usize)
                .assume_init_mut()
        }
    }

    /// Ensures the table can hold at least `capacity` entries without
    /// growing.
    ///
    /// The bucket count only ever increases and stays a power of two; a
    /// request at or below the current capacity does nothing. Growth
    /// rehashes every live entry with the `hasher` closure, but entries keep
    /// their slot indices.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(100, |&v| hash_u64(v));
    /// assert!(table.capacity() >= 100);
    /// let capacity = table.capacity();
    ///
    /// // A smaller request never shrinks
    /// table.reserve(10, |&v| hash_u64(v));
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn reserve(&mut self, capacity: usize, hasher: impl Fn(&V) -> u64) {
        let buckets = buckets_for_capacity(capacity);
        if buckets > self.buckets {
            self.reserve_rehash(buckets, &hasher);
        }
    }

    /// Shrinks the table to the smallest capacity that holds the current
    /// entries, rehashing them with the `hasher` closure.
    ///
    /// An empty table is deallocated entirely and reset to the zero-capacity
    /// state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(1000);
    /// table
    ///     .entry(hash_u64(7), |&n| n == 7, |&n| hash_u64(n))
    ///     .or_insert(7);
    ///
    /// table.shrink_to_fit(|&v| hash_u64(v));
    /// assert!(table.capacity() < 1000);
    /// assert_eq!(table.find(hash_u64(7), |&n| n == 7), Some(&7));
    /// ```
    pub fn shrink_to_fit(&mut self, hasher: impl Fn(&V) -> u64) {
        if self.len == 0 {
            if self.layout.layout.size() != 0 {
                // SAFETY: The allocation is valid and holds no live entries.
                unsafe {
                    alloc::alloc::dealloc(self.alloc.as_ptr(), self.layout.layout);
                }
                self.layout = DataLayout::new::<V>(0, 0);
                // Dangling placeholder aligned for the layout, matching
                // the zero-capacity state built by `with_buckets`.
                self.alloc =
                    NonNull::new(core::ptr::without_provenance_mut(self.layout.layout.align()))
                        .unwrap();
                self.buckets = 0;
                self.slots = 0;
                self.free_head = EOL;
                self.generation += 1;
            }
            return;
        }

        let target = buckets_for_capacity(self.len);
        if target < self.buckets {
            self.rebuild(target, &hasher);
        }
    }

    /// Removes all entries from the table, keeping the allocated capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_u64(1), |&n: &u64| n == 1, |&n| hash_u64(n))
    ///     .or_insert(1);
    /// let capacity = table.capacity();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }

        let guard = ResetOnUnwind(&mut *self);
        // SAFETY: Live entries are dropped exactly once; the guard then
        // rebuilds the empty structure, even if one of the destructors
        // panicked mid-walk.
        unsafe {
            if core::mem::needs_drop::<V>() {
                guard.0.drop_live();
            }
        }
        drop(guard);
    }

    /// Drops every live entry in place without touching the chain structure.
    ///
    /// # Safety
    ///
    /// The caller must reset or deallocate the table before the dropped
    /// entries can be observed again.
    unsafe fn drop_live(&mut self) {
        // SAFETY: Chain membership implies the slot is initialized, and each
        // live slot is reachable from exactly one chain.
        unsafe {
            for bucket in 0..self.buckets {
                let mut index = *self.heads_ptr().as_ref().get_unchecked(bucket);
                while index != EOL {
                    self.entries_ptr()
                        .as_mut()
                        .get_unchecked_mut(index as usize)
                        .assume_init_drop();
                    index = *self.links_ptr().as_ref().get_unchecked(index as usize);
                }
            }
        }
    }

    /// Returns the number of entries in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(10);
    /// assert_eq!(table.len(), 0);
    ///
    /// table
    ///     .entry(hash_u64(1), |&n: &u64| n == 1, |&n| hash_u64(n))
    ///     .or_insert(1);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table contains no entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<i32> = HashTable::with_capacity(10);
    /// assert!(table.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current bucket count.
    ///
    /// This is always zero or a power of two, and the table holds up to
    /// three quarters of it in entries before growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<i32> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert!(table.capacity().is_power_of_two());
    /// ```
    pub fn capacity(&self) -> usize {
        self.buckets
    }

    /// Returns an iterator over all entries in the table.
    ///
    /// Entries come out in bucket-chain order, which is arbitrary from the
    /// caller's point of view and changes across mutations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_u64(1), |&n: &u64| n == 1, |&n| hash_u64(n))
    ///     .or_insert(1);
    /// table
    ///     .entry(hash_u64(2), |&n: &u64| n == 2, |&n| hash_u64(n))
    ///     .or_insert(2);
    ///
    /// let mut seen: Vec<u64> = table.iter().copied().collect();
    /// seen.sort_unstable();
    /// assert_eq!(seen, [1, 2]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V, COMPACT> {
        let mut iter = Iter {
            table: self,
            bucket: 0,
            index: EOL,
        };
        if self.buckets != 0 {
            // SAFETY: Bucket 0 exists whenever the table has any buckets.
            iter.index = unsafe { *self.heads_ptr().as_ref().get_unchecked(0) };
            iter.skip_exhausted();
        }
        iter
    }

    /// Returns an iterator that removes and yields every entry.
    ///
    /// The table is empty once the iterator is dropped, even if it was not
    /// fully consumed. Leaking the iterator leaks the unyielded values but
    /// leaves the table in a consistent state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_u64(1), |&n: &u64| n == 1, |&n| hash_u64(n))
    ///     .or_insert(1);
    /// table
    ///     .entry(hash_u64(2), |&n: &u64| n == 2, |&n| hash_u64(n))
    ///     .or_insert(2);
    ///
    /// let values: Vec<u64> = table.drain().collect();
    /// assert!(table.is_empty());
    /// assert_eq!(values.len(), 2);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V, COMPACT> {
        let mut detached = 0;
        if COMPACT {
            detached = self.len;
            if detached != 0 {
                // Detach the dense prefix up front: the table is already
                // empty from its own point of view, so leaking the iterator
                // cannot leave half-owned entries behind.
                // SAFETY: The byte fill resets every bucket head to the
                // sentinel; the detached values become owned by the
                // iterator.
                unsafe {
                    core::ptr::write_bytes(self.alloc.as_ptr(), 0xff, self.layout.links_offset);
                }
                self.len = 0;
                self.generation += 1;
            }
        } else if self.len != 0 {
            self.generation += 1;
        }
        Drain {
            table: self,
            bucket: 0,
            index: 0,
            detached,
        }
    }

    /// Returns a cursor for traversing the table with optional removal of
    /// the entry most recently returned.
    ///
    /// Ordinary iteration cannot erase safely because removal rewrites the
    /// chain link the iteration is about to follow. The cursor owns that
    /// link position, so erase-and-advance is a single coherent step; see
    /// [`CursorMut::advance`].
    pub fn cursor_mut(&mut self) -> CursorMut<'_, V, COMPACT> {
        let generation = self.generation;
        CursorMut {
            table: self,
            cell: None,
            next_bucket: 0,
            generation,
        }
    }

    /// Grows the table, doubling the bucket count (or allocating the initial
    /// 16 buckets).
    fn grow(&mut self, hasher: &impl Fn(&V) -> u64) {
        let target = if self.buckets == 0 {
            16
        } else {
            self.buckets * 2
        };
        self.reserve_rehash(target, hasher);
    }

    /// Replaces the backing allocation with one sized for `new_buckets`,
    /// relinking every live entry under the wider mask. Entries keep their
    /// slot indices; only bucket membership changes.
    #[inline(never)]
    fn reserve_rehash(&mut self, new_buckets: usize, hasher: &impl Fn(&V) -> u64) {
        debug_assert!(new_buckets.is_power_of_two());
        debug_assert!(new_buckets > self.buckets);

        let new_slots = slot_capacity(new_buckets);
        let new_layout = DataLayout::new::<V>(new_buckets, new_slots);

        // SAFETY: `new_buckets` is nonzero so the layout has nonzero size.
        // Allocation failure is handled, and every bucket head is reset to
        // the sentinel before any table state refers to the new buffer.
        let new_alloc = unsafe {
            let raw_alloc = alloc::alloc::alloc(new_layout.layout);
            if raw_alloc.is_null() {
                handle_alloc_error(new_layout.layout);
            }
            core::ptr::write_bytes(raw_alloc, 0xff, new_layout.links_offset);
            NonNull::new_unchecked(raw_alloc)
        };

        let old_layout = core::mem::replace(&mut self.layout, new_layout);
        let old_alloc = core::mem::replace(&mut self.alloc, new_alloc);
        let old_buckets = core::mem::replace(&mut self.buckets, new_buckets);
        let old_slots = core::mem::replace(&mut self.slots, new_slots);

        // SAFETY: The old allocation stays valid until deallocated below,
        // and the slice lengths match the old layout.
        let old_heads: NonNull<[u32]> = unsafe {
            NonNull::slice_from_raw_parts(
                old_alloc.add(old_layout.heads_offset).cast(),
                old_buckets,
            )
        };
        let old_links: NonNull<[u32]> = unsafe {
            NonNull::slice_from_raw_parts(old_alloc.add(old_layout.links_offset).cast(), old_slots)
        };
        let old_entries: NonNull<[MaybeUninit<V>]> = unsafe {
            NonNull::slice_from_raw_parts(
                old_alloc.add(old_layout.entries_offset).cast(),
                old_slots,
            )
        };

        // Ownership note: values are moved into the new allocation by byte
        // copy, and the values live in the old buffer until that copy runs.
        // The old allocation is deallocated without running destructors for
        // the moved-out contents; only the new table drops values from here
        // on. If the hash closure panics mid-relink, the guard leaves a
        // valid empty table on the new buffer and the old buffer leaks
        // outright instead of being half-owned by both.
        let guard = ResetOnUnwind(&mut *self);
        // SAFETY: All indices touched below are within the old or new slot
        // ranges, and live slots are initialized.
        unsafe {
            let new = &*guard.0;
            if COMPACT || new.free_head == EOL {
                // Live entries occupy [0, len) exactly, either because the
                // table compacts or because it was completely full. A linear
                // scan relinks them without consulting the old chains.
                for index in 0..new.len {
                    let value = old_entries.as_ref().get_unchecked(index).assume_init_ref();
                    let bucket = hasher(value) as usize & (new_buckets - 1);
                    *new.links_ptr().as_mut().get_unchecked_mut(index) =
                        *new.heads_ptr().as_ref().get_unchecked(bucket);
                    *new.heads_ptr().as_mut().get_unchecked_mut(bucket) = index as u32;
                }
                core::ptr::copy_nonoverlapping(
                    old_entries.cast::<MaybeUninit<V>>().as_ptr(),
                    new.entries_ptr().cast::<MaybeUninit<V>>().as_ptr(),
                    new.len,
                );
            } else {
                // Free slots are scattered through the old slot range. Carry
                // the link array wholesale so the free threading survives,
                // then walk the old chains and relink just the live slots.
                core::ptr::copy_nonoverlapping(
                    old_links.cast::<u32>().as_ptr(),
                    new.links_ptr().cast::<u32>().as_ptr(),
                    old_slots,
                );
                for bucket in 0..old_buckets {
                    let mut index = *old_heads.as_ref().get_unchecked(bucket);
                    while index != EOL {
                        let next = *old_links.as_ref().get_unchecked(index as usize);
                        let value = old_entries
                            .as_ref()
                            .get_unchecked(index as usize)
                            .assume_init_ref();
                        let new_bucket = hasher(value) as usize & (new_buckets - 1);
                        *new.links_ptr().as_mut().get_unchecked_mut(index as usize) =
                            *new.heads_ptr().as_ref().get_unchecked(new_bucket);
                        *new.heads_ptr().as_mut().get_unchecked_mut(new_bucket) = index;
                        index = next;
                    }
                }
                core::ptr::copy_nonoverlapping(
                    old_entries.cast::<MaybeUninit<V>>().as_ptr(),
                    new.entries_ptr().cast::<MaybeUninit<V>>().as_ptr(),
                    old_slots,
                );
            }

            if old_layout.layout.size() != 0 {
                alloc::alloc::dealloc(old_alloc.as_ptr(), old_layout.layout);
            }
        }
        core::mem::forget(guard);

        self.link_free_range(old_slots, new_slots);
        self.generation += 1;
    }

    /// Moves every live entry into a freshly allocated table with
    /// `new_buckets` buckets. Unlike
    /// [`reserve_rehash`](Self::reserve_rehash) this assigns new slot
    /// indices, which is what allows shrinking below slot indices currently
    /// in use.
    fn rebuild(&mut self, new_buckets: usize, hasher: &impl Fn(&V) -> u64) {
        let mut rebuilt = Self::with_buckets(new_buckets);
        debug_assert!(rebuilt.slots >= self.len);

        let generation = self.generation;
        // A panicking hash closure empties this table through the guard;
        // values moved so far are dropped by `rebuilt` unwinding, the rest
        // leak.
        let guard = ResetOnUnwind(&mut *self);
        // SAFETY: Every live entry is moved out exactly once; the guard or
        // the assignment below forgets the source slots before they can be
        // observed again.
        unsafe {
            let source = &*guard.0;
            for bucket in 0..source.buckets {
                let mut index = *source.heads_ptr().as_ref().get_unchecked(bucket);
                while index != EOL {
                    let value = source
                        .entries_ptr()
                        .as_ref()
                        .get_unchecked(index as usize)
                        .assume_init_read();
                    let hash = hasher(&value);
                    rebuilt.claim_and_link(hash, value);
                    index = *source.links_ptr().as_ref().get_unchecked(index as usize);
                }
            }
        }
        core::mem::forget(guard);

        rebuilt.generation = generation + 1;
        self.len = 0;
        *self = rebuilt;
    }

    /// Produces chain statistics for the current table state.
    ///
    /// Test-only: compiled only with `cfg(test)`.
    #[cfg(test)]
    pub fn debug_stats(&self) -> ChainStats {
        let mut occupied_buckets = 0;
        let mut longest_chain = 0;
        // SAFETY: Only chain indices are read, and those are in bounds.
        unsafe {
            for bucket in 0..self.buckets {
                let mut chain = 0;
                let mut index = *self.heads_ptr().as_ref().get_unchecked(bucket);
                while index != EOL {
                    chain += 1;
                    index = *self.links_ptr().as_ref().get_unchecked(index as usize);
                }
                if chain > 0 {
                    occupied_buckets += 1;
                }
                longest_chain = longest_chain.max(chain);
            }
        }
        ChainStats {
            populated: self.len,
            buckets: self.buckets,
            slots: self.slots,
            occupied_buckets,
            longest_chain,
            free_slots: self.slots - self.len,
            total_bytes: self.layout.layout.size(),
        }
    }

    /// Asserts every structural invariant of the table: chain reachability
    /// matching `len`, no slot in two chains, bucket residence under the
    /// current mask, and free slots accounted for exactly once.
    ///
    /// Test-only: compiled only with `cfg(test)`.
    #[cfg(test)]
    #[track_caller]
    pub fn check_invariants(&self, hasher: impl Fn(&V) -> u64) {
        use alloc::vec;

        assert!(self.buckets == 0 || self.buckets.is_power_of_two());
        assert_eq!(self.slots, slot_capacity(self.buckets));
        assert!(self.len <= self.slots);

        let mut seen = vec![false; self.slots];
        let mut live = 0usize;
        // SAFETY: Test-only walk; chain indices are asserted in bounds
        // before use.
        unsafe {
            for bucket in 0..self.buckets {
                let mut index = *self.heads_ptr().as_ref().get_unchecked(bucket);
                while index != EOL {
                    assert!((index as usize) < self.slots, "chain index out of range");
                    assert!(!seen[index as usize], "slot reachable from two chains");
                    seen[index as usize] = true;
                    live += 1;
                    assert!(live <= self.slots, "cycle in bucket chain");
                    let value = self
                        .entries_ptr()
                        .as_ref()
                        .get_unchecked(index as usize)
                        .assume_init_ref();
                    assert_eq!(
                        self.bucket_of(hasher(value)),
                        bucket,
                        "entry reachable from the wrong bucket"
                    );
                    index = *self.links_ptr().as_ref().get_unchecked(index as usize);
                }
            }
        }
        assert_eq!(live, self.len, "chain walk disagrees with len");

        if COMPACT {
            for (index, live_slot) in seen.iter().enumerate() {
                assert_eq!(
                    *live_slot,
                    index < self.len,
                    "compacted storage must be dense"
                );
            }
        } else {
            let mut free = 0usize;
            let mut index = self.free_head;
            // SAFETY: Free list indices are asserted in bounds before use.
            unsafe {
                while index != EOL {
                    assert!((index as usize) < self.slots, "free index out of range");
                    assert!(!seen[index as usize], "slot both live and free");
                    seen[index as usize] = true;
                    free += 1;
                    assert!(free <= self.slots, "cycle in free list");
                    index = *self.links_ptr().as_ref().get_unchecked(index as usize);
                }
            }
            assert_eq!(live + free, self.slots, "every slot must be live or free");
        }
    }
}

impl<V> HashTable<V, false> {
    /// Removes and returns the first entry matching the predicate under the
    /// given hash, or `None` if no entry matches.
    ///
    /// The vacated slot goes onto the free list; no other entry moves.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_u64(42), |&n: &u64| n == 42, |&n| hash_u64(n))
    ///     .or_insert(42);
    ///
    /// assert_eq!(table.remove(hash_u64(42), |&n| n == 42), Some(42));
    /// assert_eq!(table.remove(hash_u64(42), |&n| n == 42), None);
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let (bucket, prev, _) = self.find_cell(hash, &eq)?;
        // SAFETY: `find_cell` produced the coordinates of a live cell.
        unsafe {
            let (index, value) = self.unlink_cell(bucket, prev);
            self.release_slot(index);
            Some(value)
        }
    }

    /// Removes every entry for which the predicate returns `false`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// for n in 0..10u64 {
    ///     table
    ///         .entry(hash_u64(n), |&v| v == n, |&v| hash_u64(v))
    ///         .or_insert(n);
    /// }
    ///
    /// table.retain(|&mut n| n % 2 == 0);
    /// assert_eq!(table.len(), 5);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) {
        let mut cursor = self.cursor_mut();
        let mut erase = false;
        while let Some(value) = cursor.advance(erase) {
            erase = !f(value);
        }
    }
}

impl<V> HashTable<V, true> {
    /// Removes and returns the first entry matching the predicate under the
    /// given hash, or `None` if no entry matches.
    ///
    /// Compacting removal relocates the last live entry into the vacated
    /// slot, so it needs the `hasher` closure to find the chain cell that
    /// referenced the relocated entry's old index.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64, true> = HashTable::new();
    /// for n in 0..3 {
    ///     table
    ///         .entry(hash_u64(n), |&v| v == n, |&v| hash_u64(v))
    ///         .or_insert(n);
    /// }
    ///
    /// let removed = table.remove(hash_u64(1), |&n| n == 1, |&n| hash_u64(n));
    /// assert_eq!(removed, Some(1));
    /// // Storage stays dense after the removal
    /// assert_eq!(table.as_slice().len(), table.len());
    /// ```
    pub fn remove(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Option<V> {
        let (bucket, prev, _) = self.find_cell(hash, &eq)?;
        // SAFETY: `find_cell` produced the coordinates of a live cell.
        unsafe {
            let (index, value) = self.unlink_cell(bucket, prev);
            let guard = ResetOnUnwind(&mut *self);
            guard.0.compact_slot(index, &hasher);
            core::mem::forget(guard);
            Some(value)
        }
    }

    /// Removes every entry for which the predicate returns `false`,
    /// re-deriving hashes with the `hasher` closure for the relocations each
    /// removal performs.
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool, hasher: impl Fn(&V) -> u64) {
        let mut cursor = self.cursor_mut();
        let mut erase = false;
        while let Some(value) = cursor.advance(erase, &hasher) {
            erase = !f(value);
        }
    }

    /// Returns the live entries as a contiguous slice.
    ///
    /// Compacting reclamation keeps live entries dense in slot order, so the
    /// slice always covers exactly `len()` entries. The order is arbitrary
    /// and changes when removals relocate entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<u64, true> = HashTable::new();
    /// table
    ///     .entry(hash_u64(5), |&v| v == 5, |&v| hash_u64(v))
    ///     .or_insert(5);
    ///
    /// assert_eq!(table.as_slice(), &[5]);
    /// ```
    pub fn as_slice(&self) -> &[V] {
        // SAFETY: In compacting mode the slots [0, len) are initialized, and
        // the shared borrow rules out exclusive references to them.
        unsafe { core::slice::from_raw_parts(self.entries_ptr().cast::<V>().as_ptr(), self.len) }
    }
}

/// A view into a single position of a [`HashTable`], occupied or vacant.
///
/// Constructed by the [`entry`](HashTable::entry) method.
pub enum Entry<'a, V, const COMPACT: bool = false> {
    /// No entry matched the probe; a slot is ready for insertion.
    Vacant(VacantEntry<'a, V, COMPACT>),
    /// An entry matched the probe.
    Occupied(OccupiedEntry<'a, V, COMPACT>),
}

impl<'a, V, const COMPACT: bool> Entry<'a, V, COMPACT> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the entry's value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use chain_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<String> = HashTable::with_capacity(10);
    /// let hash = hash_str("key");
    ///
    /// let value = table
    ///     .entry(hash, |s: &String| s == "key", |s| hash_str(s))
    ///     .or_insert("key".to_string());
    /// assert_eq!(value, "key");
    ///
    /// // A second probe sees the existing value
    /// let existing = table
    ///     .entry(hash, |s: &String| s == "key", |s| hash_str(s))
    ///     .or_insert("other".to_string());
    /// assert_eq!(existing, "key");
    /// ```
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the value produced by `default` if the entry is vacant and
    /// returns a mutable reference to the entry's value. The closure is not
    /// called for occupied entries.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to the value if the entry is occupied and returns a
    /// mutable reference to it, or returns `None` without inserting
    /// anything.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the entry's value.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant position of a [`HashTable`].
///
/// The slot for the eventual value is already guaranteed: the probing call
/// grew the table if it was full, so [`insert`](VacantEntry::insert) never
/// allocates.
pub struct VacantEntry<'a, V, const COMPACT: bool = false> {
    table: &'a mut HashTable<V, COMPACT>,
    hash: u64,
}

impl<'a, V, const COMPACT: bool> VacantEntry<'a, V, COMPACT> {
    /// Moves `value` into the table and returns a mutable reference to it.
    ///
    /// The value is linked at the head of the bucket chain selected by the
    /// hash the entry was probed with.
    pub fn insert(self, value: V) -> &'a mut V {
        // SAFETY: `entry` ensured a free slot before handing out this view,
        // and the claimed index stays in bounds.
        unsafe {
            let index = self.table.claim_and_link(self.hash, value);
            self.table
                .entries_ptr()
                .as_mut()
                .get_unchecked_mut(index as usize)
                .assume_init_mut()
        }
    }
}

/// A view into an occupied position of a [`HashTable`].
///
/// Holds the coordinates of the chain cell pointing at the entry, so removal
/// does not re-walk the chain.
pub struct OccupiedEntry<'a, V, const COMPACT: bool = false> {
    table: &'a mut HashTable<V, COMPACT>,
    bucket: usize,
    prev: u32,
    index: u32,
}

impl<'a, V, const COMPACT: bool> OccupiedEntry<'a, V, COMPACT> {
    /// Returns a reference to the entry's value.
    pub fn get(&self) -> &V {
        // SAFETY: The entry was live when probed and this view holds the
        // exclusive table borrow, so nothing has moved it since.
        unsafe {
            self.table
                .entries_ptr()
                .as_ref()
                .get_unchecked(self.index as usize)
                .assume_init_ref()
        }
    }

    /// Returns a mutable reference to the entry's value.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: Same as `get`.
        unsafe {
            self.table
                .entries_ptr()
                .as_mut()
                .get_unchecked_mut(self.index as usize)
                .assume_init_mut()
        }
    }

    /// Converts the view into a mutable reference tied to the table borrow.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: Same as `get`.
        unsafe {
            self.table
                .entries_ptr()
                .as_mut()
                .get_unchecked_mut(self.index as usize)
                .assume_init_mut()
        }
    }
}

impl<'a, V> OccupiedEntry<'a, V, false> {
    /// Removes the entry and returns its value. The vacated slot goes onto
    /// the free list.
    pub fn remove(self) -> V {
        // SAFETY: The probe that created this view recorded the live cell,
        // and the exclusive borrow kept it valid.
        unsafe {
            let (index, value) = self.table.unlink_cell(self.bucket, self.prev);
            debug_assert_eq!(index, self.index);
            self.table.release_slot(index);
            value
        }
    }
}

impl<'a, V> OccupiedEntry<'a, V, true> {
    /// Removes the entry and returns its value, relocating the last live
    /// entry into the vacated slot to keep storage dense.
    pub fn remove(self, hasher: impl Fn(&V) -> u64) -> V {
        // SAFETY: Same as the non-compacting `remove`.
        unsafe {
            let (index, value) = self.table.unlink_cell(self.bucket, self.prev);
            debug_assert_eq!(index, self.index);
            let guard = ResetOnUnwind(self.table);
            guard.0.compact_slot(index, &hasher);
            core::mem::forget(guard);
            value
        }
    }
}

/// An iterator over the entries of a [`HashTable`].
///
/// Created by [`iter`](HashTable::iter); walks bucket 0 upward, following
/// each bucket's chain before moving to the next.
pub struct Iter<'a, V, const COMPACT: bool = false> {
    table: &'a HashTable<V, COMPACT>,
    bucket: usize,
    index: u32,
}

impl<V, const COMPACT: bool> Iter<'_, V, COMPACT> {
    fn skip_exhausted(&mut self) {
        // SAFETY: `bucket` stays within the bucket array.
        unsafe {
            while self.index == EOL {
                self.bucket += 1;
                if self.bucket >= self.table.buckets {
                    break;
                }
                self.index = *self.table.heads_ptr().as_ref().get_unchecked(self.bucket);
            }
        }
    }
}

impl<'a, V, const COMPACT: bool> Iterator for Iter<'a, V, COMPACT> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index == EOL {
            return None;
        }

        // SAFETY: `index` was read from a live chain, so it is in bounds and
        // the slot is initialized.
        unsafe {
            let entry = self
                .table
                .entries_ptr()
                .as_ref()
                .get_unchecked(self.index as usize)
                .assume_init_ref();
            self.index = *self
                .table
                .links_ptr()
                .as_ref()
                .get_unchecked(self.index as usize);
            self.skip_exhausted();
            Some(entry)
        }
    }
}

impl<'a, V, const COMPACT: bool> IntoIterator for &'a HashTable<V, COMPACT> {
    type IntoIter = Iter<'a, V, COMPACT>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A draining iterator over the entries of a [`HashTable`].
///
/// Created by [`drain`](HashTable::drain). The table is empty once this is
/// dropped.
pub struct Drain<'a, V, const COMPACT: bool = false> {
    table: &'a mut HashTable<V, COMPACT>,
    // The sparse drain pops chain heads, releasing each slot as it goes; the
    // compacting drain detached the dense prefix at construction and walks
    // it by position.
    bucket: usize,
    index: usize,
    detached: usize,
}

impl<V, const COMPACT: bool> Iterator for Drain<'_, V, COMPACT> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if COMPACT {
            if self.index >= self.detached {
                return None;
            }
            // SAFETY: Positions below `detached` were live when the drain
            // detached them, and each is read exactly once.
            unsafe {
                let value = self
                    .table
                    .entries_ptr()
                    .as_ref()
                    .get_unchecked(self.index)
                    .assume_init_read();
                self.index += 1;
                Some(value)
            }
        } else {
            if self.table.len == 0 {
                return None;
            }
            // SAFETY: Chain heads address live entries; each pop leaves the
            // table consistent, so an abandoned drain is harmless.
            unsafe {
                while self.bucket < self.table.buckets {
                    let head = *self.table.heads_ptr().as_ref().get_unchecked(self.bucket);
                    if head == EOL {
                        self.bucket += 1;
                        continue;
                    }
                    let (index, value) = self.table.unlink_cell(self.bucket, EOL);
                    self.table.release_slot(index);
                    return Some(value);
                }
                None
            }
        }
    }
}

impl<V, const COMPACT: bool> Drop for Drain<'_, V, COMPACT> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

/// An owning iterator over the entries of a [`HashTable`].
pub struct IntoIter<V, const COMPACT: bool = false> {
    table: HashTable<V, COMPACT>,
    bucket: usize,
}

impl<V, const COMPACT: bool> Iterator for IntoIter<V, COMPACT> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.table.len == 0 {
            return None;
        }
        // SAFETY: Chain heads address live entries. Slots are not recycled
        // here; the consumed table's destructor only walks the chains, which
        // each pop keeps consistent.
        unsafe {
            while self.bucket < self.table.buckets {
                let head = *self.table.heads_ptr().as_ref().get_unchecked(self.bucket);
                if head == EOL {
                    self.bucket += 1;
                    continue;
                }
                let (_, value) = self.table.unlink_cell(self.bucket, EOL);
                return Some(value);
            }
            None
        }
    }
}

impl<V, const COMPACT: bool> IntoIterator for HashTable<V, COMPACT> {
    type IntoIter = IntoIter<V, COMPACT>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            bucket: 0,
        }
    }
}

/// A cursor over a [`HashTable`] that can remove the entry it most recently
/// returned while continuing the traversal.
///
/// Ordinary iterators cannot support removal because erasing an entry
/// rewrites the chain link the iterator is about to follow, and compacting
/// tables additionally relocate an arbitrary entry on every removal. The
/// cursor instead tracks the chain cell pointing at the current entry, which
/// is exactly the state removal has to rewrite, so advancing and erasing
/// compose into one well-defined step.
///
/// The cursor records the table's generation counter when created and keeps
/// it in sync across its own removals. [`advance`](CursorMut::advance)
/// asserts that no other path mutated the table in between. The exclusive
/// borrow already rules that out for ordinary code; the one exception is a
/// panicking hash closure caught mid-erase, which empties the table and
/// makes any later use of the cursor panic rather than traverse stale
/// links.
///
/// # Examples
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use chain_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_u64(n: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     n.hash(&mut hasher);
/// #     hasher.finish()
/// # }
/// #
/// let mut table: HashTable<u64> = HashTable::new();
/// for n in 0..6u64 {
///     table
///         .entry(hash_u64(n), |&v| v == n, |&v| hash_u64(v))
///         .or_insert(n);
/// }
///
/// // Remove the odd values during a single traversal
/// let mut cursor = table.cursor_mut();
/// let mut erase = false;
/// while let Some(&mut value) = cursor.advance(erase) {
///     erase = value % 2 == 1;
/// }
/// assert_eq!(table.len(), 3);
/// ```
pub struct CursorMut<'a, V, const COMPACT: bool = false> {
    table: &'a mut HashTable<V, COMPACT>,
    // Coordinates of the cell whose contents index the entry most recently
    // returned: `(bucket, EOL)` is the bucket head, `(bucket, prev)` the
    // link of the predecessor entry. `None` before the first entry and
    // after the last.
    cell: Option<(usize, u32)>,
    next_bucket: usize,
    generation: u64,
}

impl<V, const COMPACT: bool> CursorMut<'_, V, COMPACT> {
    /// Steps past the most recently returned entry without erasing it.
    fn advance_pos(&mut self) -> Option<&mut V> {
        match self.cell {
            None => self.traverse_buckets(),
            Some((bucket, prev)) => {
                // SAFETY: The cursor borrows the table exclusively, so cell
                // coordinates recorded by earlier steps are still valid.
                unsafe {
                    let index = self.table.cell_get(bucket, prev);
                    debug_assert!(index != EOL);
                    let next = *self.table.links_ptr().as_ref().get_unchecked(index as usize);
                    if next == EOL {
                        self.traverse_buckets()
                    } else {
                        self.cell = Some((bucket, index));
                        Some(self.entry_at(next))
                    }
                }
            }
        }
    }

    /// Re-reads the current cell after an erase: its contents already name
    /// the next entry in the chain, or the chain is exhausted.
    fn after_erase(&mut self) -> Option<&mut V> {
        let Some((bucket, prev)) = self.cell else {
            return self.traverse_buckets();
        };
        // SAFETY: The erase rewired this cell to the next chain entry.
        unsafe {
            let next = self.table.cell_get(bucket, prev);
            if next == EOL {
                self.traverse_buckets()
            } else {
                Some(self.entry_at(next))
            }
        }
    }

    fn traverse_buckets(&mut self) -> Option<&mut V> {
        self.cell = None;
        while self.next_bucket < self.table.buckets {
            let bucket = self.next_bucket;
            self.next_bucket += 1;
            // SAFETY: `bucket` is in bounds by the loop condition.
            unsafe {
                let head = *self.table.heads_ptr().as_ref().get_unchecked(bucket);
                if head != EOL {
                    self.cell = Some((bucket, EOL));
                    return Some(self.entry_at(head));
                }
            }
        }
        None
    }

    /// # Safety
    ///
    /// `index` must address a live entry.
    unsafe fn entry_at(&mut self, index: u32) -> &mut V {
        // SAFETY: Caller guarantees the slot is live.
        unsafe {
            self.table
                .entries_ptr()
                .as_mut()
                .get_unchecked_mut(index as usize)
                .assume_init_mut()
        }
    }
}

impl<V> CursorMut<'_, V, false> {
    /// Returns the next live entry, optionally erasing the one returned by
    /// the previous call first.
    ///
    /// Passing `erase_current = true` before any entry has been returned, or
    /// after the traversal finished, has no effect. Every entry alive when
    /// the cursor was created is returned exactly once, except entries
    /// erased through the cursor itself.
    pub fn advance(&mut self, erase_current: bool) -> Option<&mut V> {
        assert_eq!(
            self.generation, self.table.generation,
            "cursor out of sync with table"
        );

        if erase_current {
            if let Some((bucket, prev)) = self.cell {
                // SAFETY: The cell was recorded by this cursor, and the
                // exclusive borrow kept it valid.
                unsafe {
                    let (index, _value) = self.table.unlink_cell(bucket, prev);
                    self.table.release_slot(index);
                }
                self.generation = self.table.generation;
                return self.after_erase();
            }
        }
        self.advance_pos()
    }
}

impl<V> CursorMut<'_, V, true> {
    /// Returns the next live entry, optionally erasing the one returned by
    /// the previous call first.
    ///
    /// The `hasher` closure re-derives the hash of the entry relocated by a
    /// compacting erase. Passing `erase_current = true` before any entry has
    /// been returned, or after the traversal finished, has no effect. Every
    /// entry alive when the cursor was created is returned exactly once,
    /// except entries erased through the cursor itself.
    pub fn advance(&mut self, erase_current: bool, hasher: impl Fn(&V) -> u64) -> Option<&mut V> {
        assert_eq!(
            self.generation, self.table.generation,
            "cursor out of sync with table"
        );

        if erase_current {
            if let Some((bucket, prev)) = self.cell {
                // SAFETY: The cell was recorded by this cursor, and the
                // exclusive borrow kept it valid.
                unsafe {
                    let (index, _value) = self.table.unlink_cell(bucket, prev);
                    let last = self.table.len as u32;
                    let guard = ResetOnUnwind(&mut *self.table);
                    guard.0.compact_slot(index, &hasher);
                    core::mem::forget(guard);
                    // If the relocation moved the predecessor entry, this
                    // cursor's cell moved with it.
                    if index != last && prev != EOL && prev == last {
                        self.cell = Some((bucket, index));
                    }
                }
                self.generation = self.table.generation;
                return self.after_erase();
            }
        }
        self.advance_pos()
    }
}
