//! Per-class buddy free-lists.
//!
//! Buffers move between the free-lists and user hands; they are created by
//! region seeding or by splitting and are never destroyed before teardown.
//! Frees do not coalesce: the RPC workload reuses same-size buffers heavily,
//! and a constant-time free path wins over long-term defragmentation.

use std::ptr::NonNull;

use crate::buffer::Buffer;
use crate::classes::{class_of, class_size, MAX_CLASS_SIZE, NUM_CLASSES};

/// Size-classed free-lists with split-on-demand.
///
/// Purely structural: the engine does pointer arithmetic over regions owned
/// elsewhere and never dereferences buffer memory. Growth and accounting are
/// the facade's job; an allocation miss surfaces as `None`.
///
/// # Example
///
/// ```
/// use std::ptr::NonNull;
/// use hugepool_core::{BuddyEngine, MAX_CLASS_SIZE};
///
/// let mut engine = BuddyEngine::new();
/// let base = NonNull::new(0x7000_0000 as *mut u8).unwrap();
/// engine.seed_region(base, MAX_CLASS_SIZE, 1);
///
/// // A 4 KB request splits down from the seeded 8 MB buffer.
/// let buffer = engine.alloc(6).unwrap();
/// assert_eq!(buffer.class_size(), 4096);
/// assert_eq!(buffer.lkey(), 1);
///
/// engine.free(buffer);
/// assert_eq!(engine.free_len(6), 2);
/// ```
#[derive(Debug, Default)]
pub struct BuddyEngine {
    freelist: [Vec<Buffer>; NUM_CLASSES],
}

impl BuddyEngine {
    /// Create an engine with all free-lists empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Carve `[base, base + len)` into largest-class buffers, in address
    /// order, all carrying the region's registration key.
    ///
    /// `len` must be a whole multiple of the largest class size, and the
    /// range must stay valid for the engine's lifetime.
    pub fn seed_region(&mut self, base: NonNull<u8>, len: usize, lkey: u32) {
        debug_assert!(len >= MAX_CLASS_SIZE && len % MAX_CLASS_SIZE == 0);

        for i in 0..len / MAX_CLASS_SIZE {
            let ptr = base.as_ptr().wrapping_add(i * MAX_CLASS_SIZE);
            // SAFETY: a non-null base plus an in-region offset cannot wrap
            // to null.
            let ptr = unsafe { NonNull::new_unchecked(ptr) };
            self.freelist[NUM_CLASSES - 1].push(Buffer::new(ptr, MAX_CLASS_SIZE, lkey));
        }
    }

    /// Pop a buffer of class `target`, splitting a larger buffer downward
    /// if the target class is empty.
    ///
    /// Returns `None` when no class at or above `target` has a free buffer,
    /// signaling the facade to reserve another region.
    pub fn alloc(&mut self, target: usize) -> Option<Buffer> {
        debug_assert!(target < NUM_CLASSES);

        let from = (target..NUM_CLASSES).find(|&c| !self.freelist[c].is_empty())?;

        // Take from the back for reuse locality.
        let mut buffer = self.freelist[from].pop()?;
        let mut class = from;
        while class > target {
            class -= 1;
            let (low, high) = buffer.split();
            self.freelist[class].push(high);
            buffer = low;
        }

        debug_assert_eq!(buffer.class_size(), class_size(target));
        Some(buffer)
    }

    /// Return a buffer to its class free-list. No coalescing.
    pub fn free(&mut self, buffer: Buffer) {
        let class = class_of(buffer.class_size());
        debug_assert_eq!(class_size(class), buffer.class_size());
        self.freelist[class].push(buffer);
    }

    /// Number of free buffers in `class`.
    #[must_use]
    pub fn free_len(&self, class: usize) -> usize {
        self.freelist.get(class).map_or(0, Vec::len)
    }
}
