//! The power-of-two size-class ladder.
//!
//! Class `i` holds buffers of `MIN_CLASS_SIZE << i` bytes. A new region is
//! carved into largest-class buffers, which later split downward to fill the
//! smaller classes.

/// Smallest buffer size handed out by the allocator.
pub const MIN_CLASS_SIZE: usize = 64;

/// Shift for dividing by [`MIN_CLASS_SIZE`].
pub const MIN_CLASS_SHIFT: u32 = 6;

/// Number of size classes: 64 B (2^6) up to 8 MB (2^23).
pub const NUM_CLASSES: usize = 18;

/// Largest buffer size the free-lists can satisfy.
pub const MAX_CLASS_SIZE: usize = MIN_CLASS_SIZE << (NUM_CLASSES - 1);

/// Rounding unit for region reservations (2 MB hugepages).
pub const HUGEPAGE_SIZE: usize = 2 * 1024 * 1024;

/// Upper bound on the configurable NUMA node, matching the 64-bit nodemask
/// passed to `mbind`.
pub const MAX_NUMA_NODES: usize = 64;

const _: () = assert!(MIN_CLASS_SIZE >> MIN_CLASS_SHIFT == 1);
const _: () = assert!(MAX_CLASS_SIZE == MIN_CLASS_SIZE << (NUM_CLASSES - 1));
const _: () = assert!(MAX_CLASS_SIZE % HUGEPAGE_SIZE == 0);

/// Buffer size of class `class`.
#[must_use]
pub const fn class_size(class: usize) -> usize {
    MIN_CLASS_SIZE << class
}

/// Class index for an allocation of `size` bytes: the smallest class whose
/// buffer size is at least `size`.
///
/// Callers reject `size == 0` and `size > MAX_CLASS_SIZE` first.
///
/// # Example
///
/// ```
/// use hugepool_core::classes::{class_of, class_size};
///
/// assert_eq!(class_of(64), 0);
/// assert_eq!(class_of(100), 1);
/// assert_eq!(class_size(class_of(100)), 128);
/// assert_eq!(class_of(4096), 6);
/// ```
#[must_use]
pub const fn class_of(size: usize) -> usize {
    debug_assert!(size >= 1 && size <= MAX_CLASS_SIZE);
    (usize::BITS - ((size - 1) >> MIN_CLASS_SHIFT).leading_zeros()) as usize
}

/// Round `size` up to a whole multiple of `unit`.
pub(crate) const fn round_up(size: usize, unit: usize) -> usize {
    size.div_ceil(unit) * unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_constants() {
        assert_eq!(MAX_CLASS_SIZE, 8 * 1024 * 1024);
        assert_eq!(class_size(0), 64);
        assert_eq!(class_size(1), 128);
        assert_eq!(class_size(NUM_CLASSES - 1), MAX_CLASS_SIZE);
    }

    #[test]
    fn test_class_of_boundaries() {
        assert_eq!(class_of(1), 0);
        assert_eq!(class_of(64), 0);
        assert_eq!(class_of(65), 1);
        assert_eq!(class_of(100), 1);
        assert_eq!(class_of(128), 1);
        assert_eq!(class_of(129), 2);
        assert_eq!(class_of(4096), 6);
        assert_eq!(class_of(MAX_CLASS_SIZE - 1), NUM_CLASSES - 1);
        assert_eq!(class_of(MAX_CLASS_SIZE), NUM_CLASSES - 1);
    }

    #[test]
    fn test_class_of_matches_reference() {
        // Reference: walk the ladder until the class covers the size.
        let slow = |size: usize| {
            let mut class = 0;
            let mut limit = MIN_CLASS_SIZE;
            while size > limit {
                class += 1;
                limit *= 2;
            }
            class
        };

        for size in 1..=65_536 {
            assert_eq!(class_of(size), slow(size), "size {size}");
        }
        for class in 0..NUM_CLASSES {
            assert_eq!(class_of(class_size(class)), class);
        }
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(1, HUGEPAGE_SIZE), HUGEPAGE_SIZE);
        assert_eq!(round_up(HUGEPAGE_SIZE, HUGEPAGE_SIZE), HUGEPAGE_SIZE);
        assert_eq!(round_up(HUGEPAGE_SIZE + 1, HUGEPAGE_SIZE), 2 * HUGEPAGE_SIZE);
        assert_eq!(round_up(9 << 20, MAX_CLASS_SIZE), 16 << 20);
    }
}
