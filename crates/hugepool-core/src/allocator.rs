//! The allocator facade.
//!
//! Owns the regions, the buddy free-lists, the registration capability, and
//! the counters, and orchestrates growth when the free-lists run dry. One
//! instance per transport thread, each pinned to its own NUMA node; the
//! `&mut self` surface is the serialization contract.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::buddy::BuddyEngine;
use crate::buffer::{Buffer, RawMem};
use crate::classes::{class_of, class_size, round_up, MAX_CLASS_SIZE, MAX_NUMA_NODES, NUM_CLASSES};
use crate::error::AllocError;
use crate::numa::NumaTopology;
use crate::region::{self, ShmRegion};
use crate::registration::MemRegistrar;
use crate::stats::{fmt_bytes, AllocStats};
use crate::Result;

/// NUMA-aware hugepage allocator with size-classed buddy free-lists.
///
/// Every buffer it returns is hugepage-backed, zero-initialized at region
/// reservation, bound to the configured NUMA node, and covered by a live
/// memory registration. Buffers stay valid until the allocator is dropped;
/// dropping it while handles are in flight is a contract violation.
pub struct HugeAllocator {
    engine: BuddyEngine,
    regions: Vec<ShmRegion>,
    registrar: Box<dyn MemRegistrar>,
    rng: SmallRng,
    numa_node: usize,
    /// Size of the previous reservation, doubled on each growth.
    prev_reservation: usize,
    stats: AllocStats,
}

impl HugeAllocator {
    /// Construct an allocator and reserve its initial region.
    ///
    /// `initial_size` is raised to at least one largest-class buffer and
    /// rounded to a whole number of largest-class buffers. The registrar is
    /// invoked once for the initial region before this returns.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidNode`] if `numa_node` does not exist;
    /// [`AllocError::OutOfMemory`] if the initial reservation cannot be
    /// satisfied; [`AllocError::Registration`] if the registrar rejects the
    /// initial region.
    ///
    /// # Panics
    ///
    /// SHM permission or size-limit misconfiguration, attach failure, and
    /// NUMA binding failure terminate the process (see [`crate::error`]).
    pub fn new(
        initial_size: usize,
        numa_node: usize,
        registrar: Box<dyn MemRegistrar>,
    ) -> Result<Self> {
        let topology = NumaTopology::detect();
        if numa_node >= MAX_NUMA_NODES || numa_node >= topology.num_nodes() {
            return Err(AllocError::InvalidNode {
                node: numa_node,
                available: topology.num_nodes(),
            });
        }
        topology.log();

        let initial = round_up(initial_size.max(MAX_CLASS_SIZE), MAX_CLASS_SIZE);
        let mut allocator = Self {
            engine: BuddyEngine::new(),
            regions: Vec::new(),
            registrar,
            rng: SmallRng::from_entropy(),
            numa_node,
            prev_reservation: initial,
            stats: AllocStats::default(),
        };
        allocator.grow(initial)?;
        Ok(allocator)
    }

    /// Allocate a buffer of at least `size` bytes from the free-lists,
    /// reserving another region when they run dry.
    ///
    /// The returned buffer's capacity is the class size, the smallest
    /// power of two that covers `size`.
    ///
    /// # Errors
    ///
    /// [`AllocError::ZeroSize`] and [`AllocError::SizeTooLarge`] are
    /// rejected without attempting growth. [`AllocError::OutOfMemory`] means
    /// the growth reservation failed; existing capacity is untouched and the
    /// caller may free buffers and retry.
    pub fn alloc(&mut self, size: usize) -> Result<Buffer> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        if size > MAX_CLASS_SIZE {
            return Err(AllocError::SizeTooLarge {
                size,
                max: MAX_CLASS_SIZE,
            });
        }

        let target = class_of(size);
        if let Some(buffer) = self.engine.alloc(target) {
            self.stats.user_alloc_tot += buffer.class_size();
            return Ok(buffer);
        }

        // Free-lists are dry at and above the target class. Reserve double
        // the previous amount; the new region seeds the largest class.
        let want = round_up(
            self.prev_reservation.saturating_mul(2).max(size),
            MAX_CLASS_SIZE,
        );
        self.grow(want)?;
        self.prev_reservation = want;

        let buffer = self
            .engine
            .alloc(target)
            .ok_or(AllocError::OutOfMemory {
                requested: size,
                node: self.numa_node,
            })?;
        self.stats.user_alloc_tot += buffer.class_size();
        Ok(buffer)
    }

    /// Return a buffer to its class free-list. Constant time, no coalescing.
    pub fn free(&mut self, buffer: Buffer) {
        self.stats.user_alloc_tot = self.stats.user_alloc_tot.saturating_sub(buffer.class_size());
        self.engine.free(buffer);
    }

    /// Ensure at least `num_buffers` free buffers of the class covering
    /// `size`, so that many subsequent `alloc` calls of that size hit
    /// without splitting or reservation.
    ///
    /// A free-list already at or above `num_buffers` means there is nothing
    /// to do, which makes the call idempotent.
    ///
    /// # Errors
    ///
    /// Size validation as in [`alloc`](Self::alloc). On
    /// [`AllocError::OutOfMemory`] mid-fill, the buffers staged so far are
    /// returned to the free-lists before the error surfaces.
    pub fn create_cache(&mut self, size: usize, num_buffers: usize) -> Result<()> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        if size > MAX_CLASS_SIZE {
            return Err(AllocError::SizeTooLarge {
                size,
                max: MAX_CLASS_SIZE,
            });
        }

        let class = class_of(size);
        let deficit = num_buffers.saturating_sub(self.engine.free_len(class));
        if deficit == 0 {
            return Ok(());
        }

        // Allocate the deficit, then free everything: the frees leave the
        // buffers parked on the target class free-list.
        let mut staged = Vec::with_capacity(deficit);
        for _ in 0..deficit {
            match self.alloc(size) {
                Ok(buffer) => staged.push(buffer),
                Err(err) => {
                    for buffer in staged {
                        self.free(buffer);
                    }
                    return Err(err);
                }
            }
        }
        for buffer in staged {
            self.free(buffer);
        }
        Ok(())
    }

    /// Reserve a dedicated registered region outside the free-lists.
    ///
    /// For contiguous ranges larger than the largest size class, e.g.
    /// transport ring buffers. The range is sized up to whole hugepages and
    /// lives until the allocator is dropped; it counts toward
    /// `shm_reserved` but not toward `user_alloc_tot`.
    ///
    /// # Errors
    ///
    /// [`AllocError::ZeroSize`], [`AllocError::OutOfMemory`],
    /// [`AllocError::Registration`] as in [`alloc`](Self::alloc).
    pub fn alloc_raw(&mut self, size: usize) -> Result<RawMem> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }

        let shm_region =
            region::reserve(size, self.numa_node, &mut self.rng, self.registrar.as_mut())?;
        self.stats.shm_reserved += shm_region.len;
        let raw = RawMem::new(shm_region.base, shm_region.len, shm_region.reg.lkey);
        self.regions.push(shm_region);
        Ok(raw)
    }

    /// Reserve a region of exactly `size` bytes (already rounded) and seed
    /// the largest class with its buffers.
    fn grow(&mut self, size: usize) -> Result<()> {
        debug_assert_eq!(size % MAX_CLASS_SIZE, 0);

        let shm_region =
            region::reserve(size, self.numa_node, &mut self.rng, self.registrar.as_mut())?;
        self.stats.shm_reserved += shm_region.len;
        self.engine
            .seed_region(shm_region.base, shm_region.len, shm_region.reg.lkey);
        self.regions.push(shm_region);
        Ok(())
    }

    /// The NUMA node all memory is bound to.
    #[must_use]
    pub fn numa_node(&self) -> usize {
        self.numa_node
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> AllocStats {
        self.stats
    }

    /// Total bytes reserved from the OS. Monotonic non-decreasing.
    #[must_use]
    pub fn stat_shm_reserved(&self) -> usize {
        self.stats.shm_reserved
    }

    /// Bytes currently allocated to callers, in class-size units.
    #[must_use]
    pub fn stat_user_alloc_tot(&self) -> usize {
        self.stats.user_alloc_tot
    }

    /// Number of free buffers in size class `class`.
    #[must_use]
    pub fn class_free_len(&self, class: usize) -> usize {
        self.engine.free_len(class)
    }

    /// Human-readable dump of counters, regions, and free-list occupancy.
    #[must_use]
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = String::new();
        let _ = writeln!(s, "hugepage allocator stats:");
        let _ = writeln!(
            s,
            "  total reserved SHM = {} bytes ({})",
            self.stats.shm_reserved,
            fmt_bytes(self.stats.shm_reserved)
        );
        let _ = writeln!(
            s,
            "  allocated to user = {} bytes ({})",
            self.stats.user_alloc_tot,
            fmt_bytes(self.stats.user_alloc_tot)
        );
        let _ = writeln!(s, "  {} SHM region(s)", self.regions.len());
        for (i, shm_region) in self.regions.iter().enumerate() {
            let _ = writeln!(s, "    region {i}: {}", fmt_bytes(shm_region.len));
        }
        let _ = writeln!(s, "  size classes:");
        for class in 0..NUM_CLASSES {
            let _ = writeln!(
                s,
                "    {:>6}: {} buffers",
                fmt_bytes(class_size(class)),
                self.engine.free_len(class)
            );
        }
        s
    }

    /// Write [`summary`](Self::summary) to the diagnostic stream.
    pub fn print_stats(&self) {
        eprint!("{}", self.summary());
    }
}

impl Drop for HugeAllocator {
    /// Deregister and remove every region, in insertion order.
    fn drop(&mut self) {
        for shm_region in std::mem::take(&mut self.regions) {
            self.registrar.deregister(shm_region.reg);
            region::destroy(&shm_region);
        }
    }
}

impl std::fmt::Debug for HugeAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HugeAllocator")
            .field("numa_node", &self.numa_node)
            .field("regions", &self.regions.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::NoopRegistrar;

    #[test]
    fn test_invalid_node_rejected() {
        // Node validation happens before any OS reservation.
        let result = HugeAllocator::new(8 << 20, 9999, Box::new(NoopRegistrar));
        assert!(matches!(
            result,
            Err(AllocError::InvalidNode { node: 9999, .. })
        ));
    }
}
