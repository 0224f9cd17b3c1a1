//! The memory-registration capability.
//!
//! DMA-capable transports (RDMA NICs, DPDK ports) must register a memory
//! range before submitting I/O against it. The allocator calls the
//! capability once per region, right after NUMA binding, and once more at
//! teardown. Registration is tied to the region's lifetime: it is never
//! retried and never re-established.

use std::ptr::NonNull;

/// Error type produced by a registrar; propagated to the caller unchanged.
pub type RegistrationError = Box<dyn std::error::Error + Send + Sync>;

/// Registration record for one region.
///
/// Stable for the lifetime of the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRegInfo {
    /// Transport-owned registration handle, opaque to the allocator.
    pub handle: u64,
    /// Local access key quoted on every I/O submission touching the region.
    pub lkey: u32,
}

/// Capability object supplied at allocator construction.
///
/// Moves into the allocator and lives exactly as long as it does. The
/// allocator guarantees `register` and `deregister` are called once each per
/// region, in region insertion order at teardown.
pub trait MemRegistrar {
    /// Register `len` bytes starting at `base`.
    ///
    /// Called once per region immediately after the region is bound to its
    /// NUMA node and zeroed.
    ///
    /// # Errors
    ///
    /// Any error is propagated to the allocator's caller unchanged; the
    /// region is detached and removed first, so a failed registration leaks
    /// nothing.
    fn register(&mut self, base: NonNull<u8>, len: usize)
        -> Result<MemRegInfo, RegistrationError>;

    /// Release the registration of one region at teardown. Must not fail.
    fn deregister(&mut self, reg: MemRegInfo);
}

/// Registrar for loopback transports with no DMA engine.
///
/// Hands out `lkey` 0 for every region and ignores deregistration.
///
/// # Example
///
/// ```
/// use std::ptr::NonNull;
/// use hugepool_core::{MemRegistrar, NoopRegistrar};
///
/// let mut registrar = NoopRegistrar;
/// let base = NonNull::new(0x1000 as *mut u8).unwrap();
///
/// let reg = registrar.register(base, 4096).unwrap();
/// assert_eq!(reg.lkey, 0);
/// registrar.deregister(reg);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistrar;

impl MemRegistrar for NoopRegistrar {
    fn register(
        &mut self,
        _base: NonNull<u8>,
        _len: usize,
    ) -> Result<MemRegInfo, RegistrationError> {
        Ok(MemRegInfo { handle: 0, lkey: 0 })
    }

    fn deregister(&mut self, _reg: MemRegInfo) {}
}
