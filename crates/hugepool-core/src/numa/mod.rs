//! # NUMA Binding and Topology
//!
//! Strict NUMA binding for hugepage regions, using the raw `mbind` syscall
//! directly instead of depending on libnuma, plus a sysfs topology probe
//! used to validate the configured node and report hugepage headroom.
//!
//! Binding is strict by contract: `MPOL_BIND` with no fallback node. A
//! buffer on the wrong socket would silently cost 2-3x on every access, so
//! the allocator treats a failed bind as fatal rather than degrading.

mod topology;

pub use topology::{HugepageCounters, NumaTopology};

use std::io;
use std::ptr::NonNull;

/// Bind `[base, base + len)` to `node` with a strict `MPOL_BIND` policy.
///
/// The nodemask is a single 64-bit word; callers have already validated
/// `node` against [`MAX_NUMA_NODES`](crate::classes::MAX_NUMA_NODES).
pub(crate) fn bind_strict(base: NonNull<u8>, len: usize, node: usize) -> io::Result<()> {
    // MPOL_BIND = 2 - strictly bind to the specified nodes
    const MPOL_BIND: i32 = 2;

    let nodemask: u64 = 1u64 << node;

    // SAFETY: mbind is a valid syscall when called with proper arguments;
    // the range was just mapped by shmat and the nodemask outlives the call.
    let result = unsafe {
        libc::syscall(
            libc::SYS_mbind,
            base.as_ptr(),
            len,
            MPOL_BIND,
            &raw const nodemask,
            64usize, // maxnode
            0u32,    // flags
        )
    };

    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
