//! Hugepage-backed shared-memory regions.
//!
//! Each region is one System V segment created with `SHM_HUGETLB`, attached,
//! strictly bound to the allocator's NUMA node, zeroed, and registered with
//! the transport before it is recorded. Regions are append-only: once
//! reserved they live until allocator teardown.

use std::io;
use std::ptr::NonNull;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::classes::{round_up, HUGEPAGE_SIZE};
use crate::error::AllocError;
use crate::numa;
use crate::registration::{MemRegInfo, MemRegistrar};
use crate::Result;

/// One reserved, registered shared-memory region.
pub(crate) struct ShmRegion {
    /// System V key used to look the segment up again at teardown.
    pub(crate) key: i32,
    /// Attach address.
    pub(crate) base: NonNull<u8>,
    /// Reserved bytes, a whole number of hugepages.
    pub(crate) len: usize,
    /// Registration record handed back at deregistration.
    pub(crate) reg: MemRegInfo,
}

/// Reserve `size` bytes (rounded up to whole hugepages) on `numa_node`.
///
/// Runs the full preparation pipeline: key draw with collision retry,
/// segment creation, attach, strict NUMA bind, zeroing, registration. The
/// region is not recorded anywhere yet; the caller owns the returned record.
///
/// # Errors
///
/// [`AllocError::OutOfMemory`] when the hugepage pool cannot cover the
/// request; [`AllocError::Registration`] when the registrar rejects the
/// range (the segment is detached and removed first).
///
/// # Panics
///
/// Permission errors, SHM size-limit errors, attach failures, and NUMA
/// binding failures are system misconfiguration and terminate the process
/// with a diagnostic naming the SHM key and size.
pub(crate) fn reserve(
    size: usize,
    numa_node: usize,
    rng: &mut SmallRng,
    registrar: &mut dyn MemRegistrar,
) -> Result<ShmRegion> {
    let len = round_up(size, HUGEPAGE_SIZE);

    let (key, shm_id) = loop {
        // Positive 31-bit key; zero is IPC_PRIVATE and never usable.
        let key = (rng.gen::<u32>() & 0x7fff_ffff) as i32;
        if key == 0 {
            continue;
        }

        let shm_id = unsafe {
            libc::shmget(
                key,
                len,
                libc::IPC_CREAT | libc::IPC_EXCL | libc::SHM_HUGETLB | 0o666,
            )
        };
        if shm_id != -1 {
            break (key, shm_id);
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            // Key collision, draw again.
            Some(libc::EEXIST) => {}
            Some(libc::EACCES) => {
                panic!("hugepage reservation failed: insufficient permissions (SHM key {key})");
            }
            Some(libc::EINVAL) => {
                panic!(
                    "hugepage reservation failed: size {len} bytes violates SHMMAX/SHMMIN \
                     limits (SHM key {key})"
                );
            }
            Some(libc::ENOMEM) => {
                tracing::warn!(
                    bytes = len,
                    node = numa_node,
                    "insufficient hugepages, cannot reserve"
                );
                return Err(AllocError::OutOfMemory {
                    requested: len,
                    node: numa_node,
                });
            }
            _ => panic!("hugepage reservation failed: {err} (SHM key {key})"),
        }
    };

    let raw = unsafe { libc::shmat(shm_id, std::ptr::null(), 0) };
    assert!(
        raw as isize != -1,
        "shmat failed for SHM key {key}: {}",
        io::Error::last_os_error()
    );
    let Some(base) = NonNull::new(raw.cast::<u8>()) else {
        panic!("shmat returned a null mapping for SHM key {key}");
    };

    if let Err(err) = numa::bind_strict(base, len, numa_node) {
        panic!("mbind to NUMA node {numa_node} failed for SHM key {key}: {err}");
    }

    // SAFETY: the range was just attached with read/write access.
    unsafe { std::ptr::write_bytes(base.as_ptr(), 0, len) };

    let reg = match registrar.register(base, len) {
        Ok(reg) => reg,
        Err(err) => {
            // The segment is not recorded yet; remove it before the error
            // escapes so a rejected registration leaks nothing.
            unsafe {
                libc::shmctl(shm_id, libc::IPC_RMID, std::ptr::null_mut());
                libc::shmdt(base.as_ptr().cast());
            }
            return Err(AllocError::Registration(err));
        }
    };

    tracing::info!(
        key,
        bytes = len,
        node = numa_node,
        lkey = reg.lkey,
        "reserved hugepage region"
    );

    Ok(ShmRegion {
        key,
        base,
        len,
        reg,
    })
}

/// Remove one region's segment at teardown.
///
/// Best-effort is not acceptable here: a region that cannot be removed is a
/// leaked pinned hugepage range, so every failure aborts the process after
/// an operator-visible diagnostic.
pub(crate) fn destroy(region: &ShmRegion) {
    let key = region.key;

    let shm_id = unsafe { libc::shmget(key, 0, 0) };
    if shm_id == -1 {
        teardown_abort(key, "lookup", &io::Error::last_os_error());
    }

    if unsafe { libc::shmctl(shm_id, libc::IPC_RMID, std::ptr::null_mut()) } != 0 {
        teardown_abort(key, "remove", &io::Error::last_os_error());
    }

    if unsafe { libc::shmdt(region.base.as_ptr().cast()) } != 0 {
        teardown_abort(key, "detach", &io::Error::last_os_error());
    }
}

fn teardown_abort(key: i32, step: &str, err: &io::Error) -> ! {
    eprintln!("hugepool: SHM {step} failed at teardown for key {key}: {err}");
    tracing::error!(key, step, %err, "SHM teardown failed");
    std::process::abort();
}
