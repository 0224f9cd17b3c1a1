//! # `hugepool` Core
//!
//! A NUMA-aware hugepage allocator, the memory backbone for a
//! microsecond-class RPC runtime.
//!
//! This crate provides:
//! - **Region reservation**: hugepage-backed System V shared-memory regions,
//!   strictly bound to one NUMA node
//! - **Buddy free-lists**: power-of-two size classes from 64 B to 8 MB,
//!   split on demand, never coalesced
//! - **DMA registration**: every region is registered through a caller-supplied
//!   [`MemRegistrar`] capability, and every [`Buffer`] carries the resulting
//!   `lkey`
//! - **On-demand growth**: reservation size doubles on each allocation miss
//!
//! ## Design Principles
//!
//! 1. **Single owner** - no internal locks; the allocator takes `&mut self`
//!    everywhere and expects one instance per transport thread
//! 2. **Constant-time steady state** - `alloc`/`free` touch only in-process
//!    free-lists; the OS is involved only when capacity grows
//! 3. **Fixed locality** - buffers never migrate; a buffer is bound to the
//!    NUMA node configured at construction for its whole life
//!
//! ## Example
//!
//! ```rust,ignore
//! use hugepool_core::{HugeAllocator, NoopRegistrar};
//!
//! let mut pool = HugeAllocator::new(8 << 20, 0, Box::new(NoopRegistrar))?;
//! let buf = pool.alloc(4096)?;
//! // hand (buf.as_ptr(), buf.lkey()) to the transport ...
//! pool.free(buf);
//! ```
//!
//! ## Platform Support
//!
//! Linux only. The allocator requires `SHM_HUGETLB`-capable System V shared
//! memory and the `mbind` syscall; it does not tolerate non-hugepage backing.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Region memory is handed out as raw pointers shared with the transport.
#![allow(unsafe_code)]

pub mod allocator;
pub mod buddy;
pub mod buffer;
pub mod classes;
pub mod error;
pub mod numa;
mod region;
pub mod registration;
pub mod stats;

// Re-export key types
pub use allocator::HugeAllocator;
pub use buddy::BuddyEngine;
pub use buffer::{Buffer, RawMem};
pub use classes::{MAX_CLASS_SIZE, MAX_NUMA_NODES, MIN_CLASS_SIZE, NUM_CLASSES};
pub use error::AllocError;
pub use registration::{MemRegInfo, MemRegistrar, NoopRegistrar};
pub use stats::AllocStats;

/// Result type for hugepool-core operations
pub type Result<T> = std::result::Result<T, AllocError>;
