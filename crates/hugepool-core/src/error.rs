//! Error types for the recoverable channel.
//!
//! Misconfiguration faults (permissions, SHM size limits, attach and NUMA
//! binding failures, teardown failures) are not represented here: they
//! terminate the process with a diagnostic, because continuing would leak
//! pinned memory or hand out wrong-NUMA buffers.

/// Errors a caller can act on.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    /// The OS has no more hugepages to give. The caller may free working set
    /// and retry; existing capacity is unaffected.
    #[error("insufficient hugepage memory: failed to reserve {requested} bytes on NUMA node {node}")]
    OutOfMemory {
        /// Bytes the failed reservation asked for
        requested: usize,
        /// The allocator's NUMA node
        node: usize,
    },

    /// The request exceeds the largest size class. Growth is not attempted.
    #[error("allocation of {size} bytes exceeds the largest size class ({max} bytes)")]
    SizeTooLarge {
        /// Requested size
        size: usize,
        /// Largest satisfiable size
        max: usize,
    },

    /// Zero-sized allocations are rejected.
    #[error("allocation size must be non-zero")]
    ZeroSize,

    /// The configured NUMA node does not exist on this system.
    #[error("invalid NUMA node {node}: system has {available} node(s)")]
    InvalidNode {
        /// The requested node
        node: usize,
        /// Number of detected nodes
        available: usize,
    },

    /// The memory-registration callback rejected a freshly reserved region.
    /// The region has already been detached and removed when this surfaces.
    #[error("memory registration failed: {0}")]
    Registration(#[source] Box<dyn std::error::Error + Send + Sync>),
}
