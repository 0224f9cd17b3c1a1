//! # NUMA Topology Probe
//!
//! Detects the system's NUMA nodes and their 2 MB hugepage pools from sysfs
//! (`/sys/devices/system/node/`), falling back to a single-node view when
//! sysfs is unavailable. The allocator uses the probe to validate its
//! configured node at construction and to log hugepage headroom.

use std::fs;
use std::path::Path;

/// Hugepage pool counters for one NUMA node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HugepageCounters {
    /// Total 2 MB hugepages configured on the node.
    pub total: usize,
    /// Currently unallocated 2 MB hugepages on the node.
    pub free: usize,
}

/// NUMA node inventory with per-node hugepage counters.
#[derive(Debug, Clone)]
pub struct NumaTopology {
    num_nodes: usize,
    hugepages: Vec<HugepageCounters>,
}

impl NumaTopology {
    /// Detect the system's NUMA topology.
    ///
    /// Never fails: falls back to a single node with zeroed counters when
    /// sysfs cannot be read.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_sysfs().unwrap_or_else(Self::single_node_fallback)
    }

    /// Read node directories and hugepage counters from sysfs.
    fn detect_sysfs() -> Option<Self> {
        let node_path = Path::new("/sys/devices/system/node");

        let mut node_ids: Vec<usize> = Vec::new();
        for entry in fs::read_dir(node_path).ok()? {
            let entry = entry.ok()?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_prefix("node") {
                if let Ok(id) = id.parse::<usize>() {
                    node_ids.push(id);
                }
            }
        }

        if node_ids.is_empty() {
            return None;
        }

        let num_nodes = node_ids.iter().max().map_or(1, |m| m + 1);
        let mut hugepages = vec![HugepageCounters::default(); num_nodes];

        for id in node_ids {
            let pool = node_path.join(format!("node{id}/hugepages/hugepages-2048kB"));
            hugepages[id] = HugepageCounters {
                total: read_count(&pool.join("nr_hugepages")),
                free: read_count(&pool.join("free_hugepages")),
            };
        }

        Some(Self {
            num_nodes,
            hugepages,
        })
    }

    fn single_node_fallback() -> Self {
        Self {
            num_nodes: 1,
            hugepages: vec![HugepageCounters::default()],
        }
    }

    /// Number of NUMA nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Hugepage counters for `node`; zeroed counters if the node is invalid.
    #[must_use]
    pub fn hugepages(&self, node: usize) -> HugepageCounters {
        self.hugepages.get(node).copied().unwrap_or_default()
    }

    /// Log the detected topology.
    pub fn log(&self) {
        tracing::info!("NUMA topology: {} node(s)", self.num_nodes);
        for node in 0..self.num_nodes {
            let hp = self.hugepages(node);
            tracing::info!(
                "  node {}: {} free / {} total 2MB hugepages",
                node,
                hp.free,
                hp.total
            );
        }
    }

    /// One-line summary of the topology.
    #[must_use]
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = format!("{} node(s)", self.num_nodes);
        for node in 0..self.num_nodes {
            let hp = self.hugepages(node);
            let _ = write!(s, ", node{node}: {}/{} hugepages free", hp.free, hp.total);
        }
        s
    }
}

/// Read a sysfs counter file; 0 when missing or malformed.
fn read_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        let topo = NumaTopology::detect();
        assert!(topo.num_nodes() >= 1);
    }

    #[test]
    fn test_invalid_node_counters() {
        let topo = NumaTopology::detect();
        assert_eq!(topo.hugepages(9999), HugepageCounters::default());
    }

    #[test]
    fn test_summary() {
        let topo = NumaTopology::detect();
        let summary = topo.summary();
        assert!(summary.contains("node"));
        assert!(summary.contains("hugepages"));
    }

    #[test]
    fn test_read_count_missing_file() {
        assert_eq!(read_count(Path::new("/nonexistent/counter")), 0);
    }

    #[test]
    fn test_single_node_fallback() {
        let topo = NumaTopology::single_node_fallback();
        assert_eq!(topo.num_nodes(), 1);
        assert_eq!(topo.hugepages(0), HugepageCounters::default());
    }
}
