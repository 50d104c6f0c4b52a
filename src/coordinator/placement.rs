//! Round-robin replica placement
//!
//! Block `i` of a file goes to `min(replication_factor, k)` nodes taken from
//! the available list (length `k`) starting at position `i mod k`, so
//! consecutive blocks do not all start on the same node. This spreads
//! primaries but does not guarantee even load when `k` is small.

use crate::common::{Error, Result};
use crate::coordinator::splitter::BlockDescriptor;
use serde::{Deserialize, Serialize};

/// A block together with the nodes chosen to hold its replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPlacement {
    pub block_id: String,
    pub size: u64,
    pub assigned_datanodes: Vec<String>,
}

/// PlacementManager decides which nodes hold each block of a file.
#[derive(Debug, Clone)]
pub struct PlacementManager {
    /// Number of replicas per block
    replication_factor: usize,
}

impl PlacementManager {
    pub fn new(replication_factor: usize) -> Self {
        Self { replication_factor }
    }

    pub fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    /// Select the replica set for the block at `index`.
    pub fn select_nodes(&self, index: usize, nodes: &[String]) -> Result<Vec<String>> {
        if nodes.is_empty() {
            return Err(Error::NoCapacity);
        }
        let k = nodes.len();
        let replicas = self.replication_factor.min(k);
        Ok((0..replicas)
            .map(|r| nodes[(index + r) % k].clone())
            .collect())
    }

    /// Place every block of a file onto `available` nodes.
    pub fn place(
        &self,
        blocks: &[BlockDescriptor],
        available: &[String],
    ) -> Result<Vec<BlockPlacement>> {
        if available.is_empty() {
            return Err(Error::NoCapacity);
        }
        if available.len() < self.replication_factor {
            tracing::warn!(
                available = available.len(),
                replication_factor = self.replication_factor,
                "Fewer live datanodes than the replication factor; blocks will be under-replicated"
            );
        }

        blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                Ok(BlockPlacement {
                    block_id: block.block_id.clone(),
                    size: block.size,
                    assigned_datanodes: self.select_nodes(i, available)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::splitter::split_file;
    use std::collections::HashSet;

    fn nodes(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("dn-{}", i)).collect()
    }

    #[test]
    fn test_round_robin_rotation() {
        let manager = PlacementManager::new(2);
        let available = nodes(3);

        assert_eq!(manager.select_nodes(0, &available).unwrap(), vec!["dn-1", "dn-2"]);
        assert_eq!(manager.select_nodes(1, &available).unwrap(), vec!["dn-2", "dn-3"]);
        assert_eq!(manager.select_nodes(2, &available).unwrap(), vec!["dn-3", "dn-1"]);
        assert_eq!(manager.select_nodes(3, &available).unwrap(), vec!["dn-1", "dn-2"]);
    }

    #[test]
    fn test_replicas_are_distinct_and_available() {
        for k in 1..=6 {
            for r in 1..=6 {
                let manager = PlacementManager::new(r);
                let available = nodes(k);
                let allowed: HashSet<&String> = available.iter().collect();
                let blocks = split_file("f.bin", 100, 9);
                let placed = manager.place(&blocks, &available).unwrap();

                assert_eq!(placed.len(), blocks.len());
                for p in &placed {
                    assert_eq!(p.assigned_datanodes.len(), r.min(k));
                    let distinct: HashSet<&String> = p.assigned_datanodes.iter().collect();
                    assert_eq!(distinct.len(), p.assigned_datanodes.len());
                    assert!(distinct.is_subset(&allowed));
                }
            }
        }
    }

    #[test]
    fn test_no_available_nodes() {
        let manager = PlacementManager::new(2);
        let blocks = split_file("f.bin", 10, 5);
        assert!(matches!(manager.place(&blocks, &[]), Err(Error::NoCapacity)));
        assert!(matches!(manager.select_nodes(0, &[]), Err(Error::NoCapacity)));
    }

    #[test]
    fn test_placement_carries_block_sizes() {
        let manager = PlacementManager::new(1);
        let blocks = split_file("f.bin", 10, 4);
        let placed = manager.place(&blocks, &nodes(2)).unwrap();
        let sizes: Vec<u64> = placed.iter().map(|p| p.size).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(placed[0].block_id, blocks[0].block_id);
    }
}
