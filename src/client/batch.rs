//! Batch Aggregator
//!
//! Groups a window of operations by destination shard so each shard gets one call.

use std::collections::BTreeMap;

use crate::client::KeyRouter;
use crate::models::Operation;
use crate::workload::Workload;

/// The slice of a window bound for one shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardBatch {
    pub shard: usize,
    /// Position of each op in the original window
    pub positions: Vec<usize>,
    /// Ops in submission order
    pub ops: Vec<Operation>,
}

// == Batch Aggregator ==
#[derive(Debug, Clone, Copy)]
pub struct BatchAggregator {
    router: KeyRouter,
    batch_size: usize,
}

impl BatchAggregator {
    pub fn new(router: KeyRouter, batch_size: usize) -> Self {
        Self {
            router,
            batch_size: batch_size.max(1),
        }
    }

    pub fn router(&self) -> &KeyRouter {
        &self.router
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    // == Fill Window ==
    /// Pulls `batch_size` operations from `workload`; writes carry `value`.
    pub fn fill_window(&self, workload: &mut dyn Workload, value: &str) -> Vec<Operation> {
        (0..self.batch_size)
            .map(|_| {
                let op = workload.next();
                let key = op.key.to_string();
                if op.is_read {
                    Operation::get(key)
                } else {
                    Operation::put(key, value)
                }
            })
            .collect()
    }

    // == Partition ==
    /// Splits a window by shard.
    ///
    /// Within a shard, ops keep their submission order. Batches come back ordered by
    /// shard index.
    pub fn partition(&self, ops: Vec<Operation>) -> Vec<ShardBatch> {
        self.partition_indexed(ops.into_iter().enumerate())
    }

    /// Like [`partition`](Self::partition) for ops already tagged with their window position.
    pub fn partition_indexed(
        &self,
        ops: impl IntoIterator<Item = (usize, Operation)>,
    ) -> Vec<ShardBatch> {
        let mut by_shard: BTreeMap<usize, ShardBatch> = BTreeMap::new();

        for (position, op) in ops {
            let shard = self.router.route(&op.key);
            let batch = by_shard.entry(shard).or_insert_with(|| ShardBatch {
                shard,
                positions: Vec::new(),
                ops: Vec::new(),
            });
            batch.positions.push(position);
            batch.ops.push(op);
        }

        by_shard.into_values().collect()
    }
}
