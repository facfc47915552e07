
use crate::{config::GlobalConfig, estimator::EstimatedRecord};
use itertools::Itertools;
use serde::Serialize;
use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashSet},
    fmt,
};
use thiserror::Error;
use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Too few accessions to balance: {count} found, at least {minimum} required")]
    InsufficientWorkload { count: usize, minimum: usize },
    #[error("Internal invariant violated: node {0} received no accessions")]
    EmptyPartition(NodeId),
    #[error("Internal invariant violated: {assigned} accessions assigned for {expected} inputs")]
    Misassigned { assigned: usize, expected: usize },
}

/// Index of a compute node, stable from partitioning through emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accessions assigned to a single node, in assignment order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub node: NodeId,
    pub records: Vec<EstimatedRecord>,
}

impl Partition {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// cumulative estimated size
    pub fn load(&self) -> u64 {
        self.records
            .iter()
            .fold(0u64, |acc, record| acc.saturating_add(record.estimated_size))
    }

    pub fn accession_ids(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .map(|record| record.accession_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub partitions: Vec<Partition>,
    pub disk_ceiling: u64,
}

impl PartitionPlan {
    pub fn node_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn max_load(&self) -> u64 {
        self.partitions.iter().map(Partition::load).max().unwrap_or(0)
    }
}

/// Heap entry for a node, the smallest load pops first
#[derive(Debug, PartialEq, Eq)]
struct NodeLoad {
    load: u64,
    assigned: usize,
    node: usize,
}

impl Ord for NodeLoad {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so the max-heap yields the least loaded node, then the lowest
        // index; an empty node wins a tie at zero load
        (other.load, other.assigned > 0, other.node).cmp(&(self.load, self.assigned > 0, self.node))
    }
}

impl PartialOrd for NodeLoad {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Longest-processing-time-first assignment onto `node_count` nodes.
///
/// Records are taken largest first (ties by accession id so the result does
/// not depend on input order) and each goes to the node with the smallest
/// cumulative estimated size, ties going to the lowest node index. Zero sized
/// records still fill empty nodes first, so no partition is left empty.
pub fn assign_greedy(mut records: Vec<EstimatedRecord>, node_count: usize) -> Vec<Partition> {
    let mut partitions = (0..node_count).map(|node| Partition::new(NodeId(node))).collect_vec();

    if node_count == 0 {
        return partitions;
    }

    records.sort_by(|a, b| {
        Reverse(a.estimated_size)
            .cmp(&Reverse(b.estimated_size))
            .then_with(|| a.accession_id.cmp(&b.accession_id))
    });

    let mut heap: BinaryHeap<NodeLoad> = (0..node_count)
        .map(|node| NodeLoad {
            load: 0,
            assigned: 0,
            node,
        })
        .collect();

    for record in records {
        // the heap is never empty, every popped node is pushed back
        let Some(mut next) = heap.pop() else {
            break;
        };

        trace!(
            accession = %record.accession_id,
            estimated = record.estimated_size,
            node = next.node,
            "Assigning accession"
        );

        next.load = next.load.saturating_add(record.estimated_size);
        next.assigned += 1;
        partitions[next.node].records.push(record);
        heap.push(next);
    }

    partitions
}

/// Number of nodes so that each stays under the disk ceiling, without
/// requesting more nodes than there are accessions
pub fn node_count(total_estimated: u64, accession_count: usize, config: &GlobalConfig) -> usize {
    let ceiling = config.disk_ceiling_per_node.max(1);
    let by_disk = total_estimated / ceiling + u64::from(total_estimated % ceiling != 0);
    let by_disk = usize::try_from(by_disk.max(1)).unwrap_or(usize::MAX);

    let count = by_disk.min(accession_count);

    match config.max_nodes {
        Some(cap) => count.min(cap.max(1)),
        None => count,
    }
}

#[derive(Debug, Clone)]
pub struct NodePartitioner {
    config: GlobalConfig,
}

impl NodePartitioner {
    pub fn new(config: GlobalConfig) -> Self {
        Self { config }
    }

    /// Split the estimated catalog into one partition per node
    #[instrument(skip_all, level = "info", fields(accessions = records.len()))]
    pub fn partition(&self, records: Vec<EstimatedRecord>) -> Result<PartitionPlan, PartitionError> {
        let count = records.len();
        let minimum = self.config.minimum_submissions_for_balancing;

        if count < minimum {
            warn!("Too few accessions to balance ({count} < {minimum})");

            return Err(PartitionError::InsufficientWorkload { count, minimum });
        }

        let ceiling = self.config.disk_ceiling_per_node;
        let total = records
            .iter()
            .fold(0u64, |acc, record| acc.saturating_add(record.estimated_size));
        let nodes = node_count(total, count, &self.config);

        info!(
            nodes,
            total_estimated = total,
            disk_ceiling = ceiling,
            "Determined node count"
        );

        if let Some(cap) = self.config.max_nodes {
            if nodes > 0 && nodes == cap && total / (nodes as u64) > ceiling {
                warn!(
                    max_nodes = cap,
                    "Node cap forces an average load of {} above the disk ceiling",
                    total / (nodes as u64)
                );
            }
        }

        for record in records.iter().filter(|record| record.estimated_size > ceiling) {
            warn!(
                accession = %record.accession_id,
                estimated = record.estimated_size,
                "Accession alone exceeds the disk ceiling, its node will go over budget"
            );
        }

        let partitions = assign_greedy(records, nodes);
        self.verify(&partitions, count)?;

        for partition in partitions.iter() {
            debug!(
                node = partition.node.0,
                accessions = partition.len(),
                load = partition.load(),
                "Partition summary"
            );
        }

        let plan = PartitionPlan {
            partitions,
            disk_ceiling: ceiling,
        };
        info!(max_load = plan.max_load(), "Partitioning finished");

        Ok(plan)
    }

    /// every accession lands exactly once and no node is left empty
    fn verify(&self, partitions: &[Partition], expected: usize) -> Result<(), PartitionError> {
        if let Some(empty) = partitions.iter().find(|partition| partition.is_empty()) {
            error!(node = empty.node.0, "Partition came out empty");

            return Err(PartitionError::EmptyPartition(empty.node));
        }

        let assigned = partitions.iter().map(Partition::len).sum::<usize>();
        let unique = partitions
            .iter()
            .flat_map(Partition::accession_ids)
            .collect::<HashSet<_>>()
            .len();

        if assigned != expected || unique != expected {
            error!(assigned, unique, expected, "Accessions were lost or duplicated");

            return Err(PartitionError::Misassigned { assigned, expected });
        }

        Ok(())
    }
}
