#[cfg(test)]
mod resources_test;

use crate::{
    config::GlobalConfig,
    partition::{NodeId, Partition},
    size::GB,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("CPU request {cpu_request} for node {node} exceeds max_cpu_request {max_cpu_request}")]
pub struct ResourceBoundsError {
    pub node: NodeId,
    pub cpu_request: u32,
    pub max_cpu_request: u32,
}

/// Resources requested from the scheduler for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRequest {
    pub node: NodeId,
    pub cpu_request: u32,
    pub disk_request_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<u32>,
}

impl NodeRequest {
    /// disk request in whole decimal GB, rounded up so the node never gets less than needed
    pub fn disk_request_gb(&self) -> u64 {
        self.disk_request_bytes / GB + u64::from(self.disk_request_bytes % GB != 0)
    }
}

#[derive(Debug, Clone)]
pub struct ResourceRequestBuilder {
    config: GlobalConfig,
}

impl ResourceRequestBuilder {
    pub fn new(config: GlobalConfig) -> Self {
        Self { config }
    }

    /// CPU for a node holding `accessions` when the busiest node holds `busiest`.
    /// Scales `cpu_per_node` down proportionally (floor), never below 1.
    pub fn scaled_cpu(&self, accessions: usize, busiest: usize) -> u32 {
        let busiest = busiest.max(1) as u64;
        let scaled = u64::from(self.config.cpu_per_node) * accessions as u64 / busiest;

        u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
    }

    /// One request per partition, index aligned
    pub fn build(&self, partitions: &[Partition]) -> Result<Vec<NodeRequest>, ResourceBoundsError> {
        let busiest = partitions.iter().map(Partition::len).max().unwrap_or(0);
        let mut requests = Vec::with_capacity(partitions.len());

        for partition in partitions {
            let cpu_request = self.scaled_cpu(partition.len(), busiest);

            if cpu_request > self.config.max_cpu_request {
                error!(
                    node = partition.node.0,
                    cpu_request,
                    max_cpu_request = self.config.max_cpu_request,
                    "CPU request out of bounds"
                );

                return Err(ResourceBoundsError {
                    node: partition.node,
                    cpu_request,
                    max_cpu_request: self.config.max_cpu_request,
                });
            }

            if cpu_request < self.config.cpu_per_node {
                debug!(
                    node = partition.node.0,
                    accessions = partition.len(),
                    busiest,
                    cpu_request,
                    "Scaled down CPU request for a lightly loaded node"
                );
            }

            requests.push(NodeRequest {
                node: partition.node,
                cpu_request,
                disk_request_bytes: partition.load(),
                memory_request: self.config.memory_request,
            });
        }

        info!(
            nodes = requests.len(),
            cpus = requests.iter().map(|request| u64::from(request.cpu_request)).sum::<u64>(),
            disk_bytes = requests
                .iter()
                .fold(0u64, |acc, request| acc.saturating_add(request.disk_request_bytes)),
            "Built resource requests"
        );

        Ok(requests)
    }
}
