use super::{NodeRequest, ResourceBoundsError, ResourceRequestBuilder};
use crate::{
    catalog::AccessionRecord,
    config::GlobalConfig,
    estimator::EstimatedRecord,
    partition::{NodeId, Partition},
    size::GB,
};

fn config(cpu_per_node: u32, max_cpu_request: u32) -> GlobalConfig {
    GlobalConfig {
        cpu_per_node,
        max_cpu_request,
        minimum_submissions_for_balancing: 1,
        disk_ceiling_per_node: 100 * GB,
        max_nodes: None,
        memory_request: Some(8),
    }
}

fn partition(node: usize, raw_sizes: &[u64]) -> Partition {
    Partition {
        node: NodeId(node),
        records: raw_sizes
            .iter()
            .enumerate()
            .map(|(index, size)| {
                EstimatedRecord::from(AccessionRecord::new(format!("SRR{node}{index:03}"), *size))
            })
            .collect(),
    }
}

#[test]
pub fn busiest_node_keeps_full_cpu() {
    let requests = ResourceRequestBuilder::new(config(8, 16))
        .build(&[partition(0, &[1, 1, 1, 1]), partition(1, &[1, 1, 1, 1])])
        .unwrap();

    assert!(requests.iter().all(|request| request.cpu_request == 8));
}

#[test]
pub fn light_nodes_scale_down_with_floor() {
    let requests = ResourceRequestBuilder::new(config(8, 16))
        .build(&[
            partition(0, &[1, 1, 1, 1]),
            partition(1, &[1, 1, 1]),
            partition(2, &[1]),
        ])
        .unwrap();

    // 8 * 3 / 4 = 6, 8 * 1 / 4 = 2
    assert_eq!(
        requests.iter().map(|request| request.cpu_request).collect::<Vec<_>>(),
        [8, 6, 2]
    );
}

#[test]
pub fn cpu_never_drops_below_one() {
    let requests = ResourceRequestBuilder::new(config(2, 2))
        .build(&[partition(0, &[1; 10]), partition(1, &[1])])
        .unwrap();

    assert_eq!(requests[1].cpu_request, 1);
}

#[test]
pub fn disk_request_is_exact_estimated_sum() {
    let requests = ResourceRequestBuilder::new(config(4, 4))
        .build(&[partition(0, &[3, 5]), partition(1, &[GB])])
        .unwrap();

    assert_eq!(requests[0].disk_request_bytes, 160);
    assert_eq!(requests[1].disk_request_bytes, 20 * GB);
    assert_eq!(requests[0].memory_request, Some(8));
    assert_eq!(requests[0].node, NodeId(0));
    assert_eq!(requests[1].node, NodeId(1));
}

#[test]
pub fn disk_request_rounds_up_to_whole_gb() {
    let request = |disk_request_bytes| NodeRequest {
        node: NodeId(0),
        cpu_request: 1,
        disk_request_bytes,
        memory_request: None,
    };

    assert_eq!(request(0).disk_request_gb(), 0);
    assert_eq!(request(GB).disk_request_gb(), 1);
    assert_eq!(request(GB + 1).disk_request_gb(), 2);
}

#[test]
pub fn misconfigured_cap_is_a_bounds_error() {
    let result = ResourceRequestBuilder::new(config(8, 4)).build(&[partition(0, &[1])]);

    assert_eq!(
        result,
        Err(ResourceBoundsError {
            node: NodeId(0),
            cpu_request: 8,
            max_cpu_request: 4
        })
    );
}
