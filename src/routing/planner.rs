//! Shortest-path planning over the waypoint graph.

use std::{cmp::Ordering, collections::BinaryHeap};

use log::debug;

use crate::{geometry::Point, routing::graph::RouteGraph};

#[derive(Debug, PartialEq)]
struct QueueEntry {
    cost: f64,
    node: usize,
}

impl Eq for QueueEntry {}

// BinaryHeap is a max-heap; reverse the cost ordering to pop the cheapest
// tentative node first. Costs are finite sums of edge weights, never NaN.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Waypoints from the node nearest `start` to the resolved destination,
/// ordered start to end. Unknown or unreachable destinations yield an
/// empty path.
pub fn shortest_path(graph: &RouteGraph, start: Point, target: &str) -> Vec<Point> {
    let Some(end) = graph.resolve_target(target) else {
        debug!("route target '{target}' did not resolve");
        return Vec::new();
    };
    let origin = graph.nearest_node(start);

    let mut distances = vec![f64::INFINITY; graph.node_count()];
    let mut previous: Vec<Option<usize>> = vec![None; graph.node_count()];
    let mut heap = BinaryHeap::new();

    distances[origin] = 0.0;
    heap.push(QueueEntry {
        cost: 0.0,
        node: origin,
    });

    while let Some(QueueEntry { cost, node }) = heap.pop() {
        if node == end {
            break;
        }
        if cost > distances[node] {
            continue;
        }

        for &(neighbor, weight) in graph.neighbors(node) {
            let next_cost = cost + weight;
            if next_cost < distances[neighbor] {
                distances[neighbor] = next_cost;
                previous[neighbor] = Some(node);
                heap.push(QueueEntry {
                    cost: next_cost,
                    node: neighbor,
                });
            }
        }
    }

    if distances[end].is_infinite() {
        debug!(
            "no path from {} to {}",
            graph.node(origin).id,
            graph.node(end).id
        );
        return Vec::new();
    }

    let mut order = Vec::new();
    let mut cursor = Some(end);
    while let Some(node) = cursor {
        order.push(node);
        cursor = previous[node];
    }
    order.reverse();

    order
        .into_iter()
        .map(|node| graph.node(node).location())
        .collect()
}
