use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::graph::Graph;
use super::traits::PricedEdge;
use common::error::Error;

/// A discovered cycle rotated to start at its entry vertex, together with
/// the path that leads into it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedCycle<E> {
    pub cycle: Vec<E>,
    pub enter_path: Vec<E>,
    /// `None` when no vertex of the cycle is reachable from the source; the
    /// cycle is then left in extraction order.
    pub entry: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    distance: f64,
    vertex: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed because BinaryHeap is a max-heap.
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Cheapest approaches from a source currency, measured in summed price.
///
/// Prices are strictly positive, so Dijkstra applies. Every approach is at
/// least one trade long: the search starts from the source's outgoing edges,
/// which makes the source itself reachable only through a round trip.
#[derive(Debug)]
pub struct EntryPathFinder<'g, E> {
    source: usize,
    dist_to: Vec<f64>,
    edge_to: Vec<Option<&'g E>>,
}

impl<'g, E: PricedEdge> EntryPathFinder<'g, E> {
    /// # Errors
    /// Returns `Error::VertexOutOfBounds` if `source` is not a vertex of `graph`.
    pub fn new(graph: &'g Graph<E>, source: usize) -> Result<Self, Error> {
        let num_vertices = graph.vertex_count();
        if source >= num_vertices {
            return Err(Error::VertexOutOfBounds(source));
        }

        let mut finder = Self {
            source,
            dist_to: vec![f64::INFINITY; num_vertices],
            edge_to: vec![None; num_vertices],
        };
        let mut heap = BinaryHeap::new();

        for edge in graph.adjacent(source) {
            finder.relax(edge, 0.0, &mut heap);
        }

        while let Some(HeapEntry { distance, vertex }) = heap.pop() {
            if distance > finder.dist_to[vertex] {
                continue; // stale
            }
            for edge in graph.adjacent(vertex) {
                finder.relax(edge, distance, &mut heap);
            }
        }

        Ok(finder)
    }

    fn relax(&mut self, edge: &'g E, distance: f64, heap: &mut BinaryHeap<HeapEntry>) {
        let next = edge.to();
        let candidate = distance + edge.price();
        if candidate < self.dist_to[next] {
            self.dist_to[next] = candidate;
            self.edge_to[next] = Some(edge);
            heap.push(HeapEntry {
                distance: candidate,
                vertex: next,
            });
        }
    }

    pub fn dist_to(&self, vertex: usize) -> Option<f64> {
        self.dist_to.get(vertex).copied().filter(|d| d.is_finite())
    }

    /// Edges of the cheapest approach from the source to `vertex`; empty if
    /// `vertex` cannot be reached.
    pub fn path_to(&self, vertex: usize) -> Vec<&'g E> {
        let mut path = Vec::new();
        let mut current = vertex;

        loop {
            let Some(edge) = self.edge_to.get(current).copied().flatten() else {
                return Vec::new();
            };
            path.push(edge);
            if edge.from() == self.source {
                break;
            }
            current = edge.from();

            if path.len() > self.edge_to.len() {
                return Vec::new();
            }
        }

        path.reverse();
        path
    }

    /// Rotates `cycle` to start at its cheapest-to-reach vertex and attaches
    /// the path into it. Ties go to the vertex seen first in `cycle`.
    pub fn route(&self, mut cycle: Vec<&'g E>) -> RoutedCycle<&'g E> {
        let mut best: Option<(usize, f64)> = None;
        for (offset, edge) in cycle.iter().enumerate() {
            let Some(distance) = self.dist_to(edge.from()) else {
                continue;
            };
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((offset, distance));
            }
        }

        let Some((offset, _)) = best else {
            return RoutedCycle {
                cycle,
                enter_path: Vec::new(),
                entry: None,
            };
        };

        let entry = cycle[offset].from();
        cycle.rotate_left(offset);
        RoutedCycle {
            cycle,
            enter_path: self.path_to(entry),
            entry: Some(entry),
        }
    }
}
