use std::collections::VecDeque;
use std::fmt::Display;
use std::hash::Hash;
use tracing::trace;

use super::cycle::CycleFinder;
use super::graph::{Graph, SymbolGraph};
use super::traits::WeightedEdge;
use common::error::Error;
use common::numeric_kernel::{RELAXATION_EPS, improves};

/// Queue-based Bellman-Ford (SPFA) from a single source with incremental
/// negative-cycle detection.
///
/// Every `V` relaxation attempts the current predecessor edges are searched
/// for a cycle. Such a cycle is always negative, and once a reachable
/// negative cycle exists the relaxation would never settle, so the first one
/// found ends the run.
#[derive(Debug)]
pub struct BellmanFord<'g, E> {
    source: usize,
    dist_to: Vec<f64>,
    edge_to: Vec<Option<&'g E>>,
    cycle: Option<Vec<&'g E>>,
}

/// Scratch state owned by one run.
struct Relaxation<'g, E> {
    dist_to: Vec<f64>,
    edge_to: Vec<Option<&'g E>>,
    on_queue: Vec<bool>,
    queue: VecDeque<usize>,
    attempts: usize,
}

impl<'g, E> Relaxation<'g, E> {
    fn new(num_vertices: usize, source: usize) -> Self {
        let mut state = Self {
            dist_to: vec![f64::INFINITY; num_vertices],
            edge_to: vec![None; num_vertices],
            on_queue: vec![false; num_vertices],
            queue: VecDeque::with_capacity(num_vertices),
            attempts: 0,
        };

        state.dist_to[source] = 0.0;
        state.enqueue(source);
        state
    }

    fn enqueue(&mut self, vertex: usize) {
        if !self.on_queue[vertex] {
            self.queue.push_back(vertex);
            self.on_queue[vertex] = true;
        }
    }

    fn dequeue(&mut self) -> Option<usize> {
        let vertex = self.queue.pop_front()?;
        self.on_queue[vertex] = false;
        Some(vertex)
    }
}

impl<'g, E: WeightedEdge> BellmanFord<'g, E> {
    /// Runs the search from the vertex named `source`.
    ///
    /// # Errors
    /// Returns `Error::UnknownSymbol` if `source` is not in the symbol table.
    pub fn of<S>(symbol_graph: &'g SymbolGraph<S, E>, source: &S) -> Result<Self, Error>
    where
        S: Eq + Hash + Clone + Display,
    {
        let source = symbol_graph.require_index(source)?;
        Self::run(symbol_graph.graph(), source)
    }

    /// Runs the search from vertex `source` to completion.
    ///
    /// # Errors
    /// Returns `Error::VertexOutOfBounds` if `source` is not a vertex of `graph`.
    pub fn run(graph: &'g Graph<E>, source: usize) -> Result<Self, Error> {
        let num_vertices = graph.vertex_count();
        if source >= num_vertices {
            return Err(Error::VertexOutOfBounds(source));
        }

        let mut state = Relaxation::new(num_vertices, source);
        let mut cycle = None;

        while cycle.is_none() {
            let Some(vertex) = state.dequeue() else {
                break;
            };
            cycle = relax(graph, vertex, &mut state)?;
        }

        Ok(Self {
            source,
            dist_to: state.dist_to,
            edge_to: state.edge_to,
            cycle,
        })
    }

    pub fn has_negative_cycle(&self) -> bool {
        self.cycle.is_some()
    }

    pub fn negative_cycle_path(&self) -> Option<&[&'g E]> {
        self.cycle.as_deref()
    }

    pub fn into_negative_cycle(self) -> Option<Vec<&'g E>> {
        self.cycle
    }

    /// Shortest distance from the source, if `vertex` was reached and the
    /// distances are well defined (no negative cycle).
    pub fn dist_to(&self, vertex: usize) -> Option<f64> {
        if self.has_negative_cycle() {
            return None;
        }
        self.dist_to.get(vertex).copied().filter(|d| d.is_finite())
    }

    pub fn has_path_to(&self, vertex: usize) -> bool {
        self.dist_to(vertex).is_some()
    }

    /// Edges of the shortest path from the source to `vertex`.
    ///
    /// Empty when `vertex` is the source, is unreached, or a negative cycle
    /// was found.
    pub fn shortest_path_to(&self, vertex: usize) -> Vec<&'g E> {
        if !self.has_path_to(vertex) {
            return Vec::new();
        }

        let mut path = Vec::new();
        let mut current = vertex;
        while current != self.source {
            let Some(edge) = self.edge_to[current] else {
                return Vec::new();
            };
            path.push(edge);
            current = edge.from();

            if path.len() > self.edge_to.len() {
                return Vec::new();
            }
        }

        path.reverse();
        path
    }
}

/// Relaxes every outgoing edge of `vertex`, probing for a cycle every `V` attempts.
fn relax<'g, E: WeightedEdge>(
    graph: &'g Graph<E>,
    vertex: usize,
    state: &mut Relaxation<'g, E>,
) -> Result<Option<Vec<&'g E>>, Error> {
    let num_vertices = graph.vertex_count();

    for edge in graph.adjacent(vertex) {
        let next = edge.to();
        let candidate = state.dist_to[vertex] + edge.weight();

        if improves(candidate, state.dist_to[next], RELAXATION_EPS) {
            state.dist_to[next] = candidate;
            state.edge_to[next] = Some(edge);
            state.enqueue(next);
        }

        state.attempts += 1;
        if state.attempts % num_vertices == 0 {
            if let Some(cycle) = find_negative_cycle(num_vertices, &state.edge_to)? {
                trace!(
                    attempts = state.attempts,
                    length = cycle.len(),
                    "Negative cycle found in predecessor graph"
                );
                return Ok(Some(cycle));
            }
        }
    }

    Ok(None)
}

/// Searches the graph made of the current predecessor edges only.
fn find_negative_cycle<'g, E: WeightedEdge>(
    num_vertices: usize,
    edge_to: &[Option<&'g E>],
) -> Result<Option<Vec<&'g E>>, Error> {
    let mut predecessors: Graph<&'g E> = Graph::new(num_vertices);
    for &edge in edge_to.iter().flatten() {
        predecessors.add_edge(edge)?;
    }

    Ok(CycleFinder::search(&predecessors)?.into_cycle())
}
