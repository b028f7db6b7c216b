use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use super::traits::Edge;
use common::error::Error;

/// Directed graph stored as adjacency lists over dense vertex ids `0..V`.
///
/// The vertex set is fixed at construction. Edges are appended to the bucket
/// of their source vertex and never removed, so each bucket preserves
/// insertion order.
#[derive(Debug, Clone)]
pub struct Graph<E> {
    adjacency: Vec<Vec<E>>,
    edge_count: usize,
}

impl<E: Edge> Graph<E> {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            adjacency: (0..vertex_count).map(|_| Vec::new()).collect(),
            edge_count: 0,
        }
    }

    /// Appends `edge` to the bucket of `edge.from()`.
    ///
    /// # Errors
    /// Returns `Error::VertexOutOfBounds` if either endpoint is not in `0..V`.
    pub fn add_edge(&mut self, edge: E) -> Result<(), Error> {
        let (from, to) = (edge.from(), edge.to());
        if to >= self.vertex_count() {
            return Err(Error::VertexOutOfBounds(to));
        }
        let bucket = self
            .adjacency
            .get_mut(from)
            .ok_or(Error::VertexOutOfBounds(from))?;

        bucket.push(edge);
        self.edge_count += 1;
        Ok(())
    }

    /// Outgoing edges of `vertex` in insertion order; empty for an unknown vertex.
    pub fn adjacent(&self, vertex: usize) -> &[E] {
        self.adjacency.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All edges, grouped by source vertex.
    pub fn edges(&self) -> impl Iterator<Item = &E> {
        self.adjacency.iter().flatten()
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

/// A [`Graph`] whose vertices are named by domain symbols.
///
/// The symbol table is a bijection built once: ids are assigned in
/// first-seen order and lookups are O(1) in both directions.
#[derive(Debug, Clone)]
pub struct SymbolGraph<S, E> {
    symbol_table: HashMap<S, usize>,
    symbol_index: Vec<S>,
    graph: Graph<E>,
}

impl<S, E> SymbolGraph<S, E>
where
    S: Eq + Hash + Clone,
    E: Edge,
{
    /// Builds the vertex set from `symbols`, ignoring duplicates.
    pub fn from_symbols<I>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        let mut symbol_table = HashMap::new();
        let mut symbol_index = Vec::new();

        for symbol in symbols {
            if !symbol_table.contains_key(&symbol) {
                symbol_table.insert(symbol.clone(), symbol_index.len());
                symbol_index.push(symbol);
            }
        }

        let graph = Graph::new(symbol_index.len());
        Self {
            symbol_table,
            symbol_index,
            graph,
        }
    }

    pub fn add_edge(&mut self, edge: E) -> Result<(), Error> {
        self.graph.add_edge(edge)
    }

    pub fn index_of(&self, symbol: &S) -> Option<usize> {
        self.symbol_table.get(symbol).copied()
    }

    pub fn symbol_of(&self, index: usize) -> Option<&S> {
        self.symbol_index.get(index)
    }

    pub fn contains(&self, symbol: &S) -> bool {
        self.symbol_table.contains_key(symbol)
    }

    pub fn symbols(&self) -> &[S] {
        &self.symbol_index
    }

    pub fn graph(&self) -> &Graph<E> {
        &self.graph
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }
}

impl<S, E> SymbolGraph<S, E>
where
    S: Eq + Hash + Clone + Display,
    E: Edge,
{
    /// Like [`SymbolGraph::index_of`], but absence is an `UnknownSymbol` error.
    pub fn require_index(&self, symbol: &S) -> Result<usize, Error> {
        self.index_of(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))
    }
}
