use std::sync::Arc;

use super::graph::Graph;
use super::path::RoutedCycle;
use common::error::Error;

/// A directed edge between two dense vertex ids.
pub trait Edge {
    fn from(&self) -> usize;
    fn to(&self) -> usize;
}

/// An edge carrying the additive weight used for negative-cycle detection.
pub trait WeightedEdge: Edge {
    fn weight(&self) -> f64;
}

/// An edge carrying the raw conversion price.
pub trait PricedEdge: Edge {
    fn price(&self) -> f64;
}

/// Plain immutable edge list entry: (from, to, rate)
pub type RawEdge = (usize, usize, f64);

impl Edge for RawEdge {
    fn from(&self) -> usize {
        self.0
    }

    fn to(&self) -> usize {
        self.1
    }
}

impl WeightedEdge for RawEdge {
    fn weight(&self) -> f64 {
        -self.2.ln()
    }
}

impl PricedEdge for RawEdge {
    fn price(&self) -> f64 {
        self.2
    }
}

impl<E: Edge + ?Sized> Edge for &E {
    fn from(&self) -> usize {
        (**self).from()
    }

    fn to(&self) -> usize {
        (**self).to()
    }
}

impl<E: WeightedEdge + ?Sized> WeightedEdge for &E {
    fn weight(&self) -> f64 {
        (**self).weight()
    }
}

impl<E: PricedEdge + ?Sized> PricedEdge for &E {
    fn price(&self) -> f64 {
        (**self).price()
    }
}

impl<E: Edge + ?Sized> Edge for Arc<E> {
    fn from(&self) -> usize {
        (**self).from()
    }

    fn to(&self) -> usize {
        (**self).to()
    }
}

impl<E: WeightedEdge + ?Sized> WeightedEdge for Arc<E> {
    fn weight(&self) -> f64 {
        (**self).weight()
    }
}

impl<E: PricedEdge + ?Sized> PricedEdge for Arc<E> {
    fn price(&self) -> f64 {
        (**self).price()
    }
}

/// Trait for graph solvers capable of detecting arbitrage cycles.
pub trait GraphSolver {
    /// Detects a negative cycle reachable from `source` and routes into it.
    ///
    /// Returns `Ok(Some(cycle))` if a negative cycle is found,
    /// `Ok(None)` if none is reachable, or `Err(e)` on failure.
    fn find_arbitrage<'g, E>(
        &self,
        graph: &'g Graph<E>,
        source: usize,
    ) -> Result<Option<RoutedCycle<&'g E>>, Error>
    where
        E: WeightedEdge + PricedEdge;
}
