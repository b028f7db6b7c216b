use tracing::debug;

use super::bellman_ford::BellmanFord;
use super::graph::Graph;
use super::path::{EntryPathFinder, RoutedCycle};
use super::traits::{GraphSolver, PricedEdge, WeightedEdge};
use common::error::Error;

/// Solver implementing the Shortest Path Faster Algorithm (SPFA) for negative
/// cycle detection, followed by a price-weighted search for the cheapest way
/// into the cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpfaSolver;

impl GraphSolver for SpfaSolver {
    /// Finds the first negative cycle reachable from `source`.
    ///
    /// # Returns
    /// - `Ok(Some(routed))` → Profitable cycle found, rotated to its entry vertex.
    /// - `Ok(None)` → No negative cycle reachable from `source`.
    /// - `Err(e)` → `source` is not a vertex of `graph`.
    fn find_arbitrage<'g, E>(
        &self,
        graph: &'g Graph<E>,
        source: usize,
    ) -> Result<Option<RoutedCycle<&'g E>>, Error>
    where
        E: WeightedEdge + PricedEdge,
    {
        let Some(cycle) = BellmanFord::run(graph, source)?.into_negative_cycle() else {
            return Ok(None);
        };

        let routed = EntryPathFinder::new(graph, source)?.route(cycle);
        debug!(
            source,
            entry = ?routed.entry,
            cycle_len = routed.cycle.len(),
            enter_len = routed.enter_path.len(),
            "Routed negative cycle"
        );
        Ok(Some(routed))
    }
}
