pub mod bellman_ford;
pub mod cycle;
pub mod edge;
pub mod graph;
pub mod path;
pub mod solver;
pub mod traits;

pub use bellman_ford::BellmanFord;
pub use cycle::CycleFinder;
pub use edge::{ExchangeRate, Quote};
pub use graph::{Graph, SymbolGraph};
pub use path::{EntryPathFinder, RoutedCycle};
pub use solver::SpfaSolver;
