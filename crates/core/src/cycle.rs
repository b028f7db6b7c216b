use super::graph::Graph;
use super::traits::Edge;
use common::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Depth-first search for a directed cycle.
///
/// Vertices are searched as roots in id order and edges in insertion order;
/// the first back edge onto the current DFS path closes the reported cycle
/// and ends the search. The search keeps its own stack, so deep graphs do not
/// grow the call stack.
#[derive(Debug, Clone)]
pub struct CycleFinder<E> {
    cycle: Option<Vec<E>>,
}

impl<E: Edge + Clone> CycleFinder<E> {
    /// Runs the search over `graph`.
    ///
    /// # Errors
    /// Returns `Error::CycleReconstructionFailed` if the DFS tree does not
    /// link the closing edge back to its target.
    pub fn search(graph: &Graph<E>) -> Result<Self, Error> {
        let num_vertices = graph.vertex_count();
        let mut marked = vec![Mark::Unvisited; num_vertices];
        let mut edge_to: Vec<Option<&E>> = vec![None; num_vertices];

        for root in 0..num_vertices {
            if marked[root] != Mark::Unvisited {
                continue;
            }
            if let Some(cycle) = Self::dfs(graph, root, &mut marked, &mut edge_to)? {
                return Ok(Self { cycle: Some(cycle) });
            }
        }

        Ok(Self { cycle: None })
    }

    pub fn has_cycle(&self) -> bool {
        self.cycle.is_some()
    }

    pub fn cycle_path(&self) -> Option<&[E]> {
        self.cycle.as_deref()
    }

    pub fn into_cycle(self) -> Option<Vec<E>> {
        self.cycle
    }

    fn dfs<'a>(
        graph: &'a Graph<E>,
        root: usize,
        marked: &mut [Mark],
        edge_to: &mut [Option<&'a E>],
    ) -> Result<Option<Vec<E>>, Error> {
        // Each frame is (vertex, index of the next outgoing edge to follow).
        let mut stack = vec![(root, 0usize)];
        marked[root] = Mark::OnPath;

        while let Some(frame) = stack.last_mut() {
            let vertex = frame.0;
            let Some(edge) = graph.adjacent(vertex).get(frame.1) else {
                marked[vertex] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let next = edge.to();
            match marked[next] {
                Mark::Unvisited => {
                    edge_to[next] = Some(edge);
                    marked[next] = Mark::OnPath;
                    stack.push((next, 0));
                }
                Mark::OnPath => return Self::close_cycle(vertex, edge, edge_to).map(Some),
                Mark::Done => {}
            }
        }

        Ok(None)
    }

    /// Builds the cycle closed by `closing` (`vertex -> w`): the closing edge
    /// first, then the tree edges from `w` down to `vertex`.
    fn close_cycle(vertex: usize, closing: &E, edge_to: &[Option<&E>]) -> Result<Vec<E>, Error> {
        let target = closing.to();
        let mut cycle = Vec::new();
        let mut current = vertex;

        while current != target {
            let edge = edge_to[current].ok_or(Error::CycleReconstructionFailed)?;
            cycle.push(edge.clone());
            current = edge.from();

            if cycle.len() > edge_to.len() {
                return Err(Error::CycleReconstructionFailed);
            }
        }

        cycle.push(closing.clone());
        cycle.reverse();
        Ok(cycle)
    }
}
