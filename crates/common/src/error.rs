use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A price that is zero, negative, NaN or infinite reached an edge update.
    #[error("Price {0} is not a finite positive number.")]
    InvalidPrice(f64),

    /// A currency symbol outside the configured universe.
    #[error("Symbol {0} is not part of the graph.")]
    UnknownSymbol(String),

    /// A ticker for an instrument that is not in the market index.
    #[error("Instrument {0} is not part of the market.")]
    UnknownInstrument(String),

    /// An instrument identifier that is not of the form `BASE/QUOTE`.
    #[error("Instrument identifier {0:?} is malformed, expected BASE/QUOTE.")]
    MalformedInstrument(String),

    /// Indicates an attempt to access a vertex index that exceeds the graph size (V).
    #[error("Vertex index {0} is out of bounds.")]
    VertexOutOfBounds(usize),

    /// Failed to trace the full cycle path, usually due to broken predecessor chains.
    #[error("Cycle path reconstruction failed due to broken predecessor chain.")]
    CycleReconstructionFailed,
}
