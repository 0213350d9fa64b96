// Reference data integrity errors
use thiserror::Error;

/// Problems found while ingesting breakpoint or indicator rows.
///
/// Rows failing these checks are dropped before they reach the engines,
/// which assume well-formed tables.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ReferenceDataError {
    #[error("breakpoint for {gas} has zero-width range at {bound}")]
    DegenerateRange { gas: String, bound: f64 },

    #[error("breakpoint for {gas} has inverted range {low}..{high}")]
    InvertedRange { gas: String, low: f64, high: f64 },

    #[error("breakpoint for {gas} has a non-finite bound")]
    NonFiniteBound { gas: String },

    #[error("indicator {name} has invalid emission factor {factor}")]
    InvalidEmissionFactor { name: String, factor: f64 },

    #[error("unknown indicator category: {0}")]
    UnknownCategory(String),
}
