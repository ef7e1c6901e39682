//! Error types for the Corticore network core.
//!
//! This module provides a unified error type for all construction and
//! introspection operations, using the `thiserror` crate for ergonomic
//! error handling. Structural problems found while building a network are
//! gathered into [`BuildErrors`] and reported together.

use itertools::Itertools;
use std::fmt;
use thiserror::Error;

/// The main error type for Corticore operations.
#[derive(Error, Debug)]
pub enum CorticoreError {
    /// Layer shape has no units in it
    #[error("Layer {layer}: no units specified in shape {dims:?}")]
    ZeroUnits {
        /// Layer name
        layer: String,
        /// Offending dimensions
        dims: Vec<usize>,
    },

    /// Layer shape is neither 2-D nor 4-D
    #[error("Layer {layer}: shape must be 2-D or 4-D, got {rank} dimensions")]
    UnsupportedShape {
        /// Layer name
        layer: String,
        /// Number of dimensions given
        rank: usize,
    },

    /// A layer name could not be resolved
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    /// A pathway name could not be resolved
    #[error("Unknown pathway: {0}")]
    UnknownPath(String),

    /// Operation requires `Network::build()` to have run
    #[error("Network not built - call build() before use")]
    NotBuilt,

    /// Structure cannot change once the network is built
    #[error("Network already built - structure is frozen")]
    AlreadyBuilt,

    /// Index out of bounds
    #[error("Index out of bounds: index {index}, length {length}")]
    IndexOutOfBounds {
        /// The index that was accessed
        index: usize,
        /// The valid length
        length: usize,
    },

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Aggregated structural errors from a build attempt
    #[error("{0}")]
    Build(BuildErrors),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error occurred
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary serialization error occurred
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Every structural error found during one build pass.
///
/// The build keeps going after a layer or pathway fails so that the caller
/// sees the full list of problems at once.
#[derive(Debug, Default)]
pub struct BuildErrors {
    errors: Vec<CorticoreError>,
}

impl BuildErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error.
    pub fn push(&mut self, err: CorticoreError) {
        self.errors.push(err);
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when nothing went wrong.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Recorded errors in the order they were found.
    pub fn errors(&self) -> &[CorticoreError] {
        &self.errors
    }

    /// `Ok(())` when empty, otherwise the whole collection as one error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CorticoreError::Build(self))
        }
    }
}

impl Extend<CorticoreError> for BuildErrors {
    fn extend<I: IntoIterator<Item = CorticoreError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Build failed with {} error(s):\n{}",
            self.errors.len(),
            self.errors.iter().map(|e| format!("  {}", e)).join("\n")
        )
    }
}

/// A specialized `Result` type for Corticore operations.
pub type Result<T> = std::result::Result<T, CorticoreError>;
