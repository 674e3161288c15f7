//! World Errors

use thiserror::Error;

/// Errors raised while building the world from external data
#[derive(Error, Debug)]
pub enum WorldError {
    #[error("Tile layer has {actual} tiles, expected {expected}")]
    LayerSize { expected: usize, actual: usize },

    #[error("Invalid tile layer: {0}")]
    LayerParse(#[from] serde_json::Error),

    #[error("Cannot read tile layer: {0}")]
    Io(#[from] std::io::Error),
}
