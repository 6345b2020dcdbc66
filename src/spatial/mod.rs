//! Spatial indexing over geographic coordinates.
//!
//! A single grid-bucket index, generic over its payload so locations and
//! region centroids share one implementation.

pub mod grid;

pub use grid::{CellKey, GridIndex, IndexedEntity};
