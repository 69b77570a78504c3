//! **lamplight-core**: tile geometry and cancellation primitives.
//!
//! This crate provides the foundational types used across the *lamplight*
//! crates: map coordinates ([`Tile`], [`TileArea`]), movement directions
//! ([`Direction`], [`DirectionSet`]) and the cooperative-cancellation
//! [`Context`] shared between the tick loop and the pathfinding worker.

pub mod context;
pub mod geom;

pub use context::Context;
pub use geom::{Direction, DirectionSet, Tile, TileArea, TileAreaIter};
