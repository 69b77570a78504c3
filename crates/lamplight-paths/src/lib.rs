//! Map data and bounded path search for *lamplight*.
//!
//! - [`CollisionGrid`]: bit-packed per-tile movement flags, with a
//!   [`CollisionGridBuilder`] and a compact binary encoding.
//! - [`TransportTable`]: ladders, doors and teleports indexed by origin.
//! - [`MapData`]: the two of them together, loadable from disk.
//! - [`PathSearch`]: single-target A* ([`PathSearch::find_path`]) and
//!   multi-target nearest search ([`PathSearch::find_nearest_path`]).
//!
//! Every search is bounded by [`SearchLimits`] and has a cancellable
//! variant taking a [`lamplight_core::Context`].

mod astar;
mod bfs;
mod collision;
mod distance;
mod error;
mod map;
mod search;
mod traits;
mod transport;

pub use collision::{
    CollisionGrid, CollisionGridBuilder, FORMAT_VERSION, MAGIC, MoveFlags, REGION_SIZE,
};
pub use distance::{chebyshev, manhattan};
pub use error::LoadError;
pub use map::{COLLISION_FILE, MapData, TRANSPORTS_FILE};
pub use search::{Cancelled, NearestPath, PathSearch, SearchLimits, WallOverrides};
pub use traits::Pather;
pub use transport::{TransportEdge, TransportTable};
