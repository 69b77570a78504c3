//! Shared state and types for the two search algorithms.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lamplight_core::{DirectionSet, Tile};

use crate::map::MapData;
use crate::transport::TransportEdge;

/// Bounds that guarantee every search terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SearchLimits {
    /// Maximum number of node expansions per search.
    pub max_iterations: usize,
    /// Maximum Manhattan distance between endpoints, maximum accumulated
    /// cost, and maximum number of tiles in a returned path.
    pub max_path_length: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            max_path_length: 512,
        }
    }
}

/// Returned by the cancellable search variants when their [`Context`] was
/// cancelled before the search finished.
///
/// [`Context`]: lamplight_core::Context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("path search cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Result of a nearest-target search: the path and the target it leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NearestPath {
    /// Start inclusive, ends on a tile adjacent to `target` (or on `target`
    /// itself when the search started there).
    pub path: Vec<Tile>,
    pub target: Tile,
}

/// Per-target cardinal directions from which the target must not be
/// approached.
pub type WallOverrides = HashMap<Tile, DirectionSet>;

/// Path search over a shared, immutable [`MapData`].
///
/// Cloning is cheap: clones share the map.
#[derive(Debug, Clone)]
pub struct PathSearch {
    pub(crate) map: Arc<MapData>,
    pub(crate) limits: SearchLimits,
}

impl PathSearch {
    /// Create a search engine with the default [`SearchLimits`].
    pub fn new(map: Arc<MapData>) -> Self {
        Self::with_limits(map, SearchLimits::default())
    }

    pub fn with_limits(map: Arc<MapData>, limits: SearchLimits) -> Self {
        Self { map, limits }
    }

    #[inline]
    pub fn map(&self) -> &Arc<MapData> {
        &self.map
    }

    #[inline]
    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    /// Transport edges leaving `t`.
    pub fn transports_at(&self, t: Tile) -> &[TransportEdge] {
        self.map.transports().edges_from(t)
    }

    /// Whether any transport edge leaves `t`.
    pub fn is_transport_location(&self, t: Tile) -> bool {
        self.map.transports().has_edges_from(t)
    }
}

// ---------------------------------------------------------------------------
// Internal node bookkeeping for best-first search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    pub(crate) g: f32,
    pub(crate) parent: Option<Tile>,
    pub(crate) closed: bool,
}

/// Open-list entry. Ordered so that `BinaryHeap` pops the smallest `f`
/// first, and among equal `f` the earliest pushed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeRef {
    pub(crate) tile: Tile,
    pub(crate) f: f32,
    pub(crate) g: f32,
    pub(crate) seq: u64,
}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for NodeRef {}

/// Walk parent links back from `end` and return the path start-first.
pub(crate) fn reconstruct(nodes: &HashMap<Tile, Node>, end: Tile) -> Vec<Tile> {
    let mut path = vec![end];
    let mut cur = end;
    while let Some(parent) = nodes.get(&cur).and_then(|n| n.parent) {
        path.push(parent);
        cur = parent;
    }
    path.reverse();
    path
}
