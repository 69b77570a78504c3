//! Transport edges: ladders, doors and teleports that connect tiles which
//! are not adjacent on the grid.

use std::collections::HashMap;
use std::ops::Range;

use lamplight_core::Tile;

use crate::error::LoadError;

/// A directed, weighted connection between two non-adjacent tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportEdge {
    pub origin: Tile,
    pub destination: Tile,
    /// Traversal duration in ticks. Always at least 1.
    pub cost: f32,
}

impl TransportEdge {
    pub const fn new(origin: Tile, destination: Tile, cost: f32) -> Self {
        Self {
            origin,
            destination,
            cost,
        }
    }

    /// Whether taking this edge changes level.
    #[inline]
    pub fn changes_level(&self) -> bool {
        self.origin.level != self.destination.level
    }
}

/// The static set of transport edges, indexed by origin tile.
///
/// Edges are stored contiguously, grouped by origin, so that
/// [`edges_from`](TransportTable::edges_from) is a hash lookup plus a slice.
#[derive(Debug, Clone, Default)]
pub struct TransportTable {
    edges: Vec<TransportEdge>,
    by_origin: HashMap<Tile, Range<usize>>,
}

impl TransportTable {
    /// Build the table from a fixed edge list. Edges sharing an origin keep
    /// their relative order.
    pub fn new(edges: impl IntoIterator<Item = TransportEdge>) -> Self {
        let mut edges: Vec<TransportEdge> = edges.into_iter().collect();
        edges.sort_by_key(|e| e.origin);

        let mut by_origin: HashMap<Tile, Range<usize>> = HashMap::new();
        let mut start = 0;
        while start < edges.len() {
            let origin = edges[start].origin;
            let mut end = start + 1;
            while end < edges.len() && edges[end].origin == origin {
                end += 1;
            }
            by_origin.insert(origin, start..end);
            start = end;
        }
        Self { edges, by_origin }
    }

    /// Parse a tab-separated edge list.
    ///
    /// One edge per line: `ox oy olevel<TAB>dx dy dlevel<TAB>cost[<TAB>label]`.
    /// Blank lines and lines starting with `#` are ignored.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let mut edges = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |reason: String| LoadError::Transport {
                line: i + 1,
                reason,
            };
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < 3 || fields.len() > 4 {
                return Err(err(format!(
                    "expected 3 or 4 tab-separated fields, found {}",
                    fields.len()
                )));
            }
            let origin = parse_tile(fields[0]).map_err(err)?;
            let destination = parse_tile(fields[1]).map_err(err)?;
            let cost: f32 = fields[2]
                .parse()
                .map_err(|_| err(format!("invalid cost \u{201c}{}\u{201d}", fields[2])))?;
            if !cost.is_finite() || cost < 1.0 {
                return Err(err(format!("cost must be at least 1, got {cost}")));
            }
            edges.push(TransportEdge::new(origin, destination, cost));
        }
        Ok(Self::new(edges))
    }

    /// Edges leaving `t`; empty if there are none.
    #[inline]
    pub fn edges_from(&self, t: Tile) -> &[TransportEdge] {
        match self.by_origin.get(&t) {
            Some(r) => &self.edges[r.clone()],
            None => &[],
        }
    }

    /// Whether any edge leaves `t`.
    #[inline]
    pub fn has_edges_from(&self, t: Tile) -> bool {
        self.by_origin.contains_key(&t)
    }

    /// Every edge, grouped by origin.
    pub fn iter(&self) -> impl Iterator<Item = &TransportEdge> {
        self.edges.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn parse_tile(field: &str) -> Result<Tile, String> {
    let mut parts = field.split_whitespace().map(str::parse::<i32>);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(level)), None) => Ok(Tile::new(x, y, level)),
        _ => Err(format!("invalid tile \u{201c}{field}\u{201d}, expected \u{201c}x y level\u{201d}")),
    }
}
