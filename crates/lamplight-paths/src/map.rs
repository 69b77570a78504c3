//! The pre-baked map: collision grid plus transport table.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use lamplight_core::{Direction, Tile};

use crate::collision::CollisionGrid;
use crate::error::LoadError;
use crate::traits::Pather;
use crate::transport::TransportTable;

/// File name of the collision grid inside a map directory.
pub const COLLISION_FILE: &str = "collision-map.bin";
/// File name of the transport table inside a map directory.
pub const TRANSPORTS_FILE: &str = "transports.tsv";

/// Immutable map data shared by every search.
#[derive(Debug, Clone, Default)]
pub struct MapData {
    grid: CollisionGrid,
    transports: TransportTable,
}

/// One outgoing move from a tile, with what it costs to take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Step {
    pub(crate) to: Tile,
    pub(crate) kind: StepKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum StepKind {
    Walk { diagonal: bool },
    Transport { cost: f32 },
}

impl MapData {
    pub fn new(grid: CollisionGrid, transports: TransportTable) -> Self {
        Self { grid, transports }
    }

    /// Load from an encoded collision grid and the text of a transport table.
    pub fn load<R: Read>(collision: R, transports: &str) -> Result<Self, LoadError> {
        let grid = CollisionGrid::decode(collision)?;
        let transports = TransportTable::parse(transports)?;
        Ok(Self::new(grid, transports))
    }

    /// Load [`COLLISION_FILE`] and [`TRANSPORTS_FILE`] from `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let collision = BufReader::new(File::open(dir.join(COLLISION_FILE))?);
        let transports = fs::read_to_string(dir.join(TRANSPORTS_FILE))?;
        Self::load(collision, &transports)
    }

    #[inline]
    pub fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    #[inline]
    pub fn transports(&self) -> &TransportTable {
        &self.transports
    }

    /// Reachable neighbours of `t`, grid steps first, then transports.
    pub fn valid_neighbors(&self, t: Tile) -> Vec<Tile> {
        self.grid.valid_neighbors(t, &self.transports)
    }

    /// Outgoing moves of `t` in the same order as [`valid_neighbors`](Self::valid_neighbors).
    pub(crate) fn steps(&self, t: Tile, buf: &mut Vec<Step>) {
        for d in Direction::ALL {
            if self.grid.can_move(t, d) {
                buf.push(Step {
                    to: t.step(d),
                    kind: StepKind::Walk {
                        diagonal: d.is_diagonal(),
                    },
                });
            }
        }
        buf.extend(self.transports.edges_from(t).iter().map(|e| Step {
            to: e.destination,
            kind: StepKind::Transport { cost: e.cost },
        }));
    }
}

impl Pather for MapData {
    fn neighbors(&self, t: Tile, buf: &mut Vec<Tile>) {
        self.grid.neighbors_into(t, &self.transports, buf);
    }
}
