//! Bit-packed directional passability grid.
//!
//! Each tile stores two bits: whether it is possible to move north from it,
//! and whether it is possible to move east from it. South and west moves are
//! read from the neighbouring tile's north and east bits, and diagonal moves
//! are derived from the four cardinal bits around the corner.
//!
//! # Binary format
//!
//! ```text
//! [magic: b"LLCM"] [version: u16 LE]
//! [region_count: u32 LE]
//! region_count × {
//!     [region_x: i32 LE] [region_y: i32 LE] [levels: u8]
//!     [byte_len: u32 LE] [bits: byte_len bytes]
//! }
//! ```
//!
//! Within a region the bit for local `(lx, ly)` on `level` and flag `f`
//! (0 = north, 1 = east) is `((level * 64 + ly) * 64 + lx) * 2 + f`,
//! LSB-first within each byte.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Write};

use lamplight_core::{Direction, DirectionSet, Tile, TileArea};

use crate::error::LoadError;
use crate::transport::TransportTable;

/// Side length of a square region, in tiles.
pub const REGION_SIZE: i32 = 64;

/// Magic bytes at the start of an encoded grid.
pub const MAGIC: [u8; 4] = *b"LLCM";

/// The only format version currently understood.
pub const FORMAT_VERSION: u16 = 1;

const BYTES_PER_LEVEL: usize = (REGION_SIZE * REGION_SIZE * 2 / 8) as usize;

const NORTH: usize = 0;
const EAST: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Region {
    levels: u8,
    bits: Vec<u8>,
}

impl Region {
    fn new(levels: u8) -> Self {
        Self {
            levels,
            bits: vec![0; levels as usize * BYTES_PER_LEVEL],
        }
    }

    #[inline]
    fn bit_index(lx: i32, ly: i32, level: i32, flag: usize) -> usize {
        (((level * REGION_SIZE + ly) * REGION_SIZE + lx) as usize) * 2 + flag
    }

    #[inline]
    fn get(&self, lx: i32, ly: i32, level: i32, flag: usize) -> bool {
        if level < 0 || level >= self.levels as i32 {
            return false;
        }
        let i = Self::bit_index(lx, ly, level, flag);
        self.bits[i >> 3] & (1 << (i & 7)) != 0
    }

    fn set(&mut self, lx: i32, ly: i32, level: i32, flag: usize, value: bool) {
        let i = Self::bit_index(lx, ly, level, flag);
        if value {
            self.bits[i >> 3] |= 1 << (i & 7);
        } else {
            self.bits[i >> 3] &= !(1 << (i & 7));
        }
    }

    fn grow_to(&mut self, levels: u8) {
        if levels > self.levels {
            self.levels = levels;
            self.bits.resize(levels as usize * BYTES_PER_LEVEL, 0);
        }
    }
}

#[inline]
fn split(t: Tile) -> ((i32, i32), i32, i32) {
    (
        (t.x.div_euclid(REGION_SIZE), t.y.div_euclid(REGION_SIZE)),
        t.x.rem_euclid(REGION_SIZE),
        t.y.rem_euclid(REGION_SIZE),
    )
}

// ---------------------------------------------------------------------------
// CollisionGrid
// ---------------------------------------------------------------------------

/// Immutable per-tile movement flags, partitioned into 64×64 regions.
///
/// Tiles outside every stored region, or on a level the region does not
/// carry, are impassable in all directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionGrid {
    regions: HashMap<(i32, i32), Region>,
}

impl CollisionGrid {
    #[inline]
    fn flag(&self, t: Tile, flag: usize) -> bool {
        let (key, lx, ly) = split(t);
        match self.regions.get(&key) {
            Some(r) => r.get(lx, ly, t.level, flag),
            None => false,
        }
    }

    #[inline]
    fn n(&self, t: Tile) -> bool {
        self.flag(t, NORTH)
    }

    #[inline]
    fn e(&self, t: Tile) -> bool {
        self.flag(t, EAST)
    }

    #[inline]
    fn s(&self, t: Tile) -> bool {
        self.flag(t.shift(0, -1), NORTH)
    }

    #[inline]
    fn w(&self, t: Tile) -> bool {
        self.flag(t.shift(-1, 0), EAST)
    }

    /// Whether a single step from `t` in direction `d` is legal.
    ///
    /// A diagonal step needs both cardinal moves out of `t` and both
    /// cardinal moves into the destination, so corners cannot be cut.
    pub fn can_move(&self, t: Tile, d: Direction) -> bool {
        use Direction::*;
        match d {
            North => self.n(t),
            East => self.e(t),
            South => self.s(t),
            West => self.w(t),
            NorthEast => {
                self.n(t) && self.e(t) && self.e(t.step(North)) && self.n(t.step(East))
            }
            NorthWest => {
                self.n(t) && self.w(t) && self.w(t.step(North)) && self.n(t.step(West))
            }
            SouthEast => {
                self.s(t) && self.e(t) && self.e(t.step(South)) && self.s(t.step(East))
            }
            SouthWest => {
                self.s(t) && self.w(t) && self.w(t.step(South)) && self.s(t.step(West))
            }
        }
    }

    /// Every legal single-step direction out of `t`.
    pub fn moves(&self, t: Tile) -> DirectionSet {
        Direction::ALL
            .into_iter()
            .filter(|&d| self.can_move(t, d))
            .collect()
    }

    /// Whether all four cardinal moves out of `t` are illegal.
    pub fn is_blocked(&self, t: Tile) -> bool {
        !(self.n(t) || self.e(t) || self.s(t) || self.w(t))
    }

    /// Cardinal movement flags of `t`, for debugging.
    pub fn flags(&self, t: Tile) -> MoveFlags {
        MoveFlags {
            north: self.n(t),
            south: self.s(t),
            east: self.e(t),
            west: self.w(t),
        }
    }

    /// Reachable neighbours of `t`: grid steps in [`Direction::ALL`] order,
    /// then the destination of every transport edge leaving `t`.
    pub fn valid_neighbors(&self, t: Tile, transports: &TransportTable) -> Vec<Tile> {
        let mut buf = Vec::with_capacity(8);
        self.neighbors_into(t, transports, &mut buf);
        buf
    }

    /// Like [`valid_neighbors`](Self::valid_neighbors), appending to `buf`.
    pub fn neighbors_into(&self, t: Tile, transports: &TransportTable, buf: &mut Vec<Tile>) {
        for d in Direction::ALL {
            if self.can_move(t, d) {
                buf.push(t.step(d));
            }
        }
        buf.extend(transports.edges_from(t).iter().map(|e| e.destination));
    }

    /// Number of stored regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Level count of every stored region, sorted by region coordinate.
    pub fn level_counts(&self) -> Vec<((i32, i32), u8)> {
        let mut counts: Vec<_> = self.regions.iter().map(|(k, r)| (*k, r.levels)).collect();
        counts.sort_unstable();
        counts
    }

    /// Write the grid in the binary format described in the module docs.
    /// Regions are written in coordinate order so output is deterministic.
    pub fn encode<W: Write>(&self, mut w: W) -> io::Result<()> {
        let mut keys: Vec<_> = self.regions.keys().copied().collect();
        keys.sort_unstable();

        w.write_all(&MAGIC)?;
        w.write_all(&FORMAT_VERSION.to_le_bytes())?;
        w.write_all(&(keys.len() as u32).to_le_bytes())?;
        for key in keys {
            let r = &self.regions[&key];
            w.write_all(&key.0.to_le_bytes())?;
            w.write_all(&key.1.to_le_bytes())?;
            w.write_all(&[r.levels])?;
            w.write_all(&(r.bits.len() as u32).to_le_bytes())?;
            w.write_all(&r.bits)?;
        }
        w.flush()
    }

    /// Read a grid written by [`encode`](Self::encode).
    pub fn decode<R: Read>(mut r: R) -> Result<Self, LoadError> {
        let magic: [u8; 4] = read_array(&mut r)?;
        if magic != MAGIC {
            return Err(LoadError::BadMagic(magic));
        }
        let version = u16::from_le_bytes(read_array(&mut r)?);
        if version != FORMAT_VERSION {
            return Err(LoadError::UnsupportedVersion(version));
        }
        let count = u32::from_le_bytes(read_array(&mut r)?);

        let mut regions = HashMap::new();
        for _ in 0..count {
            let rx = i32::from_le_bytes(read_array(&mut r)?);
            let ry = i32::from_le_bytes(read_array(&mut r)?);
            let [levels] = read_array::<1, _>(&mut r)?;
            let byte_len = u32::from_le_bytes(read_array(&mut r)?) as usize;
            let expected = levels as usize * BYTES_PER_LEVEL;
            if byte_len != expected {
                return Err(LoadError::RegionSize {
                    region: (rx, ry),
                    expected,
                    found: byte_len,
                });
            }
            let mut bits = vec![0u8; byte_len];
            r.read_exact(&mut bits)?;
            regions.insert((rx, ry), Region { levels, bits });
        }
        Ok(Self { regions })
    }
}

fn read_array<const N: usize, R: Read>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Cardinal movement flags of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveFlags {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl fmt::Display for MoveFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N: {}, S: {}, E: {}, W: {}",
            self.north, self.south, self.east, self.west
        )
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Incremental construction of a [`CollisionGrid`].
///
/// Levels outside `0..255` cannot be stored and are ignored.
#[derive(Debug, Clone, Default)]
pub struct CollisionGridBuilder {
    regions: HashMap<(i32, i32), Region>,
}

impl CollisionGridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_flag(&mut self, t: Tile, flag: usize, value: bool) {
        let Ok(level) = u8::try_from(t.level) else {
            return;
        };
        if level == u8::MAX {
            return;
        }
        let (key, lx, ly) = split(t);
        if !value && !self.regions.contains_key(&key) {
            return;
        }
        let region = self
            .regions
            .entry(key)
            .or_insert_with(|| Region::new(level + 1));
        if level >= region.levels {
            if !value {
                return;
            }
            region.grow_to(level + 1);
        }
        region.set(lx, ly, t.level, flag, value);
    }

    /// Allow or forbid the cardinal move from `t` in direction `d`, and the
    /// reverse move from the neighbour. Diagonal directions are derived and
    /// therefore ignored here.
    pub fn set_passable(&mut self, t: Tile, d: Direction, passable: bool) -> &mut Self {
        match d {
            Direction::North => self.set_flag(t, NORTH, passable),
            Direction::East => self.set_flag(t, EAST, passable),
            Direction::South | Direction::West => {
                self.set_passable(t.step(d), d.opposite(), passable);
            }
            _ => {}
        }
        self
    }

    /// Open every move between two tiles that both lie inside `area`.
    pub fn open_area(&mut self, area: TileArea) -> &mut Self {
        for t in area {
            if area.contains(t.step(Direction::North)) {
                self.set_flag(t, NORTH, true);
            }
            if area.contains(t.step(Direction::East)) {
                self.set_flag(t, EAST, true);
            }
        }
        self
    }

    /// Close all four cardinal moves into and out of `t`.
    pub fn block(&mut self, t: Tile) -> &mut Self {
        for d in Direction::CARDINALS {
            self.set_passable(t, d, false);
        }
        self
    }

    /// Finish construction.
    pub fn build(&self) -> CollisionGrid {
        CollisionGrid {
            regions: self.regions.clone(),
        }
    }
}
