//! Geometry primitives: [`Tile`], [`TileArea`], [`Direction`] and
//! [`DirectionSet`].
//!
//! Coordinates follow the map convention: X grows east, Y grows north and
//! `level` selects the vertical layer.

use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the eight movement directions.
///
/// The declaration order is the order in which neighbors are enumerated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    West,
    East,
    South,
    North,
    SouthWest,
    SouthEast,
    NorthWest,
    NorthEast,
}

impl Direction {
    /// Every direction in enumeration order.
    pub const ALL: [Direction; 8] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
        Direction::SouthWest,
        Direction::SouthEast,
        Direction::NorthWest,
        Direction::NorthEast,
    ];

    /// The four cardinal directions, clockwise from north.
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// X offset of one step in this direction.
    #[inline]
    pub const fn dx(self) -> i32 {
        match self {
            Self::West | Self::SouthWest | Self::NorthWest => -1,
            Self::East | Self::SouthEast | Self::NorthEast => 1,
            Self::South | Self::North => 0,
        }
    }

    /// Y offset of one step in this direction.
    #[inline]
    pub const fn dy(self) -> i32 {
        match self {
            Self::South | Self::SouthWest | Self::SouthEast => -1,
            Self::North | Self::NorthWest | Self::NorthEast => 1,
            Self::West | Self::East => 0,
        }
    }

    #[inline]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::SouthWest | Self::SouthEast | Self::NorthWest | Self::NorthEast
        )
    }

    /// The direction pointing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Self::West => Self::East,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::North => Self::South,
            Self::SouthWest => Self::NorthEast,
            Self::SouthEast => Self::NorthWest,
            Self::NorthWest => Self::SouthEast,
            Self::NorthEast => Self::SouthWest,
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::West => "west",
            Self::East => "east",
            Self::South => "south",
            Self::North => "north",
            Self::SouthWest => "south-west",
            Self::SouthEast => "south-east",
            Self::NorthWest => "north-west",
            Self::NorthEast => "north-east",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// DirectionSet
// ---------------------------------------------------------------------------

/// A compact set of [`Direction`]s, one bit per direction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionSet(pub u8);

impl DirectionSet {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0xFF);

    /// Whether `d` is in the set.
    #[inline]
    pub const fn contains(self, d: Direction) -> bool {
        self.0 & d.bit() != 0
    }

    #[inline]
    pub const fn with(self, d: Direction) -> Self {
        Self(self.0 | d.bit())
    }

    #[inline]
    pub fn insert(&mut self, d: Direction) {
        self.0 |= d.bit();
    }

    #[inline]
    pub fn remove(&mut self, d: Direction) {
        self.0 &= !d.bit();
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in [`Direction::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = Self::NONE;
        for d in iter {
            set.insert(d);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// One map cell: `(x, y)` on vertical layer `level`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub level: i32,
}

impl Tile {
    /// Create a new tile.
    #[inline]
    pub const fn new(x: i32, y: i32, level: i32) -> Self {
        Self { x, y, level }
    }

    /// Return a tile shifted by (dx, dy) on the same level.
    ///
    /// Coordinates wrap around at the edges of the `i32` range.
    #[inline]
    pub const fn shift(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
            level: self.level,
        }
    }

    /// The adjacent tile one step in direction `d`.
    #[inline]
    pub const fn step(self, d: Direction) -> Self {
        self.shift(d.dx(), d.dy())
    }

    /// The same `(x, y)` on another level.
    #[inline]
    pub const fn with_level(self, level: i32) -> Self {
        Self {
            x: self.x,
            y: self.y,
            level,
        }
    }

    /// The four cardinal neighbours in [`Direction::CARDINALS`] order.
    #[inline]
    pub fn neighbors_4(self) -> [Tile; 4] {
        Direction::CARDINALS.map(|d| self.step(d))
    }
}

impl PartialOrd for Tile {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tile {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level
            .cmp(&other.level)
            .then(self.y.cmp(&other.y))
            .then(self.x.cmp(&other.x))
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.level)
    }
}

// ---------------------------------------------------------------------------
// TileArea
// ---------------------------------------------------------------------------

/// A half-open rectangle of tiles `[min, max)` on a single level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileArea {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
    pub level: i32,
}

impl TileArea {
    /// Create a new area from two corners, canonicalized so that
    /// `min` ≤ `max` on each axis.
    #[inline]
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32, level: i32) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
            level,
        }
    }

    #[inline]
    pub fn width(self) -> i32 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(self) -> i32 {
        self.max_y - self.min_y
    }

    /// Whether the area has zero or negative extent.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// Total number of tiles in the area.
    #[inline]
    pub fn len(self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.width() as usize) * (self.height() as usize)
    }

    /// Whether `t` lies inside the area, level included.
    #[inline]
    pub fn contains(self, t: Tile) -> bool {
        t.level == self.level
            && t.x >= self.min_x
            && t.x < self.max_x
            && t.y >= self.min_y
            && t.y < self.max_y
    }

    /// Row-major iterator over every tile in the area.
    #[inline]
    pub fn iter(self) -> TileAreaIter {
        TileAreaIter {
            area: self,
            cur_x: self.min_x,
            cur_y: self.min_y,
        }
    }
}

impl IntoIterator for TileArea {
    type Item = Tile;
    type IntoIter = TileAreaIter;
    #[inline]
    fn into_iter(self) -> TileAreaIter {
        self.iter()
    }
}

impl fmt::Display for TileArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {})-({}, {})) on level {}",
            self.min_x, self.min_y, self.max_x, self.max_y, self.level
        )
    }
}

/// Row-major iterator over the tiles of a [`TileArea`].
#[derive(Clone, Debug)]
pub struct TileAreaIter {
    area: TileArea,
    cur_x: i32,
    cur_y: i32,
}

impl Iterator for TileAreaIter {
    type Item = Tile;

    #[inline]
    fn next(&mut self) -> Option<Tile> {
        if self.cur_y >= self.area.max_y || self.area.is_empty() {
            return None;
        }
        let t = Tile::new(self.cur_x, self.cur_y, self.area.level);
        self.cur_x += 1;
        if self.cur_x >= self.area.max_x {
            self.cur_x = self.area.min_x;
            self.cur_y += 1;
        }
        Some(t)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.area.is_empty() || self.cur_y >= self.area.max_y {
            return (0, Some(0));
        }
        let w = self.area.width() as usize;
        let remaining_in_row = (self.area.max_x - self.cur_x) as usize;
        let remaining_rows = (self.area.max_y - self.cur_y - 1) as usize;
        let total = remaining_in_row + remaining_rows * w;
        (total, Some(total))
    }
}

impl ExactSizeIterator for TileAreaIter {}
