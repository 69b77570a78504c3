//! Fixtures (lamps) and fixed landmarks of the mapped area.

use std::fmt;

use lamplight_core::{Tile, TileArea};

/// Stable identifier of a fixture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixtureId(pub u32);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fixture #{}", self.0)
    }
}

/// What the host currently knows about a fixture.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixtureStatus {
    Broken,
    Working,
    #[default]
    Unknown,
}

/// A fixture and the tile it occupies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixture {
    pub id: FixtureId,
    pub tile: Tile,
}

/// Summary of the player's bulbs, which decides where to go next.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InventoryState {
    /// Head to the bank for more bulbs.
    NoLightBulbs,
    /// Head to the wiring machine to refill empty bulbs.
    OnlyEmptyBulbs,
    /// Head to the nearest broken fixture.
    HasWorkingBulbs,
    #[default]
    Unknown,
}

/// Fixed locations supplied by the host.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Landmarks {
    pub bank: Tile,
    /// Default wiring machine tile, used when the host does not report a
    /// live one.
    pub wiring_machine: Tile,
    /// Standing anywhere in here counts as already being at the bank.
    #[cfg_attr(feature = "serde", serde(default))]
    pub bank_area: Option<TileArea>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fixtures: Vec<Fixture>,
}

impl Landmarks {
    /// Tile of fixture `id`, if it is known.
    pub fn tile_of(&self, id: FixtureId) -> Option<Tile> {
        self.fixtures.iter().find(|f| f.id == id).map(|f| f.tile)
    }

    pub fn in_bank_area(&self, t: Tile) -> bool {
        self.bank_area.is_some_and(|a| a.contains(t))
    }
}
