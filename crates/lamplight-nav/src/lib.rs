//! Background navigation for *lamplight*.
//!
//! A [`Navigator`] is fed a [`TickInput`] once per tick. From the player's
//! inventory it picks an objective (the bank, the wiring machine, or the
//! nearest broken fixture) and keeps a path toward it up to date on a
//! dedicated worker thread, so the caller never blocks on a search.
//!
//! Searches are rate limited by [`NavConfig::recompute_cooldown_ms`]; a new
//! search cancels the one before it, and a superseded search never
//! overwrites a newer [`NavigationResult`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use lamplight_core::Tile;
//! use lamplight_nav::{InventoryState, Landmarks, NavConfig, Navigator, TickInput};
//! use lamplight_paths::MapData;
//!
//! let map = Arc::new(MapData::open("data/map").unwrap());
//! let landmarks = Landmarks {
//!     bank: Tile::new(2700, 5350, 0),
//!     wiring_machine: Tile::new(2720, 5360, 0),
//!     bank_area: None,
//!     fixtures: Vec::new(),
//! };
//! let mut nav = Navigator::new(map, landmarks, NavConfig::default()).unwrap();
//! nav.update(&TickInput::new(Tile::new(2710, 5340, 0), InventoryState::NoLightBulbs));
//! let snapshot = nav.result();
//! println!("{} tiles to the {}", snapshot.distance, snapshot.target_kind);
//! ```

pub mod clock;
pub mod config;
pub mod fixture;
pub mod navigator;
pub mod result;
mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::NavConfig;
pub use fixture::{Fixture, FixtureId, FixtureStatus, InventoryState, Landmarks};
pub use navigator::{NavPhase, Navigator, TickInput};
pub use result::{NavigationResult, TargetKind};
pub use worker::WORKER_THREAD_NAME;
