//! Tick-driven navigation toward the current objective.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use lamplight_core::{Context, DirectionSet, Tile};
use lamplight_paths::{MapData, TransportEdge, WallOverrides};
use log::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::NavConfig;
use crate::fixture::{FixtureId, FixtureStatus, InventoryState, Landmarks};
use crate::result::{NavigationResult, Shared, TargetKind};
use crate::worker::{Job, Request, Worker, warn_dropped};

/// Everything the navigator reads from the host on one tick.
#[derive(Clone, Debug, Default)]
pub struct TickInput {
    pub player: Tile,
    pub inventory: InventoryState,
    pub fixture_statuses: HashMap<FixtureId, FixtureStatus>,
    /// Sides of each fixture that are walled off and cannot be used to
    /// reach it.
    pub wall_cache: HashMap<FixtureId, DirectionSet>,
    /// Live wiring machine position, if the host has seen it.
    pub wiring_machine: Option<Tile>,
}

impl TickInput {
    pub fn new(player: Tile, inventory: InventoryState) -> Self {
        Self {
            player,
            inventory,
            ..Self::default()
        }
    }
}

/// Where the navigator is in its compute cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NavPhase {
    /// Nothing queued and nothing published.
    Idle,
    /// A search is queued or running.
    Computing,
    /// Nothing queued, and a non-empty path is published.
    Published,
}

/// Keeps a path toward the current objective up to date without blocking
/// the caller.
///
/// [`update`](Navigator::update) is called once per tick. It decides the
/// objective from the inventory, and at most once per cooldown hands a
/// search to a dedicated worker thread, cancelling the previous one. The
/// latest completed search is available from [`result`](Navigator::result).
pub struct Navigator<C: Clock = SystemClock> {
    map: Arc<MapData>,
    landmarks: Landmarks,
    config: NavConfig,
    clock: C,
    shared: Arc<Shared>,
    worker: Worker,
    in_flight: Option<Context>,
    last_scheduled: Option<Instant>,
    target_kind: TargetKind,
    last_fixture: Option<FixtureId>,
}

impl Navigator<SystemClock> {
    /// Create a navigator and start its worker thread.
    pub fn new(map: Arc<MapData>, landmarks: Landmarks, config: NavConfig) -> io::Result<Self> {
        Self::with_clock(map, landmarks, config, SystemClock)
    }
}

impl<C: Clock> Navigator<C> {
    /// Like [`new`](Navigator::new) with an explicit time source.
    pub fn with_clock(
        map: Arc<MapData>,
        landmarks: Landmarks,
        config: NavConfig,
        clock: C,
    ) -> io::Result<Self> {
        let shared = Arc::new(Shared::new());
        let worker = Worker::spawn(Arc::clone(&map), Arc::clone(&shared))?;
        Ok(Self {
            map,
            landmarks,
            config,
            clock,
            shared,
            worker,
            in_flight: None,
            last_scheduled: None,
            target_kind: TargetKind::None,
            last_fixture: None,
        })
    }

    /// Advance one tick.
    pub fn update(&mut self, input: &TickInput) {
        self.observe_published();

        let target = match input.inventory {
            InventoryState::NoLightBulbs => Some((TargetKind::Bank, self.landmarks.bank)),
            InventoryState::OnlyEmptyBulbs => Some((
                TargetKind::WiringMachine,
                input
                    .wiring_machine
                    .unwrap_or(self.landmarks.wiring_machine),
            )),
            InventoryState::HasWorkingBulbs => None,
            InventoryState::Unknown => {
                self.target_kind = TargetKind::None;
                self.clear(TargetKind::None);
                return;
            }
        };
        self.target_kind = match target {
            Some((kind, _)) => kind,
            None => TargetKind::NearestFixture,
        };

        if !self.config.show_path {
            self.clear(self.target_kind);
            return;
        }

        match target {
            Some((kind, tile)) => self.route_to(input.player, tile, kind),
            None => self.route_to_nearest_fixture(input),
        }
    }

    /// Replace the configuration. Disabling `show_path` clears the
    /// published path at once.
    pub fn set_config(&mut self, config: NavConfig) {
        self.config = config;
        if !self.config.show_path {
            self.clear(self.target_kind);
        }
    }

    /// Drop the published path and objective, for example when the player
    /// leaves the mapped area.
    pub fn clear_path_and_target(&mut self) {
        self.target_kind = TargetKind::None;
        self.clear(TargetKind::None);
    }

    /// Cancel outstanding work and stop the worker thread. Idempotent; later
    /// requests are dropped.
    pub fn shut_down(&mut self) {
        self.cancel_in_flight();
        self.worker.shut_down();
    }

    /// The latest published result.
    pub fn result(&self) -> Arc<NavigationResult> {
        self.shared.snapshot()
    }

    /// The objective chosen on the last tick.
    pub fn target_kind(&self) -> TargetKind {
        self.target_kind
    }

    pub fn phase(&self) -> NavPhase {
        if self.shared.has_pending() {
            NavPhase::Computing
        } else if self.shared.snapshot().is_empty() {
            NavPhase::Idle
        } else {
            NavPhase::Published
        }
    }

    /// Whether the published result suggests teleporting instead of walking.
    pub fn suggests_teleport(&self) -> bool {
        self.result()
            .suggests_teleport(self.config.teleport_hint_distance)
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    /// Transport edges leaving `t`.
    pub fn transports_at(&self, t: Tile) -> &[TransportEdge] {
        self.map.transports().edges_from(t)
    }

    pub fn is_transport_location(&self, t: Tile) -> bool {
        self.map.transports().has_edges_from(t)
    }

    fn route_to(&mut self, player: Tile, target: Tile, kind: TargetKind) {
        if !self.start_cooldown() {
            return;
        }
        self.cancel_in_flight();

        if kind == TargetKind::Bank && self.landmarks.in_bank_area(player) {
            self.shared.replace(NavigationResult::cleared(kind));
            return;
        }
        self.schedule(Request::Route {
            player,
            target,
            kind,
        });
    }

    fn route_to_nearest_fixture(&mut self, input: &TickInput) {
        let mut broken: Vec<(FixtureId, Tile)> = input
            .fixture_statuses
            .iter()
            .filter(|(_, status)| **status == FixtureStatus::Broken)
            .filter_map(|(id, _)| self.landmarks.tile_of(*id).map(|t| (*id, t)))
            .collect();

        if broken.is_empty() {
            if self.last_fixture.take().is_some() {
                info!("no broken fixtures remain");
            }
            self.clear(TargetKind::NearestFixture);
            return;
        }

        if !self.start_cooldown() {
            return;
        }
        self.cancel_in_flight();

        // Listing order decides ties between equally near fixtures.
        broken.sort_unstable();
        let targets: Vec<Tile> = broken.iter().map(|(_, t)| *t).collect();
        let fixtures: HashMap<Tile, FixtureId> = broken.iter().map(|(id, t)| (*t, *id)).collect();
        let walls: WallOverrides = broken
            .iter()
            .filter_map(|(id, t)| input.wall_cache.get(id).map(|w| (*t, *w)))
            .collect();

        self.schedule(Request::Nearest {
            player: input.player,
            targets,
            walls,
            fixtures,
        });
    }

    /// Stamp the cooldown if it has elapsed. Returns whether it had.
    fn start_cooldown(&mut self) -> bool {
        let now = self.clock.now();
        if let Some(last) = self.last_scheduled {
            if now.duration_since(last) < self.config.recompute_cooldown() {
                return false;
            }
        }
        self.last_scheduled = Some(now);
        true
    }

    fn schedule(&mut self, request: Request) {
        let ctx = Context::new();
        let job = Job {
            ctx: ctx.clone(),
            generation: self.shared.advance(),
            limits: self.config.limits,
            request,
        };
        self.shared.job_queued();
        match self.worker.submit(job) {
            Ok(()) => self.in_flight = Some(ctx),
            Err(job) => {
                self.shared.job_done();
                warn_dropped(&job);
            }
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(ctx) = self.in_flight.take() {
            ctx.cancel();
        }
    }

    /// Cancel outstanding work and publish an empty result for `kind`.
    fn clear(&mut self, kind: TargetKind) {
        self.cancel_in_flight();
        let current = self.shared.snapshot();
        if current.is_empty() && current.target_kind == kind {
            return;
        }
        self.shared.replace(NavigationResult::cleared(kind));
    }

    fn observe_published(&mut self) {
        let current = self.shared.snapshot();
        if current.target_kind != TargetKind::NearestFixture {
            return;
        }
        let Some(fixture) = current.fixture else {
            return;
        };
        if self.last_fixture != Some(fixture) {
            info!(
                "nearest broken {fixture} is {} tiles away",
                current.distance
            );
            self.last_fixture = Some(fixture);
        } else {
            debug!("nearest broken {fixture} unchanged");
        }
    }
}

impl<C: Clock> Drop for Navigator<C> {
    fn drop(&mut self) {
        self.shut_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fixture::Fixture;
    use lamplight_core::{Direction, TileArea};
    use lamplight_paths::{CollisionGridBuilder, SearchLimits, TransportTable, chebyshev};
    use std::thread;
    use std::time::Duration;

    const COOLDOWN: Duration = Duration::from_millis(600);

    fn t(x: i32, y: i32) -> Tile {
        Tile::new(x, y, 0)
    }

    /// 20×10 room with lamps at (5,5) and (15,5) and a wiring machine at
    /// (18,8); none of them can be stood on.
    fn setup() -> (Navigator<ManualClock>, ManualClock) {
        let mut b = CollisionGridBuilder::new();
        b.open_area(TileArea::new(0, 0, 20, 10, 0));
        for tile in [t(5, 5), t(15, 5), t(18, 8)] {
            b.block(tile);
        }
        let map = Arc::new(MapData::new(b.build(), TransportTable::default()));
        let landmarks = Landmarks {
            bank: t(1, 8),
            wiring_machine: t(18, 8),
            bank_area: Some(TileArea::new(0, 7, 3, 10, 0)),
            fixtures: vec![
                Fixture {
                    id: FixtureId(1),
                    tile: t(5, 5),
                },
                Fixture {
                    id: FixtureId(2),
                    tile: t(15, 5),
                },
            ],
        };
        let clock = ManualClock::new();
        let nav = Navigator::with_clock(map, landmarks, NavConfig::default(), clock.clone())
            .unwrap();
        (nav, clock)
    }

    fn settle<C: Clock>(nav: &Navigator<C>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while nav.phase() == NavPhase::Computing {
            assert!(Instant::now() < deadline, "search did not finish in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn both_broken(player: Tile) -> TickInput {
        let mut input = TickInput::new(player, InventoryState::HasWorkingBulbs);
        input.fixture_statuses.insert(FixtureId(1), FixtureStatus::Broken);
        input.fixture_statuses.insert(FixtureId(2), FixtureStatus::Broken);
        input
    }

    #[test]
    fn routes_to_bank_without_bulbs() {
        let (mut nav, _clock) = setup();
        nav.update(&TickInput::new(t(12, 1), InventoryState::NoLightBulbs));
        assert_eq!(nav.target_kind(), TargetKind::Bank);
        settle(&nav);

        let r = nav.result();
        assert_eq!(r.target_kind, TargetKind::Bank);
        assert_eq!(r.path.first(), Some(&t(12, 1)));
        assert_eq!(r.destination(), Some(t(1, 8)));
        assert_eq!(r.distance, r.path.len() as i32);
        assert_eq!(r.distance, chebyshev(t(12, 1), t(1, 8)) + 1);
        assert_eq!(nav.phase(), NavPhase::Published);
    }

    #[test]
    fn nearest_of_two_fixtures() {
        let (mut nav, _clock) = setup();
        nav.update(&both_broken(t(2, 5)));
        assert_eq!(nav.target_kind(), TargetKind::NearestFixture);
        settle(&nav);

        let r = nav.result();
        assert_eq!(r.fixture, Some(FixtureId(1)));
        assert_eq!(r.destination(), Some(t(4, 5)));
        assert_eq!(r.distance, 3);
        assert!(!nav.suggests_teleport());
    }

    #[test]
    fn wall_cache_redirects_the_approach() {
        let (mut nav, _clock) = setup();
        let mut input = both_broken(t(2, 5));
        input.fixture_statuses.remove(&FixtureId(2));
        input.wall_cache.insert(
            FixtureId(1),
            [Direction::West, Direction::North, Direction::South]
                .into_iter()
                .collect(),
        );
        nav.update(&input);
        settle(&nav);
        assert_eq!(nav.result().destination(), Some(t(6, 5)));
    }

    #[test]
    fn updates_within_cooldown_keep_the_result() {
        let (mut nav, clock) = setup();
        let input = TickInput::new(t(8, 1), InventoryState::NoLightBulbs);
        nav.update(&input);
        settle(&nav);
        let first = nav.result();

        clock.advance(Duration::from_millis(100));
        nav.update(&input);
        assert_eq!(nav.phase(), NavPhase::Published);
        assert!(Arc::ptr_eq(&first, &nav.result()));

        clock.advance(COOLDOWN);
        nav.update(&input);
        settle(&nav);
        let second = nav.result();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn later_objective_replaces_earlier_one() {
        let (mut nav, clock) = setup();
        nav.update(&TickInput::new(t(8, 1), InventoryState::NoLightBulbs));
        clock.advance(COOLDOWN);
        nav.update(&TickInput::new(t(8, 1), InventoryState::OnlyEmptyBulbs));
        settle(&nav);

        let r = nav.result();
        assert_eq!(r.target_kind, TargetKind::WiringMachine);
        assert_eq!(nav.target_kind(), TargetKind::WiringMachine);
        // The machine itself is solid, so the path stops next to it.
        let end = r.destination().unwrap();
        assert_eq!(chebyshev(end, t(18, 8)), 1);
    }

    /// A 1000×1000 floor around the player at (500,500). The wiring machine
    /// sits in a room on level 1 that no transport reaches, so routing to it
    /// floods the whole floor before giving up.
    fn big_floor() -> (Navigator<ManualClock>, ManualClock) {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 1000, 1000, 0))
            .open_area(TileArea::new(0, 0, 5, 5, 1))
            .build();
        let landmarks = Landmarks {
            bank: t(498, 500),
            wiring_machine: Tile::new(2, 2, 1),
            bank_area: None,
            fixtures: Vec::new(),
        };
        let config = NavConfig {
            limits: SearchLimits {
                max_iterations: usize::MAX,
                max_path_length: 100_000,
            },
            ..NavConfig::default()
        };
        let clock = ManualClock::new();
        let map = Arc::new(MapData::new(grid, TransportTable::default()));
        let nav = Navigator::with_clock(map, landmarks, config, clock.clone()).unwrap();
        (nav, clock)
    }

    #[test]
    fn running_search_loses_to_a_newer_request() {
        let (mut nav, clock) = big_floor();
        nav.update(&TickInput::new(t(500, 500), InventoryState::OnlyEmptyBulbs));
        assert_eq!(nav.phase(), NavPhase::Computing);
        clock.advance(COOLDOWN);
        nav.update(&TickInput::new(t(500, 500), InventoryState::NoLightBulbs));
        settle(&nav);

        let r = nav.result();
        assert_eq!(r.target_kind, TargetKind::Bank);
        assert_eq!(r.path, vec![t(500, 500), t(499, 500), t(498, 500)]);
        assert_eq!(nav.phase(), NavPhase::Published);
    }

    #[test]
    fn running_search_is_not_published_after_a_clear() {
        let (mut nav, _clock) = big_floor();
        nav.update(&TickInput::new(t(500, 500), InventoryState::OnlyEmptyBulbs));
        nav.update(&TickInput::new(t(500, 500), InventoryState::Unknown));
        settle(&nav);
        assert_eq!(*nav.result(), NavigationResult::cleared(TargetKind::None));
        assert_eq!(nav.phase(), NavPhase::Idle);
    }

    #[test]
    fn extreme_player_position_keeps_the_worker_alive() {
        let (mut nav, clock) = setup();
        nav.update(&TickInput::new(
            Tile::new(i32::MIN, 0, 0),
            InventoryState::NoLightBulbs,
        ));
        settle(&nav);
        let r = nav.result();
        assert_eq!(r.path, vec![Tile::new(i32::MIN, 0, 0), t(1, 8)]);
        assert_eq!(r.distance, i32::MAX);

        clock.advance(COOLDOWN);
        nav.update(&TickInput::new(t(12, 1), InventoryState::NoLightBulbs));
        settle(&nav);
        let r = nav.result();
        assert_eq!(r.target_kind, TargetKind::Bank);
        assert_eq!(r.path.first(), Some(&t(12, 1)));
        assert_eq!(r.destination(), Some(t(1, 8)));
        assert_eq!(nav.phase(), NavPhase::Published);
    }

    #[test]
    fn live_wiring_machine_position_wins() {
        let (mut nav, _clock) = setup();
        let mut input = TickInput::new(t(8, 1), InventoryState::OnlyEmptyBulbs);
        input.wiring_machine = Some(t(12, 1));
        nav.update(&input);
        settle(&nav);
        assert_eq!(nav.result().destination(), Some(t(12, 1)));
    }

    #[test]
    fn disabling_show_path_clears_at_once() {
        let (mut nav, clock) = setup();
        nav.update(&both_broken(t(2, 5)));
        nav.set_config(NavConfig {
            show_path: false,
            ..NavConfig::default()
        });
        let r = nav.result();
        assert!(r.is_empty());
        assert_eq!(r.distance, 0);

        settle(&nav);
        assert!(nav.result().is_empty());

        clock.advance(COOLDOWN);
        nav.update(&both_broken(t(2, 5)));
        assert_eq!(nav.phase(), NavPhase::Idle);
        assert_eq!(nav.target_kind(), TargetKind::NearestFixture);
    }

    #[test]
    fn unreachable_utility_falls_back_to_straight_line() {
        let (mut nav, _clock) = setup();
        let mut input = TickInput::new(t(8, 1), InventoryState::OnlyEmptyBulbs);
        input.wiring_machine = Some(t(40, 30));
        nav.update(&input);
        settle(&nav);

        let r = nav.result();
        assert_eq!(r.path, vec![t(8, 1), t(40, 30)]);
        assert_eq!(r.distance, 32);
        assert_eq!(r.target_kind, TargetKind::WiringMachine);
    }

    #[test]
    fn no_broken_fixtures_clears_without_cooldown() {
        let (mut nav, _clock) = setup();
        nav.update(&both_broken(t(2, 5)));
        settle(&nav);
        assert!(!nav.result().is_empty());

        let mut input = both_broken(t(2, 5));
        input.fixture_statuses.insert(FixtureId(1), FixtureStatus::Working);
        input.fixture_statuses.insert(FixtureId(2), FixtureStatus::Unknown);
        nav.update(&input);
        let r = nav.result();
        assert!(r.is_empty());
        assert_eq!(r.target_kind, TargetKind::NearestFixture);
        assert!(nav.suggests_teleport());
    }

    #[test]
    fn standing_in_the_bank_area_needs_no_path() {
        let (mut nav, _clock) = setup();
        nav.update(&TickInput::new(t(2, 8), InventoryState::NoLightBulbs));
        assert_eq!(nav.phase(), NavPhase::Idle);
        let r = nav.result();
        assert!(r.is_empty());
        assert_eq!(r.target_kind, TargetKind::Bank);
    }

    #[test]
    fn unknown_inventory_clears_the_target() {
        let (mut nav, _clock) = setup();
        nav.update(&TickInput::new(t(8, 1), InventoryState::NoLightBulbs));
        nav.update(&TickInput::new(t(8, 1), InventoryState::Unknown));
        assert_eq!(nav.target_kind(), TargetKind::None);
        settle(&nav);
        let r = nav.result();
        assert!(r.is_empty());
        assert_eq!(r.target_kind, TargetKind::None);
    }

    #[test]
    fn clear_path_and_target_resets_everything() {
        let (mut nav, _clock) = setup();
        nav.update(&both_broken(t(2, 5)));
        settle(&nav);
        nav.clear_path_and_target();
        assert_eq!(nav.target_kind(), TargetKind::None);
        assert_eq!(*nav.result(), NavigationResult::cleared(TargetKind::None));
    }

    #[test]
    fn requests_after_shut_down_are_dropped() {
        let (mut nav, _clock) = setup();
        nav.shut_down();
        nav.update(&TickInput::new(t(8, 1), InventoryState::NoLightBulbs));
        assert_eq!(nav.phase(), NavPhase::Idle);
        nav.shut_down();
    }

    #[test]
    fn transport_queries_pass_through() {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 4, 4, 0))
            .build();
        let transports = TransportTable::new([TransportEdge::new(t(1, 1), Tile::new(1, 1, 1), 2.0)]);
        let landmarks = Landmarks {
            bank: t(0, 0),
            wiring_machine: t(3, 3),
            bank_area: None,
            fixtures: Vec::new(),
        };
        let nav = Navigator::new(
            Arc::new(MapData::new(grid, transports)),
            landmarks,
            NavConfig::default(),
        )
        .unwrap();
        assert!(nav.is_transport_location(t(1, 1)));
        assert_eq!(nav.transports_at(t(1, 1)).len(), 1);
        assert!(nav.transports_at(t(2, 2)).is_empty());
    }
}
