//! The published navigation snapshot and the slot it lives in.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lamplight_core::{Context, Tile};
use lamplight_paths::chebyshev;

use crate::fixture::FixtureId;

/// What the published path leads to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetKind {
    #[default]
    None,
    Bank,
    WiringMachine,
    NearestFixture,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Bank => "bank",
            Self::WiringMachine => "wiring machine",
            Self::NearestFixture => "nearest fixture",
        };
        f.write_str(s)
    }
}

/// A complete, immutable navigation result.
///
/// `distance` is the number of tiles in `path`, or 0 when there is no
/// path. The one exception is [`fallback`](Self::fallback), which carries
/// the straight-line distance to a target no search could reach.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavigationResult {
    pub path: Vec<Tile>,
    pub distance: i32,
    pub target_kind: TargetKind,
    /// Fixture the path leads to, for [`TargetKind::NearestFixture`].
    pub fixture: Option<FixtureId>,
}

impl NavigationResult {
    /// No path toward `kind`.
    pub fn cleared(kind: TargetKind) -> Self {
        Self {
            path: Vec::new(),
            distance: 0,
            target_kind: kind,
            fixture: None,
        }
    }

    /// A searched path; distance is its tile count.
    pub fn found(path: Vec<Tile>, kind: TargetKind, fixture: Option<FixtureId>) -> Self {
        let distance = path.len() as i32;
        Self {
            path,
            distance,
            target_kind: kind,
            fixture,
        }
    }

    /// Two-point stand-in path used when a utility target is unreachable.
    ///
    /// The distance is the Chebyshev distance over `(x, y)` alone. Levels
    /// are ignored, so a target straight above or below the player on
    /// another level reports a distance of 0. Far-apart coordinates
    /// saturate at `i32::MAX`.
    pub fn fallback(player: Tile, target: Tile, kind: TargetKind) -> Self {
        Self {
            path: vec![player, target],
            distance: chebyshev(player, target),
            target_kind: kind,
            fixture: None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Last tile of the path.
    pub fn destination(&self) -> Option<Tile> {
        self.path.last().copied()
    }

    /// Whether teleporting is likely faster than walking to the nearest
    /// fixture. `hint_distance` of 0 disables the hint.
    pub fn suggests_teleport(&self, hint_distance: i32) -> bool {
        self.target_kind == TargetKind::NearestFixture
            && hint_distance > 0
            && (self.distance == 0 || self.distance > hint_distance)
    }
}

/// State shared between the navigator and its worker.
///
/// Every scheduled job and every reset takes a fresh generation. A worker
/// result is swapped in only while its generation is still the latest and
/// its context has not been cancelled, both checked under the publish lock.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    generation: AtomicU64,
    published: Mutex<Arc<NavigationResult>>,
    pending: AtomicUsize,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Arc<NavigationResult>> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new generation and return it.
    pub(crate) fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Publish `result` from generation `generation`. Returns whether it
    /// was published.
    pub(crate) fn publish_if_current(
        &self,
        generation: u64,
        ctx: &Context,
        result: NavigationResult,
    ) -> bool {
        let mut slot = self.slot();
        if self.generation.load(Ordering::Acquire) != generation || ctx.is_done() {
            return false;
        }
        *slot = Arc::new(result);
        true
    }

    /// Supersede any in-flight job and publish `result` immediately.
    pub(crate) fn replace(&self, result: NavigationResult) {
        self.advance();
        *self.slot() = Arc::new(result);
    }

    pub(crate) fn snapshot(&self) -> Arc<NavigationResult> {
        Arc::clone(&self.slot())
    }

    pub(crate) fn job_queued(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn job_done(&self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire) > 0
    }
}
