use std::collections::{HashMap, VecDeque};

use lamplight_core::{Context, Direction, Tile};
use log::debug;

use crate::search::{Cancelled, NearestPath, PathSearch, WallOverrides};
use crate::traits::Pather;

impl PathSearch {
    /// Path from `start` to a tile next to the nearest reachable target.
    ///
    /// Every step, transports included, counts as one. Returns an empty path
    /// when no target can be reached within the search limits.
    pub fn find_nearest_path(
        &self,
        start: Tile,
        targets: &[Tile],
        walls: &WallOverrides,
    ) -> Vec<Tile> {
        self.find_nearest(start, targets, walls)
            .map(|n| n.path)
            .unwrap_or_default()
    }

    /// Like [`find_nearest_path`](Self::find_nearest_path), also reporting
    /// which target the path leads to.
    pub fn find_nearest(
        &self,
        start: Tile,
        targets: &[Tile],
        walls: &WallOverrides,
    ) -> Option<NearestPath> {
        self.find_nearest_with(start, targets, walls, &Context::new())
            .unwrap_or_default()
    }

    /// Cancellable nearest-target search.
    ///
    /// A target is reached through any of its cardinal neighbours that is
    /// not listed in `walls` for that target and can be stood on. When two
    /// targets share an approach tile, the one listed first owns it. Among
    /// equally near approach tiles, the first discovered wins.
    pub fn find_nearest_with(
        &self,
        start: Tile,
        targets: &[Tile],
        walls: &WallOverrides,
        ctx: &Context,
    ) -> Result<Option<NearestPath>, Cancelled> {
        if ctx.is_done() {
            return Err(Cancelled);
        }
        if targets.contains(&start) {
            return Ok(Some(NearestPath {
                path: vec![start],
                target: start,
            }));
        }

        let mut goals: HashMap<Tile, Tile> = HashMap::new();
        for &target in targets {
            let walled = walls.get(&target).copied().unwrap_or_default();
            for d in Direction::CARDINALS {
                if walled.contains(d) {
                    continue;
                }
                let adjacent = target.step(d);
                if !self.map.valid_neighbors(adjacent).is_empty() {
                    goals.entry(adjacent).or_insert(target);
                }
            }
        }
        if goals.is_empty() {
            debug!("no reachable tiles adjacent to {} targets", targets.len());
            return Ok(None);
        }

        let found = bfs_path(
            self.map.as_ref(),
            start,
            |t| goals.contains_key(&t),
            self.limits.max_iterations,
            ctx,
        )?;
        Ok(found.and_then(|path| {
            let target = *goals.get(path.last()?)?;
            Some(NearestPath { path, target })
        }))
    }
}

/// Breadth-first search from `start` until a tile satisfying `is_goal` is
/// dequeued. Returns the path to it, or `None` if the frontier empties or
/// `max_iterations` tiles have been expanded first.
pub(crate) fn bfs_path<P: Pather>(
    pather: &P,
    start: Tile,
    is_goal: impl Fn(Tile) -> bool,
    max_iterations: usize,
    ctx: &Context,
) -> Result<Option<Vec<Tile>>, Cancelled> {
    let mut parents: HashMap<Tile, Option<Tile>> = HashMap::new();
    let mut queue: VecDeque<Tile> = VecDeque::new();
    parents.insert(start, None);
    queue.push_back(start);

    let mut nbuf: Vec<Tile> = Vec::with_capacity(10);
    let mut iterations = 0;

    while let Some(current) = queue.pop_front() {
        if ctx.is_done() {
            return Err(Cancelled);
        }
        if iterations >= max_iterations {
            debug!("nearest search hit max iterations ({max_iterations})");
            return Ok(None);
        }
        iterations += 1;

        if is_goal(current) {
            let mut path = vec![current];
            let mut cur = current;
            while let Some(&Some(parent)) = parents.get(&cur) {
                path.push(parent);
                cur = parent;
            }
            path.reverse();
            return Ok(Some(path));
        }

        nbuf.clear();
        pather.neighbors(current, &mut nbuf);
        for &n in nbuf.iter() {
            if parents.contains_key(&n) {
                continue;
            }
            parents.insert(n, Some(current));
            queue.push_back(n);
        }
    }
    Ok(None)
}
