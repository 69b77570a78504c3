use std::collections::{BinaryHeap, HashMap};

use lamplight_core::{Context, Tile};
use log::debug;

use crate::distance::{chebyshev, manhattan};
use crate::map::{MapData, Step, StepKind};
use crate::search::{Cancelled, Node, NodeRef, PathSearch, reconstruct};

const DIAGONAL_COST: f32 = 1.01;
const BRIDGE_BIAS: f32 = 0.1;
const TRANSPORT_DISCOUNT: f32 = 0.9;
const MIN_LEVEL_CHANGE_COST: f32 = 2.0;

impl PathSearch {
    /// Compute a path from `start` to `end` using a bounded A*.
    ///
    /// Returns the full path (including both endpoints), or an empty path if
    /// none was found within the search limits.
    pub fn find_path(&self, start: Tile, end: Tile) -> Vec<Tile> {
        self.find_path_with(start, end, &Context::new())
            .unwrap_or_default()
    }

    /// Like [`find_path`](Self::find_path), but gives up with [`Cancelled`]
    /// as soon as `ctx` is cancelled.
    pub fn find_path_with(
        &self,
        start: Tile,
        end: Tile,
        ctx: &Context,
    ) -> Result<Vec<Tile>, Cancelled> {
        if ctx.is_done() {
            return Err(Cancelled);
        }
        if start == end {
            return Ok(vec![start]);
        }

        let max_len = self.limits.max_path_length;
        let rough = manhattan(start, end);
        if rough as usize > max_len {
            debug!("path rejected, endpoints too far apart: {rough} > {max_len}");
            return Ok(Vec::new());
        }

        let cross_level = start.level != end.level;
        let goal = if cross_level {
            end
        } else {
            match self.approach_tile(start, end) {
                Some(t) => t,
                None => {
                    debug!("no walkable approach to {end}");
                    return Ok(Vec::new());
                }
            }
        };
        if goal == start {
            return Ok(vec![start]);
        }

        let model = CostModel::new(&self.map, goal);
        if ctx.is_done() {
            return Err(Cancelled);
        }

        let mut nodes: HashMap<Tile, Node> = HashMap::new();
        let mut open: BinaryHeap<NodeRef> = BinaryHeap::new();
        let mut seq: u64 = 0;

        nodes.insert(
            start,
            Node {
                g: 0.0,
                parent: None,
                closed: false,
            },
        );
        open.push(NodeRef {
            tile: start,
            f: model.estimate(start),
            g: 0.0,
            seq,
        });

        let mut steps: Vec<Step> = Vec::with_capacity(10);
        let mut iterations = 0;

        loop {
            if ctx.is_done() {
                return Err(Cancelled);
            }
            if iterations >= self.limits.max_iterations {
                debug!("path search hit max iterations ({iterations})");
                return Ok(Vec::new());
            }
            let Some(current) = open.pop() else {
                debug!("path search failed, open set exhausted after {iterations} iterations");
                return Ok(Vec::new());
            };

            let ct = current.tile;
            let Some(node) = nodes.get_mut(&ct) else {
                continue;
            };
            // Skip stale entries.
            if node.closed || current.g > node.g {
                continue;
            }
            node.closed = true;
            let current_g = node.g;
            iterations += 1;

            if ct == goal {
                return Ok(self.finish(reconstruct(&nodes, ct)));
            }

            if cross_level {
                if ct.level == goal.level && chebyshev(ct, goal) <= 1 {
                    return Ok(self.finish(reconstruct(&nodes, ct)));
                }
            } else if current_g <= 3.0
                && manhattan(ct, goal) <= 1
                && self.map.valid_neighbors(ct).contains(&goal)
            {
                let mut path = reconstruct(&nodes, ct);
                path.push(goal);
                return Ok(self.finish(path));
            }

            steps.clear();
            self.map.steps(ct, &mut steps);

            for step in steps.iter() {
                let tentative_g = current_g + model.step_cost(ct, step);
                if tentative_g > max_len as f32 {
                    continue;
                }
                match nodes.get_mut(&step.to) {
                    Some(n) if tentative_g >= n.g => continue,
                    Some(n) => {
                        n.g = tentative_g;
                        n.parent = Some(ct);
                        n.closed = false;
                    }
                    None => {
                        nodes.insert(
                            step.to,
                            Node {
                                g: tentative_g,
                                parent: Some(ct),
                                closed: false,
                            },
                        );
                    }
                }
                seq += 1;
                open.push(NodeRef {
                    tile: step.to,
                    f: tentative_g + model.estimate(step.to),
                    g: tentative_g,
                    seq,
                });
            }
        }
    }

    /// The tile a same-level search should actually aim for.
    ///
    /// A tile that can be stood on is its own approach. Otherwise (a lamp,
    /// a machine) the cardinal neighbour closest to `start` that connects
    /// back toward `start` is used instead.
    fn approach_tile(&self, start: Tile, end: Tile) -> Option<Tile> {
        if !self.map.valid_neighbors(end).is_empty() {
            return Some(end);
        }
        let mut best: Option<(i32, Tile)> = None;
        for nearby in end.neighbors_4() {
            let nearby_dist = manhattan(start, nearby);
            let connected = self
                .map
                .valid_neighbors(nearby)
                .iter()
                .any(|n| n.level == nearby.level && manhattan(start, *n) <= nearby_dist.saturating_add(2));
            if !connected {
                continue;
            }
            if best.is_none_or(|(d, _)| nearby_dist < d) {
                best = Some((nearby_dist, nearby));
            }
        }
        best.map(|(_, t)| t)
    }

    fn finish(&self, path: Vec<Tile>) -> Vec<Tile> {
        if path.len() > self.limits.max_path_length {
            debug!(
                "path rejected, {} tiles exceeds {}",
                path.len(),
                self.limits.max_path_length
            );
            return Vec::new();
        }
        path
    }
}

/// Step costs and heuristic for one search toward a fixed goal.
struct CostModel<'a> {
    map: &'a MapData,
    goal: Tile,
    /// Origins of transports that land on the goal's level from elsewhere.
    bridges: Vec<Tile>,
}

impl<'a> CostModel<'a> {
    fn new(map: &'a MapData, goal: Tile) -> Self {
        let mut bridges: Vec<Tile> = map
            .transports()
            .iter()
            .filter(|e| e.changes_level() && e.destination.level == goal.level)
            .map(|e| e.origin)
            .collect();
        bridges.dedup();
        Self { map, goal, bridges }
    }

    /// Chebyshev distance on the goal's level; across levels, the cheapest
    /// walk-to-transport plus transport-to-goal estimate.
    fn estimate(&self, from: Tile) -> f32 {
        let to = self.goal;
        let direct = chebyshev(from, to);
        if from.level == to.level {
            return direct as f32;
        }
        self.map
            .transports()
            .iter()
            .filter(|e| e.destination.level == to.level || e.origin.level == from.level)
            .map(|e| chebyshev(from, e.origin).saturating_add(chebyshev(e.destination, to)))
            .min()
            .unwrap_or(direct) as f32
    }

    fn step_cost(&self, from: Tile, step: &Step) -> f32 {
        match step.kind {
            StepKind::Transport { cost } => {
                if step.to.level == self.goal.level {
                    (cost * TRANSPORT_DISCOUNT).max(1.0)
                } else {
                    cost.max(MIN_LEVEL_CHANGE_COST)
                }
            }
            StepKind::Walk { diagonal } => {
                let base = if diagonal { DIAGONAL_COST } else { 1.0 };
                if from.level == self.goal.level {
                    return base;
                }
                base + self.bridge_bias(from, step.to)
            }
        }
    }

    /// Nudge walking off the goal level toward the nearest bridge.
    fn bridge_bias(&self, from: Tile, to: Tile) -> f32 {
        let (Some(before), Some(after)) = (self.bridge_distance(from), self.bridge_distance(to))
        else {
            return 0.0;
        };
        match after.cmp(&before) {
            std::cmp::Ordering::Less => -BRIDGE_BIAS,
            std::cmp::Ordering::Greater => BRIDGE_BIAS,
            std::cmp::Ordering::Equal => 0.0,
        }
    }

    /// Distance from `t` to the closest bridge on its level.
    fn bridge_distance(&self, t: Tile) -> Option<i32> {
        self.bridges
            .iter()
            .filter(|b| b.level == t.level)
            .map(|b| chebyshev(t, *b))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionGridBuilder;
    use crate::transport::{TransportEdge, TransportTable};
    use lamplight_core::TileArea;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};
    use std::sync::Arc;

    fn open_search(w: i32, h: i32) -> PathSearch {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, w, h, 0))
            .build();
        PathSearch::new(Arc::new(MapData::new(grid, TransportTable::default())))
    }

    fn assert_contiguous(search: &PathSearch, path: &[Tile]) {
        for pair in path.windows(2) {
            assert!(
                search.map().valid_neighbors(pair[0]).contains(&pair[1]),
                "{} -> {} is not a legal step",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn same_tile() {
        let s = open_search(5, 5);
        let t = Tile::new(2, 2, 0);
        assert_eq!(s.find_path(t, t), vec![t]);
    }

    #[test]
    fn open_grid_corner_to_corner() {
        let s = open_search(5, 5);
        let path = s.find_path(Tile::new(0, 0, 0), Tile::new(4, 4, 0));
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&Tile::new(0, 0, 0)));
        assert_eq!(path.last(), Some(&Tile::new(4, 4, 0)));
        assert_contiguous(&s, &path);
    }

    #[test]
    fn open_grid_length_is_chebyshev_plus_one() {
        let s = open_search(30, 30);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let a = Tile::new(rng.random_range(0..30), rng.random_range(0..30), 0);
            let b = Tile::new(rng.random_range(0..30), rng.random_range(0..30), 0);
            let path = s.find_path(a, b);
            assert_eq!(path.len() as i32, chebyshev(a, b) + 1, "{a} -> {b}");
            assert_eq!(path.first(), Some(&a));
            assert_eq!(path.last(), Some(&b));
            assert_contiguous(&s, &path);
        }
    }

    #[test]
    fn routes_around_a_wall() {
        // A wall along x = 2 with a single gap at y = 4.
        let mut b = CollisionGridBuilder::new();
        b.open_area(TileArea::new(0, 0, 5, 5, 0));
        for y in 0..4 {
            b.block(Tile::new(2, y, 0));
        }
        let s = PathSearch::new(Arc::new(MapData::new(b.build(), TransportTable::default())));
        let path = s.find_path(Tile::new(0, 0, 0), Tile::new(4, 0, 0));
        assert!(!path.is_empty());
        assert!(path.contains(&Tile::new(2, 4, 0)));
        assert_eq!(path.last(), Some(&Tile::new(4, 0, 0)));
        assert_contiguous(&s, &path);
    }

    #[test]
    fn unstandable_target_is_approached_from_a_neighbour() {
        let mut b = CollisionGridBuilder::new();
        b.open_area(TileArea::new(0, 0, 7, 7, 0));
        b.block(Tile::new(5, 3, 0));
        let s = PathSearch::new(Arc::new(MapData::new(b.build(), TransportTable::default())));
        let path = s.find_path(Tile::new(0, 3, 0), Tile::new(5, 3, 0));
        assert_eq!(path.last(), Some(&Tile::new(4, 3, 0)));
        assert_eq!(path.len(), 5);
        assert_contiguous(&s, &path);
    }

    #[test]
    fn enclosed_target_has_no_path() {
        let mut b = CollisionGridBuilder::new();
        b.open_area(TileArea::new(0, 0, 5, 5, 0));
        b.block(Tile::new(3, 3, 0));
        for t in Tile::new(3, 3, 0).neighbors_4() {
            b.block(t);
        }
        let s = PathSearch::new(Arc::new(MapData::new(b.build(), TransportTable::default())));
        assert!(s.find_path(Tile::new(0, 0, 0), Tile::new(3, 3, 0)).is_empty());
    }

    #[test]
    fn disconnected_regions_fail() {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 3, 3, 0))
            .open_area(TileArea::new(10, 0, 13, 3, 0))
            .build();
        let s = PathSearch::new(Arc::new(MapData::new(grid, TransportTable::default())));
        assert!(s.find_path(Tile::new(0, 0, 0), Tile::new(11, 1, 0)).is_empty());
    }

    #[test]
    fn rejects_far_endpoints_without_searching() {
        let s = open_search(4, 4);
        assert!(s.find_path(Tile::new(0, 0, 0), Tile::new(600, 0, 0)).is_empty());
    }

    #[test]
    fn iteration_cap_gives_up() {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 40, 40, 0))
            .build();
        let s = PathSearch::with_limits(
            Arc::new(MapData::new(grid, TransportTable::default())),
            crate::SearchLimits {
                max_iterations: 5,
                max_path_length: 512,
            },
        );
        assert!(s.find_path(Tile::new(0, 0, 0), Tile::new(30, 30, 0)).is_empty());
    }

    #[test]
    fn path_length_cap_rejects_long_paths() {
        let s = PathSearch::with_limits(
            open_search(20, 1).map().clone(),
            crate::SearchLimits {
                max_iterations: 10_000,
                max_path_length: 10,
            },
        );
        assert!(s.find_path(Tile::new(0, 0, 0), Tile::new(15, 0, 0)).is_empty());
        assert_eq!(s.find_path(Tile::new(0, 0, 0), Tile::new(8, 0, 0)).len(), 9);
    }

    fn two_floors() -> PathSearch {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 10, 10, 0))
            .open_area(TileArea::new(0, 0, 10, 10, 1))
            .build();
        let transports = TransportTable::new([
            TransportEdge::new(Tile::new(8, 8, 0), Tile::new(8, 8, 1), 3.0),
            TransportEdge::new(Tile::new(8, 8, 1), Tile::new(8, 8, 0), 3.0),
        ]);
        PathSearch::new(Arc::new(MapData::new(grid, transports)))
    }

    #[test]
    fn cross_level_uses_transport_and_stops_next_to_goal() {
        let s = two_floors();
        let goal = Tile::new(5, 5, 1);
        let path = s.find_path(Tile::new(1, 1, 0), goal);
        assert!(!path.is_empty());
        assert!(path.contains(&Tile::new(8, 8, 0)));
        assert!(path.contains(&Tile::new(8, 8, 1)));
        let last = *path.last().unwrap();
        assert_eq!(last.level, 1);
        assert!(chebyshev(last, goal) <= 1);
        assert_contiguous(&s, &path);
    }

    #[test]
    fn cross_level_without_transport_fails() {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 5, 5, 0))
            .open_area(TileArea::new(0, 0, 5, 5, 1))
            .build();
        let s = PathSearch::new(Arc::new(MapData::new(grid, TransportTable::default())));
        assert!(s.find_path(Tile::new(0, 0, 0), Tile::new(3, 3, 1)).is_empty());
    }

    #[test]
    fn cheaper_transport_wins() {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 10, 3, 0))
            .open_area(TileArea::new(0, 0, 10, 3, 1))
            .build();
        // Both ladders are equally far from the start; the slow one is
        // closer to the goal but costs far more to climb.
        let transports = TransportTable::new([
            TransportEdge::new(Tile::new(3, 1, 0), Tile::new(3, 1, 1), 40.0),
            TransportEdge::new(Tile::new(7, 1, 0), Tile::new(7, 1, 1), 1.0),
        ]);
        let s = PathSearch::new(Arc::new(MapData::new(grid, transports)));
        let path = s.find_path(Tile::new(5, 1, 0), Tile::new(2, 1, 1));
        assert!(path.contains(&Tile::new(7, 1, 0)));
        assert!(path.contains(&Tile::new(7, 1, 1)));
        assert!(!path.contains(&Tile::new(3, 1, 0)));
    }

    #[test]
    fn cancelled_before_start() {
        let s = open_search(5, 5);
        let ctx = Context::new();
        ctx.cancel();
        assert_eq!(
            s.find_path_with(Tile::new(0, 0, 0), Tile::new(4, 4, 0), &ctx),
            Err(Cancelled)
        );
    }

    #[test]
    fn cancelled_while_searching() {
        // Cross-level with no transports: the whole floor is explored before
        // the search gives up, which leaves plenty of time to cancel it.
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 1000, 1000, 0))
            .open_area(TileArea::new(0, 0, 5, 5, 1))
            .build();
        let s = PathSearch::with_limits(
            Arc::new(MapData::new(grid, TransportTable::default())),
            crate::SearchLimits {
                max_iterations: usize::MAX,
                max_path_length: 100_000,
            },
        );
        let ctx = Context::new();
        let canceller = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(5));
                ctx.cancel();
            })
        };
        let outcome = s.find_path_with(Tile::new(500, 500, 0), Tile::new(2, 2, 1), &ctx);
        canceller.join().unwrap();
        assert_eq!(outcome, Err(Cancelled));
    }

    #[test]
    fn bridge_bias_measures_each_side_against_its_closest_bridge() {
        let grid = CollisionGridBuilder::new()
            .open_area(TileArea::new(0, 0, 12, 1, 0))
            .open_area(TileArea::new(0, 0, 12, 1, 1))
            .build();
        let transports = TransportTable::new([
            TransportEdge::new(Tile::new(0, 0, 0), Tile::new(0, 0, 1), 2.0),
            TransportEdge::new(Tile::new(10, 0, 0), Tile::new(10, 0, 1), 2.0),
            // Same-level edges never count as bridges.
            TransportEdge::new(Tile::new(6, 0, 0), Tile::new(11, 0, 0), 2.0),
        ]);
        let map = MapData::new(grid, transports);
        let model = CostModel::new(&map, Tile::new(5, 0, 1));
        assert_eq!(model.bridges.len(), 2);

        let walk = |to: Tile| Step {
            to,
            kind: StepKind::Walk { diagonal: false },
        };
        // Equidistant from both bridges: stepping east nears the eastern one.
        let from = Tile::new(5, 0, 0);
        assert_eq!(model.step_cost(from, &walk(Tile::new(6, 0, 0))), 1.0 - BRIDGE_BIAS);
        assert_eq!(model.step_cost(from, &walk(Tile::new(4, 0, 0))), 1.0 - BRIDGE_BIAS);
        // Moving away from the only close bridge is penalised.
        let from = Tile::new(1, 0, 0);
        assert_eq!(model.step_cost(from, &walk(Tile::new(2, 0, 0))), 1.0 + BRIDGE_BIAS);
        // On the goal level there is no bias.
        let from = Tile::new(1, 0, 1);
        assert_eq!(model.step_cost(from, &walk(Tile::new(2, 0, 1))), 1.0);
    }

    #[test]
    fn transport_queries() {
        let s = two_floors();
        assert!(s.is_transport_location(Tile::new(8, 8, 0)));
        assert!(!s.is_transport_location(Tile::new(8, 7, 0)));
        assert_eq!(s.transports_at(Tile::new(8, 8, 1)).len(), 1);
        assert!(s.transports_at(Tile::new(0, 0, 0)).is_empty());
    }
}
