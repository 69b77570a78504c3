use lamplight_core::Tile;

/// Minimal pathfinding interface: neighbour enumeration.
pub trait Pather {
    /// Append neighbours of `t` into `buf`. The caller clears `buf` before calling.
    fn neighbors(&self, t: Tile, buf: &mut Vec<Tile>);
}
