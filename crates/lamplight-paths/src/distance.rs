use lamplight_core::Tile;

/// Manhattan (L1) distance between two tiles, ignoring their levels.
///
/// Saturates at `i32::MAX` for tiles further apart than that.
#[inline]
pub fn manhattan(a: Tile, b: Tile) -> i32 {
    saturate(a.x.abs_diff(b.x).saturating_add(a.y.abs_diff(b.y)))
}

/// Chebyshev (L∞) distance between two tiles, ignoring their levels.
///
/// Saturates at `i32::MAX` for tiles further apart than that.
#[inline]
pub fn chebyshev(a: Tile, b: Tile) -> i32 {
    saturate(a.x.abs_diff(b.x).max(a.y.abs_diff(b.y)))
}

#[inline]
fn saturate(d: u32) -> i32 {
    i32::try_from(d).unwrap_or(i32::MAX)
}
