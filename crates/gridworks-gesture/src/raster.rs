//! Cell rasterization for line and rectangle gestures.
//!
//! All functions are pure and return materialized, ordered cell lists; the
//! order is the commit order.

use gridworks_core::geometry::{GridBounds, GridPosition};

/// Snap `end` onto the nearest of the 8 compass directions from `start`.
///
/// Horizontal when `|dx| > 2|dy|`, vertical when `|dy| > 2|dx|`, otherwise
/// the diagonal matching the signs of `dx` and `dy`. The snapped length is
/// `max(|dx|, |dy|)`.
pub fn snap_direction(start: GridPosition, end: GridPosition) -> GridPosition {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let (adx, ady) = (dx.abs(), dy.abs());
    let len = adx.max(ady);

    if adx > 2 * ady {
        GridPosition::new(start.x + dx.signum() * len, start.y)
    } else if ady > 2 * adx {
        GridPosition::new(start.x, start.y + dy.signum() * len)
    } else {
        GridPosition::new(start.x + dx.signum() * len, start.y + dy.signum() * len)
    }
}

/// The snapped line endpoint, clamped into `bounds`.
pub fn snap_line_end(start: GridPosition, end: GridPosition, bounds: GridBounds) -> GridPosition {
    bounds.clamp(snap_direction(start, end))
}

/// Integer Bresenham line from `start` to `end`, both inclusive, in
/// visitation order.
pub fn bresenham_line(start: GridPosition, end: GridPosition) -> Vec<GridPosition> {
    let dx = (end.x - start.x).abs();
    let dy = -(end.y - start.y).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity(dx.max(-dy) as usize + 1);
    let (mut x, mut y) = (start.x, start.y);
    loop {
        cells.push(GridPosition::new(x, y));
        if x == end.x && y == end.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// Cells of a line gesture: snapped, clamped, then rasterized.
pub fn line_cells(start: GridPosition, end: GridPosition, bounds: GridBounds) -> Vec<GridPosition> {
    bresenham_line(start, snap_line_end(start, end, bounds))
}

/// The inclusive axis-aligned rectangle spanned by `a` and `b`, clipped to
/// `bounds`. Ordered x ascending, then y ascending within each column.
pub fn rect_cells(a: GridPosition, b: GridPosition, bounds: GridBounds) -> Vec<GridPosition> {
    if bounds.width == 0 || bounds.height == 0 {
        return Vec::new();
    }
    let min_x = a.x.min(b.x).max(0);
    let max_x = a.x.max(b.x).min(bounds.width as i32 - 1);
    let min_y = a.y.min(b.y).max(0);
    let max_y = a.y.max(b.y).min(bounds.height as i32 - 1);

    let mut cells = Vec::new();
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            cells.push(GridPosition::new(x, y));
        }
    }
    cells
}
