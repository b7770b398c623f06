//! Grid geometry: cells, bounds, directions, and multi-cell footprints.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A cell on the 2D grid. May lie outside a grid's bounds; use
/// [`GridBounds::contains`] to check validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell one step away in `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Chebyshev (chessboard) distance to another position.
    pub fn chebyshev_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }
}

/// The fixed size of a grid. Valid cells are `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridBounds {
    pub width: u32,
    pub height: u32,
}

impl GridBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, cell: GridPosition) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// Clamp a cell into the bounds. Meaningless on an empty grid.
    pub fn clamp(&self, cell: GridPosition) -> GridPosition {
        let max_x = self.width.saturating_sub(1) as i32;
        let max_y = self.height.saturating_sub(1) as i32;
        GridPosition::new(cell.x.clamp(0, max_x), cell.y.clamp(0, max_y))
    }

    /// Number of cells in the grid.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Row-major dense index of an in-bounds cell.
    pub fn index_of(&self, cell: GridPosition) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some(cell.y as usize * self.width as usize + cell.x as usize)
    }
}

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// Cardinal directions. North is toward negative y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}

// ---------------------------------------------------------------------------
// Footprints
// ---------------------------------------------------------------------------

/// Footprint-local cell used as the placement reference point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Anchor {
    pub x: u32,
    pub y: u32,
}

/// The rectangular set of cells a definition occupies, plus its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub anchor: Anchor,
}

impl Footprint {
    /// A 1x1 footprint anchored on its only cell.
    pub fn single() -> Self {
        Self::new(1, 1)
    }

    /// A footprint anchored at its top-left cell.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            anchor: Anchor::default(),
        }
    }

    pub fn with_anchor(mut self, x: u32, y: u32) -> Self {
        self.anchor = Anchor { x, y };
        self
    }

    /// Whether the footprint is non-empty and its anchor lies inside it.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.anchor.x < self.width && self.anchor.y < self.height
    }

    /// Number of cells covered.
    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// Iterate over every cell covered when the anchor sits on `anchor_cell`:
    /// `anchor_cell + (local - anchor)` for each local cell, row by row.
    pub fn cells(&self, anchor_cell: GridPosition) -> impl Iterator<Item = GridPosition> {
        let w = self.width as i32;
        let h = self.height as i32;
        let ox = anchor_cell.x - self.anchor.x as i32;
        let oy = anchor_cell.y - self.anchor.y as i32;
        (0..h).flat_map(move |dy| (0..w).map(move |dx| GridPosition::new(ox + dx, oy + dy)))
    }
}
