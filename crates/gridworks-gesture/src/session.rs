//! Drag session state for one press-to-release gesture.

use std::collections::BTreeSet;

use gridworks_core::geometry::{GridBounds, GridPosition};

use crate::raster::{line_cells, rect_cells};

/// Which edit a gesture performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GestureAction {
    Place,
    Erase,
}

/// How a drag turns pointer motion into cells. Fixed at press time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureMode {
    /// Paint each cell the pointer visits, immediately.
    Free,
    /// Preview a snapped line while held; commit it on release.
    Line,
    /// Preview a rectangle while held; commit it on release.
    Rect,
}

impl GestureMode {
    /// Rectangle needs both modifiers; line needs only the line modifier.
    pub fn classify(line_modifier: bool, rect_modifier: bool) -> Self {
        match (line_modifier, rect_modifier) {
            (true, true) => GestureMode::Rect,
            (true, false) => GestureMode::Line,
            _ => GestureMode::Free,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub action: GestureAction,
    pub mode: GestureMode,
    pub start: GridPosition,
    /// Last known pointer cell.
    pub current: GridPosition,
    /// Cells already edited this drag.
    visited: BTreeSet<GridPosition>,
}

impl DragSession {
    pub fn new(action: GestureAction, mode: GestureMode, start: GridPosition) -> Self {
        Self {
            action,
            mode,
            start,
            current: start,
            visited: BTreeSet::new(),
        }
    }

    /// Cells the batch modes would affect if released at `current`. Free
    /// mode affects only the current cell.
    pub fn batch_cells(&self, bounds: GridBounds) -> Vec<GridPosition> {
        match self.mode {
            GestureMode::Free => {
                if bounds.contains(self.current) {
                    vec![self.current]
                } else {
                    Vec::new()
                }
            }
            GestureMode::Line => line_cells(self.start, self.current, bounds),
            GestureMode::Rect => rect_cells(self.start, self.current, bounds),
        }
    }

    pub fn was_visited(&self, cell: GridPosition) -> bool {
        self.visited.contains(&cell)
    }

    /// Record an edited cell. Returns false if it was already recorded.
    pub fn visit(&mut self, cell: GridPosition) -> bool {
        self.visited.insert(cell)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
