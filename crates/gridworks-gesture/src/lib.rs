//! Drag-gesture interpretation for grid editing.
//!
//! Turns a per-frame [`InputFrame`] into previews and committed edits. Each
//! of the place and erase actions runs its own state machine:
//!
//! - **Free**: paints the cell under the pointer every frame, once per cell
//!   per drag.
//! - **Line**: previews a 45°-snapped Bresenham line while held; on release
//!   commits it in rasterization order, stopping at the first failure
//!   unless configured to continue past blocked cells.
//! - **Rect**: previews the clipped rectangle while held; on release
//!   attempts every cell (x ascending, then y), never stopping early.
//!
//! Within a frame previews are computed before any commit. Edits are
//! applied through the [`EditTarget`] trait so the interpreter never touches
//! the grid directly.

use gridworks_core::geometry::{GridBounds, GridPosition};
use gridworks_core::id::{DefinitionId, EntityId};
use gridworks_spatial::SpatialError;

pub mod input;
pub mod interpreter;
pub mod raster;
pub mod session;

pub use input::{ActionEdges, InputEvent, InputFrame, InputQueue};
pub use interpreter::GestureInterpreter;
pub use session::{DragSession, GestureAction, GestureMode};

// ---------------------------------------------------------------------------
// Errors and receipts
// ---------------------------------------------------------------------------

/// Why a single-cell edit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("cell is out of bounds")]
    OutOfBounds,
    #[error("cell is occupied")]
    CellOccupied,
    #[error("loose items lie on the cell")]
    ItemsOnGround,
    #[error("nothing to erase at this cell")]
    CellEmpty,
    #[error("no blocks of the selected definition left in inventory")]
    InsufficientInventory,
    #[error("no definition is selected")]
    NoActiveDefinition,
}

impl From<SpatialError> for EditError {
    fn from(err: SpatialError) -> Self {
        match err {
            SpatialError::OutOfBounds => EditError::OutOfBounds,
            SpatialError::Occupied => EditError::CellOccupied,
            SpatialError::ItemsOnGround => EditError::ItemsOnGround,
            SpatialError::Empty | SpatialError::UnknownEntity => EditError::CellEmpty,
        }
    }
}

/// What a successful edit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditReceipt {
    Placed {
        entity: EntityId,
        definition: DefinitionId,
    },
    Erased {
        definition: DefinitionId,
        /// Units credited back to inventory.
        refunded: u32,
        /// Items the entity held when erased. They are discarded.
        lost_items: u64,
    },
}

/// One attempted edit, in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub action: GestureAction,
    pub cell: GridPosition,
    pub result: Result<EditReceipt, EditError>,
}

// ---------------------------------------------------------------------------
// Edit target
// ---------------------------------------------------------------------------

/// The world as the interpreter sees it: read-only queries for previews and
/// two commit operations.
pub trait EditTarget {
    fn bounds(&self) -> GridBounds;

    /// Cells the selected definition would cover anchored on `anchor`, or
    /// `None` when nothing is selected.
    fn placement_cells(&self, anchor: GridPosition) -> Option<Vec<GridPosition>>;

    /// Whether committing a placement at `anchor` would pass the grid check.
    fn can_place_at(&self, anchor: GridPosition) -> bool;

    fn is_occupied(&self, cell: GridPosition) -> bool;

    /// Every cell of the entity under `cell`; empty when nothing is there.
    fn erase_cells(&self, cell: GridPosition) -> Vec<GridPosition>;

    fn commit_place(&mut self, anchor: GridPosition) -> Result<EditReceipt, EditError>;

    fn commit_erase(&mut self, cell: GridPosition) -> Result<EditReceipt, EditError>;
}

// ---------------------------------------------------------------------------
// Previews and output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTint {
    Valid,
    /// Would fail, or (for erase) about to be removed.
    Blocked,
}

/// The footprint drawn for one candidate cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewGroup {
    pub anchor: GridPosition,
    pub cells: Vec<GridPosition>,
    pub tint: PreviewTint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub action: GestureAction,
    /// `None` for the idle hover preview.
    pub mode: Option<GestureMode>,
    pub groups: Vec<PreviewGroup>,
}

impl Preview {
    pub fn cell_count(&self) -> usize {
        self.groups.iter().map(|g| g.cells.len()).sum()
    }
}

/// Everything the interpreter produced for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureOutput {
    pub previews: Vec<Preview>,
    pub outcomes: Vec<EditOutcome>,
}

impl GestureOutput {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }
}
