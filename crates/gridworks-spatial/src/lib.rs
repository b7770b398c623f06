//! Occupancy grid for multi-cell placement, erasure, and cell queries.
//!
//! The grid is the single authority on which entity occupies which cell.
//! Entities live in a slot-map arena addressed by stable [`EntityId`]s; a
//! dense row-major index maps each in-bounds cell to at most one id. Erasing
//! any cell of a multi-cell entity clears all of its cells at once, using
//! the cell list stored on the entity rather than scanning the grid.
//!
//! Placement and erasure buffer [`GridEvent`]s which the simulation context
//! drains immediately after each mutation.

use std::collections::BTreeMap;

use gridworks_core::catalog::Definition;
use gridworks_core::geometry::{Direction, Footprint, GridBounds, GridPosition};
use gridworks_core::id::{DefinitionId, EntityId};
use gridworks_core::item::ItemStack;
use log::{debug, info};
use slotmap::SlotMap;

pub mod entity;
pub use entity::{ConveyorState, Entity, EntityState, MachineState, MachineStatus, StorageState};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Errors from grid operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("cell is out of bounds")]
    OutOfBounds,
    #[error("cell is occupied")]
    Occupied,
    #[error("cell holds loose items")]
    ItemsOnGround,
    #[error("cell is empty")]
    Empty,
    #[error("entity is not on the grid")]
    UnknownEntity,
}

/// Registration notifications for grid observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
    Registered {
        entity: EntityId,
        definition: DefinitionId,
    },
    Unregistered {
        entity: EntityId,
        definition: DefinitionId,
    },
}

/// What an erasure hands back for the caller to credit to inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refund {
    pub definition: DefinitionId,
    pub quantity: u32,
    /// Units the entity was carrying or buffering. They leave the grid with it.
    pub lost_items: u64,
}

// ---------------------------------------------------------------------------
// OccupancyGrid
// ---------------------------------------------------------------------------

/// A bounded grid mapping cells to placed entities.
///
/// Maintains:
/// - `cells`: dense cell -> entity index
/// - `entities`: arena of entity records (definition, cells, runtime state)
/// - `ground`: loose item stacks dropped onto empty cells
#[derive(Debug)]
pub struct OccupancyGrid {
    bounds: GridBounds,
    cells: Vec<Option<EntityId>>,
    entities: SlotMap<EntityId, Entity>,
    ground: BTreeMap<GridPosition, ItemStack>,
    events: Vec<GridEvent>,
}

impl OccupancyGrid {
    pub fn new(bounds: GridBounds) -> Self {
        Self {
            bounds,
            cells: vec![None; bounds.area() as usize],
            entities: SlotMap::with_key(),
            ground: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    // -- Placement --

    /// Whether a footprint anchored on `anchor` fits: every cell in bounds
    /// and, when `blocks_placement` is set, unoccupied.
    pub fn can_place(&self, anchor: GridPosition, footprint: Footprint, blocks_placement: bool) -> bool {
        self.check_place(anchor, footprint, blocks_placement).is_ok()
    }

    /// Like [`can_place`](Self::can_place) but reports why. Bounds failures
    /// take precedence over occupancy, occupancy over ground stacks. A
    /// blocking footprint may not cover a loose ground stack.
    pub fn check_place(
        &self,
        anchor: GridPosition,
        footprint: Footprint,
        blocks_placement: bool,
    ) -> Result<(), SpatialError> {
        if !footprint.cells(anchor).all(|cell| self.bounds.contains(cell)) {
            return Err(SpatialError::OutOfBounds);
        }
        if blocks_placement && footprint.cells(anchor).any(|cell| self.is_occupied(cell)) {
            return Err(SpatialError::Occupied);
        }
        if blocks_placement && footprint.cells(anchor).any(|cell| self.ground.contains_key(&cell)) {
            return Err(SpatialError::ItemsOnGround);
        }
        Ok(())
    }

    /// Place an instance of `definition` with its anchor on `anchor`.
    ///
    /// All-or-nothing: no cell is written unless every target cell is in
    /// bounds, free and clear of ground stacks.
    pub fn place(
        &mut self,
        anchor: GridPosition,
        definition_id: DefinitionId,
        definition: &Definition,
    ) -> Result<EntityId, SpatialError> {
        let footprint = definition.footprint;
        self.check_place(anchor, footprint, true)?;

        let cells: Vec<GridPosition> = footprint.cells(anchor).collect();
        let entity = self.entities.insert(Entity {
            definition: definition_id,
            category: definition.category,
            anchor,
            cells: cells.clone(),
            state: EntityState::for_definition(definition),
        });
        for cell in cells {
            if let Some(index) = self.bounds.index_of(cell) {
                self.cells[index] = Some(entity);
            }
        }

        debug!(
            "placed '{}' ({:?}) at ({}, {})",
            definition.name, entity, anchor.x, anchor.y
        );
        self.events.push(GridEvent::Registered {
            entity,
            definition: definition_id,
        });
        Ok(entity)
    }

    /// Erase whatever entity occupies `cell`, clearing all of its cells.
    pub fn erase(&mut self, cell: GridPosition) -> Result<Refund, SpatialError> {
        if !self.bounds.contains(cell) {
            return Err(SpatialError::OutOfBounds);
        }
        let entity = self.entity_at(cell).ok_or(SpatialError::Empty)?;
        self.remove(entity)
    }

    /// Remove an entity by id.
    pub fn remove(&mut self, entity: EntityId) -> Result<Refund, SpatialError> {
        let removed = self
            .entities
            .remove(entity)
            .ok_or(SpatialError::UnknownEntity)?;
        for cell in &removed.cells {
            if let Some(index) = self.bounds.index_of(*cell) {
                if self.cells[index] == Some(entity) {
                    self.cells[index] = None;
                }
            }
        }

        let lost_items = removed.item_count();
        debug!(
            "erased {:?} ({} cells) anchored at ({}, {})",
            entity,
            removed.cells.len(),
            removed.anchor.x,
            removed.anchor.y
        );
        if lost_items > 0 {
            info!("erasing {entity:?} discarded {lost_items} held items");
        }
        self.events.push(GridEvent::Unregistered {
            entity,
            definition: removed.definition,
        });
        Ok(Refund {
            definition: removed.definition,
            quantity: 1,
            lost_items,
        })
    }

    // -- Point queries --

    pub fn is_in_bounds(&self, cell: GridPosition) -> bool {
        self.bounds.contains(cell)
    }

    pub fn is_occupied(&self, cell: GridPosition) -> bool {
        self.entity_at(cell).is_some()
    }

    /// The entity occupying `cell`, if any. Out-of-bounds cells are empty.
    pub fn entity_at(&self, cell: GridPosition) -> Option<EntityId> {
        self.bounds.index_of(cell).and_then(|i| self.cells[i])
    }

    /// The entity one step from `cell` in `dir`.
    pub fn neighbor(&self, cell: GridPosition, dir: Direction) -> Option<EntityId> {
        self.entity_at(cell.step(dir))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Borrows two distinct live entities mutably at once. `None` if either
    /// is gone or both ids are the same.
    pub fn entity_pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<[&mut Entity; 2]> {
        self.entities.get_disjoint_mut([a, b])
    }

    /// All entities in deterministic arena order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().collect()
    }

    // -- Ground layer --

    pub fn ground_item(&self, cell: GridPosition) -> Option<&ItemStack> {
        self.ground.get(&cell)
    }

    /// Drop a stack onto an empty in-bounds cell. Merges with a ground stack
    /// of the same type; refuses a different type. The stack is handed back
    /// on refusal.
    pub fn drop_item(&mut self, cell: GridPosition, stack: ItemStack) -> Result<(), ItemStack> {
        if !self.bounds.contains(cell) || self.is_occupied(cell) {
            return Err(stack);
        }
        match self.ground.get_mut(&cell) {
            Some(existing) if existing.item_type == stack.item_type => {
                existing.quantity += stack.quantity;
                Ok(())
            }
            Some(_) => Err(stack),
            None => {
                self.ground.insert(cell, stack);
                Ok(())
            }
        }
    }

    /// Whether `drop_item` would accept a stack of this type at `cell`.
    pub fn can_drop(&self, cell: GridPosition, stack: &ItemStack) -> bool {
        self.bounds.contains(cell)
            && !self.is_occupied(cell)
            && self
                .ground
                .get(&cell)
                .is_none_or(|existing| existing.item_type == stack.item_type)
    }

    pub fn take_ground_item(&mut self, cell: GridPosition) -> Option<ItemStack> {
        self.ground.remove(&cell)
    }

    pub fn ground_items(&self) -> impl Iterator<Item = (&GridPosition, &ItemStack)> {
        self.ground.iter()
    }

    // -- Events --

    /// Take all registration events buffered since the last drain.
    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    // -- Stats --

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn occupied_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}
