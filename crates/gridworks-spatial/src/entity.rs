//! Placed entities and their per-category runtime state.

use std::collections::BTreeMap;

use gridworks_core::catalog::{Category, Definition};
use gridworks_core::fixed::{Fixed64, Ticks};
use gridworks_core::geometry::{Direction, GridPosition};
use gridworks_core::id::{DefinitionId, ItemTypeId};
use gridworks_core::item::{ItemSlot, ItemStack};

/// A placed instance of a definition. Owned by the occupancy grid's arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub definition: DefinitionId,
    pub category: Category,
    /// The cell the footprint anchor was placed on.
    pub anchor: GridPosition,
    /// Every cell this entity occupies, in footprint order.
    pub cells: Vec<GridPosition>,
    pub state: EntityState,
}

impl Entity {
    pub fn occupies(&self, cell: GridPosition) -> bool {
        self.cells.contains(&cell)
    }

    pub fn conveyor(&self) -> Option<&ConveyorState> {
        match &self.state {
            EntityState::Conveyor(c) => Some(c),
            _ => None,
        }
    }

    pub fn conveyor_mut(&mut self) -> Option<&mut ConveyorState> {
        match &mut self.state {
            EntityState::Conveyor(c) => Some(c),
            _ => None,
        }
    }

    /// Total items held anywhere inside this entity.
    pub fn item_count(&self) -> u64 {
        match &self.state {
            EntityState::Inert => 0,
            EntityState::Conveyor(c) => c.carried.as_ref().map_or(0, |s| s.quantity as u64),
            EntityState::Miner(m) | EntityState::Crafter(m) => {
                m.input.quantity() as u64 + m.output.quantity() as u64
            }
            EntityState::Storage(s) => s.total() as u64,
        }
    }
}

/// Runtime state, tagged by behaviour. Categories without item behaviour
/// (generic, power, decoration) are `Inert`.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityState {
    Inert,
    Conveyor(ConveyorState),
    Miner(MachineState),
    Crafter(MachineState),
    Storage(StorageState),
}

impl EntityState {
    /// Fresh state for a newly placed instance of `def`.
    pub fn for_definition(def: &Definition) -> Self {
        match def.category {
            Category::Conveyor => match def.conveyor {
                Some(spec) => EntityState::Conveyor(ConveyorState::new(spec.direction, spec.speed)),
                None => EntityState::Inert,
            },
            Category::Miner => EntityState::Miner(MachineState::new(def.buffer_capacity)),
            Category::Crafter => EntityState::Crafter(MachineState::new(def.buffer_capacity)),
            Category::Storage => EntityState::Storage(StorageState::new(def.storage_capacity)),
            Category::Generic | Category::Power | Category::Decoration => EntityState::Inert,
        }
    }
}

/// A conveyor carries at most one stack and accumulates per-tile progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ConveyorState {
    pub direction: Direction,
    /// Tiles per second.
    pub speed: Fixed64,
    pub carried: Option<ItemStack>,
    /// Fraction of a tile the carried item has travelled; 1.0 means ready
    /// to leave.
    pub progress: Fixed64,
}

impl ConveyorState {
    pub fn new(direction: Direction, speed: Fixed64) -> Self {
        Self {
            direction,
            speed,
            carried: None,
            progress: Fixed64::ZERO,
        }
    }
}

/// Single-slot input and output buffers plus a cycle timer.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    pub input: ItemSlot,
    pub output: ItemSlot,
    /// Ticks spent in the current cycle.
    pub elapsed: Ticks,
    pub status: MachineStatus,
}

impl MachineState {
    pub fn new(buffer_capacity: u32) -> Self {
        Self {
            input: ItemSlot::new(buffer_capacity),
            output: ItemSlot::new(buffer_capacity),
            elapsed: 0,
            status: MachineStatus::Idle,
        }
    }
}

/// What a machine did on its last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineStatus {
    #[default]
    Idle,
    Working,
    MissingInput,
    OutputFull,
}

/// A terminal sink holding any mix of items up to a total capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageState {
    pub contents: BTreeMap<ItemTypeId, u32>,
    pub capacity: u32,
}

impl StorageState {
    pub fn new(capacity: u32) -> Self {
        Self {
            contents: BTreeMap::new(),
            capacity,
        }
    }

    pub fn total(&self) -> u32 {
        self.contents.values().sum()
    }

    pub fn quantity(&self, item: ItemTypeId) -> u32 {
        self.contents.get(&item).copied().unwrap_or(0)
    }

    pub fn has_room_for(&self, quantity: u32) -> bool {
        self.total() + quantity <= self.capacity
    }
}
