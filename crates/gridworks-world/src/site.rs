//! The editable, tickable part of the world: catalog, grid, power and the
//! optional block inventory.
//!
//! Every grid mutation drains the grid's registration events into the power
//! accumulator before returning, so power is always current after an edit.

use gridworks_core::catalog::{Catalog, Definition};
use gridworks_core::fixed::{Fixed64, Ticks};
use gridworks_core::geometry::{GridBounds, GridPosition};
use gridworks_core::id::DefinitionId;
use gridworks_core::inventory::Inventory;
use gridworks_gesture::{EditError, EditReceipt, EditTarget};
use gridworks_logistics::LogisticsReport;
use gridworks_power::{PowerBalance, PowerEvent};
use gridworks_spatial::OccupancyGrid;
use log::{debug, warn};

/// What one fixed tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Ticks,
    pub logistics: LogisticsReport,
    pub power_events: Vec<PowerEvent>,
}

#[derive(Debug)]
pub struct Site {
    pub(crate) catalog: Catalog,
    pub(crate) grid: OccupancyGrid,
    pub(crate) power: PowerBalance,
    pub(crate) inventory: Option<Box<dyn Inventory>>,
    pub(crate) selected: Option<DefinitionId>,
}

impl Site {
    pub(crate) fn new(catalog: Catalog, grid: OccupancyGrid, power: PowerBalance) -> Self {
        Self {
            catalog,
            grid,
            power,
            inventory: None,
            selected: None,
        }
    }

    fn definition(&self, id: DefinitionId) -> Result<&Definition, EditError> {
        self.catalog
            .definition(id)
            .ok_or(EditError::NoActiveDefinition)
    }

    fn has_stock(&self, id: DefinitionId) -> bool {
        self.inventory
            .as_ref()
            .is_none_or(|inv| inv.has_block(id, 1))
    }

    fn sync_power(&mut self) {
        for event in self.grid.drain_events() {
            self.power.observe(&event, &self.catalog);
        }
    }

    /// Place one `definition` with its anchor on `anchor`, debiting one
    /// block from inventory. The block is debited before the grid is
    /// touched and credited back if the grid then refuses.
    pub fn place(&mut self, anchor: GridPosition, definition: DefinitionId) -> Result<EditReceipt, EditError> {
        let def = self.definition(definition)?;
        if !self.has_stock(definition) {
            return Err(EditError::InsufficientInventory);
        }
        self.grid
            .check_place(anchor, def.footprint, def.blocks_placement)?;
        let def = def.clone();

        if let Some(inv) = self.inventory.as_mut()
            && !inv.try_consume(definition, 1)
        {
            debug!("inventory refused to debit '{}'", def.name);
            return Err(EditError::InsufficientInventory);
        }
        let entity = match self.grid.place(anchor, definition, &def) {
            Ok(entity) => entity,
            Err(err) => {
                if let Some(inv) = self.inventory.as_mut()
                    && !inv.try_add_block(definition, 1)
                {
                    warn!("inventory full; debit of '{}' not returned", def.name);
                }
                return Err(err.into());
            }
        };
        self.sync_power();
        Ok(EditReceipt::Placed { entity, definition })
    }

    /// Erase the entity covering `cell` and credit its refund.
    pub fn erase(&mut self, cell: GridPosition) -> Result<EditReceipt, EditError> {
        let refund = self.grid.erase(cell)?;
        let mut refunded = 0;
        if let Some(inv) = self.inventory.as_mut() {
            if inv.try_add_block(refund.definition, refund.quantity) {
                refunded = refund.quantity;
            } else {
                warn!("inventory full; refund of {:?} discarded", refund.definition);
            }
        }
        self.sync_power();
        Ok(EditReceipt::Erased {
            definition: refund.definition,
            refunded,
            lost_items: refund.lost_items,
        })
    }

    /// One fixed tick: transport, machine processing, then power.
    pub fn tick(&mut self, dt: Fixed64, tick: Ticks) -> TickReport {
        let logistics = gridworks_logistics::tick(&mut self.grid, &self.catalog, dt);
        // Catch any registration change made outside an edit.
        self.sync_power();
        let power_events = self.power.tick(dt, tick);
        if logistics.transport.moved() > 0 {
            debug!(
                "tick {tick}: {} moved, {} rejected",
                logistics.transport.moved(),
                logistics.transport.rejected
            );
        }
        TickReport {
            tick,
            logistics,
            power_events,
        }
    }
}

impl EditTarget for Site {
    fn bounds(&self) -> GridBounds {
        self.grid.bounds()
    }

    fn placement_cells(&self, anchor: GridPosition) -> Option<Vec<GridPosition>> {
        let def = self.catalog.definition(self.selected?)?;
        Some(def.footprint.cells(anchor).collect())
    }

    fn can_place_at(&self, anchor: GridPosition) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let Some(def) = self.catalog.definition(id) else {
            return false;
        };
        self.has_stock(id) && self.grid.can_place(anchor, def.footprint, def.blocks_placement)
    }

    fn is_occupied(&self, cell: GridPosition) -> bool {
        self.grid.is_occupied(cell)
    }

    fn erase_cells(&self, cell: GridPosition) -> Vec<GridPosition> {
        self.grid
            .entity_at(cell)
            .and_then(|id| self.grid.entity(id))
            .map(|e| e.cells.clone())
            .unwrap_or_default()
    }

    fn commit_place(&mut self, anchor: GridPosition) -> Result<EditReceipt, EditError> {
        let definition = self.selected.ok_or(EditError::NoActiveDefinition)?;
        self.place(anchor, definition)
    }

    fn commit_erase(&mut self, cell: GridPosition) -> Result<EditReceipt, EditError> {
        self.erase(cell)
    }
}
