//! Power balance for everything placed on the grid.
//!
//! A single accumulator tracks every registered entity's drain and
//! generation, plus a base drain proportional to grid (or visible) area:
//!
//! ```text
//! total_drain      = sum(max(0, drain))
//! total_generation = sum(max(0, generation))
//! tile_base_drain  = area * per_tile_drain
//! net              = total_generation - (total_drain + tile_base_drain)
//! ```
//!
//! # Design
//!
//! - Registration follows the occupancy grid's [`GridEvent`]s; the sums are
//!   recomputed eagerly on every registration change and again each tick.
//! - Optional stored energy integrates `net * dt` per tick into
//!   `[0, capacity]`.
//! - Events fire only on *transitions* into and out of deficit, not every
//!   tick.

use std::collections::HashMap;

use gridworks_core::catalog::{Catalog, Definition};
use gridworks_core::config::SimConfig;
use gridworks_core::fixed::{Fixed64, Ticks, clamp, non_negative};
use gridworks_core::id::{DefinitionId, EntityId};
use gridworks_spatial::GridEvent;
use log::{debug, info};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Drain and generation snapshotted from a definition at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSpec {
    pub definition: DefinitionId,
    pub drain: Fixed64,
    pub generation: Fixed64,
}

impl PowerSpec {
    pub fn from_definition(definition: DefinitionId, def: &Definition) -> Self {
        Self {
            definition,
            drain: def.power_drain,
            generation: def.power_generation,
        }
    }
}

/// Which area the per-tile base drain is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BaseDrainArea {
    /// The whole grid, `width * height` cells.
    #[default]
    Grid,
    /// A cell count supplied by the camera.
    Visible(u64),
}

/// Result of the most recent recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerSnapshot {
    pub total_drain: Fixed64,
    pub total_generation: Fixed64,
    pub tile_base_drain: Fixed64,
    /// Generation minus all drain, per second.
    pub net: Fixed64,
    pub stored: Fixed64,
    pub capacity: Fixed64,
}

/// Events emitted on state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerEvent {
    /// Net went negative and storage can no longer cover it.
    Deficit {
        /// Uncovered drain per second.
        shortfall: Fixed64,
        tick: Ticks,
    },
    /// Supply covers drain again.
    Restored { tick: Ticks },
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PowerBalance {
    registered: HashMap<EntityId, PowerSpec>,
    grid_area: u64,
    area: BaseDrainArea,
    per_tile_drain: Fixed64,
    stored: Fixed64,
    capacity: Fixed64,
    snapshot: PowerSnapshot,
    in_deficit: bool,
}

impl PowerBalance {
    /// An accumulator for a grid of `grid_area` cells with no storage.
    pub fn new(grid_area: u64, per_tile_drain: Fixed64) -> Self {
        let mut balance = Self {
            registered: HashMap::new(),
            grid_area,
            area: BaseDrainArea::Grid,
            per_tile_drain: non_negative(per_tile_drain),
            stored: Fixed64::ZERO,
            capacity: Fixed64::ZERO,
            snapshot: PowerSnapshot::default(),
            in_deficit: false,
        };
        balance.recompute();
        balance
    }

    /// Builder-style stored energy. `stored` is clamped into the capacity.
    pub fn with_storage(mut self, capacity: Fixed64, stored: Fixed64) -> Self {
        self.capacity = non_negative(capacity);
        self.stored = clamp(stored, Fixed64::ZERO, self.capacity);
        self.recompute();
        self
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.bounds().area(), config.per_tile_drain_fixed())
            .with_storage(config.energy_capacity_fixed(), config.stored_energy_fixed())
    }

    // -- Registration --

    /// Register (or re-register) an entity. Recomputes immediately.
    pub fn register(&mut self, entity: EntityId, spec: PowerSpec) {
        debug!(
            "power: registered {entity:?} (drain {}, generation {})",
            spec.drain, spec.generation
        );
        self.registered.insert(entity, spec);
        self.recompute();
    }

    /// Drop an entity. Unknown ids are ignored.
    pub fn unregister(&mut self, entity: EntityId) {
        if self.registered.remove(&entity).is_some() {
            debug!("power: unregistered {entity:?}");
            self.recompute();
        }
    }

    /// Follow a grid registration notification.
    pub fn observe(&mut self, event: &GridEvent, catalog: &Catalog) {
        match *event {
            GridEvent::Registered { entity, definition } => {
                if let Some(def) = catalog.definition(definition) {
                    self.register(entity, PowerSpec::from_definition(definition, def));
                }
            }
            GridEvent::Unregistered { entity, .. } => self.unregister(entity),
        }
    }

    pub fn is_registered(&self, entity: EntityId) -> bool {
        self.registered.contains_key(&entity)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    // -- Base drain area --

    pub fn set_base_drain_area(&mut self, area: BaseDrainArea) {
        self.area = area;
        self.recompute();
    }

    pub fn base_drain_area(&self) -> BaseDrainArea {
        self.area
    }

    fn area_cells(&self) -> u64 {
        match self.area {
            BaseDrainArea::Grid => self.grid_area,
            BaseDrainArea::Visible(cells) => cells,
        }
    }

    // -- Balance --

    /// Recompute the sums from the registered set.
    pub fn recompute(&mut self) -> PowerSnapshot {
        let total_drain = self
            .registered
            .values()
            .map(|s| non_negative(s.drain))
            .fold(Fixed64::ZERO, |acc, v| acc.saturating_add(v));
        let total_generation = self
            .registered
            .values()
            .map(|s| non_negative(s.generation))
            .fold(Fixed64::ZERO, |acc, v| acc.saturating_add(v));
        let tile_base_drain = Fixed64::saturating_from_num(self.area_cells())
            .saturating_mul(self.per_tile_drain);
        let net = total_generation.saturating_sub(total_drain.saturating_add(tile_base_drain));

        self.snapshot = PowerSnapshot {
            total_drain,
            total_generation,
            tile_base_drain,
            net,
            stored: self.stored,
            capacity: self.capacity,
        };
        self.snapshot
    }

    /// Advance by `dt` seconds: recompute, integrate storage, and report
    /// transitions.
    pub fn tick(&mut self, dt: Fixed64, tick: Ticks) -> Vec<PowerEvent> {
        let net = self.recompute().net;
        let delta = net.saturating_mul(dt);
        let unclamped = self.stored.saturating_add(delta);
        self.stored = clamp(unclamped, Fixed64::ZERO, self.capacity);
        self.snapshot.stored = self.stored;

        let deficit = net < Fixed64::ZERO && unclamped < Fixed64::ZERO;
        let mut events = Vec::new();
        if deficit && !self.in_deficit {
            self.in_deficit = true;
            let shortfall = -net;
            info!("power deficit at tick {tick}: short {shortfall}/s");
            events.push(PowerEvent::Deficit { shortfall, tick });
        } else if !deficit && self.in_deficit {
            self.in_deficit = false;
            info!("power restored at tick {tick}");
            events.push(PowerEvent::Restored { tick });
        }
        events
    }

    // -- Queries --

    pub fn snapshot(&self) -> PowerSnapshot {
        self.snapshot
    }

    pub fn net(&self) -> Fixed64 {
        self.snapshot.net
    }

    pub fn stored_energy(&self) -> Fixed64 {
        self.stored
    }

    pub fn in_deficit(&self) -> bool {
        self.in_deficit
    }
}
