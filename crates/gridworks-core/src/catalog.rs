//! The definition catalog: every placeable type and item type, frozen at
//! startup.
//!
//! Catalogs are assembled with a [`CatalogBuilder`] (or resolved from a
//! [`CatalogFile`] loaded from RON/TOML/JSON) and validated once in
//! [`CatalogBuilder::build`]. Malformed definitions -- an anchor outside its
//! own footprint, a machine without the items it needs -- are configuration
//! errors surfaced here, never at runtime.

use std::collections::HashMap;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, deserialize_file};
use crate::fixed::{Fixed64, Ticks, checked_f64_to_fixed64};
use crate::geometry::{Direction, Footprint};
use crate::id::{DefinitionId, ItemTypeId};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Behaviour category of a placeable definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Generic,
    Conveyor,
    Miner,
    Crafter,
    Storage,
    Power,
    Decoration,
}

/// Conveyor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorSpec {
    pub direction: Direction,
    /// Tiles per second.
    pub speed: Fixed64,
}

/// An item type plus a per-cycle amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFlow {
    pub item: ItemTypeId,
    pub amount: u32,
}

/// Static description of a placeable type.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub category: Category,
    pub footprint: Footprint,
    /// Whether the candidate requires its cells to be unoccupied.
    pub blocks_placement: bool,
    pub power_drain: Fixed64,
    pub power_generation: Fixed64,
    pub conveyor: Option<ConveyorSpec>,
    /// Ticks per machine cycle.
    pub tick_interval: Ticks,
    pub input: Option<ItemFlow>,
    pub output: Option<ItemFlow>,
    /// Capacity of each single-slot machine buffer.
    pub buffer_capacity: u32,
    /// Total item capacity of a storage.
    pub storage_capacity: u32,
}

impl Definition {
    pub const DEFAULT_BUFFER_CAPACITY: u32 = 10;
    pub const DEFAULT_STORAGE_CAPACITY: u32 = 100;

    /// A 1x1 blocking definition with no power or item behaviour.
    pub fn new(name: &str, category: Category) -> Self {
        Self {
            name: name.to_string(),
            category,
            footprint: Footprint::single(),
            blocks_placement: true,
            power_drain: Fixed64::ZERO,
            power_generation: Fixed64::ZERO,
            conveyor: None,
            tick_interval: 1,
            input: None,
            output: None,
            buffer_capacity: Self::DEFAULT_BUFFER_CAPACITY,
            storage_capacity: Self::DEFAULT_STORAGE_CAPACITY,
        }
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_drain(mut self, drain: Fixed64) -> Self {
        self.power_drain = drain;
        self
    }

    pub fn with_generation(mut self, generation: Fixed64) -> Self {
        self.power_generation = generation;
        self
    }

    pub fn with_conveyor(mut self, direction: Direction, speed: Fixed64) -> Self {
        self.conveyor = Some(ConveyorSpec { direction, speed });
        self
    }

    pub fn with_input(mut self, item: ItemTypeId, amount: u32) -> Self {
        self.input = Some(ItemFlow { item, amount });
        self
    }

    pub fn with_output(mut self, item: ItemTypeId, amount: u32) -> Self {
        self.output = Some(ItemFlow { item, amount });
        self
    }

    pub fn with_tick_interval(mut self, ticks: Ticks) -> Self {
        self.tick_interval = ticks;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: u32) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_storage_capacity(mut self, capacity: u32) -> Self {
        self.storage_capacity = capacity;
        self
    }

    pub fn non_blocking(mut self) -> Self {
        self.blocks_placement = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("definition '{name}' has a zero-sized footprint")]
    ZeroSizedFootprint { name: String },
    #[error("definition '{name}' has its anchor ({x}, {y}) outside its {width}x{height} footprint")]
    InvalidAnchor {
        name: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("duplicate name '{0}'")]
    DuplicateName(String),
    #[error("definition '{name}' references unknown item {item:?}")]
    InvalidItemRef { name: String, item: ItemTypeId },
    #[error("definition '{definition}' references unresolved item '{item}'")]
    UnresolvedItem { definition: String, item: String },
    #[error("definition '{name}' is missing {what}")]
    MissingBehaviour { name: String, what: &'static str },
    #[error("definition '{name}' has {field} {value}, which is not a representable number")]
    OutOfRange {
        name: String,
        field: &'static str,
        value: f64,
    },
    #[error(transparent)]
    Load(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    items: Vec<String>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    definitions: Vec<Definition>,
    definition_name_to_id: HashMap<String, DefinitionId>,
    duplicates: Vec<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item type. Returns its ID.
    pub fn register_item(&mut self, name: &str) -> ItemTypeId {
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(name.to_string());
        if self.item_name_to_id.insert(name.to_string(), id).is_some() {
            self.duplicates.push(name.to_string());
        }
        id
    }

    /// Register a placeable definition. Returns its ID.
    pub fn register_definition(&mut self, definition: Definition) -> DefinitionId {
        let id = DefinitionId(self.definitions.len() as u32);
        let name = definition.name.clone();
        self.definitions.push(definition);
        if self.definition_name_to_id.insert(name.clone(), id).is_some() {
            self.duplicates.push(name);
        }
        id
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn definition_id(&self, name: &str) -> Option<DefinitionId> {
        self.definition_name_to_id.get(name).copied()
    }

    /// Validate and freeze the catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(CatalogError::DuplicateName(name));
        }
        for def in &self.definitions {
            validate_definition(def, self.items.len())?;
        }
        Ok(Catalog {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            definitions: self.definitions,
            definition_name_to_id: self.definition_name_to_id,
        })
    }
}

fn validate_definition(def: &Definition, item_count: usize) -> Result<(), CatalogError> {
    let fp = def.footprint;
    if fp.width == 0 || fp.height == 0 {
        return Err(CatalogError::ZeroSizedFootprint {
            name: def.name.clone(),
        });
    }
    if !fp.is_valid() {
        return Err(CatalogError::InvalidAnchor {
            name: def.name.clone(),
            x: fp.anchor.x,
            y: fp.anchor.y,
            width: fp.width,
            height: fp.height,
        });
    }

    for flow in def.input.iter().chain(def.output.iter()) {
        if flow.item.0 as usize >= item_count {
            return Err(CatalogError::InvalidItemRef {
                name: def.name.clone(),
                item: flow.item,
            });
        }
    }

    let missing = |what| CatalogError::MissingBehaviour {
        name: def.name.clone(),
        what,
    };
    match def.category {
        Category::Conveyor if def.conveyor.is_none() => return Err(missing("conveyor parameters")),
        Category::Miner if def.output.is_none() => return Err(missing("an output item")),
        Category::Crafter if def.input.is_none() => return Err(missing("an input item")),
        Category::Crafter if def.output.is_none() => return Err(missing("an output item")),
        Category::Miner | Category::Crafter if def.tick_interval == 0 => {
            return Err(missing("a non-zero tick interval"));
        }
        _ => {}
    }

    if def.power_drain < Fixed64::ZERO {
        warn!(
            "definition '{}' declares negative drain {}; it will be treated as zero",
            def.name, def.power_drain
        );
    }
    if def.power_generation < Fixed64::ZERO {
        warn!(
            "definition '{}' declares negative generation {}; it will be treated as zero",
            def.name, def.power_generation
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog. Frozen after build().
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<String>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    definitions: Vec<Definition>,
    definition_name_to_id: HashMap<String, DefinitionId>,
}

impl Catalog {
    /// Load and resolve a catalog file (format from extension).
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let file: CatalogFile = deserialize_file(path)?;
        file.resolve()
    }

    pub fn definition(&self, id: DefinitionId) -> Option<&Definition> {
        self.definitions.get(id.0 as usize)
    }

    pub fn definition_id(&self, name: &str) -> Option<DefinitionId> {
        self.definition_name_to_id.get(name).copied()
    }

    pub fn item_name(&self, id: ItemTypeId) -> Option<&str> {
        self.items.get(id.0 as usize).map(String::as_str)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    /// All definitions in id order.
    pub fn definitions(&self) -> impl Iterator<Item = (DefinitionId, &Definition)> {
        self.definitions
            .iter()
            .enumerate()
            .map(|(i, d)| (DefinitionId(i as u32), d))
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

// ---------------------------------------------------------------------------
// Data file schema
// ---------------------------------------------------------------------------

/// On-disk catalog: items and definitions referenced by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub definitions: Vec<DefinitionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionEntry {
    pub name: String,
    pub category: Category,
    #[serde(default = "Footprint::single")]
    pub footprint: Footprint,
    #[serde(default = "default_true")]
    pub blocks_placement: bool,
    #[serde(default)]
    pub power_drain: f64,
    #[serde(default)]
    pub power_generation: f64,
    #[serde(default)]
    pub conveyor: Option<ConveyorEntry>,
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Ticks,
    #[serde(default)]
    pub input: Option<FlowEntry>,
    #[serde(default)]
    pub output: Option<FlowEntry>,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: u32,
    #[serde(default = "default_storage_capacity")]
    pub storage_capacity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConveyorEntry {
    pub direction: Direction,
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEntry {
    pub item: String,
    #[serde(default = "default_amount")]
    pub amount: u32,
}

fn default_true() -> bool {
    true
}

fn default_tick_interval() -> Ticks {
    1
}

fn default_amount() -> u32 {
    1
}

fn default_buffer_capacity() -> u32 {
    Definition::DEFAULT_BUFFER_CAPACITY
}

fn default_storage_capacity() -> u32 {
    Definition::DEFAULT_STORAGE_CAPACITY
}

impl CatalogFile {
    /// Resolve item names and build the catalog.
    pub fn resolve(self) -> Result<Catalog, CatalogError> {
        let mut builder = CatalogBuilder::new();
        for item in &self.items {
            builder.register_item(item);
        }

        for entry in self.definitions {
            let resolve_flow = |flow: Option<FlowEntry>| -> Result<Option<ItemFlow>, CatalogError> {
                flow.map(|f| {
                    builder
                        .item_id(&f.item)
                        .map(|item| ItemFlow {
                            item,
                            amount: f.amount,
                        })
                        .ok_or_else(|| CatalogError::UnresolvedItem {
                            definition: entry.name.clone(),
                            item: f.item.clone(),
                        })
                })
                .transpose()
            };
            let input = resolve_flow(entry.input.clone())?;
            let output = resolve_flow(entry.output.clone())?;
            let number = |field: &'static str, value: f64| {
                checked_f64_to_fixed64(value).ok_or_else(|| CatalogError::OutOfRange {
                    name: entry.name.clone(),
                    field,
                    value,
                })
            };
            let power_drain = number("power_drain", entry.power_drain)?;
            let power_generation = number("power_generation", entry.power_generation)?;
            let conveyor = match &entry.conveyor {
                Some(c) => Some(ConveyorSpec {
                    direction: c.direction,
                    speed: number("conveyor speed", c.speed)?,
                }),
                None => None,
            };

            builder.register_definition(Definition {
                name: entry.name,
                category: entry.category,
                footprint: entry.footprint,
                blocks_placement: entry.blocks_placement,
                power_drain,
                power_generation,
                conveyor,
                tick_interval: entry.tick_interval,
                input,
                output,
                buffer_capacity: entry.buffer_capacity,
                storage_capacity: entry.storage_capacity,
            });
        }

        builder.build()
    }
}
