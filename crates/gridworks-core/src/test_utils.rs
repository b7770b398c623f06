//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::{Catalog, CatalogBuilder, Category, Definition};
use crate::fixed::Fixed64;
use crate::geometry::{Direction, Footprint};
use crate::id::{DefinitionId, ItemTypeId};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Standard catalog
// ===========================================================================

/// A catalog covering every category, with the ids handy.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub catalog: Catalog,
    pub ore: ItemTypeId,
    pub plate: ItemTypeId,
    /// Conveyors, speed 1 tile/s.
    pub belt_east: DefinitionId,
    pub belt_west: DefinitionId,
    pub belt_north: DefinitionId,
    pub belt_south: DefinitionId,
    /// 1x1 miner: 1 ore every 4 ticks, drain 5, buffer 10.
    pub drill: DefinitionId,
    /// 1x1 crafter: 1 ore -> 1 plate over 2 ticks, drain 3, buffer 2.
    pub smelter: DefinitionId,
    /// 1x1 storage holding 5 items.
    pub chest: DefinitionId,
    /// 1x1 generator, generation 10.
    pub generator: DefinitionId,
    /// 2x2 generic anchored top-left.
    pub big: DefinitionId,
    /// 3x2 generic anchored on (1, 1).
    pub wide: DefinitionId,
    /// 1x1 non-blocking decoration.
    pub lamp: DefinitionId,
}

pub fn fixture() -> Fixture {
    let mut b = CatalogBuilder::new();
    let ore = b.register_item("ore");
    let plate = b.register_item("plate");

    let belt = |name: &str, dir: Direction| {
        Definition::new(name, Category::Conveyor).with_conveyor(dir, fixed(1.0))
    };
    let belt_east = b.register_definition(belt("belt_east", Direction::East));
    let belt_west = b.register_definition(belt("belt_west", Direction::West));
    let belt_north = b.register_definition(belt("belt_north", Direction::North));
    let belt_south = b.register_definition(belt("belt_south", Direction::South));

    let drill = b.register_definition(
        Definition::new("drill", Category::Miner)
            .with_output(ore, 1)
            .with_tick_interval(4)
            .with_drain(fixed(5.0)),
    );
    let smelter = b.register_definition(
        Definition::new("smelter", Category::Crafter)
            .with_input(ore, 1)
            .with_output(plate, 1)
            .with_tick_interval(2)
            .with_buffer_capacity(2)
            .with_drain(fixed(3.0)),
    );
    let chest = b.register_definition(
        Definition::new("chest", Category::Storage).with_storage_capacity(5),
    );
    let generator = b.register_definition(
        Definition::new("generator", Category::Power).with_generation(fixed(10.0)),
    );
    let big = b.register_definition(
        Definition::new("big", Category::Generic).with_footprint(Footprint::new(2, 2)),
    );
    let wide = b.register_definition(
        Definition::new("wide", Category::Generic)
            .with_footprint(Footprint::new(3, 2).with_anchor(1, 1)),
    );
    let lamp = b.register_definition(Definition::new("lamp", Category::Decoration).non_blocking());

    let catalog = match b.build() {
        Ok(catalog) => catalog,
        Err(e) => panic!("fixture catalog is invalid: {e}"),
    };

    Fixture {
        catalog,
        ore,
        plate,
        belt_east,
        belt_west,
        belt_north,
        belt_south,
        drill,
        smelter,
        chest,
        generator,
        big,
        wide,
        lamp,
    }
}

impl Fixture {
    pub fn def(&self, id: DefinitionId) -> &Definition {
        match self.catalog.definition(id) {
            Some(def) => def,
            None => panic!("fixture has no definition {id:?}"),
        }
    }
}
