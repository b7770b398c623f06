//! The simulation context.
//!
//! [`World`] owns one occupancy grid and everything that works on it: the
//! gesture interpreter, conveyor and machine logistics, and the power
//! accumulator. There is no global state; every component receives the
//! world (or the part of it it needs) explicitly, so independent worlds can
//! coexist.
//!
//! # Frame pipeline
//!
//! Each call to [`World::frame`]:
//!
//! 1. drains queued input events into one [`InputFrame`](gridworks_gesture::InputFrame),
//! 2. runs the gesture interpreter once (previews, then commits),
//! 3. runs as many fixed ticks as the elapsed time allows, carrying the
//!    remainder. Each tick runs transport, machine processing, then power.

use std::path::Path;

use gridworks_core::catalog::Catalog;
use gridworks_core::config::{SimConfig, require_data_file};
use gridworks_core::fixed::{Fixed64, Ticks};
use gridworks_core::geometry::GridPosition;
use gridworks_core::id::{DefinitionId, EntityId};
use gridworks_core::inventory::Inventory;
use gridworks_core::item::ItemStack;
use gridworks_core::sim::SimClock;
use gridworks_gesture::{EditError, EditReceipt, GestureInterpreter, GestureOutput, InputEvent, InputQueue};
use gridworks_logistics::{MachineReport, TransportReport};
use gridworks_power::{BaseDrainArea, PowerBalance, PowerEvent, PowerSnapshot};
use gridworks_spatial::{Entity, OccupancyGrid};
use log::info;

pub mod error;
pub mod site;

pub use error::WorldError;
pub use site::{Site, TickReport};

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub gestures: GestureOutput,
    /// Fixed ticks run this frame.
    pub steps: u32,
    pub transport: TransportReport,
    pub machines: MachineReport,
    pub power_events: Vec<PowerEvent>,
}

#[derive(Debug)]
pub struct World {
    config: SimConfig,
    site: Site,
    clock: SimClock,
    input: InputQueue,
    gestures: GestureInterpreter,
}

impl World {
    /// Build an empty world. The config is validated first.
    pub fn new(config: SimConfig, catalog: Catalog) -> Result<Self, WorldError> {
        config.validate()?;
        let grid = OccupancyGrid::new(config.bounds());
        let power = PowerBalance::from_config(&config);
        let clock = SimClock::new(config.tick_seconds(), config.max_steps_per_frame);
        let gestures = GestureInterpreter::new(config.continue_past_blocked_cells);
        info!(
            "world {}x{} with {} definitions at {} ticks/s",
            config.width,
            config.height,
            catalog.definition_count(),
            config.tick_rate
        );
        Ok(Self {
            config,
            site: Site::new(catalog, grid, power),
            clock,
            input: InputQueue::new(),
            gestures,
        })
    }

    /// Load `sim.*` (optional, defaults otherwise) and `catalog.*` from a
    /// data directory.
    pub fn load(dir: &Path) -> Result<Self, WorldError> {
        let config = SimConfig::from_dir(dir, "sim")?;
        let catalog = Catalog::from_path(&require_data_file(dir, "catalog")?)?;
        Self::new(config, catalog)
    }

    /// Attach a block inventory. Without one, placement is unlimited.
    pub fn with_inventory(mut self, inventory: impl Inventory + 'static) -> Self {
        self.site.inventory = Some(Box::new(inventory));
        self
    }

    pub fn set_inventory(&mut self, inventory: Option<Box<dyn Inventory>>) {
        self.site.inventory = inventory;
    }

    pub fn inventory(&self) -> Option<&dyn Inventory> {
        self.site.inventory.as_deref()
    }

    // -- Selection and editing --

    /// Choose the definition gestures place. `None` clears it.
    pub fn select(&mut self, definition: Option<DefinitionId>) -> Result<(), WorldError> {
        if let Some(id) = definition
            && self.site.catalog.definition(id).is_none()
        {
            return Err(WorldError::UnknownDefinition(id));
        }
        self.site.selected = definition;
        Ok(())
    }

    /// Resolve a definition by catalog name.
    pub fn definition_named(&self, name: &str) -> Result<DefinitionId, WorldError> {
        self.site
            .catalog
            .definition_id(name)
            .ok_or_else(|| WorldError::UnknownName(name.to_string()))
    }

    pub fn selected(&self) -> Option<DefinitionId> {
        self.site.selected
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Place directly, bypassing gestures.
    pub fn place(&mut self, anchor: GridPosition, definition: DefinitionId) -> Result<EditReceipt, EditError> {
        self.site.place(anchor, definition)
    }

    /// Erase directly, bypassing gestures.
    pub fn erase(&mut self, cell: GridPosition) -> Result<EditReceipt, EditError> {
        self.site.erase(cell)
    }

    /// Lift a ground stack off a cell.
    pub fn take_ground_item(&mut self, cell: GridPosition) -> Option<ItemStack> {
        self.site.grid.take_ground_item(cell)
    }

    /// Charge the per-tile base drain against a camera-visible area instead
    /// of the whole grid.
    pub fn set_base_drain_area(&mut self, area: BaseDrainArea) {
        self.site.power.set_base_drain_area(area);
    }

    // -- Driving --

    /// Advance by `elapsed` seconds of wall time.
    pub fn frame(&mut self, elapsed: Fixed64) -> FrameReport {
        let input = self.input.drain_frame(&self.config.bindings);
        let gestures = self.gestures.update(&input, &mut self.site);

        let mut report = FrameReport {
            gestures,
            ..FrameReport::default()
        };
        let steps = self.clock.accumulate(elapsed);
        for _ in 0..steps {
            let tick = self.step();
            report.transport.merge(&tick.logistics.transport);
            report.machines.merge(&tick.logistics.machines);
            report.power_events.extend(tick.power_events);
        }
        report.steps = steps;
        report
    }

    /// Run exactly one fixed tick, ignoring input.
    pub fn step(&mut self) -> TickReport {
        self.clock.advance_tick();
        self.site.tick(self.clock.step_seconds(), self.clock.tick)
    }

    // -- Queries --

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.site.catalog
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.site.grid
    }

    pub fn gestures(&self) -> &GestureInterpreter {
        &self.gestures
    }

    pub fn tick(&self) -> Ticks {
        self.clock.tick
    }

    pub fn is_occupied(&self, cell: GridPosition) -> bool {
        self.site.grid.is_occupied(cell)
    }

    pub fn entity_at(&self, cell: GridPosition) -> Option<EntityId> {
        self.site.grid.entity_at(cell)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.site.grid.entity(id)
    }

    pub fn ground_item(&self, cell: GridPosition) -> Option<&ItemStack> {
        self.site.grid.ground_item(cell)
    }

    pub fn power_snapshot(&self) -> PowerSnapshot {
        self.site.power.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworks_core::inventory::BlockInventory;
    use gridworks_core::test_utils::{fixed, fixture};
    use gridworks_gesture::PreviewTint;

    fn config(w: u32, h: u32) -> SimConfig {
        SimConfig {
            width: w,
            height: h,
            tick_rate: 4,
            ..SimConfig::default()
        }
    }

    fn p(x: i32, y: i32) -> GridPosition {
        GridPosition::new(x, y)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let fx = fixture();
        assert!(matches!(
            World::new(config(0, 4), fx.catalog),
            Err(WorldError::Config(_))
        ));
    }

    #[test]
    fn select_unknown_definition_fails() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog.clone()).unwrap();
        assert!(matches!(
            world.select(Some(DefinitionId(999))),
            Err(WorldError::UnknownDefinition(_))
        ));
        assert_eq!(world.selected(), None);
        assert!(matches!(
            world.definition_named("nope"),
            Err(WorldError::UnknownName(name)) if name == "nope"
        ));
        assert_eq!(world.definition_named("chest").unwrap(), fx.chest);
    }

    #[test]
    fn place_debits_and_erase_refunds() {
        let fx = fixture();
        let mut world = World::new(config(8, 8), fx.catalog.clone())
            .unwrap()
            .with_inventory(BlockInventory::new().with_blocks(fx.big, 1));

        assert!(world.place(p(1, 1), fx.big).is_ok());
        assert!(!world.inventory().unwrap().has_block(fx.big, 1));
        assert_eq!(
            world.place(p(4, 4), fx.big),
            Err(EditError::InsufficientInventory)
        );

        let receipt = world.erase(p(2, 2)).unwrap();
        assert_eq!(
            receipt,
            EditReceipt::Erased {
                definition: fx.big,
                refunded: 1,
                lost_items: 0,
            }
        );
        assert!(world.inventory().unwrap().has_block(fx.big, 1));
        assert!(!world.is_occupied(p(1, 1)));
    }

    #[test]
    fn failed_place_does_not_debit() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog.clone())
            .unwrap()
            .with_inventory(BlockInventory::new().with_blocks(fx.chest, 1));
        assert_eq!(world.place(p(4, 0), fx.chest), Err(EditError::OutOfBounds));
        assert!(world.inventory().unwrap().has_block(fx.chest, 1));
    }

    /// Claims stock it then refuses to hand over.
    #[derive(Debug)]
    struct StingyInventory;

    impl Inventory for StingyInventory {
        fn has_block(&self, _: DefinitionId, _: u32) -> bool {
            true
        }

        fn try_consume(&mut self, _: DefinitionId, _: u32) -> bool {
            false
        }

        fn try_add_block(&mut self, _: DefinitionId, _: u32) -> bool {
            false
        }
    }

    #[test]
    fn refused_debit_leaves_the_grid_untouched() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog.clone())
            .unwrap()
            .with_inventory(StingyInventory);
        assert_eq!(
            world.place(p(1, 1), fx.drill),
            Err(EditError::InsufficientInventory)
        );
        assert!(!world.is_occupied(p(1, 1)));
        assert_eq!(world.grid().entity_count(), 0);
        assert_eq!(world.power_snapshot().total_drain, Fixed64::ZERO);
    }

    #[test]
    fn grid_refusal_after_debit_returns_the_block() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog.clone())
            .unwrap()
            .with_inventory(BlockInventory::new().with_blocks(fx.lamp, 1));
        world.place(p(0, 0), fx.chest).unwrap();
        // The lamp passes the non-blocking check but the grid holds one
        // entity per cell.
        assert_eq!(world.place(p(0, 0), fx.lamp), Err(EditError::CellOccupied));
        assert!(world.inventory().unwrap().has_block(fx.lamp, 1));
    }

    #[test]
    fn erase_empty_cell() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog).unwrap();
        assert_eq!(world.erase(p(1, 1)), Err(EditError::CellEmpty));
        assert_eq!(world.erase(p(7, 1)), Err(EditError::OutOfBounds));
    }

    #[test]
    fn power_follows_edits_eagerly() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog.clone()).unwrap();
        world.place(p(0, 0), fx.generator).unwrap();
        assert_eq!(world.power_snapshot().net, fixed(10.0));
        world.place(p(1, 0), fx.drill).unwrap();
        assert_eq!(world.power_snapshot().net, fixed(5.0));
        world.erase(p(0, 0)).unwrap();
        assert_eq!(world.power_snapshot().net, fixed(-5.0));
    }

    #[test]
    fn frame_runs_whole_ticks_and_carries_remainder() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog).unwrap();
        assert_eq!(world.frame(fixed(0.625)).steps, 2);
        assert_eq!(world.frame(fixed(0.125)).steps, 1);
        assert_eq!(world.tick(), 3);
    }

    #[test]
    fn deficit_event_surfaces_in_frame_report() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog.clone()).unwrap();
        world.place(p(0, 0), fx.drill).unwrap();
        let report = world.frame(fixed(0.5));
        assert_eq!(report.power_events.len(), 1);
        assert!(matches!(report.power_events[0], PowerEvent::Deficit { tick: 1, .. }));
    }

    #[test]
    fn click_places_selected_definition() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog.clone()).unwrap();
        world.select(Some(fx.chest)).unwrap();
        let place = world.config().bindings.place;
        world.push_input(InputEvent::PointerMoved(Some(p(2, 3))));
        world.push_input(InputEvent::Pressed(place));
        world.push_input(InputEvent::Released(place));

        let report = world.frame(Fixed64::ZERO);
        assert_eq!(report.gestures.successes(), 1);
        assert!(world.is_occupied(p(2, 3)));
    }

    #[test]
    fn hover_preview_blocks_out_of_stock() {
        let fx = fixture();
        let mut world = World::new(config(4, 4), fx.catalog.clone())
            .unwrap()
            .with_inventory(BlockInventory::new());
        world.select(Some(fx.chest)).unwrap();
        world.push_input(InputEvent::PointerMoved(Some(p(0, 0))));
        let report = world.frame(Fixed64::ZERO);
        assert_eq!(report.gestures.previews[0].groups[0].tint, PreviewTint::Blocked);
    }
}
