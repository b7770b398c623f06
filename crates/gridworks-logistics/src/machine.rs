//! Per-category tick behaviour for miners, crafters and storage.
//!
//! Dispatch is a match on [`EntityState`]; each variant runs its own
//! `on_tick`. Conveyors are advanced separately by the transport pass, and
//! inert entities do nothing.

use gridworks_core::catalog::{Catalog, Definition};
use gridworks_core::item::ItemStack;
use gridworks_spatial::{Entity, EntityState, MachineState, MachineStatus, OccupancyGrid, StorageState};
use log::trace;

/// Totals from one machine pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineReport {
    /// Units produced into output slots.
    pub produced: u32,
    /// Units consumed from input slots.
    pub consumed: u32,
    /// Machines that could not progress this tick.
    pub stalled: u32,
}

impl MachineReport {
    pub fn merge(&mut self, other: &MachineReport) {
        self.produced += other.produced;
        self.consumed += other.consumed;
        self.stalled += other.stalled;
    }
}

// ---------------------------------------------------------------------------
// Tick dispatch
// ---------------------------------------------------------------------------

/// Advance every miner and crafter by one tick, in arena order.
pub fn tick_machines(grid: &mut OccupancyGrid, catalog: &Catalog) -> MachineReport {
    let mut report = MachineReport::default();
    for id in grid.entity_ids() {
        let Some(entity) = grid.entity_mut(id) else {
            continue;
        };
        let Some(def) = catalog.definition(entity.definition) else {
            continue;
        };
        on_tick(&mut entity.state, def, &mut report);
    }
    report
}

fn on_tick(state: &mut EntityState, def: &Definition, report: &mut MachineReport) {
    match state {
        EntityState::Miner(machine) => tick_miner(machine, def, report),
        EntityState::Crafter(machine) => tick_crafter(machine, def, report),
        // Storage is a passive sink; conveyors move in the transport pass.
        EntityState::Storage(_) | EntityState::Conveyor(_) | EntityState::Inert => {}
    }
}

fn set_status(machine: &mut MachineState, status: MachineStatus, report: &mut MachineReport) {
    if matches!(status, MachineStatus::MissingInput | MachineStatus::OutputFull) {
        report.stalled += 1;
    }
    machine.status = status;
}

// ---------------------------------------------------------------------------
// Miner
// ---------------------------------------------------------------------------

/// Adds `output.amount` every `tick_interval` ticks. The cycle timer does
/// not advance while the output slot is full.
fn tick_miner(machine: &mut MachineState, def: &Definition, report: &mut MachineReport) {
    let Some(output) = def.output else {
        machine.status = MachineStatus::Idle;
        return;
    };
    if !machine.output.can_accept(output.item, output.amount) {
        set_status(machine, MachineStatus::OutputFull, report);
        return;
    }

    machine.elapsed += 1;
    set_status(machine, MachineStatus::Working, report);
    if machine.elapsed < def.tick_interval.max(1) {
        return;
    }

    machine.elapsed = 0;
    if machine
        .output
        .insert(ItemStack::new(output.item, output.amount))
        .is_ok()
    {
        report.produced += output.amount;
        trace!("'{}' mined {} x{:?}", def.name, output.amount, output.item);
    }
}

// ---------------------------------------------------------------------------
// Crafter
// ---------------------------------------------------------------------------

/// Runs a `tick_interval` cycle once the input is satisfied and the output
/// has room, then converts input into output.
fn tick_crafter(machine: &mut MachineState, def: &Definition, report: &mut MachineReport) {
    let (Some(input), Some(output)) = (def.input, def.output) else {
        machine.status = MachineStatus::Idle;
        return;
    };

    if machine.input.quantity_of(input.item) < input.amount {
        machine.elapsed = 0;
        set_status(machine, MachineStatus::MissingInput, report);
        return;
    }
    if !machine.output.can_accept(output.item, output.amount) {
        set_status(machine, MachineStatus::OutputFull, report);
        return;
    }

    machine.elapsed += 1;
    set_status(machine, MachineStatus::Working, report);
    if machine.elapsed < def.tick_interval.max(1) {
        return;
    }

    machine.elapsed = 0;
    let consumed = machine.input.remove(input.amount);
    report.consumed += consumed;
    if machine
        .output
        .insert(ItemStack::new(output.item, output.amount))
        .is_ok()
    {
        report.produced += output.amount;
        trace!(
            "'{}' crafted {} x{:?} from {} x{:?}",
            def.name, output.amount, output.item, consumed, input.item
        );
    }
}

// ---------------------------------------------------------------------------
// Item exchange with conveyors
// ---------------------------------------------------------------------------

/// Whether `entity` would accept `stack` right now.
///
/// Crafters accept their declared input item while the input slot has room;
/// storage accepts anything while below capacity. Everything else refuses.
pub fn can_receive_item(entity: &Entity, def: &Definition, stack: &ItemStack) -> bool {
    match &entity.state {
        EntityState::Crafter(machine) => def.input.is_some_and(|input| {
            input.item == stack.item_type
                && machine.input.can_accept(stack.item_type, stack.quantity)
        }),
        EntityState::Storage(storage) => storage.has_room_for(stack.quantity),
        _ => false,
    }
}

/// Hand `stack` to `entity`. On refusal the stack comes back unchanged.
pub fn receive_item(entity: &mut Entity, def: &Definition, stack: ItemStack) -> Result<(), ItemStack> {
    if !can_receive_item(entity, def, &stack) {
        return Err(stack);
    }
    match &mut entity.state {
        EntityState::Crafter(machine) => machine.input.insert(stack),
        EntityState::Storage(storage) => {
            store(storage, stack);
            Ok(())
        }
        _ => Err(stack),
    }
}

fn store(storage: &mut StorageState, stack: ItemStack) {
    *storage.contents.entry(stack.item_type).or_insert(0) += stack.quantity;
}

/// Take one unit from a miner or crafter output slot. Conveyors, storage
/// and inert entities are never pull sources.
pub fn take_output(entity: &mut Entity) -> Option<ItemStack> {
    match &mut entity.state {
        EntityState::Miner(machine) | EntityState::Crafter(machine) => machine.output.take_one(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworks_core::geometry::{GridBounds, GridPosition};
    use gridworks_core::id::EntityId;
    use gridworks_core::test_utils::{Fixture, fixture};

    fn setup(def: fn(&Fixture) -> gridworks_core::id::DefinitionId) -> (Fixture, OccupancyGrid, EntityId) {
        let fx = fixture();
        let mut grid = OccupancyGrid::new(GridBounds::new(4, 4));
        let id = def(&fx);
        let entity = grid.place(GridPosition::new(0, 0), id, fx.def(id)).unwrap();
        (fx, grid, entity)
    }

    fn machine(grid: &OccupancyGrid, id: EntityId) -> &MachineState {
        match &grid.entity(id).unwrap().state {
            EntityState::Miner(m) | EntityState::Crafter(m) => m,
            other => panic!("not a machine: {other:?}"),
        }
    }

    #[test]
    fn miner_produces_every_interval() {
        let (fx, mut grid, drill) = setup(|fx| fx.drill);
        let mut produced = 0;
        for _ in 0..8 {
            produced += tick_machines(&mut grid, &fx.catalog).produced;
        }
        assert_eq!(produced, 2);
        assert_eq!(machine(&grid, drill).output.quantity_of(fx.ore), 2);
    }

    #[test]
    fn miner_stalls_when_output_full() {
        let (fx, mut grid, drill) = setup(|fx| fx.drill);
        // Buffer 10, one ore per 4 ticks: full after 40 ticks.
        for _ in 0..60 {
            tick_machines(&mut grid, &fx.catalog);
        }
        let m = machine(&grid, drill);
        assert_eq!(m.output.quantity(), 10);
        assert_eq!(m.status, MachineStatus::OutputFull);
    }

    #[test]
    fn crafter_waits_for_input() {
        let (fx, mut grid, smelter) = setup(|fx| fx.smelter);
        let report = tick_machines(&mut grid, &fx.catalog);
        assert_eq!(report.stalled, 1);
        assert_eq!(machine(&grid, smelter).status, MachineStatus::MissingInput);
    }

    #[test]
    fn crafter_converts_after_interval() {
        let (fx, mut grid, smelter) = setup(|fx| fx.smelter);
        let entity = grid.entity_mut(smelter).unwrap();
        receive_item(entity, fx.def(fx.smelter), ItemStack::one(fx.ore)).unwrap();

        assert_eq!(tick_machines(&mut grid, &fx.catalog).produced, 0);
        let report = tick_machines(&mut grid, &fx.catalog);
        assert_eq!(report.produced, 1);
        assert_eq!(report.consumed, 1);

        let m = machine(&grid, smelter);
        assert!(m.input.is_empty());
        assert_eq!(m.output.quantity_of(fx.plate), 1);
    }

    #[test]
    fn crafter_stalls_on_full_output() {
        let (fx, mut grid, smelter) = setup(|fx| fx.smelter);
        let def = fx.def(fx.smelter).clone();
        if let EntityState::Crafter(m) = &mut grid.entity_mut(smelter).unwrap().state {
            m.output.insert(ItemStack::new(fx.plate, 2)).unwrap();
            m.input.insert(ItemStack::one(fx.ore)).unwrap();
        }
        tick_machines(&mut grid, &fx.catalog);
        assert_eq!(machine(&grid, smelter).status, MachineStatus::OutputFull);

        let entity = grid.entity_mut(smelter).unwrap();
        assert_eq!(take_output(entity), Some(ItemStack::one(fx.plate)));
        assert!(can_receive_item(entity, &def, &ItemStack::one(fx.ore)));
    }

    #[test]
    fn crafter_refuses_wrong_item() {
        let (fx, mut grid, smelter) = setup(|fx| fx.smelter);
        let entity = grid.entity_mut(smelter).unwrap();
        let refused = receive_item(entity, fx.def(fx.smelter), ItemStack::one(fx.plate));
        assert_eq!(refused, Err(ItemStack::one(fx.plate)));
    }

    #[test]
    fn storage_accepts_until_full() {
        let (fx, mut grid, chest) = setup(|fx| fx.chest);
        let def = fx.def(fx.chest).clone();
        let entity = grid.entity_mut(chest).unwrap();
        for _ in 0..5 {
            receive_item(entity, &def, ItemStack::one(fx.ore)).unwrap();
        }
        assert!(!can_receive_item(entity, &def, &ItemStack::one(fx.plate)));
        assert_eq!(entity.item_count(), 5);
        // Never a pull source.
        assert_eq!(take_output(entity), None);
    }

    #[test]
    fn inert_entities_refuse_items() {
        let (fx, grid, generator) = setup(|fx| fx.generator);
        let entity = grid.entity(generator).unwrap();
        assert!(!can_receive_item(entity, fx.def(fx.generator), &ItemStack::one(fx.ore)));
    }
}
