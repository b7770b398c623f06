//! Conveyor transport: per-tile progress and item hand-off.
//!
//! Each tick every conveyor, in arena order:
//!
//! 1. pulls one unit from the miner or crafter directly behind it when it
//!    carries nothing,
//! 2. accumulates `progress += speed * dt` while carrying, saturating at 1,
//! 3. at full progress tries to move its stack one cell ahead: onto the
//!    ground if the cell is empty, onto a conveyor that was empty at the
//!    start of the tick, or into a machine or storage that accepts it.
//!
//! A refused transfer leaves the stack where it is. Every transfer takes the
//! stack out of its source before placing it, so a unit is never held by two
//! entities at once.

use std::collections::BTreeSet;

use gridworks_core::catalog::Catalog;
use gridworks_core::fixed::Fixed64;
use gridworks_core::geometry::GridPosition;
use gridworks_core::id::EntityId;
use gridworks_core::item::ItemStack;
use gridworks_spatial::OccupancyGrid;
use log::trace;

use crate::machine::{can_receive_item, receive_item, take_output};

/// Result of one conveyor's transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Into a machine or storage.
    Delivered,
    /// Onto the next conveyor.
    HandedOff,
    /// Onto the ground of an empty cell.
    Dropped,
    /// Nothing accepted it; the stack stays put.
    Rejected,
}

/// Counts from one transport pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportReport {
    pub pulled: u32,
    pub delivered: u32,
    pub handed_off: u32,
    pub dropped: u32,
    pub rejected: u32,
}

impl TransportReport {
    fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Delivered => self.delivered += 1,
            TransferOutcome::HandedOff => self.handed_off += 1,
            TransferOutcome::Dropped => self.dropped += 1,
            TransferOutcome::Rejected => self.rejected += 1,
        }
    }

    /// Transfers that moved a stack off its conveyor.
    pub fn moved(&self) -> u32 {
        self.delivered + self.handed_off + self.dropped
    }

    /// Fold another pass's counts into this one.
    pub fn merge(&mut self, other: &TransportReport) {
        self.pulled += other.pulled;
        self.delivered += other.delivered;
        self.handed_off += other.handed_off;
        self.dropped += other.dropped;
        self.rejected += other.rejected;
    }
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// Advance every conveyor on the grid by `dt` seconds.
pub fn tick_conveyors(grid: &mut OccupancyGrid, catalog: &Catalog, dt: Fixed64) -> TransportReport {
    let conveyors: Vec<EntityId> = grid
        .entities()
        .filter(|(_, e)| e.conveyor().is_some())
        .map(|(id, _)| id)
        .collect();
    let empty_at_start: BTreeSet<EntityId> = grid
        .entities()
        .filter(|(_, e)| e.conveyor().is_some_and(|c| c.carried.is_none()))
        .map(|(id, _)| id)
        .collect();

    let mut pass = Pass {
        catalog,
        empty_at_start,
        arrived: BTreeSet::new(),
        report: TransportReport::default(),
    };
    for id in conveyors {
        // A stack handed on this tick has already moved one tile.
        if pass.arrived.contains(&id) {
            continue;
        }
        pass.advance(grid, id, dt);
    }
    pass.report
}

struct Pass<'a> {
    catalog: &'a Catalog,
    empty_at_start: BTreeSet<EntityId>,
    arrived: BTreeSet<EntityId>,
    report: TransportReport,
}

impl Pass<'_> {
    fn advance(&mut self, grid: &mut OccupancyGrid, id: EntityId, dt: Fixed64) {
        let Some(entity) = grid.entity(id) else {
            return;
        };
        let Some(conveyor) = entity.conveyor() else {
            return;
        };
        let cell = entity.anchor;
        let direction = conveyor.direction;

        if conveyor.carried.is_none() {
            self.pull(grid, id, cell.step(direction.opposite()));
        }

        let Some(conveyor) = grid.entity_mut(id).and_then(|e| e.conveyor_mut()) else {
            return;
        };
        if conveyor.carried.is_none() {
            return;
        }
        let progress = conveyor.progress.saturating_add(conveyor.speed.saturating_mul(dt));
        conveyor.progress = progress.min(Fixed64::ONE);
        if conveyor.progress < Fixed64::ONE {
            return;
        }

        let outcome = self.transfer(grid, id, cell.step(direction));
        if outcome != TransferOutcome::Rejected {
            if let Some(conveyor) = grid.entity_mut(id).and_then(|e| e.conveyor_mut()) {
                conveyor.progress = Fixed64::ZERO;
            }
        }
        self.report.record(outcome);
    }

    /// Step 1: take one unit from a machine output behind the conveyor.
    fn pull(&mut self, grid: &mut OccupancyGrid, id: EntityId, behind: GridPosition) {
        let Some(source) = grid.entity_at(behind) else {
            return;
        };
        // Both ends are borrowed together so the unit moves in one step.
        let Some([belt, machine]) = grid.entity_pair_mut(id, source) else {
            return;
        };
        let Some(conveyor) = belt.conveyor_mut() else {
            return;
        };
        if conveyor.carried.is_some() {
            return;
        }
        let Some(stack) = take_output(machine) else {
            return;
        };
        trace!("conveyor {id:?} pulled {stack:?} from {source:?}");
        conveyor.carried = Some(stack);
        conveyor.progress = Fixed64::ZERO;
        self.report.pulled += 1;
    }

    /// Step 2: move the carried stack to the cell ahead.
    fn transfer(&mut self, grid: &mut OccupancyGrid, id: EntityId, ahead: GridPosition) -> TransferOutcome {
        if !grid.is_in_bounds(ahead) {
            return TransferOutcome::Rejected;
        }
        let Some(carried) = grid
            .entity(id)
            .and_then(|e| e.conveyor())
            .and_then(|c| c.carried.clone())
        else {
            return TransferOutcome::Rejected;
        };

        let Some(target) = grid.entity_at(ahead) else {
            if !grid.can_drop(ahead, &carried) {
                return TransferOutcome::Rejected;
            }
            let Some(stack) = take_carried(grid, id) else {
                return TransferOutcome::Rejected;
            };
            return match grid.drop_item(ahead, stack) {
                Ok(()) => {
                    trace!("conveyor {id:?} dropped {carried:?} at {ahead:?}");
                    TransferOutcome::Dropped
                }
                Err(stack) => {
                    restore_carried(grid, id, stack);
                    TransferOutcome::Rejected
                }
            };
        };
        if target == id {
            return TransferOutcome::Rejected;
        }

        let target_is_conveyor = grid.entity(target).is_some_and(|e| e.conveyor().is_some());
        if target_is_conveyor {
            self.hand_off(grid, id, target)
        } else {
            self.deliver(grid, id, target, &carried)
        }
    }

    fn hand_off(&mut self, grid: &mut OccupancyGrid, id: EntityId, target: EntityId) -> TransferOutcome {
        let target_free = self.empty_at_start.contains(&target)
            && grid
                .entity(target)
                .and_then(|e| e.conveyor())
                .is_some_and(|c| c.carried.is_none());
        if !target_free {
            return TransferOutcome::Rejected;
        }
        let Some(stack) = take_carried(grid, id) else {
            return TransferOutcome::Rejected;
        };
        match grid.entity_mut(target).and_then(|e| e.conveyor_mut()) {
            Some(next) => {
                trace!("conveyor {id:?} handed {stack:?} to {target:?}");
                next.carried = Some(stack);
                next.progress = Fixed64::ZERO;
                self.arrived.insert(target);
                TransferOutcome::HandedOff
            }
            None => {
                restore_carried(grid, id, stack);
                TransferOutcome::Rejected
            }
        }
    }

    fn deliver(
        &mut self,
        grid: &mut OccupancyGrid,
        id: EntityId,
        target: EntityId,
        carried: &ItemStack,
    ) -> TransferOutcome {
        let accepts = grid.entity(target).is_some_and(|e| {
            self.catalog
                .definition(e.definition)
                .is_some_and(|def| can_receive_item(e, def, carried))
        });
        if !accepts {
            return TransferOutcome::Rejected;
        }
        let Some(stack) = take_carried(grid, id) else {
            return TransferOutcome::Rejected;
        };
        let result = match grid.entity_mut(target) {
            Some(entity) => match self.catalog.definition(entity.definition) {
                Some(def) => receive_item(entity, def, stack),
                None => Err(stack),
            },
            None => Err(stack),
        };
        match result {
            Ok(()) => {
                trace!("conveyor {id:?} delivered {carried:?} to {target:?}");
                TransferOutcome::Delivered
            }
            Err(stack) => {
                restore_carried(grid, id, stack);
                TransferOutcome::Rejected
            }
        }
    }
}

fn take_carried(grid: &mut OccupancyGrid, id: EntityId) -> Option<ItemStack> {
    grid.entity_mut(id)
        .and_then(|e| e.conveyor_mut())
        .and_then(|c| c.carried.take())
}

fn restore_carried(grid: &mut OccupancyGrid, id: EntityId, stack: ItemStack) {
    if let Some(conveyor) = grid.entity_mut(id).and_then(|e| e.conveyor_mut()) {
        conveyor.carried = Some(stack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworks_core::geometry::GridBounds;
    use gridworks_core::id::DefinitionId;
    use gridworks_core::test_utils::{Fixture, fixed, fixture};
    use gridworks_spatial::{EntityState, MachineState};

    struct Line {
        fx: Fixture,
        grid: OccupancyGrid,
    }

    impl Line {
        fn new(w: u32, h: u32) -> Self {
            Self {
                fx: fixture(),
                grid: OccupancyGrid::new(GridBounds::new(w, h)),
            }
        }

        fn put(&mut self, def: DefinitionId, x: i32, y: i32) -> EntityId {
            self.grid
                .place(GridPosition::new(x, y), def, self.fx.def(def))
                .unwrap()
        }

        fn load(&mut self, id: EntityId, stack: ItemStack) {
            self.grid.entity_mut(id).unwrap().conveyor_mut().unwrap().carried = Some(stack);
        }

        fn carried(&self, id: EntityId) -> Option<ItemStack> {
            self.grid.entity(id).unwrap().conveyor().unwrap().carried.clone()
        }

        fn progress(&self, id: EntityId) -> Fixed64 {
            self.grid.entity(id).unwrap().conveyor().unwrap().progress
        }

        fn tick(&mut self, dt: f64) -> TransportReport {
            tick_conveyors(&mut self.grid, &self.fx.catalog, fixed(dt))
        }

        fn total_items(&self) -> u64 {
            let on_entities: u64 = self.grid.entities().map(|(_, e)| e.item_count()).sum();
            let on_ground: u64 = self.grid.ground_items().map(|(_, s)| s.quantity as u64).sum();
            on_entities + on_ground
        }
    }

    // -----------------------------------------------------------------------
    // Test 1: progress accumulates per tick, independent of frame slicing
    // -----------------------------------------------------------------------

    #[test]
    fn progress_accumulates_while_carrying() {
        let mut line = Line::new(4, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        line.put(line.fx.chest, 1, 0);
        let ore = ItemStack::one(line.fx.ore);
        line.load(belt, ore.clone());

        line.tick(0.25);
        line.tick(0.25);
        assert_eq!(line.progress(belt), fixed(0.5));
        assert_eq!(line.carried(belt), Some(ore));

        line.tick(0.25);
        let report = line.tick(0.25);
        assert_eq!(report.delivered, 1);
        assert_eq!(line.carried(belt), None);
        assert_eq!(line.progress(belt), Fixed64::ZERO);
    }

    #[test]
    fn empty_conveyor_does_not_accumulate() {
        let mut line = Line::new(2, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        line.tick(5.0);
        assert_eq!(line.progress(belt), Fixed64::ZERO);
    }

    // -----------------------------------------------------------------------
    // Test 2: drop onto an empty cell
    // -----------------------------------------------------------------------

    #[test]
    fn drops_onto_empty_cell() {
        let mut line = Line::new(3, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        line.load(belt, ItemStack::one(line.fx.ore));

        let report = line.tick(1.0);
        assert_eq!(report.dropped, 1);
        assert_eq!(line.carried(belt), None);
        assert_eq!(
            line.grid.ground_item(GridPosition::new(1, 0)),
            Some(&ItemStack::one(line.fx.ore))
        );
    }

    #[test]
    fn drop_refused_on_foreign_ground_stack() {
        let mut line = Line::new(3, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        line.grid
            .drop_item(GridPosition::new(1, 0), ItemStack::one(line.fx.plate))
            .unwrap();
        line.load(belt, ItemStack::one(line.fx.ore));

        let report = line.tick(1.0);
        assert_eq!(report.rejected, 1);
        assert_eq!(line.carried(belt), Some(ItemStack::one(line.fx.ore)));
        assert_eq!(line.progress(belt), Fixed64::ONE);
    }

    #[test]
    fn edge_of_grid_rejects() {
        let mut line = Line::new(1, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        line.load(belt, ItemStack::one(line.fx.ore));
        assert_eq!(line.tick(1.0).rejected, 1);
        assert!(line.carried(belt).is_some());
    }

    // -----------------------------------------------------------------------
    // Test 3: hand-off between conveyors
    // -----------------------------------------------------------------------

    #[test]
    fn hands_off_to_empty_conveyor() {
        let mut line = Line::new(3, 1);
        let a = line.put(line.fx.belt_east, 0, 0);
        let b = line.put(line.fx.belt_east, 1, 0);
        line.load(a, ItemStack::one(line.fx.ore));

        let report = line.tick(1.0);
        assert_eq!(report.handed_off, 1);
        assert_eq!(line.carried(a), None);
        assert_eq!(line.carried(b), Some(ItemStack::one(line.fx.ore)));
        // The arriving stack does not move again in the same tick.
        assert_eq!(line.progress(b), Fixed64::ZERO);
        assert!(line.grid.ground_item(GridPosition::new(2, 0)).is_none());
    }

    #[test]
    fn hand_off_waits_for_occupied_conveyor() {
        let mut line = Line::new(2, 1);
        let a = line.put(line.fx.belt_east, 0, 0);
        let b = line.put(line.fx.belt_south, 1, 0);
        line.load(a, ItemStack::one(line.fx.ore));
        line.load(b, ItemStack::one(line.fx.plate));

        // `b` points off the grid, so it never clears.
        for _ in 0..3 {
            let report = line.tick(1.0);
            assert_eq!(report.rejected, 2);
        }
        assert_eq!(line.carried(a), Some(ItemStack::one(line.fx.ore)));
        assert_eq!(line.carried(b), Some(ItemStack::one(line.fx.plate)));
    }

    #[test]
    fn chain_moves_one_tile_per_full_progress() {
        let mut line = Line::new(5, 1);
        let belts: Vec<_> = (0..4).map(|x| line.put(line.fx.belt_east, x, 0)).collect();
        line.load(belts[0], ItemStack::one(line.fx.ore));

        for step in 1..4 {
            line.tick(1.0);
            assert_eq!(line.carried(belts[step]), Some(ItemStack::one(line.fx.ore)));
            assert_eq!(line.total_items(), 1);
        }
        line.tick(1.0);
        assert_eq!(
            line.grid.ground_item(GridPosition::new(4, 0)),
            Some(&ItemStack::one(line.fx.ore))
        );
    }

    #[test]
    fn occupied_at_tick_start_is_not_reused_same_tick() {
        // b is placed before a, so b moves first and frees up; a still waits
        // because b was carrying at the start of the tick.
        let mut line = Line::new(3, 1);
        let b = line.put(line.fx.belt_east, 1, 0);
        let a = line.put(line.fx.belt_east, 0, 0);
        line.load(a, ItemStack::one(line.fx.ore));
        line.load(b, ItemStack::one(line.fx.ore));

        let report = line.tick(1.0);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(line.carried(b), None);
        assert!(line.carried(a).is_some());

        let report = line.tick(1.0);
        assert_eq!(report.handed_off, 1);
        assert_eq!(line.total_items(), 2);
    }

    // -----------------------------------------------------------------------
    // Test 4: machines and storage
    // -----------------------------------------------------------------------

    #[test]
    fn pulls_from_miner_behind() {
        let mut line = Line::new(3, 1);
        let drill = line.put(line.fx.drill, 0, 0);
        let belt = line.put(line.fx.belt_east, 1, 0);
        if let EntityState::Miner(MachineState { output, .. }) =
            &mut line.grid.entity_mut(drill).unwrap().state
        {
            output.insert(ItemStack::new(line.fx.ore, 3)).unwrap();
        }

        let report = line.tick(0.5);
        assert_eq!(report.pulled, 1);
        assert_eq!(line.carried(belt), Some(ItemStack::one(line.fx.ore)));
        assert_eq!(line.grid.entity(drill).unwrap().item_count(), 2);
    }

    #[test]
    fn never_pulls_from_storage_or_conveyor() {
        let mut line = Line::new(3, 1);
        let chest = line.put(line.fx.chest, 0, 0);
        let belt = line.put(line.fx.belt_east, 1, 0);
        if let EntityState::Storage(s) = &mut line.grid.entity_mut(chest).unwrap().state {
            s.contents.insert(line.fx.ore, 3);
        }
        assert_eq!(line.tick(1.0).pulled, 0);
        assert_eq!(line.carried(belt), None);
    }

    #[test]
    fn back_pressure_keeps_item_when_storage_full() {
        let mut line = Line::new(2, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        let chest = line.put(line.fx.chest, 1, 0);
        if let EntityState::Storage(s) = &mut line.grid.entity_mut(chest).unwrap().state {
            s.contents.insert(line.fx.plate, 5);
        }
        line.load(belt, ItemStack::one(line.fx.ore));

        for _ in 0..4 {
            assert_eq!(line.tick(1.0).rejected, 1);
        }
        assert_eq!(line.carried(belt), Some(ItemStack::one(line.fx.ore)));
        assert!(line.progress(belt) >= Fixed64::ONE);
        assert_eq!(line.total_items(), 6);
    }

    #[test]
    fn delivers_into_crafter_input() {
        let mut line = Line::new(2, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        let smelter = line.put(line.fx.smelter, 1, 0);
        line.load(belt, ItemStack::one(line.fx.ore));

        assert_eq!(line.tick(1.0).delivered, 1);
        match &line.grid.entity(smelter).unwrap().state {
            EntityState::Crafter(m) => assert_eq!(m.input.quantity_of(line.fx.ore), 1),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn crafter_rejects_wrong_item() {
        let mut line = Line::new(2, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        line.put(line.fx.smelter, 1, 0);
        line.load(belt, ItemStack::one(line.fx.plate));
        assert_eq!(line.tick(1.0).rejected, 1);
        assert!(line.carried(belt).is_some());
    }

    #[test]
    fn back_pressure_keeps_item_when_crafter_input_full() {
        let mut line = Line::new(3, 1);
        let belt = line.put(line.fx.belt_east, 0, 0);
        let smelter = line.put(line.fx.smelter, 1, 0);
        if let EntityState::Crafter(m) = &mut line.grid.entity_mut(smelter).unwrap().state {
            m.input.insert(ItemStack::new(line.fx.ore, 2)).unwrap();
        }
        line.load(belt, ItemStack::one(line.fx.ore));

        for _ in 0..4 {
            let report = line.tick(1.0);
            assert_eq!(report.rejected, 1);
            assert_eq!(report.delivered, 0);
            assert_eq!(line.carried(belt), Some(ItemStack::one(line.fx.ore)));
            assert_eq!(line.progress(belt), Fixed64::ONE);
            assert_eq!(line.total_items(), 3);
        }
        match &line.grid.entity(smelter).unwrap().state {
            EntityState::Crafter(m) => assert_eq!(m.input.quantity_of(line.fx.ore), 2),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn loaded_belt_leaves_machine_output_alone() {
        let mut line = Line::new(2, 1);
        let drill = line.put(line.fx.drill, 0, 0);
        let belt = line.put(line.fx.belt_east, 1, 0);
        if let EntityState::Miner(MachineState { output, .. }) =
            &mut line.grid.entity_mut(drill).unwrap().state
        {
            output.insert(ItemStack::new(line.fx.ore, 3)).unwrap();
        }
        line.load(belt, ItemStack::one(line.fx.plate));

        // `belt` faces the grid edge, so it never empties and never pulls.
        for _ in 0..3 {
            assert_eq!(line.tick(1.0).pulled, 0);
        }
        assert_eq!(line.grid.entity(drill).unwrap().item_count(), 3);
        assert_eq!(line.total_items(), 4);
    }

    #[test]
    fn pulling_conserves_units() {
        let mut line = Line::new(3, 1);
        let drill = line.put(line.fx.drill, 0, 0);
        line.put(line.fx.belt_east, 1, 0);
        if let EntityState::Miner(MachineState { output, .. }) =
            &mut line.grid.entity_mut(drill).unwrap().state
        {
            output.insert(ItemStack::new(line.fx.ore, 4)).unwrap();
        }

        let mut pulled = 0;
        for _ in 0..10 {
            pulled += line.tick(1.0).pulled;
            assert_eq!(line.total_items(), 4);
        }
        assert_eq!(pulled, 4);
        assert_eq!(line.grid.entity(drill).unwrap().item_count(), 0);
        assert_eq!(
            line.grid.ground_item(GridPosition::new(2, 0)),
            Some(&ItemStack::new(line.fx.ore, 4))
        );
    }
}
