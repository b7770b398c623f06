//! Headless runner: loads `data/`, lays out a small smelting line with
//! gestures, runs it, prints a summary, and verifies determinism.
//!
//! Run with: `cargo run --package gridworks-world --example headless_runner`
//! (`RUST_LOG=debug` for per-tick detail).

use std::path::Path;

use env_logger::{Builder, Env};
use gridworks_core::fixed::{Fixed64, fixed64_to_f64};
use gridworks_core::geometry::GridPosition;
use gridworks_core::inventory::BlockInventory;
use gridworks_gesture::InputEvent;
use gridworks_world::{World, WorldError};

const FRAMES: u32 = 600;

/// Everything compared between the two runs.
#[derive(Debug, PartialEq)]
struct Summary {
    tick: u64,
    entities: usize,
    items_in_chest: u64,
    stored_energy: Fixed64,
    net: Fixed64,
}

/// Drag a line of the selected definition from `from` to `to`.
fn drag_line(world: &mut World, from: GridPosition, to: GridPosition) -> usize {
    let bindings = world.config().bindings;
    world.push_input(InputEvent::PointerMoved(Some(from)));
    world.push_input(InputEvent::Pressed(bindings.line_modifier));
    world.push_input(InputEvent::Pressed(bindings.place));
    let mut placed = world.frame(Fixed64::ZERO).gestures.successes();

    world.push_input(InputEvent::PointerMoved(Some(to)));
    world.push_input(InputEvent::Released(bindings.place));
    world.push_input(InputEvent::Released(bindings.line_modifier));
    placed += world.frame(Fixed64::ZERO).gestures.successes();
    placed
}

fn run(data_dir: &Path) -> Result<Summary, WorldError> {
    let world = World::load(data_dir)?;
    let belt = world.definition_named("belt")?;
    let stock = BlockInventory::new()
        .with_blocks(belt, 8)
        .with_blocks(world.definition_named("drill")?, 1)
        .with_blocks(world.definition_named("smelter")?, 1)
        .with_blocks(world.definition_named("chest")?, 1)
        .with_blocks(world.definition_named("generator")?, 1);
    let mut world = world.with_inventory(stock);

    let generator = world.definition_named("generator")?;
    world.place(GridPosition::new(1, 7), generator)?;
    for (name, x) in [("drill", 1), ("smelter", 5), ("chest", 10)] {
        let id = world.definition_named(name)?;
        if let Err(e) = world.place(GridPosition::new(x, 2), id) {
            println!("  could not place {name}: {e}");
        }
    }

    world.select(Some(belt))?;
    let mut belts = drag_line(&mut world, GridPosition::new(2, 2), GridPosition::new(4, 2));
    belts += drag_line(&mut world, GridPosition::new(7, 2), GridPosition::new(9, 2));
    println!("  belts placed by gesture: {belts}");

    let elapsed = Fixed64::ONE / Fixed64::from_num(60);
    let mut moved = 0;
    let mut produced = 0;
    for _ in 0..FRAMES {
        let report = world.frame(elapsed);
        moved += report.transport.moved();
        produced += report.machines.produced;
        for event in &report.power_events {
            println!("  power: {event:?}");
        }
    }

    let chest = world
        .entity_at(GridPosition::new(10, 2))
        .and_then(|id| world.entity(id))
        .map_or(0, |e| e.item_count());
    let power = world.power_snapshot();
    println!(
        "  tick {}: {} entities, {moved} item moves, {produced} produced, {chest} in chest",
        world.tick(),
        world.grid().entity_count(),
    );
    println!(
        "  power: generation {:.2}, drain {:.2} + base {:.2}, net {:.2}, stored {:.2}/{:.2}",
        fixed64_to_f64(power.total_generation),
        fixed64_to_f64(power.total_drain),
        fixed64_to_f64(power.tile_base_drain),
        fixed64_to_f64(power.net),
        fixed64_to_f64(power.stored),
        fixed64_to_f64(power.capacity),
    );

    Ok(Summary {
        tick: world.tick(),
        entities: world.grid().entity_count(),
        items_in_chest: chest,
        stored_energy: power.stored,
        net: power.net,
    })
}

fn main() {
    let _ = Builder::from_env(Env::default().default_filter_or("info")).try_init();
    let data_dir = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data"));

    println!("--- run 1 ---");
    let first = run(data_dir).unwrap_or_else(|e| panic!("run 1 failed: {e}"));
    println!("--- run 2 ---");
    let second = run(data_dir).unwrap_or_else(|e| panic!("run 2 failed: {e}"));

    if first == second {
        println!("Determinism: PASS");
    } else {
        println!("Determinism: FAIL! {first:?} != {second:?}");
        std::process::exit(1);
    }
}
