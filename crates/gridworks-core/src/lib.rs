//! Gridworks Core -- shared vocabulary for the grid factory simulation.
//!
//! This crate holds the types every other gridworks crate speaks: stable ids,
//! deterministic fixed-point math, grid geometry, item stacks, the immutable
//! definition catalog, the block inventory collaborator, configuration
//! loading, and the fixed-step simulation clock.
//!
//! # Frame / Tick Pipeline
//!
//! The simulation context (`gridworks-world`) drives each frame as:
//!
//! 1. **Gesture** -- drain the input queue, compute previews, commit edits.
//! 2. **Notify** -- grid registration events are forwarded to the power
//!    accumulator immediately after each committed edit.
//! 3. **Tick** (zero or more fixed steps, see [`sim::SimClock`]):
//!    transport, machine processing, power integration.
//!
//! # Key Types
//!
//! - [`geometry::GridPosition`], [`geometry::Footprint`],
//!   [`geometry::Direction`], [`geometry::GridBounds`] -- grid geometry.
//! - [`catalog::Catalog`] -- frozen definition catalog built with
//!   [`catalog::CatalogBuilder`] or loaded from a data file.
//! - [`item::ItemStack`] / [`item::ItemSlot`] -- items and single-slot buffers.
//! - [`inventory::Inventory`] -- optional block inventory collaborator.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`config::SimConfig`] -- runtime configuration (RON/TOML/JSON).

pub mod catalog;
pub mod config;
pub mod fixed;
pub mod geometry;
pub mod id;
pub mod inventory;
pub mod item;
pub mod sim;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
