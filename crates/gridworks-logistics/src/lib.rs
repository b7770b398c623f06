//! Item movement and machine behaviour on the occupancy grid.
//!
//! One logistics tick runs two passes over the grid's arena: the transport
//! pass ([`conveyor::tick_conveyors`]) and then machine processing
//! ([`machine::tick_machines`]). Both iterate in arena order so runs are
//! reproducible.

use gridworks_core::catalog::Catalog;
use gridworks_core::fixed::Fixed64;
use gridworks_spatial::OccupancyGrid;

pub mod conveyor;
pub mod machine;

pub use conveyor::{TransferOutcome, TransportReport, tick_conveyors};
pub use machine::{MachineReport, can_receive_item, receive_item, take_output, tick_machines};

/// Combined result of one logistics tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogisticsReport {
    pub transport: TransportReport,
    pub machines: MachineReport,
}

/// Run transport then machine processing for one fixed tick of `dt` seconds.
pub fn tick(grid: &mut OccupancyGrid, catalog: &Catalog, dt: Fixed64) -> LogisticsReport {
    let transport = tick_conveyors(grid, catalog, dt);
    let machines = tick_machines(grid, catalog);
    LogisticsReport {
        transport,
        machines,
    }
}
