//! Maintenance engine: health checks, the issue taxonomy and safe repairs.

mod checks;
mod engine;
mod report;

pub use engine::MaintenanceEngine;
pub use report::{CheckDepth, MaintenanceReport};
