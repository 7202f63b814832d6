mod duration;
mod maintenance;

pub use duration::parse_duration;
pub use maintenance::{CommandSpec, MaintenanceConfig};
