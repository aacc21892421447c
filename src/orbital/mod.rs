pub mod anomaly;
pub mod body;
pub mod elements;
pub mod encounter;
pub mod maneuvers;

pub use body::{BodyOrbit, BodyRegistry, CelestialBody, ParentBody};
pub use elements::{KeplerianElements, PlanarOrbit};
pub use encounter::{closest_approach, soi_entry, soi_exit, Approach, SoiCrossing, TargetBody};
pub use maneuvers::{hohmann, transfer_window, HohmannTransfer, TransferWindow};
