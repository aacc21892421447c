pub mod propellant;
pub mod stage;
pub mod booster;

pub use propellant::{density_of, Propellant, Residuals};
pub use stage::{Stage, StageBuilder};
pub use booster::{presets, Booster, BoosterBuilder};
