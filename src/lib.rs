pub mod error;
pub mod math;
pub mod physics;
pub mod vehicle;
pub mod orbital;
pub mod sim;
pub mod io;

pub use error::{PlannerError, Result};
