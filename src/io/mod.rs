pub mod cfg;
pub mod csv;
pub mod json;

pub use cfg::load_bodies;
pub use json::load_booster;
