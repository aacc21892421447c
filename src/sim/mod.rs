pub mod state;
pub mod event;
pub mod steering;
pub mod ground;
pub mod surface;
pub mod inertial;
pub mod runner;

pub use event::{EventKey, EventMap, Profile};
pub use ground::{ElevationMap, Ground};
pub use inertial::{InertialSim, InertialStart};
pub use runner::{run, run_ascent, run_maneuver, run_retro, Integrator, RunEnd, RunResult, SimConfig, StepResult};
pub use state::{InertialSnapshot, Kinematics, SimState};
pub use steering::{Attitude, AttitudeSource, InertialMode, LiveAttitude, SurfaceMode};
pub use surface::{SurfaceSim, SurfaceStart};
