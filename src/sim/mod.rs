//! Simulation Module
//!
//! Track generation, vehicle handling, race progress and particles for up
//! to four local drivers, advanced in fixed ticks.

pub mod spline;
pub mod track;
pub mod vehicle;
pub mod progress;
pub mod particles;
pub mod race;
pub mod record;
pub mod simulation;

pub use spline::{Spline, SplineFrame};
pub use track::{Bounds, Checkpoint, Track, TrackConfig};
pub use vehicle::{Vehicle, VehicleInputs, VehicleState};
pub use progress::{DriverProgress, GateContainment, GateRules, ProgressEvent};
pub use particles::{Particle, ParticleSystem, PARTICLE_LIFETIME};
pub use race::{RaceConfig, RaceEvent, RaceSession, RaceSnapshot, MAX_DRIVERS};
pub use record::SessionRecord;
pub use simulation::{GameState, SharedSimulation, Simulation};
