//! Loop Racer - Simulation core
//!
//! Builds a closed-loop track from a seed, advances car handling every tick
//! and keeps checkpoint, lap and best-time state for up to four drivers.
//! Windowing, input polling and rendering live in the host; it feeds
//! per-slot [`VehicleInputs`] into [`Simulation::tick`] and draws the
//! returned [`RaceSnapshot`].

pub mod error;
pub mod sim;

pub use error::{Result, SimError};
pub use sim::{
    GameState, RaceConfig, RaceSession, RaceSnapshot, SessionRecord, SharedSimulation,
    Simulation, Track, TrackConfig, VehicleInputs,
};
