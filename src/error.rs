//! Error types for track generation, race setup and persistence.

use thiserror::Error;

use crate::sim::simulation::GameState;

/// Everything that can stop a race from being set up.
///
/// Steady-state ticking never fails; these are all raised before the first
/// tick or while loading configuration and records.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("spline needs at least 4 control points, got {0}")]
    NotEnoughControlPoints(usize),

    #[error("control point {index} is not usable (non-finite or equal to its neighbour)")]
    DegenerateControlPoints { index: usize },

    #[error("degenerate track geometry at parameter {param}")]
    DegenerateGeometry { param: f32 },

    #[error("no drivers enabled")]
    NoDriversEnabled,

    #[error("invalid driver slot {0}")]
    InvalidSlot(usize),

    #[error("all driver slots are taken")]
    SlotsFull,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("operation not allowed in state {0:?}")]
    WrongState(GameState),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
