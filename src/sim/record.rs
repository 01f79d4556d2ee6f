//! Record - What must survive between sessions
//!
//! The control points are enough to rebuild an identical track; best laps
//! are kept per slot plus the session best.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sim::race::{RaceConfig, RaceSession, MAX_DRIVERS};
use crate::sim::track::{Track, TrackConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Seed of the recorded session; also seeds the particle jitter
    pub seed: u64,
    pub control_points: Vec<Vec2>,
    pub best_laps: [Option<u64>; MAX_DRIVERS],
    pub session_best: Option<u64>,
}

impl SessionRecord {
    pub fn capture(session: &RaceSession) -> Self {
        let mut best_laps = [None; MAX_DRIVERS];
        for (slot, driver) in session.drivers().iter().enumerate() {
            best_laps[slot] = driver.best_lap;
        }
        Self {
            seed: session.seed(),
            control_points: session.track().control_points().to_vec(),
            best_laps,
            session_best: session.best_lap(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild the recorded track with the given generation parameters
    pub fn rebuild_track(&self, config: &TrackConfig) -> Result<Track> {
        Track::from_control_points(self.control_points.clone(), config)
    }

    /// Start a new race on the recorded track with best laps carried over
    pub fn resume(&self, slots: &[usize], config: RaceConfig) -> Result<RaceSession> {
        let track = self.rebuild_track(&config.track)?;
        let mut session = RaceSession::new(track, slots, config, self.seed)?;
        session.restore_bests(&self.best_laps, self.session_best);
        Ok(session)
    }
}
