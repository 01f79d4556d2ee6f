//! Simulation - Front-end state machine and tick driver
//!
//! Tracks which screen the game is on, which controllers own which driver
//! slot, and the running race. The host shell calls into this once per
//! frame and renders the returned snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::sim::race::{RaceConfig, RaceEvent, RaceSession, RaceSnapshot, MAX_DRIVERS};
use crate::sim::record::SessionRecord;
use crate::sim::track::Track;
use crate::sim::vehicle::VehicleInputs;

/// Which screen the game is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Main,
    PlayerSelect,
    Race,
}

/// Simulation statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimStats {
    pub tick_rate: f32,
    pub avg_tick_time_ms: f32,
    pub driver_count: u32,
    pub game_state: GameState,
    pub paused: bool,
    pub ticks: u64,
}

/// Main simulation driver
pub struct Simulation {
    /// Current screen
    state: GameState,
    config: RaceConfig,
    /// Active race (if any)
    race: Option<RaceSession>,
    /// Controller id to driver slot
    controllers: BTreeMap<u32, usize>,
    /// Events produced by the last tick
    events: Vec<RaceEvent>,
    /// Recent tick durations for averaging
    tick_times: Vec<f32>,
    paused: bool,
}

impl Simulation {
    /// Create a new simulation on the main screen
    pub fn new(config: RaceConfig) -> Self {
        Self {
            state: GameState::Main,
            config,
            race: None,
            controllers: BTreeMap::new(),
            events: Vec::new(),
            tick_times: Vec::with_capacity(60),
            paused: false,
        }
    }

    fn expect_state(&self, expected: GameState) -> Result<()> {
        if self.state != expected {
            return Err(SimError::WrongState(self.state));
        }
        Ok(())
    }

    /// Main menu to player selection
    pub fn open_player_select(&mut self) -> Result<()> {
        self.expect_state(GameState::Main)?;
        self.state = GameState::PlayerSelect;
        Ok(())
    }

    /// Give `controller` the first free driver slot
    pub fn join(&mut self, controller: u32) -> Result<usize> {
        self.expect_state(GameState::PlayerSelect)?;
        if let Some(&slot) = self.controllers.get(&controller) {
            return Ok(slot);
        }

        let slot = (0..MAX_DRIVERS)
            .find(|s| !self.controllers.values().any(|taken| taken == s))
            .ok_or(SimError::SlotsFull)?;
        self.controllers.insert(controller, slot);
        log::info!("Controller {} joined as driver {}", controller, slot);
        Ok(slot)
    }

    /// Free the slot held by `controller`; returns whether it held one
    pub fn leave(&mut self, controller: u32) -> Result<bool> {
        self.expect_state(GameState::PlayerSelect)?;
        match self.controllers.remove(&controller) {
            Some(slot) => {
                log::info!("Driver {} left", slot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Enabled driver slots in ascending order
    pub fn enabled_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self.controllers.values().copied().collect();
        slots.sort_unstable();
        slots
    }

    /// Driver slot owned by `controller`
    pub fn slot_of(&self, controller: u32) -> Option<usize> {
        self.controllers.get(&controller).copied()
    }

    /// Generate a track from `seed` and start racing
    pub fn start_race(&mut self, seed: u64) -> Result<()> {
        self.expect_state(GameState::PlayerSelect)?;
        let slots = self.enabled_slots();
        if slots.is_empty() {
            return Err(SimError::NoDriversEnabled);
        }
        let track = Track::generate(seed, &self.config.track)?;
        let race = RaceSession::new(track, &slots, self.config.clone(), seed)?;
        self.begin(race);
        Ok(())
    }

    /// Race again on a recorded track, keeping its best laps
    pub fn start_from_record(&mut self, record: &SessionRecord) -> Result<()> {
        self.expect_state(GameState::PlayerSelect)?;
        let slots = self.enabled_slots();
        if slots.is_empty() {
            return Err(SimError::NoDriversEnabled);
        }
        let race = record.resume(&slots, self.config.clone())?;
        self.begin(race);
        Ok(())
    }

    fn begin(&mut self, race: RaceSession) {
        log::info!(
            "Race started with {} drivers on seed {}",
            race.cars().len(),
            race.seed()
        );
        self.race = Some(race);
        self.state = GameState::Race;
        self.paused = false;
        self.events.clear();
        self.tick_times.clear();
    }

    /// Perform a single simulation tick
    pub fn tick(&mut self, inputs: &BTreeMap<usize, VehicleInputs>) -> Option<RaceSnapshot> {
        if self.paused || self.state != GameState::Race {
            return self.snapshot();
        }

        let tick_start = Instant::now();
        if let Some(race) = &mut self.race {
            self.events = race.step(inputs);
        }

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > 60 {
            self.tick_times.remove(0);
        }

        self.snapshot()
    }

    /// Events produced by the most recent tick
    pub fn events(&self) -> &[RaceEvent] {
        &self.events
    }

    /// Get current race snapshot
    pub fn snapshot(&self) -> Option<RaceSnapshot> {
        self.race.as_ref().map(|r| r.snapshot())
    }

    pub fn race(&self) -> Option<&RaceSession> {
        self.race.as_ref()
    }

    /// Track and best laps worth keeping for a later session
    pub fn record(&self) -> Option<SessionRecord> {
        self.race.as_ref().map(SessionRecord::capture)
    }

    /// Get simulation statistics
    pub fn stats(&self) -> SimStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        SimStats {
            tick_rate: self.config.tick_rate,
            avg_tick_time_ms: avg_tick_time,
            driver_count: self.race.as_ref().map(|r| r.cars().len() as u32).unwrap_or(0),
            game_state: self.state,
            paused: self.paused,
            ticks: self.race.as_ref().map(|r| r.tick()).unwrap_or(0),
        }
    }

    /// Get current game state
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Back to the main screen with no drivers
    pub fn reset(&mut self) {
        self.state = GameState::Main;
        self.race = None;
        self.controllers.clear();
        self.events.clear();
        self.paused = false;
        self.tick_times.clear();
    }

    /// Freeze simulation time
    pub fn pause(&mut self) {
        if self.state == GameState::Race {
            self.paused = true;
            log::info!("Race paused");
        }
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.state == GameState::Race && self.paused {
            self.paused = false;
            log::info!("Race resumed");
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(RaceConfig::default())
    }
}

/// Simulation shared with a render thread: one writer ticks, readers
/// snapshot between ticks
pub type SharedSimulation = Arc<RwLock<Simulation>>;

/// Create a new shared simulation
pub fn create_shared_simulation(config: RaceConfig) -> SharedSimulation {
    Arc::new(RwLock::new(Simulation::new(config)))
}
