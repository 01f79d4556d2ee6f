//! Race - Race configuration and session state
//!
//! Owns the track, the cars, every driver's progress and the session best
//! lap. One `step` advances the whole race by a fixed tick.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::sim::particles::{Particle, ParticleSystem};
use crate::sim::progress::{DriverProgress, GateRules, ProgressEvent};
use crate::sim::track::{Track, TrackConfig};
use crate::sim::vehicle::{Vehicle, VehicleInputs, VehicleSnapshot, VehicleState};

/// Number of driver slots
pub const MAX_DRIVERS: usize = 4;

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Fixed simulation ticks per simulated second
    pub tick_rate: f32,
    /// Loop parameter where cars are placed at the start
    pub spawn_param: f32,
    /// Track generation parameters
    pub track: TrackConfig,
    /// Checkpoint crossing rules
    pub gates: GateRules,
    /// Upper bound on live particles
    pub particle_cap: usize,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            spawn_param: 0.95,
            track: TrackConfig::default(),
            gates: GateRules::default(),
            particle_cap: 4096,
        }
    }
}

impl RaceConfig {
    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "tick rate must be positive, got {}",
                self.tick_rate
            )));
        }
        if !self.spawn_param.is_finite() {
            return Err(SimError::InvalidConfig("spawn parameter must be finite".into()));
        }
        self.track.validate()
    }

    /// Simulated seconds per tick
    pub fn tick_seconds(&self) -> f64 {
        1.0 / self.tick_rate as f64
    }
}

/// One driver's car
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub slot: usize,
    /// Latest controls; held until new ones arrive
    pub inputs: VehicleInputs,
    pub state: VehicleState,
}

/// Progress change tagged with its driver and tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub slot: usize,
    pub tick: u64,
    pub kind: ProgressEvent,
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct RaceSession {
    config: RaceConfig,
    seed: u64,
    track: Track,
    /// One car per enabled slot, in slot order
    cars: Vec<Car>,
    drivers: [DriverProgress; MAX_DRIVERS],
    /// Session best lap over all drivers (ticks)
    best_lap: Option<u64>,
    particles: ParticleSystem,
    tick: u64,
}

impl RaceSession {
    /// Set up a race on `track` for the given driver slots
    pub fn new(track: Track, slots: &[usize], config: RaceConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        if slots.is_empty() {
            return Err(SimError::NoDriversEnabled);
        }

        let mut ordered = slots.to_vec();
        ordered.sort_unstable();
        for pair in ordered.windows(2) {
            if pair[0] == pair[1] {
                return Err(SimError::InvalidSlot(pair[0]));
            }
        }
        if let Some(&slot) = ordered.iter().find(|&&s| s >= MAX_DRIVERS) {
            return Err(SimError::InvalidSlot(slot));
        }

        let (position, heading) = track.spawn_pose(config.spawn_param);
        let cars = ordered
            .into_iter()
            .map(|slot| Car {
                slot,
                inputs: VehicleInputs::default(),
                state: VehicleState::at_rest(position, heading),
            })
            .collect();

        let particles = ParticleSystem::new(seed, config.particle_cap);
        Ok(Self {
            config,
            seed,
            track,
            cars,
            drivers: [DriverProgress::default(); MAX_DRIVERS],
            best_lap: None,
            particles,
            tick: 0,
        })
    }

    /// Carry best laps over from an earlier session on the same track
    pub fn restore_bests(
        &mut self,
        best_laps: &[Option<u64>; MAX_DRIVERS],
        session_best: Option<u64>,
    ) {
        for (driver, best) in self.drivers.iter_mut().zip(best_laps) {
            driver.best_lap = *best;
        }
        self.best_lap = session_best;
    }

    /// Advance the race by one tick.
    ///
    /// Slots missing from `inputs` keep their previous controls.
    pub fn step(&mut self, inputs: &BTreeMap<usize, VehicleInputs>) -> Vec<RaceEvent> {
        let tick = self.tick;
        self.particles.advance(self.config.tick_seconds());

        for car in &mut self.cars {
            if let Some(input) = inputs.get(&car.slot) {
                car.inputs = *input;
            }
        }

        let mut events = Vec::new();
        for car in &mut self.cars {
            let last_pos = car.state.position;
            Vehicle::advance(&car.inputs, &mut car.state);

            let driver = &mut self.drivers[car.slot];
            if let Some(kind) = driver.on_tick(
                &mut self.best_lap,
                last_pos,
                car.state.position,
                self.track.checkpoints(),
                tick,
                &self.config.gates,
            ) {
                events.push(RaceEvent {
                    slot: car.slot,
                    tick,
                    kind,
                });
            }

            if car.state.slide > 0.0 {
                self.particles.spawn(&car.state);
            }
        }

        self.tick += 1;
        events
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    /// Car driven from `slot`
    pub fn car(&self, slot: usize) -> Option<&Car> {
        self.cars.iter().find(|c| c.slot == slot)
    }

    /// Progress of an enabled slot
    pub fn driver(&self, slot: usize) -> Option<&DriverProgress> {
        self.car(slot).map(|_| &self.drivers[slot])
    }

    pub fn drivers(&self) -> &[DriverProgress; MAX_DRIVERS] {
        &self.drivers
    }

    pub fn best_lap(&self) -> Option<u64> {
        self.best_lap
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles.particles()
    }

    /// Ticks simulated so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds so far
    pub fn elapsed(&self) -> f64 {
        self.tick as f64 * self.config.tick_seconds()
    }

    /// Get compact snapshot for the render side
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            tick: self.tick,
            elapsed: self.elapsed(),
            vehicles: self
                .cars
                .iter()
                .map(|c| VehicleSnapshot::new(c.slot, &c.state))
                .collect(),
            drivers: self
                .cars
                .iter()
                .map(|c| {
                    DriverSnapshot::new(
                        c.slot,
                        &self.drivers[c.slot],
                        self.tick,
                        self.track.checkpoints().len(),
                    )
                })
                .collect(),
            best_lap: self.best_lap,
            particles: self.particles.particles().iter().map(|p| p.pos).collect(),
        }
    }
}

/// Lap and timing state of one driver, as shown on a HUD
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSnapshot {
    pub slot: usize,
    pub next_checkpoint: usize,
    /// Ticks into the running lap
    pub current_lap: Option<u64>,
    pub last_lap: Option<u64>,
    pub best_lap: Option<u64>,
    pub laps_completed: u32,
}

impl DriverSnapshot {
    fn new(slot: usize, progress: &DriverProgress, tick: u64, checkpoints: usize) -> Self {
        Self {
            slot,
            next_checkpoint: progress.next_checkpoint(checkpoints),
            current_lap: progress.lap_start_tick.map(|start| tick.saturating_sub(start)),
            last_lap: progress.last_lap,
            best_lap: progress.best_lap,
            laps_completed: progress.laps_completed,
        }
    }
}

/// Compact race snapshot handed to renderers between ticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub tick: u64,
    pub elapsed: f64,
    pub vehicles: Vec<VehicleSnapshot>,
    pub drivers: Vec<DriverSnapshot>,
    pub best_lap: Option<u64>,
    pub particles: Vec<Vec2>,
}
