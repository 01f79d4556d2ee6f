//! Particles - Short-lived dust kicked up by sliding cars
//!
//! Purely cosmetic. Spawned from vehicle state, advanced on the simulation
//! clock and culled once older than [`PARTICLE_LIFETIME`].

use glam::Vec2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::sim::track::GAME_SCALE;
use crate::sim::vehicle::VehicleState;

/// Simulated seconds a particle lives
pub const PARTICLE_LIFETIME: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Effect clock value at spawn
    pub spawned_at: f64,
    /// Slide intensity of the car that emitted it
    pub intensity: f32,
}

/// All live particles plus the clock they age on
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    time: f64,
    cap: usize,
    rng: StdRng,
}

impl ParticleSystem {
    /// Constants
    const HALF_LENGTH: f32 = 25.0 * GAME_SCALE;
    const HALF_WIDTH: f32 = 15.0 * GAME_SCALE;
    const JITTER: i32 = 18;
    const FLING: f32 = 45.0 / GAME_SCALE;

    pub fn new(seed: u64, cap: usize) -> Self {
        Self {
            particles: Vec::new(),
            time: 0.0,
            cap,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Emit four particles at the car's corners
    pub fn spawn(&mut self, car: &VehicleState) {
        let d = car.forward();
        let n = Vec2::new(d.y, -d.x);
        let l = Self::HALF_LENGTH;
        let w = Self::HALF_WIDTH;
        let fling = Self::FLING * car.delta;

        for corner in [l * d + w * n, -l * d + w * n, l * d - w * n, -l * d - w * n] {
            let jitter = Vec2::new(
                self.rng.gen_range(-Self::JITTER..=Self::JITTER) as f32,
                self.rng.gen_range(-Self::JITTER..=Self::JITTER) as f32,
            );
            self.particles.push(Particle {
                pos: car.position + corner,
                velocity: jitter + fling,
                spawned_at: self.time,
                intensity: car.slide,
            });
        }

        if self.particles.len() > self.cap {
            let excess = self.particles.len() - self.cap;
            self.particles.drain(..excess);
        }
    }

    /// Advance the clock by `dt`, move particles and drop expired ones
    pub fn advance(&mut self, dt: f64) {
        self.time += dt;
        let now = self.time;

        for p in &mut self.particles {
            let r = ((now - p.spawned_at) / PARTICLE_LIFETIME) as f32;
            p.pos += (GAME_SCALE * (1.0 - r * r) * dt as f32) * p.velocity;
        }

        self.particles.retain(|p| p.spawned_at + PARTICLE_LIFETIME >= now);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}
