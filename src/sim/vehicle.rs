//! Vehicle - Per-car kinematic state and the arcade handling model
//!
//! Each car carries position, velocity, a throttle accumulator and heading.
//! The simulation advances every car once per tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::track::GAME_SCALE;

/// Normalized controls for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleInputs {
    /// -1 full right .. 1 full left
    pub steer: f32,
    pub throttle: f32,
    pub brake: f32,
    /// Reserved; not read by the integrator
    pub handbrake: f32,
}

impl VehicleInputs {
    /// Clamp every axis into its valid range; NaN reads as released
    pub fn sanitized(self) -> Self {
        let unit = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            steer: if self.steer.is_nan() { 0.0 } else { self.steer.clamp(-1.0, 1.0) },
            throttle: unit(self.throttle),
            brake: unit(self.brake),
            handbrake: unit(self.handbrake),
        }
    }
}

/// Complete kinematic state for a single car
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vec2,
    /// Displacement applied during the last tick
    pub delta: Vec2,
    pub velocity: Vec2,
    /// Throttle accumulator, never negative
    pub thrust: f32,
    /// Heading in radians
    pub heading: f32,
    /// How hard the car is sliding, 0..1
    pub slide: f32,
}

impl VehicleState {
    /// Car at rest at `position` facing `heading`
    pub fn at_rest(position: Vec2, heading: f32) -> Self {
        Self {
            position,
            heading,
            ..Default::default()
        }
    }

    pub fn forward(&self) -> Vec2 {
        Vec2::new(self.heading.cos(), self.heading.sin())
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Vehicle handling logic
pub struct Vehicle;

impl Vehicle {
    /// Constants
    const STEER_GAIN: f32 = 0.01;
    const STEER_SATURATION: f32 = 2.0;
    const STEER_RESPONSE: f32 = 0.2;
    const BRAKE_STEER_BOOST: f32 = 0.3;
    const THRUST_ACCEL: f32 = 0.4;
    const THRUST_NORM: f32 = 100.0;
    const THRUST_SOFT_CAP: f32 = 0.001;
    const BRAKE_THRUST_BLEED: f32 = 5.0;
    const BRAKE_DECEL: f32 = 0.2;
    const SLIDE_BRAKE: f32 = 0.4;
    const SLIDE_THROTTLE: f32 = 0.1;
    const DRAG: f32 = 0.98;
    const STEP: f32 = 0.5;

    /// Advance one car by one fixed tick
    pub fn advance(inputs: &VehicleInputs, state: &mut VehicleState) {
        let inputs = inputs.sanitized();

        // Steering authority grows with speed and saturates
        let vl = Self::STEER_SATURATION
            * (1.0 - (-Self::STEER_RESPONSE * state.velocity.length()).exp());
        let turn_rate = Self::STEER_GAIN * vl;
        let dx = state.heading.cos();
        let dy = state.heading.sin();

        let acc = Self::THRUST_ACCEL * (state.thrust / Self::THRUST_NORM);
        let dec = Self::BRAKE_DECEL * (1.0 - inputs.throttle) * inputs.brake;

        state.thrust = (state.thrust - Self::BRAKE_THRUST_BLEED * inputs.brake).max(0.0);
        state.thrust += inputs.throttle * (-Self::THRUST_SOFT_CAP * state.thrust).exp();
        state.thrust = (state.thrust - (1.0 - inputs.throttle)).max(0.0);

        state.slide = ((Self::SLIDE_BRAKE * inputs.brake + Self::SLIDE_THROTTLE * inputs.throttle)
            * (1.0 + inputs.steer.abs()))
        .clamp(0.0, 1.0);

        state.heading +=
            turn_rate * (1.0 + Self::BRAKE_STEER_BOOST * inputs.brake) * inputs.steer;
        state.velocity = Self::DRAG * state.velocity + (acc - dec) * Vec2::new(dx, dy);

        let next = state.position + Self::STEP * GAME_SCALE * state.velocity;
        state.delta = next - state.position;
        state.position = next;
    }
}

/// Compact car state for the render side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub slot: usize,
    pub position: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub slide: f32,
}

impl VehicleSnapshot {
    pub fn new(slot: usize, state: &VehicleState) -> Self {
        Self {
            slot,
            position: state.position,
            heading: state.heading,
            speed: state.speed(),
            slide: state.slide,
        }
    }
}
