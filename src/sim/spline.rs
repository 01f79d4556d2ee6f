//! Spline - Closed Catmull-Rom curve through the track's control points
//!
//! Evaluates position, unit tangent and left-hand normal at any loop
//! parameter. Shared by ribbon generation, checkpoint placement and spawning.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// The 4-point basis needs a neighbour on each side of the active segment
pub const MIN_CONTROL_POINTS: usize = 4;

/// Position and direction of the curve at one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineFrame {
    pub position: Vec2,
    /// Unit length, or zero where the derivative vanished
    pub tangent: Vec2,
}

impl SplineFrame {
    /// Tangent rotated a quarter turn counter-clockwise
    pub fn normal(&self) -> Vec2 {
        Vec2::new(-self.tangent.y, self.tangent.x)
    }

    /// Heading angle (radians) of travel along increasing parameter
    pub fn heading(&self) -> f32 {
        self.tangent.y.atan2(self.tangent.x)
    }

    /// Point offset sideways from the curve
    pub fn offset(&self, lateral: f32) -> Vec2 {
        self.position + lateral * self.normal()
    }

    pub fn is_degenerate(&self) -> bool {
        !self.position.is_finite()
            || !self.tangent.is_finite()
            || self.tangent.length_squared() < 0.5
    }
}

/// Cyclic spline over an ordered loop of control points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec2>", into = "Vec<Vec2>")]
pub struct Spline {
    points: Vec<Vec2>,
}

impl Spline {
    /// Build a spline, rejecting loops the basis cannot interpolate
    pub fn new(points: Vec<Vec2>) -> Result<Self> {
        let count = points.len();
        if count < MIN_CONTROL_POINTS {
            return Err(SimError::NotEnoughControlPoints(count));
        }

        for (index, point) in points.iter().enumerate() {
            let next = points[(index + 1) % count];
            if !point.is_finite() || *point == next {
                return Err(SimError::DegenerateControlPoints { index });
            }
        }

        Ok(Self { points })
    }

    pub fn control_points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Evaluate the curve at loop parameter `r`; any real value is wrapped
    /// into `[0, 1)` first.
    pub fn frame(&self, r: f32) -> SplineFrame {
        let count = self.points.len();
        let scaled = r.rem_euclid(1.0) * count as f32;
        let whole = scaled.floor();
        // rem_euclid can round up to exactly 1.0 for tiny negative inputs
        let id1 = (whole as usize) % count;
        let id0 = (id1 + count - 1) % count;
        let id2 = (id1 + 1) % count;
        let id3 = (id1 + 2) % count;
        let u = scaled - whole;

        catmull_rom(
            u,
            self.points[id0],
            self.points[id1],
            self.points[id2],
            self.points[id3],
        )
    }

    /// Curve position pushed `lateral` units along the normal
    pub fn sample(&self, r: f32, lateral: f32) -> Vec2 {
        self.frame(r).offset(lateral)
    }
}

impl TryFrom<Vec<Vec2>> for Spline {
    type Error = SimError;

    fn try_from(points: Vec<Vec2>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<Spline> for Vec<Vec2> {
    fn from(spline: Spline) -> Self {
        spline.points
    }
}

/// Segment P1..P2 with tangents `½(P2 − P0)` and `½(P3 − P1)`.
///
/// Term order is fixed so trajectories reproduce bit for bit.
fn catmull_rom(u: f32, p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> SplineFrame {
    let mut point = Vec2::ZERO;
    point = point + 0.5 * u * u * u * (-1.0 * p0 + 3.0 * p1 - 3.0 * p2 + p3);
    point = point + 0.5 * u * u * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3);
    point = point + 0.5 * u * (-1.0 * p0 + p2);
    point = point + p1;

    let t2 = u * u;
    let m0 = 0.5 * (p2 - p0);
    let m1 = 0.5 * (p3 - p1);
    let tangent = (t2 - u) * 6.0 * p1
        + (3.0 * t2 - 4.0 * u + 1.0) * m0
        + (-6.0 * t2 + 6.0 * u) * p2
        + (3.0 * t2 - 2.0 * u) * m1;

    SplineFrame {
        position: point,
        tangent: tangent.normalize_or_zero(),
    }
}
