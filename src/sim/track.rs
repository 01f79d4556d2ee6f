//! Track - Procedural closed-loop circuit
//!
//! A random ring of control points is smoothed by the spline into a
//! fixed-width ribbon, ordered checkpoint gates and decorative props.
//! Everything after the control points is deterministic.

use glam::Vec2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::{Result, SimError};
use crate::sim::spline::{Spline, SplineFrame, MIN_CONTROL_POINTS};

/// World units per design unit
pub const GAME_SCALE: f32 = 0.1;

/// One batch of evenly spaced roadside props
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropBatch {
    pub count: usize,
    /// Lateral offset from the centre line (negative = right-hand side)
    pub offset: f32,
    pub scale: f32,
}

/// Track generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Control points around the loop
    pub control_points: usize,
    /// Smallest control point radius (design units)
    pub base_radius: f32,
    /// Upper bound of the random radius added to `base_radius`
    pub radius_jitter: i32,
    /// Angular jitter range, in hundredths of a control point step
    pub angle_jitter: i32,
    /// Samples along the ribbon
    pub ribbon_samples: usize,
    /// Distance from centre line to each ribbon edge
    pub half_width: f32,
    pub checkpoint_count: usize,
    /// Half length of each checkpoint gate
    pub gate_half_width: f32,
    pub prop_batches: Vec<PropBatch>,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            control_points: 17,
            base_radius: 350.0,
            radius_jitter: 160,
            angle_jitter: 100,
            ribbon_samples: 180,
            half_width: 25.0,
            checkpoint_count: 8,
            gate_half_width: 25.0,
            prop_batches: vec![
                PropBatch { count: 45, offset: 40.0, scale: 3.0 },
                PropBatch { count: 40, offset: -40.0, scale: 3.0 },
                PropBatch { count: 25, offset: 60.0, scale: 6.0 },
                PropBatch { count: 30, offset: -60.0, scale: 6.0 },
                PropBatch { count: 10, offset: 120.0, scale: 10.0 },
                PropBatch { count: 15, offset: -120.0, scale: 10.0 },
            ],
        }
    }
}

impl TrackConfig {
    /// Reject parameters that cannot produce a usable track
    pub fn validate(&self) -> Result<()> {
        if self.control_points < MIN_CONTROL_POINTS {
            return Err(SimError::NotEnoughControlPoints(self.control_points));
        }
        if self.ribbon_samples == 0 || self.checkpoint_count == 0 {
            return Err(SimError::InvalidConfig(
                "track needs ribbon samples and checkpoints".into(),
            ));
        }
        // Two vertices per sample plus the closing pair, addressed by u16
        if (self.ribbon_samples + 1) * 2 > u16::MAX as usize {
            return Err(SimError::InvalidConfig(format!(
                "{} ribbon samples exceed 16-bit indices",
                self.ribbon_samples
            )));
        }
        if self.radius_jitter < 0 || self.angle_jitter < 0 {
            return Err(SimError::InvalidConfig("jitter must be non-negative".into()));
        }
        if !(self.half_width > 0.0 && self.gate_half_width > 0.0) {
            return Err(SimError::InvalidConfig("widths must be positive".into()));
        }
        Ok(())
    }
}

/// Axis-aligned rectangle in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    /// Pad the shorter axis symmetrically so both sides match
    pub fn squared(self) -> Self {
        let mut b = self;
        if b.width < b.height {
            b.x -= 0.5 * (b.height - b.width);
            b.width = b.height;
        } else {
            b.y -= 0.5 * (b.width - b.height);
            b.height = b.width;
        }
        b
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + 0.5 * self.width, self.y + 0.5 * self.height)
    }
}

/// Finite gate `pos ± delta` across the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub pos: Vec2,
    /// Half-width vector, perpendicular to the local tangent
    pub delta: Vec2,
}

impl Checkpoint {
    /// Unit direction of travel through the gate
    pub fn forward(&self) -> Vec2 {
        Vec2::new(self.delta.y, -self.delta.x).normalize_or_zero()
    }

    pub fn endpoints(&self) -> (Vec2, Vec2) {
        (self.pos - self.delta, self.pos + self.delta)
    }
}

/// Left/right boundary pair at one ribbon sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RibbonEdge {
    pub left: Vec2,
    pub right: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub position: Vec2,
    pub scale: f32,
}

/// Immutable race circuit; rebuilt from control points, never loaded whole
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    spline: Spline,
    /// `ribbon_samples + 1` edges; the last repeats the first
    ribbon: Vec<RibbonEdge>,
    bounds: Bounds,
    checkpoints: Vec<Checkpoint>,
    props: Vec<Prop>,
}

/// Random ring of control points, the only randomized step of generation
pub fn random_control_points<R: Rng>(rng: &mut R, config: &TrackConfig) -> Vec<Vec2> {
    let count = config.control_points;
    let angle_steps = config.angle_jitter.max(0);
    let radius_steps = config.radius_jitter.max(0);

    (0..count)
        .map(|i| {
            let da = rng.gen_range(-angle_steps..=angle_steps) as f32 / 3000.0;
            let a = (i as f32 - da) * 2.0 * PI / count as f32;
            let r = config.base_radius + rng.gen_range(0..=radius_steps) as f32;
            let x = 10.0 * r * a.cos();
            let y = 10.0 * r * a.sin();
            GAME_SCALE * Vec2::new(x, y)
        })
        .collect()
}

impl Track {
    /// Generate a fresh track from a seed
    pub fn generate(seed: u64, config: &TrackConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let points = random_control_points(&mut rng, config);
        let track = Self::from_control_points(points, config)?;
        log::info!(
            "Track generated from seed {}: aabb {:.1} {:.1} {:.1} {:.1}",
            seed,
            track.bounds.x,
            track.bounds.y,
            track.bounds.width,
            track.bounds.height
        );
        Ok(track)
    }

    /// Rebuild a track from known control points
    pub fn from_control_points(points: Vec<Vec2>, config: &TrackConfig) -> Result<Self> {
        config.validate()?;
        let spline = Spline::new(points)?;

        let (ribbon, bounds) = build_ribbon(&spline, config)?;

        let checkpoints = (0..config.checkpoint_count)
            .map(|i| {
                let rt = i as f32 / config.checkpoint_count as f32;
                let frame = checked_frame(&spline, rt)?;
                Ok(Checkpoint {
                    pos: frame.position,
                    delta: config.gate_half_width * frame.normal(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let props = config
            .prop_batches
            .iter()
            .flat_map(|batch| {
                let spline = &spline;
                (0..batch.count).map(move |i| {
                    let frame = checked_frame(spline, i as f32 / batch.count as f32)?;
                    Ok(Prop {
                        position: frame.offset(batch.offset),
                        scale: batch.scale,
                    })
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            spline,
            ribbon,
            bounds: bounds.squared(),
            checkpoints,
            props,
        })
    }

    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    pub fn control_points(&self) -> &[Vec2] {
        self.spline.control_points()
    }

    pub fn ribbon(&self) -> &[RibbonEdge] {
        &self.ribbon
    }

    /// Square bounding box of the ribbon, suitable for a uniform minimap
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    /// Spawn position and heading facing along the track at parameter `r`
    pub fn spawn_pose(&self, r: f32) -> (Vec2, f32) {
        let frame = self.spline.frame(r);
        (frame.position, frame.heading())
    }

    /// Triangle list over the ribbon vertices, laid out as
    /// `[left0, right0, left1, right1, ...]`
    pub fn ribbon_indices(&self) -> Vec<u16> {
        let strips = self.ribbon.len().saturating_sub(1);
        let mut indices = Vec::with_capacity(strips * 6);
        for i in 0..strips {
            let p = (i * 2) as u16;
            indices.extend_from_slice(&[p, p + 2, p + 1, p + 2, p + 3, p + 1]);
        }
        indices
    }
}

fn checked_frame(spline: &Spline, r: f32) -> Result<SplineFrame> {
    let frame = spline.frame(r);
    if frame.is_degenerate() {
        log::warn!("Degenerate spline frame at r = {}", r);
        return Err(SimError::DegenerateGeometry { param: r });
    }
    Ok(frame)
}

fn build_ribbon(spline: &Spline, config: &TrackConfig) -> Result<(Vec<RibbonEdge>, Bounds)> {
    let start = spline.control_points()[0];
    let mut min = start;
    let mut max = start;
    let mut push = |p: Vec2| {
        min = min.min(p);
        max = max.max(p);
        p
    };

    let pcount = config.ribbon_samples;
    let mut ribbon = Vec::with_capacity(pcount + 1);
    for i in 0..pcount {
        let r = i as f32 / pcount as f32;
        let frame = checked_frame(spline, r)?;
        ribbon.push(RibbonEdge {
            left: push(frame.offset(config.half_width)),
            right: push(frame.offset(-config.half_width)),
        });
    }
    ribbon.push(ribbon[0]);

    let bounds = Bounds {
        x: min.x,
        y: min.y,
        width: max.x - min.x,
        height: max.y - min.y,
    };
    Ok((ribbon, bounds))
}
