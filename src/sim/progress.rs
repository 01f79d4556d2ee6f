//! Progress - Checkpoint crossing and lap timing
//!
//! Gates must be passed in track order. Crossing the start/finish gate
//! closes a lap and updates personal and session best times (in ticks).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::track::Checkpoint;

/// Which trajectory endpoints must project inside the gate segment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateContainment {
    /// Only the previous position is tested (classic arcade behavior)
    LastPositionOnly,
    /// Both the previous and the new position are tested
    #[default]
    BothEndpoints,
}

/// How a gate crossing is recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateRules {
    pub containment: GateContainment,
    /// Ignore crossings made against the direction of travel
    pub forward_only: bool,
}

impl Default for GateRules {
    fn default() -> Self {
        Self {
            containment: GateContainment::BothEndpoints,
            forward_only: true,
        }
    }
}

impl GateRules {
    /// Whether the step `last -> new` passes through the gate segment
    pub fn crosses(&self, cp: &Checkpoint, last: Vec2, new: Vec2) -> bool {
        let nsz = cp.delta.length_squared();
        if nsz <= 0.0 {
            return false;
        }

        // Points backwards along the track, so forward travel goes + to -
        let dir = Vec2::new(-cp.delta.y, cp.delta.x).normalize_or_zero();
        let dp0 = (last - cp.pos).dot(dir);
        let dp1 = (new - cp.pos).dot(dir);
        // Half-open on the far side: a step ending on the line counts once
        let forward = dp0 > 0.0 && dp1 <= 0.0;
        let backward = dp0 < 0.0 && dp1 >= 0.0;
        if !(forward || (backward && !self.forward_only)) {
            return false;
        }

        let r0 = (last - cp.pos).dot(cp.delta) / nsz;
        let r1 = match self.containment {
            GateContainment::LastPositionOnly => r0,
            GateContainment::BothEndpoints => (new - cp.pos).dot(cp.delta) / nsz,
        };
        r0.abs() < 1.0 && r1.abs() < 1.0
    }
}

/// What a tick changed for one driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// Expected intermediate gate passed
    CheckpointPassed { index: usize },
    /// Start/finish passed with no lap running yet
    LapStarted,
    LapCompleted {
        ticks: u64,
        personal_best: bool,
        session_best: bool,
    },
    /// A gate other than the expected one was crossed; progress unchanged
    OutOfOrder { index: usize },
}

/// Race progress for one driver slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProgress {
    /// Last gate passed in order, `None` before the first
    pub last_checkpoint: Option<usize>,
    /// Tick at which the running lap started
    pub lap_start_tick: Option<u64>,
    pub best_lap: Option<u64>,
    pub last_lap: Option<u64>,
    pub laps_completed: u32,
}

impl DriverProgress {
    /// Gate the driver must cross next
    pub fn next_checkpoint(&self, count: usize) -> usize {
        self.last_checkpoint.map_or(0, |c| (c + 1) % count)
    }

    /// Check the step `last_pos -> new_pos` against the gates.
    ///
    /// Gates are searched in track order from the expected one; only the
    /// first gate crossed is considered.
    pub fn on_tick(
        &mut self,
        session_best: &mut Option<u64>,
        last_pos: Vec2,
        new_pos: Vec2,
        checkpoints: &[Checkpoint],
        tick: u64,
        rules: &GateRules,
    ) -> Option<ProgressEvent> {
        let count = checkpoints.len();
        if count == 0 {
            return None;
        }

        let start = self.next_checkpoint(count);
        let i = (0..count)
            .find(|i| rules.crosses(&checkpoints[(start + i) % count], last_pos, new_pos))?;
        let index = (start + i) % count;
        if i != 0 {
            log::debug!("Checkpoint {} crossed out of order (expected {})", index, start);
            return Some(ProgressEvent::OutOfOrder { index });
        }

        self.last_checkpoint = Some(index);
        if index != 0 {
            log::debug!("Checkpoint {} passed at tick {}", index, tick);
            return Some(ProgressEvent::CheckpointPassed { index });
        }

        let event = match self.lap_start_tick {
            Some(started) => {
                let ticks = tick.saturating_sub(started);
                let personal_best = self.best_lap.map_or(true, |best| ticks < best);
                let is_session_best = session_best.map_or(true, |best| ticks < best);
                self.best_lap = Some(self.best_lap.map_or(ticks, |best| best.min(ticks)));
                *session_best = Some(session_best.map_or(ticks, |best| best.min(ticks)));
                self.last_lap = Some(ticks);
                self.laps_completed += 1;
                log::info!("Lap completed in {} ticks (best {:?})", ticks, self.best_lap);
                ProgressEvent::LapCompleted {
                    ticks,
                    personal_best,
                    session_best: is_session_best,
                }
            }
            None => ProgressEvent::LapStarted,
        };
        self.lap_start_tick = Some(tick);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::track::{Track, TrackConfig};

    /// Short hop straight through a gate in the direction of travel
    fn hop(cp: &Checkpoint) -> (Vec2, Vec2) {
        let f = cp.forward();
        (cp.pos - 0.5 * f, cp.pos + 0.5 * f)
    }

    fn run_lap(
        progress: &mut DriverProgress,
        best: &mut Option<u64>,
        cps: &[Checkpoint],
        start_tick: u64,
        lap_ticks: u64,
    ) -> Option<ProgressEvent> {
        for (i, cp) in cps.iter().enumerate().skip(1) {
            let (a, b) = hop(cp);
            let tick = start_tick + lap_ticks * i as u64 / cps.len() as u64;
            let event = progress.on_tick(best, a, b, cps, tick, &GateRules::default());
            assert_eq!(event, Some(ProgressEvent::CheckpointPassed { index: i }));
        }
        let (a, b) = hop(&cps[0]);
        progress.on_tick(best, a, b, cps, start_tick + lap_ticks, &GateRules::default())
    }

    /// Drive the centre line from `from` to `to` (loop parameters) and
    /// collect every gate event.
    fn drive_centre_line(
        track: &Track,
        from: f32,
        to: f32,
        rules: &GateRules,
    ) -> Vec<ProgressEvent> {
        let mut progress = DriverProgress::default();
        let mut best = None;
        let steps = ((to - from).abs() / 0.001) as usize;
        let step = (to - from).signum() * 0.001;
        let mut last = track.spline().sample(from, 0.0);
        let mut events = Vec::new();
        for k in 1..=steps {
            let next = track.spline().sample(from + k as f32 * step, 0.0);
            let cps = track.checkpoints();
            if let Some(e) = progress.on_tick(&mut best, last, next, cps, k as u64, rules) {
                events.push(e);
            }
            last = next;
        }
        events
    }

    #[test]
    fn forward_driving_cycles_through_every_gate() {
        let track = Track::generate(21, &TrackConfig::default()).unwrap();
        let events = drive_centre_line(&track, 0.9503, 3.1003, &GateRules::default());
        let passed: Vec<usize> = events
            .iter()
            .map(|e| match e {
                ProgressEvent::CheckpointPassed { index } => *index,
                ProgressEvent::LapStarted | ProgressEvent::LapCompleted { .. } => 0,
                ProgressEvent::OutOfOrder { index } => panic!("out of order at {index}"),
            })
            .collect();
        let expected: Vec<usize> = (0..17).map(|i| i % 8).collect();
        assert_eq!(passed, expected);
        assert_eq!(events[0], ProgressEvent::LapStarted);
        assert!(matches!(events[8], ProgressEvent::LapCompleted { .. }));
    }

    #[test]
    fn wrong_way_driving_never_advances() {
        let track = Track::generate(21, &TrackConfig::default()).unwrap();
        let events = drive_centre_line(&track, 0.1003, -1.9003, &GateRules::default());
        assert!(events.is_empty(), "{events:?}");
    }

    #[test]
    fn undirected_gates_count_backward_start_line_crossings() {
        let track = Track::generate(21, &TrackConfig::default()).unwrap();
        let rules = GateRules {
            forward_only: false,
            ..Default::default()
        };
        // Less than one lap backwards: reaches start/finish but never gate 1
        let events = drive_centre_line(&track, 0.1003, -0.8003, &rules);
        assert_eq!(events[0], ProgressEvent::LapStarted);
        assert!(events[1..]
            .iter()
            .all(|e| matches!(e, ProgressEvent::OutOfOrder { .. })));

        // A full lap backwards eventually crosses gate 1 "in order"
        let events = drive_centre_line(&track, 0.1003, -1.0003, &rules);
        assert!(events.contains(&ProgressEvent::CheckpointPassed { index: 1 }));
    }

    #[test]
    fn lap_of_600_ticks_sets_both_bests() {
        let track = Track::generate(8, &TrackConfig::default()).unwrap();
        let cps = track.checkpoints();
        let mut progress = DriverProgress::default();
        let mut best = None;

        let (a, b) = hop(&cps[0]);
        let first = progress.on_tick(&mut best, a, b, cps, 0, &GateRules::default());
        assert_eq!(first, Some(ProgressEvent::LapStarted));
        assert_eq!(progress.lap_start_tick, Some(0));

        let done = run_lap(&mut progress, &mut best, cps, 0, 600);
        assert_eq!(
            done,
            Some(ProgressEvent::LapCompleted {
                ticks: 600,
                personal_best: true,
                session_best: true,
            })
        );
        assert_eq!(progress.best_lap, Some(600));
        assert_eq!(progress.last_lap, Some(600));
        assert_eq!(best, Some(600));
        assert_eq!(progress.lap_start_tick, Some(600));
        assert_eq!(progress.laps_completed, 1);
    }

    #[test]
    fn personal_best_never_gets_worse() {
        let track = Track::generate(8, &TrackConfig::default()).unwrap();
        let cps = track.checkpoints();
        let mut progress = DriverProgress::default();
        let mut best = None;
        let (a, b) = hop(&cps[0]);
        progress.on_tick(&mut best, a, b, cps, 0, &GateRules::default());

        let mut tick = 0;
        let mut previous = u64::MAX;
        for lap in [700, 650, 800, 600, 900, 600] {
            let event = run_lap(&mut progress, &mut best, cps, tick, lap);
            tick += lap;
            let pb = progress.best_lap.unwrap();
            assert!(pb <= previous);
            if let Some(ProgressEvent::LapCompleted { ticks, personal_best, .. }) = event {
                assert_eq!(ticks, lap);
                assert_eq!(personal_best, lap < previous);
            } else {
                panic!("lap not completed: {event:?}");
            }
            previous = pb;
        }
        assert_eq!(progress.best_lap, Some(600));
        assert_eq!(progress.last_lap, Some(600));
        assert_eq!(progress.laps_completed, 6);
    }

    #[test]
    fn session_best_is_shared_between_drivers() {
        let track = Track::generate(8, &TrackConfig::default()).unwrap();
        let cps = track.checkpoints();
        let mut best = None;
        let mut p1 = DriverProgress::default();
        let mut p2 = DriverProgress::default();
        let (a, b) = hop(&cps[0]);
        p1.on_tick(&mut best, a, b, cps, 0, &GateRules::default());
        p2.on_tick(&mut best, a, b, cps, 0, &GateRules::default());

        run_lap(&mut p1, &mut best, cps, 0, 500);
        let slower = run_lap(&mut p2, &mut best, cps, 0, 550);
        assert_eq!(
            slower,
            Some(ProgressEvent::LapCompleted {
                ticks: 550,
                personal_best: true,
                session_best: false,
            })
        );
        assert_eq!(best, Some(500));
        assert_eq!(p2.best_lap, Some(550));
    }

    #[test]
    fn skipped_gate_is_reported_without_progress() {
        let track = Track::generate(8, &TrackConfig::default()).unwrap();
        let cps = track.checkpoints();
        let mut progress = DriverProgress {
            last_checkpoint: Some(0),
            ..Default::default()
        };
        let mut best = None;
        let (a, b) = hop(&cps[3]);
        let event = progress.on_tick(&mut best, a, b, cps, 10, &GateRules::default());
        assert_eq!(event, Some(ProgressEvent::OutOfOrder { index: 3 }));
        assert_eq!(progress.last_checkpoint, Some(0));
    }

    #[test]
    fn containment_modes_differ_on_a_step_leaving_the_gate() {
        let cp = Checkpoint {
            pos: Vec2::ZERO,
            delta: Vec2::new(0.0, 25.0),
        };
        // Starts inside the gate span, ends beyond its tip
        let last = Vec2::new(-0.5, 0.9 * 25.0);
        let new = Vec2::new(0.5, 1.3 * 25.0);

        let last_only = GateRules {
            containment: GateContainment::LastPositionOnly,
            ..Default::default()
        };
        assert!(last_only.crosses(&cp, last, new));
        assert!(!GateRules::default().crosses(&cp, last, new));

        // Fully inside: both agree
        let inside = Vec2::new(0.5, 0.5 * 25.0);
        assert!(last_only.crosses(&cp, last, inside));
        assert!(GateRules::default().crosses(&cp, last, inside));
    }

    #[test]
    fn step_ending_on_the_line_counts_once() {
        let cps = [Checkpoint {
            pos: Vec2::ZERO,
            delta: Vec2::new(0.0, 25.0),
        }];
        let mut progress = DriverProgress::default();
        let mut best = None;
        let rules = GateRules::default();

        let landed = progress.on_tick(&mut best, Vec2::new(-1.0, 0.0), Vec2::ZERO, &cps, 1, &rules);
        assert_eq!(landed, Some(ProgressEvent::LapStarted));
        assert_eq!(progress.last_checkpoint, Some(0));

        let left = progress.on_tick(&mut best, Vec2::ZERO, Vec2::new(1.0, 0.0), &cps, 2, &rules);
        assert_eq!(left, None);
        assert_eq!(progress.lap_start_tick, Some(1));
    }

    #[test]
    fn undirected_landing_on_the_line_counts_once_each_way() {
        let cp = Checkpoint {
            pos: Vec2::ZERO,
            delta: Vec2::new(0.0, 25.0),
        };
        let rules = GateRules {
            forward_only: false,
            ..Default::default()
        };
        let (behind, on, ahead) = (Vec2::new(-1.0, 0.0), Vec2::ZERO, Vec2::new(1.0, 0.0));
        assert!(rules.crosses(&cp, behind, on));
        assert!(!rules.crosses(&cp, on, ahead));
        assert!(rules.crosses(&cp, ahead, on));
        assert!(!rules.crosses(&cp, on, behind));
        assert!(!GateRules::default().crosses(&cp, ahead, on));
    }

    #[test]
    fn only_the_first_gate_crossed_counts_per_tick() {
        let gate = |x: f32| Checkpoint {
            pos: Vec2::new(x, 0.0),
            delta: Vec2::new(0.0, 25.0),
        };
        let cps = [gate(0.0), gate(1.0), gate(100.0)];
        let mut progress = DriverProgress::default();
        let mut best = None;
        let rules = GateRules::default();

        // One step over gates 0 and 1
        let (a, b) = (Vec2::new(-0.5, 0.0), Vec2::new(1.5, 0.0));
        let event = progress.on_tick(&mut best, a, b, &cps, 1, &rules);
        assert_eq!(event, Some(ProgressEvent::LapStarted));
        assert_eq!(progress.last_checkpoint, Some(0));

        // Gate 1 is behind the car now, so gate 2 is out of order
        let (a, b) = (Vec2::new(99.0, 0.0), Vec2::new(101.0, 0.0));
        let event = progress.on_tick(&mut best, a, b, &cps, 2, &rules);
        assert_eq!(event, Some(ProgressEvent::OutOfOrder { index: 2 }));
    }

    #[test]
    fn no_gates_no_events() {
        let mut progress = DriverProgress::default();
        let mut best = None;
        let rules = GateRules::default();
        let event = progress.on_tick(&mut best, Vec2::ZERO, Vec2::ONE, &[], 0, &rules);
        assert_eq!(event, None);
        assert_eq!(progress, DriverProgress::default());
    }
}
