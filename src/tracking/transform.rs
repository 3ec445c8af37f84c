//! # Pose Transform
//!
//! Turns absolute tracker poses into per-second rates for the DSU motion fields.
//!
//! ## Rules
//!
//! - A sample with all six channels at exactly 0.0 is the tracker's stop marker:
//!   memory is cleared and an all-zero sample is emitted.
//! - Otherwise each channel's difference from the previous sample is divided by
//!   the seconds elapsed since it. The first sample after a reset uses 1.0 s.
//! - Angular differences take the shortest arc, so 179° → -179° is +2°.

use serde::Deserialize;
use std::time::Instant;

use super::PoseSample;

/// Half a turn in degrees
const HALF_TURN: f64 = 180.0;

/// A full turn in degrees
const FULL_TURN: f64 = 360.0;

/// Elapsed time used when there is no previous sample
const DEFAULT_ELAPSED_SECS: f64 = 1.0;

/// Index of the first angular channel (yaw) in wire order
const FIRST_ANGULAR_CHANNEL: usize = 3;

/// How tracker poses are mapped to motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Per-second rate of change (default)
    #[default]
    Relative,
    /// Forward the absolute pose unchanged
    Absolute,
}

/// Shortest signed difference between two angles in degrees
///
/// # Examples
///
/// ```
/// use dsu_bridge::tracking::transform::angular_diff;
///
/// assert_eq!(angular_diff(-179.0, 179.0), 2.0);
/// assert_eq!(angular_diff(10.0, 30.0), -20.0);
/// ```
pub fn angular_diff(current: f64, last: f64) -> f64 {
    let diff = current - last;
    if diff.abs() > HALF_TURN {
        diff - FULL_TURN.copysign(diff)
    } else {
        diff
    }
}

/// Stateful absolute-to-rate converter
#[derive(Debug, Clone)]
pub struct PoseTransform {
    mode: TransformMode,
    last_sample: [f64; 6],
    last_time: Option<Instant>,
}

impl Default for PoseTransform {
    fn default() -> Self {
        Self::new(TransformMode::default())
    }
}

impl PoseTransform {
    pub fn new(mode: TransformMode) -> Self {
        Self {
            mode,
            last_sample: [0.0; 6],
            last_time: None,
        }
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    /// Convert a raw sample using the current time
    pub fn apply(&mut self, raw: PoseSample) -> PoseSample {
        self.apply_at(raw, Instant::now())
    }

    /// Convert a raw sample received at `now`
    pub fn apply_at(&mut self, raw: PoseSample, now: Instant) -> PoseSample {
        if self.mode == TransformMode::Absolute {
            return raw;
        }

        if raw.is_zero() {
            self.reset();
            return PoseSample::default();
        }

        let elapsed = match self.last_time {
            Some(last_time) => {
                let secs = now.saturating_duration_since(last_time).as_secs_f64();
                // Same-instant samples would divide by zero
                if secs > 0.0 { secs } else { DEFAULT_ELAPSED_SECS }
            }
            None => DEFAULT_ELAPSED_SECS,
        };

        let current = raw.channels();
        let mut rates = [0.0f64; 6];
        for (i, rate) in rates.iter_mut().enumerate() {
            let diff = if i >= FIRST_ANGULAR_CHANNEL {
                angular_diff(current[i], self.last_sample[i])
            } else {
                current[i] - self.last_sample[i]
            };
            *rate = diff / elapsed;
        }

        self.last_sample = current;
        self.last_time = Some(now);

        PoseSample::from_channels(rates)
    }

    /// Forget the previous sample and its time
    pub fn reset(&mut self) {
        self.last_sample = [0.0; 6];
        self.last_time = None;
    }

    /// Zero the previous sample but keep its time (used after socket errors)
    pub fn clear_last_sample(&mut self) {
        self.last_sample = [0.0; 6];
    }
}
