//! Playback status - rate, play flag and a lazily advancing position
//!
//! Nothing ticks the position forward. Each status carries the instant at
//! which `seek` was last exact, and readers project from that anchor.

use std::time::Instant;

use serde::Serialize;

/// Default playback rate
pub const DEFAULT_RATE: f64 = 1.0;

/// Position of `seek` after `elapsed_secs` seconds at `rate`.
///
/// A paused timeline does not move.
pub fn project_seek(seek: f64, rate: f64, playing: bool, elapsed_secs: f64) -> f64 {
    if playing {
        seek + elapsed_secs * rate
    } else {
        seek
    }
}

/// Playback timeline at a point in time
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Status {
    /// Position in seconds along the current media item
    pub seek: f64,
    /// Playback speed multiplier
    pub rate: f64,
    pub playing: bool,
    #[serde(skip)]
    last_update: Instant,
}

impl Status {
    pub fn new() -> Self {
        Self::new_at(Instant::now())
    }

    pub(crate) fn new_at(now: Instant) -> Self {
        Self {
            seek: 0.0,
            rate: DEFAULT_RATE,
            playing: false,
            last_update: now,
        }
    }

    /// Instant at which `seek` was last known to be exact
    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    /// Bring `seek` forward to `now` and re-anchor there.
    pub(crate) fn advance_to(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.seek = project_seek(self.seek, self.rate, self.playing, elapsed);
        self.last_update = now;
    }

    /// Apply a client-reported position.
    ///
    /// While playing, `time_diff` seconds of latency are projected forward at
    /// the new rate. A paused position is taken exactly as reported.
    pub(crate) fn apply(
        &mut self,
        playing: bool,
        seek: f64,
        rate: f64,
        time_diff: f64,
        now: Instant,
    ) {
        self.playing = playing;
        self.rate = rate;
        self.seek = project_seek(seek, rate, playing, time_diff);
        self.last_update = now;
    }

    pub(crate) fn reset_seek(&mut self, now: Instant) {
        self.seek = 0.0;
        self.last_update = now;
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
