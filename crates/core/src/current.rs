//! Live playback state of a room
//!
//! `Current` pairs the selected media item with its `Status`. Every access
//! goes through one reader/writer lock, and every read of the status brings
//! `seek` forward to the present under the same acquisition, so callers never
//! see a position computed against a stale anchor.

use std::time::Instant;

use parking_lot::RwLock;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::invariants::assert_status_invariants;
use crate::models::MovieInfo;
use crate::status::Status;

#[derive(Debug)]
struct State {
    movie: MovieInfo,
    status: Status,
}

/// Selected media item plus its shared playback clock
#[derive(Debug)]
pub struct Current {
    state: RwLock<State>,
}

/// Point-in-time copy of a `Current`, as exposed to clients
#[derive(Debug, Clone, Serialize)]
pub struct CurrentSnapshot {
    pub movie: MovieInfo,
    pub status: Status,
}

impl Current {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                movie: MovieInfo::default(),
                status: Status::new(),
            }),
        }
    }

    pub fn movie(&self) -> MovieInfo {
        self.state.read().movie.clone()
    }

    /// Swap the media item. Playback restarts from the beginning but keeps
    /// its play flag and rate. Returns the state as left by this call.
    pub fn set_movie(&self, movie: MovieInfo) -> CurrentSnapshot {
        self.set_movie_at(movie, Instant::now())
    }

    pub(crate) fn set_movie_at(&self, movie: MovieInfo, now: Instant) -> CurrentSnapshot {
        let mut state = self.state.write();
        state.movie = movie;
        state.status.reset_seek(now);
        CurrentSnapshot {
            movie: state.movie.clone(),
            status: state.status,
        }
    }

    /// Status as of now.
    pub fn status(&self) -> Status {
        self.status_at(Instant::now())
    }

    pub(crate) fn status_at(&self, now: Instant) -> Status {
        // Re-anchoring mutates, so even a read needs the write side.
        let mut state = self.state.write();
        state.status.advance_to(now);
        state.status
    }

    /// Apply a play/pause/seek/rate change reported by a client.
    ///
    /// `time_diff` is the latency in seconds between the client capturing
    /// `seek` and this call; it only applies when `playing` is set. Values
    /// that are not finite, or a projection that overflows, fail with
    /// `InvalidStatus` and change nothing.
    pub fn set_status(
        &self,
        playing: bool,
        seek: f64,
        rate: f64,
        time_diff: f64,
    ) -> Result<Status> {
        self.set_status_at(playing, seek, rate, time_diff, Instant::now())
    }

    pub(crate) fn set_status_at(
        &self,
        playing: bool,
        seek: f64,
        rate: f64,
        time_diff: f64,
        now: Instant,
    ) -> Result<Status> {
        check_inputs(seek, rate, time_diff)?;
        let mut state = self.state.write();
        state.status = applied(state.status, playing, seek, rate, time_diff, now)?;
        assert_status_invariants(&state.status);
        Ok(state.status)
    }

    /// Change position and rate, leaving the play flag as it is.
    pub fn set_seek_rate(&self, seek: f64, rate: f64, time_diff: f64) -> Result<Status> {
        self.set_seek_rate_at(seek, rate, time_diff, Instant::now())
    }

    pub(crate) fn set_seek_rate_at(
        &self,
        seek: f64,
        rate: f64,
        time_diff: f64,
        now: Instant,
    ) -> Result<Status> {
        check_inputs(seek, rate, time_diff)?;
        let mut state = self.state.write();
        let playing = state.status.playing;
        state.status = applied(state.status, playing, seek, rate, time_diff, now)?;
        assert_status_invariants(&state.status);
        Ok(state.status)
    }

    /// Movie and status, exact as of now.
    pub fn snapshot(&self) -> CurrentSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> CurrentSnapshot {
        let mut state = self.state.write();
        state.status.advance_to(now);
        CurrentSnapshot {
            movie: state.movie.clone(),
            status: state.status,
        }
    }
}

fn check_inputs(seek: f64, rate: f64, time_diff: f64) -> Result<()> {
    for (field, value) in [("seek", seek), ("rate", rate), ("time_diff", time_diff)] {
        if !value.is_finite() {
            return Err(Error::InvalidStatus(format!("{field} is {value}")));
        }
    }
    Ok(())
}

/// `status` with the change applied, or an error if the projection overflows
fn applied(
    mut status: Status,
    playing: bool,
    seek: f64,
    rate: f64,
    time_diff: f64,
    now: Instant,
) -> Result<Status> {
    status.apply(playing, seek, rate, time_diff, now);
    if !status.seek.is_finite() {
        return Err(Error::InvalidStatus(format!(
            "seek {seek} at rate {rate} overflows after {time_diff}s"
        )));
    }
    Ok(status)
}

impl Default for Current {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Current {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}
