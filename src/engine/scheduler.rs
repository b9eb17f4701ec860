/*
Scheduler
=========

Owns the tracks, their signal chains and the playback sink, and decides on
every tick which tracks fire.

Two kinds of loop run side by side:

    master loop     one per engine, started by start_global
                    every tick checks every unmuted track that has samples
    track loops     one per track, started by start_track
                    fires only its own track, only while is_playing is set

Both count 0..16 and wrap. A track maps the counter onto a beat with its own
division, `(step / division) * 4`, then matches it against its pattern.

Loops are timers on a caller-supplied clock. `advance_to(now)` fires every
tick that has come due, earliest first. `skip_missed(now)` drops the backlog of
a loop that fell more than MAX_CATCH_UP intervals behind, so a stalled driver
does not burst.

Track loops keep the interval they were started with; set_bpm only retimes the
master loop.
*/

use std::time::Duration;

use tracing::{debug, trace, warn};

use super::clock::{tick_interval, TickLoop};
use super::track::Track;
use crate::graph::{AudioNode, MasterBus, SignalChain};
use crate::io::{AudioSink, NullSink};

/// Intervals a loop may lag before missed ticks are dropped
const MAX_CATCH_UP: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopId {
    Master,
    Track(usize),
}

pub struct Scheduler {
    tracks: Vec<Track>,
    chains: Vec<SignalChain>,
    master_bus: MasterBus,
    sink: Box<dyn AudioSink>,
    master: Option<TickLoop>,
    track_loops: Vec<Option<TickLoop>>,
    /// Tracks that had samples when global playback last started
    active: Vec<usize>,
    bpm: f64,
    tolerance: f32,
    steps: u32,
    now: Duration,
}

impl Scheduler {
    pub fn new(
        tracks: Vec<Track>,
        sink: Box<dyn AudioSink>,
        bpm: f64,
        tolerance: f32,
        steps: u32,
    ) -> Self {
        let master_bus = MasterBus::new();
        let chains = tracks
            .iter()
            .map(|track| SignalChain::new(master_bus.id(), track.volume()))
            .collect();
        let track_loops = vec![None; tracks.len()];

        Self {
            tracks,
            chains,
            master_bus,
            sink,
            master: None,
            track_loops,
            active: Vec::new(),
            bpm,
            tolerance,
            steps,
            now: Duration::ZERO,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn chain(&self, index: usize) -> Option<&SignalChain> {
        self.chains.get(index)
    }

    pub fn chain_mut(&mut self, index: usize) -> Option<&mut SignalChain> {
        self.chains.get_mut(index)
    }

    pub fn master_bus(&self) -> &MasterBus {
        &self.master_bus
    }

    /// Hand the sink out, leaving a [`NullSink`] in its place.
    pub fn take_sink(&mut self) -> Box<dyn AudioSink> {
        std::mem::replace(&mut self.sink, Box::new(NullSink))
    }

    pub fn replace_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.sink = sink;
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn active(&self) -> &[usize] {
        &self.active
    }

    pub fn is_master_running(&self) -> bool {
        self.master.is_some()
    }

    pub fn master_step(&self) -> Option<u32> {
        self.master.and_then(|clock| clock.last_step())
    }

    pub fn is_track_loop_running(&self, index: usize) -> bool {
        matches!(self.track_loops.get(index), Some(Some(_)))
    }

    pub fn track_step(&self, index: usize) -> Option<u32> {
        self.track_loops
            .get(index)
            .copied()
            .flatten()
            .and_then(|clock| clock.last_step())
    }

    /// (Re)start the master loop from step 0 with a new active set.
    pub fn start_master(&mut self, active: Vec<usize>) {
        self.active = active;
        self.master = Some(TickLoop::start(self.now, tick_interval(self.bpm), self.steps));
        debug!(bpm = self.bpm, active = ?self.active, "Master loop started");
    }

    pub fn stop_master(&mut self) {
        if self.master.take().is_some() {
            debug!("Master loop stopped");
        }
        self.active.clear();
    }

    /// (Re)start one track's loop at the current tempo. Returns false for an
    /// unknown index.
    pub fn start_track_loop(&mut self, index: usize) -> bool {
        let interval = tick_interval(self.bpm);
        match self.track_loops.get_mut(index) {
            Some(slot) => {
                *slot = Some(TickLoop::start(self.now, interval, self.steps));
                debug!(track = index, ?interval, "Track loop started");
                true
            }
            None => false,
        }
    }

    pub fn stop_track_loop(&mut self, index: usize) {
        if let Some(slot) = self.track_loops.get_mut(index) {
            if slot.take().is_some() {
                debug!(track = index, "Track loop stopped");
            }
        }
    }

    /// Change tempo. A running master loop restarts at the new interval and
    /// keeps its active set; track loops are untouched.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
        if self.master.is_some() {
            let active = std::mem::take(&mut self.active);
            self.start_master(active);
        }
    }

    /// Push the current route of a track to the sink.
    pub fn sync_route(&mut self, index: usize) {
        if let Some(chain) = self.chains.get(index) {
            let route = chain.route(index);
            self.sink.update_route(index, &route);
        }
    }

    /// Fire every tick due at or before `now`, earliest first.
    pub fn advance_to(&mut self, now: Duration) {
        if now < self.now {
            return;
        }

        while let Some((id, due)) = self.next_due(now) {
            self.now = due;
            let Some(clock) = self.loop_mut(id) else {
                break;
            };

            let step = clock.fire();
            match id {
                LoopId::Master => self.fire_master(step),
                LoopId::Track(index) => self.fire_track(index, step),
            }
        }

        self.now = now;
    }

    /// Resync every loop that is more than MAX_CATCH_UP intervals behind
    /// `now`, dropping its missed ticks. Returns how many loops were resynced.
    ///
    /// Call before `advance_to` when driving from a wall clock that may stall.
    pub fn skip_missed(&mut self, now: Duration) -> usize {
        let ids: Vec<LoopId> = std::iter::once(LoopId::Master)
            .chain((0..self.track_loops.len()).map(LoopId::Track))
            .collect();

        let mut skipped = 0;
        for id in ids {
            let Some(clock) = self.loop_mut(id) else {
                continue;
            };
            let lag = clock.lag(now);
            if lag > clock.interval() * MAX_CATCH_UP {
                clock.resync(now);
                warn!(?id, ?lag, "Clock fell behind, skipping missed ticks");
                skipped += 1;
            }
        }
        skipped
    }

    /// Play the track's next sample right away, through the usual selection
    /// path. Returns whether anything was played.
    pub fn trigger_now(&mut self, index: usize) -> bool {
        let playable = self
            .tracks
            .get(index)
            .is_some_and(|track| !track.is_muted() && track.has_samples());
        playable && self.trigger(index)
    }

    fn next_due(&self, now: Duration) -> Option<(LoopId, Duration)> {
        let master = self.master.map(|clock| (LoopId::Master, clock.next_due()));
        let tracks = self
            .track_loops
            .iter()
            .enumerate()
            .filter_map(|(index, clock)| clock.map(|clock| (LoopId::Track(index), clock.next_due())));

        master
            .into_iter()
            .chain(tracks)
            .filter(|(_, due)| *due <= now)
            .min_by_key(|(_, due)| *due)
    }

    fn loop_mut(&mut self, id: LoopId) -> Option<&mut TickLoop> {
        match id {
            LoopId::Master => self.master.as_mut(),
            LoopId::Track(index) => self.track_loops.get_mut(index)?.as_mut(),
        }
    }

    fn fire_master(&mut self, step: u32) {
        trace!(step, "Master tick");
        for index in 0..self.tracks.len() {
            if self.tracks[index].should_fire(step, self.tolerance) {
                self.trigger(index);
            }
        }
    }

    fn fire_track(&mut self, index: usize, step: u32) {
        let Some(track) = self.tracks.get(index) else {
            return;
        };
        trace!(track = index, step, "Track tick");
        if track.is_playing() && track.should_fire(step, self.tolerance) {
            self.trigger(index);
        }
    }

    fn trigger(&mut self, index: usize) -> bool {
        let now = self.now;
        let Some(track) = self.tracks.get_mut(index) else {
            return false;
        };
        let Some(sample) = track.next_sample() else {
            return false;
        };
        track.mark_triggered(now);

        let route = self.chains[index].route(index);
        if let Err(err) = self.sink.play_sample(&sample, &route) {
            warn!(track = index, sample = %sample, error = %err, "Playback failed");
        }
        true
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tracks", &self.tracks.len())
            .field("bpm", &self.bpm)
            .field("master", &self.master)
            .field("active", &self.active)
            .field("now", &self.now)
            .finish()
    }
}
