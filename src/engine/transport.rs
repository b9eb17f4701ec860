//! Transport controller - the public face of the engine
//!
//! Every user intent (set a pattern, mute a track, start playback) comes in
//! here, is index-checked, applied to the scheduler's state and logged.
//!
//! Global and per-track playback are independent:
//!
//! - `start_global` / `stop_global` drive the master loop only
//! - `start_track` / `stop_track` drive one track's own loop only
//!
//! Stopping global playback never stops a track loop and vice versa.

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::clock::{is_valid_bpm, MAX_BPM, MIN_BPM};
use super::scheduler::Scheduler;
use super::snapshot::{EngineSnapshot, TrackSnapshot};
use super::track::Track;
use super::EngineError;
use crate::config::EngineConfig;
use crate::graph::{EffectKind, EffectParams, EffectSpec};
use crate::io::{AudioSink, OutputError, SampleHandle, SampleId, SampleLibrary};
use crate::sequencing::{transform, Division, Pattern, TransformKind};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    GlobalPlaying,
}

pub struct TransportController {
    config: EngineConfig,
    scheduler: Scheduler,
    library: Box<dyn SampleLibrary>,
    rng: StdRng,
    initialized: bool,
    degraded: bool,
}

impl TransportController {
    /// Build an engine with empty tracks. Nothing plays until [`init`].
    ///
    /// [`init`]: TransportController::init
    pub fn new(
        config: EngineConfig,
        sink: Box<dyn AudioSink>,
        library: Box<dyn SampleLibrary>,
    ) -> Self {
        let config = config.validate();
        let division = Division::new(config.default_division).unwrap_or_default();
        let tracks = (0..config.num_tracks)
            .map(|_| {
                Track::new(
                    &config.default_pattern,
                    division,
                    config.default_volume,
                    config.max_samples_per_track,
                )
            })
            .collect();

        let scheduler = Scheduler::new(
            tracks,
            sink,
            config.default_bpm,
            config.tolerance,
            config.master_steps,
        );

        Self {
            config,
            scheduler,
            library,
            rng: StdRng::from_entropy(),
            initialized: false,
            degraded: false,
        }
    }

    /// Seed the generator behind `Randomize` transforms.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Bring the audio sink up. Idempotent.
    ///
    /// Waits at most `config.init_timeout`. If the sink fails or times out
    /// the engine keeps running with audio disabled, and this still returns
    /// true.
    pub fn init(&mut self) -> bool {
        if self.initialized {
            return true;
        }

        let timeout = self.config.init_timeout();
        let sink = self.scheduler.take_sink();
        match open_bounded(sink, timeout) {
            Ok(sink) => {
                self.scheduler.replace_sink(sink);
                info!(tracks = self.config.num_tracks, "Engine initialized");
            }
            Err(err) => {
                // The scheduler is already left with a NullSink
                warn!(error = %err, "Audio output unavailable, continuing without sound");
                self.degraded = true;
            }
        }

        self.initialized = true;
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// True when init fell back to silent playback.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> TransportState {
        if self.scheduler.is_master_running() {
            TransportState::GlobalPlaying
        } else {
            TransportState::Stopped
        }
    }

    pub fn bpm(&self) -> f64 {
        self.scheduler.bpm()
    }

    pub fn num_tracks(&self) -> usize {
        self.scheduler.tracks().len()
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.scheduler.track(index)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    // -- Track state ---------------------------------------------------

    /// Replace a track's pattern. Restarts global playback if it is running.
    pub fn set_pattern(&mut self, index: usize, text: &str) -> Result<(), EngineError> {
        self.track_mut(index)?.set_pattern(Pattern::parse(text));
        debug!(track = index, pattern = text, "Pattern set");
        self.restart_global_if_running();
        Ok(())
    }

    /// Set track volume, clamped to [0, 1]. The chain is not rebuilt.
    pub fn set_volume(&mut self, index: usize, level: f32) -> Result<(), EngineError> {
        self.check_track(index)?;
        let chain = self.chain_mut(index)?;
        chain.set_volume(level);
        let gain = chain.gain();

        self.track_mut(index)?.set_volume(gain);
        self.scheduler.sync_route(index);
        debug!(track = index, gain, "Volume set");
        Ok(())
    }

    /// Toggle mute. Returns the new mute state.
    pub fn set_mute(&mut self, index: usize) -> Result<bool, EngineError> {
        let muted = self.track_mut(index)?.toggle_mute();
        debug!(track = index, muted, "Mute toggled");
        Ok(muted)
    }

    /// Change a track's division. Takes effect on the next tick.
    pub fn set_division(&mut self, index: usize, division: u32) -> Result<(), EngineError> {
        self.check_track(index)?;
        let division = Division::new(division).ok_or_else(|| {
            warn!(track = index, division, "Rejected division");
            EngineError::InvalidDivision(division)
        })?;
        self.track_mut(index)?.set_division(division);
        debug!(track = index, %division, "Division set");
        Ok(())
    }

    pub fn add_sample(&mut self, index: usize, sample: impl Into<SampleId>) -> Result<(), EngineError> {
        let sample = sample.into();
        let track = self.track_mut(index)?;
        let capacity = track.capacity();
        if !track.add_sample(sample.clone()) {
            warn!(track = index, sample = %sample, capacity, "Track is full");
            return Err(EngineError::TrackFull {
                track: index,
                capacity,
            });
        }
        debug!(track = index, sample = %sample, "Sample added");
        Ok(())
    }

    /// Remove the sample in slot `sample_index`. Sound already playing is
    /// left to finish.
    pub fn remove_sample(&mut self, index: usize, sample_index: usize) -> Result<SampleId, EngineError> {
        let track = self.track_mut(index)?;
        let count = track.samples().len();
        match track.remove_sample(sample_index) {
            Some(removed) => {
                debug!(track = index, sample = %removed, "Sample removed");
                Ok(removed)
            }
            None => {
                warn!(track = index, sample_index, count, "Invalid sample index");
                Err(EngineError::InvalidSample {
                    track: index,
                    index: sample_index,
                    count,
                })
            }
        }
    }

    pub fn set_samples(&mut self, index: usize, samples: Vec<SampleId>) -> Result<(), EngineError> {
        let track = self.track_mut(index)?;
        let capacity = track.capacity();
        if !track.set_samples(samples) {
            warn!(track = index, capacity, "Too many samples for track");
            return Err(EngineError::TrackFull {
                track: index,
                capacity,
            });
        }
        Ok(())
    }

    /// Stop the track's loop and reset it to an empty lane with the default
    /// pattern and no effect.
    pub fn clear_track(&mut self, index: usize) -> Result<(), EngineError> {
        self.check_track(index)?;
        self.scheduler.stop_track_loop(index);

        let pattern = self.config.default_pattern.clone();
        self.track_mut(index)?.clear(&pattern);
        self.chain_mut(index)?.release();
        self.scheduler.sync_route(index);

        debug!(track = index, "Track cleared");
        Ok(())
    }

    /// Rewrite a track's pattern through a transform.
    pub fn apply_transform(&mut self, index: usize, kind: TransformKind) -> Result<(), EngineError> {
        let positions = self.track_ref(index)?.pattern().positions().to_vec();
        let transformed = transform(&positions, kind, &mut self.rng);
        debug!(track = index, transform = kind.name(), "Pattern transformed");

        self.track_mut(index)?
            .set_pattern(Pattern::from_positions(transformed));
        self.restart_global_if_running();
        Ok(())
    }

    // -- Effects -------------------------------------------------------

    /// Swap the track's effect. `None` routes direct.
    ///
    /// On failure the track is left routing direct with no effect.
    pub fn apply_effect(&mut self, index: usize, effect: Option<EffectSpec>) -> Result<(), EngineError> {
        self.check_track(index)?;
        let result = self.chain_mut(index)?.apply_effect(effect.as_ref());
        self.scheduler.sync_route(index);

        match result {
            Ok(released) => {
                debug!(
                    track = index,
                    effect = effect.as_ref().map(|spec| spec.kind.name()).unwrap_or("none"),
                    ?released,
                    "Effect applied"
                );
                self.track_mut(index)?.set_effect(effect);
                Ok(())
            }
            Err(source) => {
                warn!(track = index, error = %source, "Effect failed, track routes direct");
                self.track_mut(index)?.set_effect(None);
                Err(EngineError::Chain {
                    track: index,
                    source,
                })
            }
        }
    }

    /// Apply an effect by name. `""` and `"none"` clear the effect; an
    /// unknown name is logged and routes direct.
    pub fn apply_effect_named(
        &mut self,
        index: usize,
        name: &str,
        params: EffectParams,
    ) -> Result<(), EngineError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return self.apply_effect(index, None);
        }

        match trimmed.parse::<EffectKind>() {
            Ok(kind) => self.apply_effect(index, Some(EffectSpec::new(kind, params))),
            Err(err) => {
                warn!(track = index, error = %err, "Unknown effect, routing direct");
                self.apply_effect(index, None)
            }
        }
    }

    // -- Playback ------------------------------------------------------

    /// Start (or restart) the master loop from step 0.
    pub fn start_global(&mut self) -> Result<(), EngineError> {
        self.require_init()?;
        let active: Vec<usize> = self
            .scheduler
            .tracks()
            .iter()
            .enumerate()
            .filter(|(_, track)| track.has_samples())
            .map(|(index, _)| index)
            .collect();

        info!(bpm = self.bpm(), active = ?active, "Global playback started");
        self.scheduler.start_master(active);
        Ok(())
    }

    /// Stop the master loop. Track loops keep running.
    pub fn stop_global(&mut self) -> Result<(), EngineError> {
        if self.scheduler.is_master_running() {
            info!("Global playback stopped");
        }
        self.scheduler.stop_master();
        Ok(())
    }

    /// Start (or restart) one track's own loop, starting global playback
    /// first if it is stopped.
    pub fn start_track(&mut self, index: usize) -> Result<(), EngineError> {
        self.check_track(index)?;
        self.require_init()?;

        if !self.scheduler.is_master_running() {
            if let Err(err) = self.start_global() {
                warn!(error = %err, "Could not start global playback");
            }
        }

        self.track_mut(index)?.set_playing(true);
        self.scheduler.start_track_loop(index);
        info!(track = index, "Track playback started");
        Ok(())
    }

    /// Stop one track's loop. Stopping a stopped track is fine.
    pub fn stop_track(&mut self, index: usize) -> Result<(), EngineError> {
        self.track_mut(index)?.set_playing(false);
        self.scheduler.stop_track_loop(index);
        debug!(track = index, "Track playback stopped");
        Ok(())
    }

    /// Change tempo, within `MIN_BPM..=MAX_BPM`. Global playback restarts at the new rate; running track
    /// loops keep theirs until restarted.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), EngineError> {
        if !is_valid_bpm(bpm) {
            warn!(bpm, min = MIN_BPM, max = MAX_BPM, "Rejected bpm");
            return Err(EngineError::InvalidBpm(bpm));
        }
        self.scheduler.set_bpm(bpm);
        info!(bpm, "Tempo changed");
        Ok(())
    }

    /// Fire the track once now, as if its pattern matched. Returns whether a
    /// sample played; muted and empty tracks stay silent.
    pub fn trigger_track(&mut self, index: usize) -> Result<bool, EngineError> {
        self.check_track(index)?;
        Ok(self.scheduler.trigger_now(index))
    }

    /// Run every tick due by `now` (time since the engine epoch).
    pub fn advance_to(&mut self, now: Duration) {
        self.scheduler.advance_to(now);
    }

    pub fn advance_by(&mut self, elapsed: Duration) {
        let now = self.scheduler.now() + elapsed;
        self.scheduler.advance_to(now);
    }

    /// Drop ticks missed while the driver was stalled.
    pub fn skip_missed(&mut self, now: Duration) -> usize {
        self.scheduler.skip_missed(now)
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    // -- Samples -------------------------------------------------------

    pub fn available_samples(&self) -> Vec<String> {
        self.library.available_samples()
    }

    pub fn load_sample(&mut self, name: &str, source: &Path) -> SampleHandle {
        self.library.load_sample(name, source)
    }

    // -- Observation ---------------------------------------------------

    pub fn snapshot(&self) -> EngineSnapshot {
        let tracks = self
            .scheduler
            .tracks()
            .iter()
            .enumerate()
            .map(|(index, track)| TrackSnapshot {
                index,
                samples: track.samples().iter().map(|id| id.to_string()).collect(),
                cursor: track.cursor(),
                pattern: track.pattern().text().to_string(),
                positions: track.pattern().positions().to_vec(),
                division: track.division().count(),
                volume: track.volume(),
                muted: track.is_muted(),
                is_playing: track.is_playing(),
                effect: track.effect().map(|spec| spec.kind),
                current_step: self.scheduler.track_step(index),
                last_triggered_at: track.last_triggered_at(),
            })
            .collect();

        EngineSnapshot {
            state: self.state(),
            bpm: self.bpm(),
            master_step: self.scheduler.master_step(),
            master_steps: self.config.master_steps,
            active: self.scheduler.active().to_vec(),
            now: self.scheduler.now(),
            tracks,
        }
    }

    // -- Helpers -------------------------------------------------------

    fn restart_global_if_running(&mut self) {
        if self.scheduler.is_master_running() {
            if let Err(err) = self.start_global() {
                warn!(error = %err, "Could not restart global playback");
            }
        }
    }

    fn require_init(&self) -> Result<(), EngineError> {
        if self.initialized {
            Ok(())
        } else {
            warn!("Playback requested before init");
            Err(EngineError::NotInitialized)
        }
    }

    fn invalid_track(&self, index: usize) -> EngineError {
        let count = self.num_tracks();
        warn!(track = index, count, "Invalid track index");
        EngineError::InvalidTrack { index, count }
    }

    fn check_track(&self, index: usize) -> Result<(), EngineError> {
        if index < self.num_tracks() {
            Ok(())
        } else {
            Err(self.invalid_track(index))
        }
    }

    fn track_ref(&self, index: usize) -> Result<&Track, EngineError> {
        self.scheduler
            .track(index)
            .ok_or_else(|| self.invalid_track(index))
    }

    fn track_mut(&mut self, index: usize) -> Result<&mut Track, EngineError> {
        let count = self.num_tracks();
        self.scheduler.track_mut(index).ok_or_else(|| {
            warn!(track = index, count, "Invalid track index");
            EngineError::InvalidTrack { index, count }
        })
    }

    fn chain_mut(&mut self, index: usize) -> Result<&mut crate::graph::SignalChain, EngineError> {
        let count = self.num_tracks();
        self.scheduler.chain_mut(index).ok_or_else(|| {
            warn!(track = index, count, "Invalid track index");
            EngineError::InvalidTrack { index, count }
        })
    }
}

/// Open `sink` on a helper thread and wait at most `timeout` for it. A sink
/// that overruns is left to finish (and drop) on that thread.
fn open_bounded(
    mut sink: Box<dyn AudioSink>,
    timeout: Duration,
) -> Result<Box<dyn AudioSink>, OutputError> {
    let (done_tx, done_rx) = mpsc::channel();
    thread::Builder::new()
        .name("polyrobin-init".to_string())
        .spawn(move || {
            let result = sink.open(timeout).map(|()| sink);
            let _ = done_tx.send(result);
        })
        .map_err(|err| OutputError::Stream(err.to_string()))?;

    match done_rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(OutputError::Timeout(timeout)),
    }
}

impl std::fmt::Debug for TransportController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportController")
            .field("state", &self.state())
            .field("initialized", &self.initialized)
            .field("degraded", &self.degraded)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
