//! Transport behaviour driven through a simulated clock.
//!
//! At the default 120 bpm one sixteenth tick is 125 ms, so
//! `advance_to(TICK * n)` fires exactly n master ticks.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use polyrobin::graph::{EffectParams, EffectSettings, Route};
use polyrobin::io::{AudioSink, OutputError, PlaybackError, SampleBank, SampleId};
use polyrobin::sequencing::{EuclidParams, TransformKind};
use polyrobin::{EngineConfig, EngineError, TransportController, TransportState};

const TICK: Duration = Duration::from_millis(125);

type Plays = Arc<Mutex<Vec<(String, Route)>>>;

struct RecordingSink(Plays);

impl AudioSink for RecordingSink {
    fn play_sample(&mut self, sample: &SampleId, route: &Route) -> Result<(), PlaybackError> {
        self.0.lock().unwrap().push((sample.to_string(), route.clone()));
        Ok(())
    }
}

/// Refuses to open; the engine should fall back to silence.
struct DeadDevice;

impl AudioSink for DeadDevice {
    fn open(&mut self, _timeout: Duration) -> Result<(), OutputError> {
        Err(OutputError::NoDevice)
    }

    fn play_sample(&mut self, _sample: &SampleId, _route: &Route) -> Result<(), PlaybackError> {
        panic!("a sink that failed to open must not be played");
    }
}

/// Device that takes `delay` to come up, ignoring the timeout it is given.
struct SlowDevice {
    delay: Duration,
    plays: Plays,
}

impl AudioSink for SlowDevice {
    fn open(&mut self, _timeout: Duration) -> Result<(), OutputError> {
        thread::sleep(self.delay);
        Ok(())
    }

    fn play_sample(&mut self, sample: &SampleId, route: &Route) -> Result<(), PlaybackError> {
        self.plays.lock().unwrap().push((sample.to_string(), route.clone()));
        Ok(())
    }
}

/// Accepts every play request and then reports it as dropped.
struct OverloadedSink(Arc<Mutex<usize>>);

impl AudioSink for OverloadedSink {
    fn play_sample(&mut self, _sample: &SampleId, _route: &Route) -> Result<(), PlaybackError> {
        *self.0.lock().unwrap() += 1;
        Err(PlaybackError::QueueFull)
    }
}

fn recording_engine() -> (TransportController, Plays) {
    let plays = Plays::default();
    let mut engine = TransportController::new(
        EngineConfig::default(),
        Box::new(RecordingSink(plays.clone())),
        Box::new(SampleBank::new()),
    );
    assert!(engine.init());
    (engine, plays)
}

fn names(plays: &Plays) -> Vec<String> {
    plays.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
}

#[test]
fn test_round_robin_across_a_bar() {
    let (mut engine, plays) = recording_engine();
    for sample in ["A", "B", "C"] {
        engine.add_sample(0, sample).unwrap();
    }
    engine.set_pattern(0, "0 1 2 3").unwrap();
    engine.start_global().unwrap();

    // Beats 0..3 land on steps 0, 4, 8 and 12: ticks 1, 5, 9 and 13
    engine.advance_to(TICK * 12);
    assert_eq!(names(&plays), ["A", "B", "C"]);

    engine.advance_to(TICK * 13);
    assert_eq!(names(&plays), ["A", "B", "C", "A"]);
    assert_eq!(engine.track(0).unwrap().last_triggered_at(), Some(TICK * 13));
}

#[test]
fn test_muted_track_stays_silent_until_unmuted() {
    let (mut engine, plays) = recording_engine();
    engine.add_sample(2, "snare").unwrap();
    engine.set_pattern(2, "0").unwrap();
    assert_eq!(engine.set_mute(2), Ok(true));
    engine.start_global().unwrap();

    engine.advance_to(TICK * 32);
    assert!(names(&plays).is_empty());
    assert_eq!(engine.trigger_track(2), Ok(false));

    assert_eq!(engine.set_mute(2), Ok(false));
    engine.advance_to(TICK * 48);
    assert_eq!(names(&plays), ["snare"]);
}

#[test]
fn test_track_loop_outlives_global_stop() {
    let (mut engine, plays) = recording_engine();
    engine.add_sample(0, "kick").unwrap();
    engine.set_pattern(0, "0").unwrap();

    engine.start_track(0).unwrap();
    assert_eq!(engine.state(), TransportState::GlobalPlaying);

    engine.stop_global().unwrap();
    assert_eq!(engine.state(), TransportState::Stopped);
    assert!(engine.scheduler().is_track_loop_running(0));

    engine.advance_to(TICK * 32);
    assert_eq!(names(&plays), ["kick", "kick"]);
    assert_eq!(engine.snapshot().tracks[0].current_step, Some(15));
}

#[test]
fn test_stopping_a_stopped_track_is_ok() {
    let (mut engine, _plays) = recording_engine();
    assert!(engine.stop_track(5).is_ok());
    assert!(engine.stop_track(5).is_ok());
    assert!(!engine.track(5).unwrap().is_playing());
}

#[test]
fn test_global_stop_leaves_track_loop_and_track_stop_leaves_global() {
    let (mut engine, plays) = recording_engine();
    engine.add_sample(0, "kick").unwrap();
    engine.add_sample(1, "hat").unwrap();
    engine.set_pattern(0, "0").unwrap();
    engine.set_pattern(1, "0").unwrap();
    engine.start_global().unwrap();
    engine.start_track(1).unwrap();

    engine.stop_track(1).unwrap();
    assert_eq!(engine.state(), TransportState::GlobalPlaying);

    engine.advance_to(TICK);
    let mut heard = names(&plays);
    heard.sort();
    assert_eq!(heard, ["hat", "kick"]);
}

#[test]
fn test_second_effect_replaces_first() {
    let (mut engine, plays) = recording_engine();
    engine.add_sample(0, "kick").unwrap();
    engine.apply_effect_named(0, "delay", EffectParams::new()).unwrap();
    engine
        .apply_effect_named(0, "reverb", EffectParams::new().with("decay", 0.8))
        .unwrap();

    let chain = engine.scheduler().chain(0).unwrap();
    assert_eq!(chain.path().len(), 3);

    assert_eq!(engine.trigger_track(0), Ok(true));
    let plays = plays.lock().unwrap();
    let (_, route) = &plays[0];
    assert!(matches!(route.effect, Some(EffectSettings::Reverb { .. })));
}

#[test]
fn test_remove_sample_clamps_cursor() {
    let (mut engine, plays) = recording_engine();
    engine.add_sample(0, "a").unwrap();
    engine.add_sample(0, "b").unwrap();

    assert_eq!(engine.trigger_track(0), Ok(true));
    assert_eq!(engine.track(0).unwrap().cursor(), 1);

    assert_eq!(engine.remove_sample(0, 1), Ok(SampleId::from("b")));
    assert_eq!(engine.track(0).unwrap().cursor(), 0);

    engine.trigger_track(0).unwrap();
    assert_eq!(names(&plays), ["a", "a"]);
}

#[test]
fn test_bpm_change_restarts_master_at_new_rate() {
    let (mut engine, _plays) = recording_engine();
    engine.add_sample(0, "kick").unwrap();
    engine.start_global().unwrap();
    engine.advance_to(TICK * 3);
    assert_eq!(engine.snapshot().master_step, Some(2));

    engine.set_bpm(240.0).unwrap();
    assert_eq!(engine.snapshot().master_step, None);
    assert_eq!(engine.snapshot().active, vec![0]);

    // 62.5 ms per tick at 240 bpm
    engine.advance_by(Duration::from_micros(62_500));
    assert_eq!(engine.snapshot().master_step, Some(0));
    engine.advance_by(Duration::from_micros(62_500));
    assert_eq!(engine.snapshot().master_step, Some(1));
}

#[test]
fn test_pattern_change_restarts_global() {
    let (mut engine, _plays) = recording_engine();
    engine.add_sample(0, "kick").unwrap();
    engine.start_global().unwrap();
    engine.advance_to(TICK * 5);
    assert_eq!(engine.snapshot().master_step, Some(4));

    engine.set_pattern(0, "0.5 2.5").unwrap();
    assert_eq!(engine.snapshot().master_step, None);
    engine.advance_by(TICK);
    assert_eq!(engine.snapshot().master_step, Some(0));
}

#[test]
fn test_pattern_change_while_stopped_does_not_start() {
    let (mut engine, _plays) = recording_engine();
    engine.set_pattern(0, "1 3").unwrap();
    assert_eq!(engine.state(), TransportState::Stopped);
}

#[test]
fn test_failed_device_degrades_to_silence() {
    let mut engine = TransportController::new(
        EngineConfig::default(),
        Box::new(DeadDevice),
        Box::new(SampleBank::new()),
    );
    assert!(engine.init());
    assert!(engine.is_initialized());
    assert!(engine.is_degraded());

    engine.add_sample(0, "kick").unwrap();
    engine.start_global().unwrap();
    engine.advance_to(TICK * 16);
    assert_eq!(engine.track(0).unwrap().last_triggered_at(), Some(TICK * 5));
}

fn slow_engine(delay: Duration, init_timeout_ms: u64) -> (TransportController, Plays) {
    let plays = Plays::default();
    let config = EngineConfig {
        init_timeout_ms,
        ..EngineConfig::default()
    };
    let engine = TransportController::new(
        config,
        Box::new(SlowDevice {
            delay,
            plays: plays.clone(),
        }),
        Box::new(SampleBank::new()),
    );
    (engine, plays)
}

#[test]
fn test_slow_device_times_out_into_degraded_mode() {
    let (mut engine, plays) = slow_engine(Duration::from_secs(5), 20);

    let started = Instant::now();
    assert!(engine.init());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(engine.is_initialized());
    assert!(engine.is_degraded());

    engine.add_sample(0, "kick").unwrap();
    engine.start_global().unwrap();
    engine.advance_to(TICK * 16);
    assert_eq!(engine.track(0).unwrap().last_triggered_at(), Some(TICK * 5));
    assert!(names(&plays).is_empty());
}

#[test]
fn test_device_opening_within_timeout_is_used() {
    let (mut engine, plays) = slow_engine(Duration::from_millis(5), 2000);

    assert!(engine.init());
    assert!(!engine.is_degraded());

    engine.add_sample(0, "kick").unwrap();
    assert_eq!(engine.trigger_track(0), Ok(true));
    assert_eq!(names(&plays), ["kick"]);
}

#[test]
fn test_playback_errors_do_not_stop_the_clock() {
    let count = Arc::new(Mutex::new(0));
    let mut engine = TransportController::new(
        EngineConfig::default(),
        Box::new(OverloadedSink(count.clone())),
        Box::new(SampleBank::new()),
    );
    engine.init();
    engine.add_sample(0, "kick").unwrap();
    engine.set_pattern(0, "0").unwrap();
    engine.start_global().unwrap();

    engine.advance_to(TICK * 33);
    assert_eq!(*count.lock().unwrap(), 3);
    assert_eq!(engine.snapshot().master_step, Some(0));
}

#[test]
fn test_division_change_applies_on_next_tick() {
    let (mut engine, plays) = recording_engine();
    engine.add_sample(0, "clap").unwrap();
    engine.set_pattern(0, "1").unwrap();
    engine.start_global().unwrap();

    // Steps 0 and 1 at sixteenths: beats 0 and 0.25
    engine.advance_to(TICK * 2);
    assert!(names(&plays).is_empty());

    // At eighths step 2 lands on beat 1
    engine.set_division(0, 8).unwrap();
    engine.advance_to(TICK * 3);
    assert_eq!(names(&plays), ["clap"]);
}

#[test]
fn test_euclid_transform_feeds_playback() {
    let (mut engine, plays) = recording_engine();
    engine.add_sample(0, "rim").unwrap();
    engine
        .apply_transform(0, TransformKind::Euclid(Some(EuclidParams { beats: 4, steps: 16 })))
        .unwrap();
    assert_eq!(engine.track(0).unwrap().pattern().positions(), &[0.0, 0.25, 0.5, 0.75]);

    engine.start_global().unwrap();
    engine.advance_to(TICK * 16);
    assert_eq!(names(&plays).len(), 4);
}

#[test]
fn test_invalid_requests_leave_state_alone() {
    let (mut engine, _plays) = recording_engine();
    engine.set_pattern(0, "0 2").unwrap();

    assert_eq!(
        engine.set_pattern(8, "1"),
        Err(EngineError::InvalidTrack { index: 8, count: 8 })
    );
    assert_eq!(engine.set_division(0, 0), Err(EngineError::InvalidDivision(0)));
    assert!(engine.set_bpm(-10.0).is_err());

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.tracks[0].pattern, "0 2");
    assert_eq!(snapshot.tracks[0].division, 16);
    assert_eq!(snapshot.bpm, 120.0);
}
