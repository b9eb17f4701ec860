/*
cpal output sink
================

The engine thread never touches the device. Triggers are pushed as commands
into a lock-free ring buffer; the stream callback drains it, starts voices and
mixes them down.

    engine thread                     audio thread ("polyrobin-audio")
    -------------                     --------------------------------
    play_sample() --push--> [ring] --pop--> Mixer --render--> device

cpal streams are not Send everywhere, so the stream is built and kept alive on
its own thread. `open` waits for that thread to report in and gives up after
the timeout it is handed; the caller then runs without audio.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{debug, error, info, warn};

use super::sample_bank::SampleSource;
use super::voice::Voice;
use super::{AudioSink, OutputError, PlaybackError, SampleId, SampleLibrary};
use crate::graph::Route;
use crate::io::SampleBank;

/// Commands in flight to the audio thread
const COMMAND_CAPACITY: usize = 256;
/// Voices mixed at once; the oldest is dropped past this
pub const MAX_VOICES: usize = 32;
/// Largest block rendered in one pass
pub const BLOCK_SIZE: usize = 512;

#[derive(Debug)]
pub enum VoiceCommand {
    Play {
        track: usize,
        source: SampleSource,
        gain: f32,
        seed: u64,
    },
    SetGain {
        track: usize,
        gain: f32,
    },
}

/// Voice pool living inside the stream callback.
pub struct Mixer {
    voices: Vec<Voice>,
    scratch: Vec<f32>,
    sample_rate: f32,
}

impl Mixer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            scratch: vec![0.0; BLOCK_SIZE],
            sample_rate,
        }
    }

    pub fn handle(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::Play {
                track,
                source,
                gain,
                seed,
            } => {
                if self.voices.len() >= MAX_VOICES {
                    self.voices.remove(0);
                }
                self.voices.push(Voice::new(track, source, gain, seed));
            }
            VoiceCommand::SetGain { track, gain } => {
                for voice in self.voices.iter_mut().filter(|voice| voice.track == track) {
                    voice.gain = gain;
                }
            }
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Fill an interleaved buffer, writing the mono mix to every channel.
    pub fn render(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let total_frames = data.len() / channels;
        let mut frames_written = 0;

        while frames_written < total_frames {
            let frames_to_render = (total_frames - frames_written).min(BLOCK_SIZE);
            let block = &mut self.scratch[..frames_to_render];
            block.fill(0.0);

            for voice in self.voices.iter_mut() {
                voice.render_into(block, self.sample_rate);
            }

            let out_off = frames_written * channels;
            for (i, &s) in block.iter().enumerate() {
                let s = s.clamp(-1.0, 1.0);
                for ch in 0..channels {
                    data[out_off + i * channels + ch] = s;
                }
            }

            frames_written += frames_to_render;
        }

        self.voices.retain(|voice| voice.active);
    }
}

/// Plays samples from a [`SampleBank`] on the default output device.
///
/// Until `open` succeeds every trigger is accepted and dropped.
pub struct CpalSink {
    bank: SampleBank,
    producer: Option<Producer<VoiceCommand>>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    next_seed: u64,
}

impl CpalSink {
    pub fn new(bank: SampleBank) -> Self {
        Self {
            bank,
            producer: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            thread: None,
            next_seed: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.producer.is_some()
    }

    fn send(&mut self, command: VoiceCommand) -> Result<(), PlaybackError> {
        let Some(producer) = self.producer.as_mut() else {
            return Ok(());
        };
        if producer.is_abandoned() {
            return Err(PlaybackError::Unavailable);
        }
        match producer.push(command) {
            Ok(()) => Ok(()),
            Err(PushError::Full(_)) => Err(PlaybackError::QueueFull),
        }
    }
}

impl AudioSink for CpalSink {
    fn open(&mut self, timeout: Duration) -> Result<(), OutputError> {
        if self.is_open() {
            return Ok(());
        }

        let (producer, consumer) = RingBuffer::<VoiceCommand>::new(COMMAND_CAPACITY);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, usize), OutputError>>();
        let shutdown = Arc::new(AtomicBool::new(false));
        self.shutdown = shutdown.clone();

        let handle = thread::Builder::new()
            .name("polyrobin-audio".to_string())
            .spawn(move || match build_stream(consumer) {
                Ok((stream, sample_rate, channels)) => {
                    let _ = ready_tx.send(Ok((sample_rate, channels)));
                    while !shutdown.load(Ordering::Acquire) {
                        thread::park_timeout(Duration::from_millis(50));
                    }
                    drop(stream);
                    debug!("Output stream closed");
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|err| OutputError::Stream(err.to_string()))?;

        match ready_rx.recv_timeout(timeout) {
            Ok(Ok((sample_rate, channels))) => {
                info!(sample_rate, channels, "Audio output started");
                self.producer = Some(producer);
                self.thread = Some(handle);
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                // Leave the thread to exit on its own once the device answers
                self.shutdown.store(true, Ordering::Release);
                Err(OutputError::Timeout(timeout))
            }
        }
    }

    fn play_sample(&mut self, sample: &SampleId, route: &Route) -> Result<(), PlaybackError> {
        if !self.is_open() {
            return Ok(());
        }

        let handle = self
            .bank
            .get(sample.as_str())
            .ok_or_else(|| PlaybackError::UnknownSample(sample.clone()))?;

        self.next_seed = self.next_seed.wrapping_add(1);
        let seed = self.next_seed;
        self.send(VoiceCommand::Play {
            track: route.track,
            source: handle.source,
            gain: route.gain,
            seed,
        })
    }

    fn update_route(&mut self, track: usize, route: &Route) {
        if let Err(err) = self.send(VoiceCommand::SetGain {
            track,
            gain: route.gain,
        }) {
            warn!(track, error = %err, "Could not forward gain change");
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

fn build_stream(
    mut consumer: Consumer<VoiceCommand>,
) -> Result<(cpal::Stream, u32, usize), OutputError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
    let config = device
        .default_output_config()
        .map_err(|err| OutputError::Config(err.to_string()))?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(OutputError::UnsupportedFormat(format!(
            "{:?}",
            config.sample_format()
        )));
    }

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let mut mixer = Mixer::new(sample_rate as f32);

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                while let Ok(command) = consumer.pop() {
                    mixer.handle(command);
                }
                mixer.render(data, channels);
            },
            move |err| error!(error = %err, "Output stream error"),
            None,
        )
        .map_err(|err| OutputError::Stream(err.to_string()))?;

    stream
        .play()
        .map_err(|err| OutputError::Stream(err.to_string()))?;

    Ok((stream, sample_rate, channels))
}
