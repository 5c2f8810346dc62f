//! Audio graph backends.
//!
//! A session's graph is `source -> analysis tap -> gain -> output`. The
//! transport state and the tap live in [`SharedPlayback`], which both the
//! frame loop and the audio thread touch through a short lock. Backends only
//! decide who pulls samples: a cpal output stream, or the frame loop itself
//! for headless and test runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::source::DecodedAudio;
use crate::error::{Result, VisualizerError};

struct Transport {
    /// Playhead in source frames (fractional for rate conversion)
    position: f64,
    playing: bool,
    gain: f32,
    /// Ring of recent pre-gain mono samples
    tap: Vec<f32>,
    tap_head: usize,
}

/// Decoded track plus the transport state shared with the audio thread
pub struct SharedPlayback {
    audio: Arc<DecodedAudio>,
    transport: Mutex<Transport>,
}

impl SharedPlayback {
    pub fn new(audio: Arc<DecodedAudio>, tap_len: usize, gain: f32, playing: bool) -> Arc<Self> {
        Arc::new(Self {
            audio,
            transport: Mutex::new(Transport {
                position: 0.0,
                playing,
                gain: gain.clamp(0.0, 1.0),
                tap: vec![0.0; tap_len.max(1)],
                tap_head: 0,
            }),
        })
    }

    pub fn audio(&self) -> &DecodedAudio {
        &self.audio
    }

    pub fn play(&self) {
        let mut t = self.transport.lock();
        if t.position >= self.audio.frames() as f64 {
            // ended; restart like a media element would
            t.position = 0.0;
        }
        t.playing = true;
    }

    pub fn pause(&self) {
        self.transport.lock().playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.transport.lock().playing
    }

    /// Move the playhead, clamped to `[0, duration]`
    pub fn seek(&self, seconds: f64) {
        let duration = self.audio.duration_secs();
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        let frame = seconds.clamp(0.0, duration) * self.audio.sample_rate as f64;
        self.transport.lock().position = frame;
    }

    pub fn position_secs(&self) -> f64 {
        self.transport.lock().position / self.audio.sample_rate as f64
    }

    pub fn set_gain(&self, gain: f32) {
        self.transport.lock().gain = gain.clamp(0.0, 1.0);
    }

    pub fn gain(&self) -> f32 {
        self.transport.lock().gain
    }

    /// Copy the tap into `dest` in chronological order (oldest first)
    pub fn copy_tap(&self, dest: &mut Vec<f32>) {
        let t = self.transport.lock();
        dest.clear();
        dest.extend_from_slice(&t.tap[t.tap_head..]);
        dest.extend_from_slice(&t.tap[..t.tap_head]);
    }

    /// Fill an interleaved output buffer at the device rate
    ///
    /// Source frames are linearly interpolated; the tap records the pre-gain
    /// downmix so the spectrum does not depend on volume.
    pub fn render(&self, out: &mut [f32], out_channels: usize, out_rate: u32) {
        let out_channels = out_channels.max(1);
        let step = self.audio.sample_rate as f64 / out_rate.max(1) as f64;
        let total = self.audio.frames();
        let mut t = self.transport.lock();

        for frame in out.chunks_mut(out_channels) {
            let mut mono = 0.0;
            if t.playing && t.position < total as f64 {
                let index = t.position.floor() as usize;
                let frac = (t.position - index as f64) as f32;
                let next = (index + 1).min(total - 1);
                for (channel, slot) in frame.iter_mut().enumerate() {
                    let a = self.audio.sample(index, channel);
                    let b = self.audio.sample(next, channel);
                    *slot = (a + (b - a) * frac) * t.gain;
                }
                let a = self.audio.mono(index);
                mono = a + (self.audio.mono(next) - a) * frac;

                t.position += step;
                if t.position >= total as f64 {
                    t.position = total as f64;
                    t.playing = false;
                }
            } else {
                frame.iter_mut().for_each(|s| *s = 0.0);
            }

            let head = t.tap_head;
            t.tap[head] = mono;
            t.tap_head = (head + 1) % t.tap.len();
        }
    }
}

/// A running audio context for one session
pub trait AudioGraph {
    /// Output rate the graph pulls samples at
    fn sample_rate(&self) -> u32;

    /// Advance by one frame tick (only meaningful for graphs without a device clock)
    fn pump(&mut self, dt: Duration);

    /// Stop pulling samples and release the context; idempotent
    fn close(&mut self);
}

/// Creates audio graphs and counts the live ones
pub trait AudioBackend {
    fn open(&self, playback: Arc<SharedPlayback>) -> Result<Box<dyn AudioGraph>>;

    /// Contexts opened and not yet closed
    fn live_contexts(&self) -> usize;
}

/// Releases a live-context slot exactly once
struct LiveGuard(Option<Arc<AtomicUsize>>);

impl LiveGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Some(Arc::clone(counter)))
    }

    fn release(&mut self) {
        if let Some(counter) = self.0.take() {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Plays through the default output device
#[derive(Default)]
pub struct CpalBackend {
    live: Arc<AtomicUsize>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for CpalBackend {
    fn open(&self, playback: Arc<SharedPlayback>) -> Result<Box<dyn AudioGraph>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VisualizerError::GraphAttach("No audio output device found".into()))?;

        let config = device
            .default_output_config()
            .map_err(|e| VisualizerError::GraphAttach(format!("Failed to get audio config: {}", e)))?;

        let channels = config.channels() as usize;
        let sample_rate = config.sample_rate().0;
        info!(
            "Audio: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate
        );

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    playback.render(data, channels, sample_rate);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| VisualizerError::GraphAttach(format!("Failed to build audio stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| VisualizerError::GraphAttach(format!("Failed to start audio stream: {}", e)))?;

        Ok(Box::new(CpalGraph {
            stream: Some(stream),
            sample_rate,
            live: LiveGuard::acquire(&self.live),
        }))
    }

    fn live_contexts(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct CpalGraph {
    stream: Option<cpal::Stream>,
    sample_rate: u32,
    live: LiveGuard,
}

impl AudioGraph for CpalGraph {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    // the device clock drives rendering
    fn pump(&mut self, _dt: Duration) {}

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Pausing stream on close failed: {}", e);
            }
        }
        self.live.release();
    }
}

impl Drop for CpalGraph {
    fn drop(&mut self) {
        self.close();
    }
}

/// Renders into a null sink, advanced by the frame loop
///
/// Used for headless runs and tests. `failing(n)` makes the next `n` opens
/// fail with a graph attach error.
pub struct OfflineBackend {
    sample_rate: u32,
    channels: usize,
    live: Arc<AtomicUsize>,
    failures: AtomicUsize,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: 2,
            live: Arc::new(AtomicUsize::new(0)),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn failing(self, opens: usize) -> Self {
        self.failures.store(opens, Ordering::SeqCst);
        self
    }
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new(48_000)
    }
}

impl AudioBackend for OfflineBackend {
    fn open(&self, playback: Arc<SharedPlayback>) -> Result<Box<dyn AudioGraph>> {
        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            return Err(VisualizerError::GraphAttach("offline context refused".into()));
        }

        Ok(Box::new(OfflineGraph {
            playback: Some(playback),
            sample_rate: self.sample_rate,
            channels: self.channels,
            carry: 0.0,
            scratch: Vec::new(),
            live: LiveGuard::acquire(&self.live),
        }))
    }

    fn live_contexts(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct OfflineGraph {
    playback: Option<Arc<SharedPlayback>>,
    sample_rate: u32,
    channels: usize,
    /// Fractional frames left over from previous ticks
    carry: f64,
    scratch: Vec<f32>,
    live: LiveGuard,
}

impl AudioGraph for OfflineGraph {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn pump(&mut self, dt: Duration) {
        let Some(playback) = &self.playback else {
            return;
        };
        let wanted = dt.as_secs_f64() * self.sample_rate as f64 + self.carry;
        let frames = wanted.floor() as usize;
        self.carry = wanted - frames as f64;

        self.scratch.resize(frames * self.channels, 0.0);
        playback.render(&mut self.scratch, self.channels, self.sample_rate);
    }

    fn close(&mut self) {
        self.playback = None;
        self.live.release();
    }
}
