//! Audio sources and decoding.
//!
//! Whole tracks are decoded to interleaved f32 up front with Symphonia so the
//! audio callback only ever reads from memory.

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

use crate::error::{Result, VisualizerError};

/// Something the analyzer can attach to
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// A file on the local filesystem
    File(PathBuf),

    /// Encoded bytes already in memory (e.g. a fetched remote track)
    Memory { name: String, bytes: Arc<[u8]> },
}

impl AudioSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn memory(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Display name used in logs and errors
    pub fn name(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Memory { name, .. } => name.clone(),
        }
    }

    fn extension(&self) -> Option<String> {
        let path = match self {
            Self::File(path) => path.as_path(),
            Self::Memory { name, .. } => Path::new(name.as_str()),
        };
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Decode the whole source into memory
    pub fn decode(&self) -> Result<DecodedAudio> {
        let name = self.name();
        let media: Box<dyn MediaSource> = match self {
            Self::File(path) => Box::new(
                File::open(path).map_err(|e| VisualizerError::unsupported(&name, e))?,
            ),
            Self::Memory { bytes, .. } => Box::new(Cursor::new(bytes.clone())),
        };

        let mut hint = Hint::new();
        if let Some(ext) = self.extension() {
            hint.with_extension(&ext);
        }

        decode_stream(MediaSourceStream::new(media, Default::default()), &hint, &name)
    }
}

/// Fully decoded PCM
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// One sample of channel `channel` (clamped to the last channel)
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        let channel = channel.min(channels - 1);
        self.samples
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Downmixed mono value of a frame (what the analysis tap sees)
    pub fn mono(&self, frame: usize) -> f32 {
        let channels = self.channels as usize;
        let start = frame * channels;
        match self.samples.get(start..start + channels) {
            Some(frame) => frame.iter().sum::<f32>() / channels as f32,
            None => 0.0,
        }
    }
}

fn decode_stream(mss: MediaSourceStream, hint: &Hint, name: &str) -> Result<DecodedAudio> {
    let probed = symphonia::default::get_probe()
        .format(
            hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| VisualizerError::unsupported(name, format!("probe error: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| VisualizerError::unsupported(name, "no audio track found"))?;
    let track_id = track.id;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| VisualizerError::unsupported(name, format!("no decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut skipped = 0usize;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(VisualizerError::unsupported(name, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count() as u16;
                sample_rate = spec.rate;

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                trace!("{}: skipping corrupt packet: {}", name, e);
                skipped += 1;
            }
            Err(e) => return Err(VisualizerError::unsupported(name, e)),
        }
    }

    if samples.is_empty() {
        return Err(VisualizerError::unsupported(name, "no audio frames decoded"));
    }

    let audio = DecodedAudio::new(samples, channels, sample_rate);
    debug!(
        "Decoded {}: {} frames, {} ch @ {}Hz ({:.2}s, {} packets skipped)",
        name,
        audio.frames(),
        audio.channels,
        audio.sample_rate,
        audio.duration_secs(),
        skipped
    );
    Ok(audio)
}
