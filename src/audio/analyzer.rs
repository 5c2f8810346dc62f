//! Spectral analyzer: owns at most one audio session at a time.
//!
//! Attaching decodes first and only then tears the previous session down, so
//! a source that cannot be decoded leaves the old session where it was.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioGraph, SharedPlayback};
use super::fft::SpectrumAnalysis;
use super::snapshot::{FrequencySnapshot, SessionId};
use super::source::{AudioSource, DecodedAudio};
use crate::error::{Result, VisualizerError};
use crate::params::AnalyzerConfig;

/// Per-attach settings
#[derive(Debug, Clone, Copy)]
pub struct AttachOptions {
    /// Gain applied after the analysis tap (clamped to 0..1)
    pub gain: f32,

    /// Start playing immediately
    pub autoplay: bool,
}

impl Default for AttachOptions {
    fn default() -> Self {
        Self {
            gain: 1.0,
            autoplay: true,
        }
    }
}

/// Summary of a freshly attached session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub source_name: String,
    pub duration_s: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

struct AudioSession {
    id: SessionId,
    source_name: String,
    playback: Arc<SharedPlayback>,
    graph: Box<dyn AudioGraph>,
}

pub struct SpectralAnalyzer {
    config: AnalyzerConfig,
    backend: Box<dyn AudioBackend>,
    session: Option<AudioSession>,
    analysis: SpectrumAnalysis,
    tap: Vec<f32>,
    snapshot: FrequencySnapshot,
    last_session: u64,
}

impl SpectralAnalyzer {
    pub fn new(config: AnalyzerConfig, backend: Box<dyn AudioBackend>) -> Result<Self> {
        config.validate().map_err(VisualizerError::Config)?;
        let bins = config.bin_count();
        Ok(Self {
            analysis: SpectrumAnalysis::new(config.clone()),
            tap: Vec::with_capacity(config.fft_size),
            snapshot: FrequencySnapshot::new(SessionId::SYNTHETIC, bins),
            config,
            backend,
            session: None,
            last_session: 0,
        })
    }

    /// Attach at full gain, autoplaying
    pub fn attach(&mut self, source: &AudioSource) -> Result<SessionInfo> {
        self.attach_with(source, AttachOptions::default())
    }

    pub fn attach_with(&mut self, source: &AudioSource, options: AttachOptions) -> Result<SessionInfo> {
        let audio = source.decode()?;
        self.attach_decoded(source.name(), Arc::new(audio), options)
    }

    /// Attach already decoded audio (decoding may happen off the frame loop)
    ///
    /// Any existing session is torn down before the new context is opened.
    /// If opening fails there is no session afterwards.
    pub fn attach_decoded(
        &mut self,
        source_name: String,
        audio: Arc<DecodedAudio>,
        options: AttachOptions,
    ) -> Result<SessionInfo> {
        self.detach();

        let playback = SharedPlayback::new(
            Arc::clone(&audio),
            self.analysis.fft_size(),
            options.gain,
            options.autoplay,
        );
        let graph = self.backend.open(Arc::clone(&playback))?;

        self.last_session += 1;
        let id = SessionId(self.last_session);
        self.analysis.reset();
        self.snapshot.reset(id, self.analysis.bin_count());

        info!(
            "Attached {} (session {}, {:.1}s)",
            source_name,
            id.0,
            audio.duration_secs()
        );

        let info = SessionInfo {
            id,
            source_name: source_name.clone(),
            duration_s: audio.duration_secs(),
            sample_rate: audio.sample_rate,
            channels: audio.channels,
        };
        self.session = Some(AudioSession {
            id,
            source_name,
            playback,
            graph,
        });
        Ok(info)
    }

    /// Stop playback and release the audio context; no-op without a session
    pub fn detach(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.playback.pause();
            session.graph.close();
            debug!("Detached {} (session {})", session.source_name, session.id.0);
        }
        if self.backend.live_contexts() > 0 {
            warn!(
                "{} audio contexts still live after detach",
                self.backend.live_contexts()
            );
        }
    }

    /// Let offline graphs render the audio for one display tick
    pub fn advance(&mut self, dt: Duration) {
        if let Some(session) = &mut self.session {
            session.graph.pump(dt);
        }
    }

    /// Recompute and return the current spectrum; `None` without a session
    ///
    /// The returned snapshot is overwritten by the next call.
    pub fn current_snapshot(&mut self) -> Option<&FrequencySnapshot> {
        let session = self.session.as_ref()?;
        session.playback.copy_tap(&mut self.tap);
        self.analysis.process(&self.tap, self.snapshot.bins_mut());
        Some(&self.snapshot)
    }

    pub fn play(&mut self) {
        if let Some(session) = &self.session {
            session.playback.play();
        }
    }

    pub fn pause(&mut self) {
        if let Some(session) = &self.session {
            session.playback.pause();
        }
    }

    /// Seek within `[0, duration]`
    pub fn seek(&mut self, seconds: f64) {
        if let Some(session) = &self.session {
            session.playback.seek(seconds);
        }
    }

    /// Set the post-analysis gain; values outside 0..1 are clamped
    pub fn set_gain(&mut self, gain: f32) {
        if let Some(session) = &self.session {
            session.playback.set_gain(gain);
        }
    }

    pub fn gain(&self) -> Option<f32> {
        self.session.as_ref().map(|s| s.playback.gain())
    }

    pub fn is_playing(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.playback.is_playing())
    }

    pub fn current_time(&self) -> f64 {
        self.session
            .as_ref()
            .map_or(0.0, |s| s.playback.position_secs())
    }

    pub fn duration(&self) -> f64 {
        self.session
            .as_ref()
            .map_or(0.0, |s| s.playback.audio().duration_secs())
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn live_contexts(&self) -> usize {
        self.backend.live_contexts()
    }

    pub fn bin_count(&self) -> usize {
        self.config.bin_count()
    }
}

impl Drop for SpectralAnalyzer {
    fn drop(&mut self) {
        self.detach();
    }
}
