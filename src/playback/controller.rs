//! Playback controller: owns the playlist, the analyzer and the synthetic
//! fallback, and decides which spectrum the scenes see each tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::loader::{Fetcher, LoadWorker, Loaded, TrackOrigin};
use super::playlist::Playlist;
use super::track::Track;
use crate::audio::{
    AttachOptions, AudioBackend, DecodedAudio, FrequencySnapshot, SessionInfo, SpectralAnalyzer,
    SyntheticSpectrum,
};
use crate::error::{Result, VisualizerError};
use crate::params::VisualizerConfig;

/// Something the user should hear about
#[derive(Debug)]
pub enum PlaybackEvent {
    SourceChanged { index: usize, name: String },
    PlaylistLoaded { url: String, tracks: usize },
    Failed(VisualizerError),
}

type SourceListener = Box<dyn FnMut(&Track)>;

#[derive(Debug, Clone, Copy)]
struct PendingTrack {
    request: u64,
    index: usize,
}

pub struct PlaybackController {
    analyzer: SpectralAnalyzer,
    synthetic: SyntheticSpectrum,
    playlist: Playlist,
    loader: LoadWorker,
    volume: f32,
    last_request: u64,
    pending_track: Option<PendingTrack>,
    pending_manifest: Option<u64>,
    /// An external video is current and "playing" on the synthetic spectrum
    external_playing: bool,
    /// The playlist cursor points at what is actually loaded
    loaded: bool,
    listeners: Vec<SourceListener>,
    events: Vec<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(
        config: &VisualizerConfig,
        backend: Box<dyn AudioBackend>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        Ok(Self {
            analyzer: SpectralAnalyzer::new(config.analyzer.clone(), backend)?,
            synthetic: SyntheticSpectrum::new(config.synthetic.clone()),
            playlist: Playlist::new(Vec::new()),
            loader: LoadWorker::spawn(fetcher)?,
            volume: config.playback.initial_volume.clamp(0.0, 1.0),
            last_request: 0,
            pending_track: None,
            pending_manifest: None,
            external_playing: false,
            loaded: false,
            listeners: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    /// The track currently loaded, if any
    pub fn current_source(&self) -> Option<&Track> {
        if self.loaded {
            self.playlist.current()
        } else {
            None
        }
    }

    /// Called with the new track every time the current source changes
    pub fn on_source_change(&mut self, listener: impl FnMut(&Track) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the output volume (0..1); remembered across track switches
    pub fn set_volume(&mut self, level: f32) {
        self.volume = level.clamp(0.0, 1.0);
        self.analyzer.set_gain(self.volume);
    }

    pub fn is_loading(&self) -> bool {
        self.pending_track.is_some() || self.pending_manifest.is_some()
    }

    pub fn is_playing(&self) -> bool {
        match self.current_source() {
            Some(Track::ExternalVideo { .. }) => self.external_playing,
            Some(_) => self.analyzer.is_playing(),
            None => false,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.analyzer.current_time()
    }

    pub fn duration(&self) -> f64 {
        self.analyzer.duration()
    }

    /// Append a track; starts loading it if nothing is loaded yet
    pub fn enqueue(&mut self, track: Track) {
        self.playlist.push(track);
        if !self.loaded && self.pending_track.is_none() {
            self.request_track(self.playlist.len() - 1);
        }
    }

    pub fn play(&mut self) {
        match self.current_source() {
            Some(Track::ExternalVideo { .. }) => self.external_playing = true,
            Some(_) => self.analyzer.play(),
            None => {}
        }
    }

    pub fn pause(&mut self) {
        match self.current_source() {
            Some(Track::ExternalVideo { .. }) => self.external_playing = false,
            Some(_) => self.analyzer.pause(),
            None => {}
        }
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        if self.current_source().is_some() {
            self.analyzer.seek(seconds);
        }
    }

    pub fn next(&mut self) {
        if self.current_source().is_none() {
            return;
        }
        if let Some(index) = self.playlist.peek_next() {
            self.request_track(index);
        }
    }

    pub fn prev(&mut self) {
        if self.current_source().is_none() {
            return;
        }
        if let Some(index) = self.playlist.peek_prev() {
            self.request_track(index);
        }
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        if self.current_source().is_some() {
            self.playlist.toggle_shuffle();
        }
        self.playlist.is_shuffle()
    }

    pub fn toggle_repeat(&mut self) -> bool {
        if self.current_source().is_some() {
            self.playlist.toggle_repeat();
        }
        self.playlist.is_repeat()
    }

    /// Switch to playlist entry `index`; out-of-range indices are ignored
    pub fn select(&mut self, index: usize) {
        if index < self.playlist.len() {
            self.request_track(index);
        }
    }

    /// Fetch a JSON manifest in the background; replaces the playlist on success
    pub fn load_manifest(&mut self, url: impl Into<String>) {
        let url = url.into();
        let request = self.next_request();
        info!("Loading playlist {}", url);
        self.pending_manifest = Some(request);
        self.loader.fetch_manifest(request, url);
    }

    fn next_request(&mut self) -> u64 {
        self.last_request += 1;
        self.last_request
    }

    fn request_track(&mut self, index: usize) {
        let Some(track) = self.playlist.tracks().get(index).cloned() else {
            return;
        };

        match TrackOrigin::of(&track) {
            Some(origin) => {
                let request = self.next_request();
                debug!("Requesting {} (request {})", track.name(), request);
                self.pending_track = Some(PendingTrack { request, index });
                self.loader.load_track(request, origin);
            }
            None => {
                // external video: nothing to decode, switch right away
                self.pending_track = None;
                self.analyzer.detach();
                self.external_playing = true;
                self.commit(index);
            }
        }
    }

    /// Make `index` the current source and tell everyone
    fn commit(&mut self, index: usize) {
        self.loaded = true;
        let Some(track) = self.playlist.select(index).cloned() else {
            return;
        };
        info!("Now playing: {}", track.name());
        for listener in &mut self.listeners {
            listener(&track);
        }
        self.events.push(PlaybackEvent::SourceChanged {
            index,
            name: track.name(),
        });
    }

    /// Collect finished background work; call once per tick
    pub fn poll(&mut self) {
        while let Some(loaded) = self.loader.try_next() {
            match loaded {
                Loaded::Manifest {
                    request,
                    url,
                    result,
                } => self.finish_manifest(request, url, result),
                Loaded::Track {
                    request,
                    source_name,
                    result,
                } => self.finish_track(request, source_name, result),
            }
        }
    }

    fn finish_manifest(&mut self, request: u64, url: String, result: Result<Vec<Track>>) {
        if self.pending_manifest != Some(request) {
            debug!("Dropping stale manifest {}", url);
            return;
        }
        self.pending_manifest = None;

        match result {
            Ok(tracks) => {
                info!("Playlist {}: {} tracks", url, tracks.len());
                let count = tracks.len();
                // nothing from the old playlist may outlive it: pending loads
                // index into it and the playing session has no entry in the new one
                self.pending_track = None;
                self.analyzer.detach();
                self.external_playing = false;
                self.loaded = false;
                self.playlist.replace(tracks);
                self.events.push(PlaybackEvent::PlaylistLoaded { url, tracks: count });
                if count > 0 {
                    self.request_track(0);
                }
            }
            Err(e) => {
                warn!("{}", e);
                self.events.push(PlaybackEvent::Failed(e));
            }
        }
    }

    fn finish_track(&mut self, request: u64, source_name: String, result: Result<Arc<DecodedAudio>>) {
        let Some(pending) = self.pending_track.filter(|p| p.request == request) else {
            debug!("Dropping stale load of {}", source_name);
            return;
        };
        self.pending_track = None;

        let attached = result.and_then(|audio| self.attach_with_retry(source_name, audio));
        match attached {
            Ok(info) => {
                debug!("Session {} ready ({:.1}s)", info.id.0, info.duration_s);
                self.external_playing = false;
                self.commit(pending.index);
            }
            Err(e) => {
                warn!("{}", e);
                // the switch is abandoned; whatever was playing stays, stopped
                self.analyzer.pause();
                self.external_playing = false;
                if !self.analyzer.has_session() && !self.is_external_current() {
                    self.loaded = false;
                }
                self.events.push(PlaybackEvent::Failed(e));
            }
        }
    }

    fn is_external_current(&self) -> bool {
        self.loaded && self.playlist.current().is_some_and(|track| !track.is_analyzable())
    }

    fn attach_with_retry(&mut self, source_name: String, audio: Arc<DecodedAudio>) -> Result<SessionInfo> {
        let options = AttachOptions {
            gain: self.volume,
            autoplay: true,
        };
        match self
            .analyzer
            .attach_decoded(source_name.clone(), Arc::clone(&audio), options)
        {
            Err(e) if e.is_retryable() => {
                warn!("{}; retrying once", e);
                self.analyzer.detach();
                self.analyzer.attach_decoded(source_name, audio, options)
            }
            other => other,
        }
    }

    /// Advance audio by one display tick and return the spectrum to draw
    ///
    /// Real analysis while a session exists, the synthetic spectrum while an
    /// external video is current, otherwise nothing.
    pub fn frame_snapshot(&mut self, time_s: f64, dt: Duration) -> Option<&FrequencySnapshot> {
        self.poll();
        self.analyzer.advance(dt);

        if self.analyzer.has_session() {
            return self.analyzer.current_snapshot();
        }
        if self.is_external_current() {
            let bins = self.synthetic.bin_count();
            return Some(self.synthetic.generate(bins, time_s));
        }
        None
    }

    /// Take all queued user-facing events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }
}
