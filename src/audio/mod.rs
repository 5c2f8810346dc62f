//! Audio side: decoding, playback graphs, FFT analysis and the synthetic
//! fallback spectrum.

pub mod analyzer;
pub mod backend;
pub mod fft;
pub mod snapshot;
pub mod source;
pub mod synthetic;

pub use analyzer::{AttachOptions, SessionInfo, SpectralAnalyzer};
pub use backend::{AudioBackend, AudioGraph, CpalBackend, OfflineBackend, SharedPlayback};
pub use snapshot::{FrequencySnapshot, SessionId};
pub use source::{AudioSource, DecodedAudio};
pub use synthetic::SyntheticSpectrum;
