//! Playlist and transport: which track is current, and where its spectrum
//! comes from.

mod controller;
mod loader;
mod playlist;
mod track;

pub use controller::{PlaybackController, PlaybackEvent};
pub use loader::{Fetcher, HttpClient, LoadWorker, Loaded, TrackOrigin};
pub use playlist::Playlist;
pub use track::{parse_manifest, track_from_arg, Track};
