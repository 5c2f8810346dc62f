//! Spectrascape library - audio-reactive particle and geometry scenes

pub mod audio;
pub mod camera;
pub mod cli;
pub mod error;
pub mod noise;
pub mod params;
pub mod playback;
pub mod rendering;
pub mod scenes;
pub mod util;

pub use error::{Result, VisualizerError};
