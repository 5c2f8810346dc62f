//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::error::Result;
use crate::params::VisualizerConfig;
use crate::playback::{track_from_arg, Track};
use crate::scenes::SceneKind;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "spectrascape")]
#[command(about = "Audio-reactive particle and geometry visualizer", long_about = None)]
pub struct Args {
    /// Tracks to queue: local file paths or http(s) URLs
    #[arg(value_name = "TRACK")]
    pub tracks: Vec<String>,

    /// Scene shown at startup
    #[arg(long, value_enum, default_value_t = SceneKind::Aurora)]
    pub scene: SceneKind,

    /// Startup volume (0.0 - 1.0), overrides the config file
    #[arg(long, value_name = "LEVEL")]
    pub volume: Option<f32>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// JSON playlist manifest to fetch at startup
    #[arg(long, value_name = "URL")]
    pub manifest: Option<String>,

    /// Run without a window or audio device for the given number of frames
    #[arg(long, value_name = "FRAMES")]
    pub headless: Option<u64>,
}

impl Args {
    /// Load the configuration file (or defaults) and apply overrides
    pub fn load_config(&self) -> Result<VisualizerConfig> {
        let mut config = match &self.config {
            Some(path) => VisualizerConfig::load(path)?,
            None => VisualizerConfig::default(),
        };
        if let Some(volume) = self.volume {
            config.playback.initial_volume = volume.clamp(0.0, 1.0);
        }
        Ok(config)
    }

    pub fn initial_tracks(&self) -> Vec<Track> {
        self.tracks.iter().map(|arg| track_from_arg(arg)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["spectrascape"]);
        assert_eq!(args.scene, SceneKind::Aurora);
        assert!(args.tracks.is_empty());
        assert!(args.headless.is_none());
        let config = args.load_config().unwrap();
        assert_eq!(config.playback.initial_volume, 0.7);
    }

    #[test]
    fn test_scene_and_tracks() {
        let args = Args::parse_from([
            "spectrascape",
            "--scene",
            "galaxy",
            "--volume",
            "3",
            "a.mp3",
            "https://host/b.mp3",
        ]);
        assert_eq!(args.scene, SceneKind::Galaxy);
        assert_eq!(args.load_config().unwrap().playback.initial_volume, 1.0);

        let tracks = args.initial_tracks();
        assert_eq!(tracks.len(), 2);
        assert!(matches!(tracks[0], Track::LocalFile { .. }));
        assert!(matches!(tracks[1], Track::Remote { .. }));
    }

    #[test]
    fn test_config_file_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viz.toml");
        std::fs::write(&path, "[playback]\ninitial_volume = 0.2\n[analyzer]\nfft_size = 512\n").unwrap();
        let args = Args::parse_from([
            "spectrascape",
            "--config",
            path.to_str().unwrap(),
            "--volume",
            "0.5",
        ]);
        let config = args.load_config().unwrap();
        assert_eq!(config.analyzer.fft_size, 512);
        assert_eq!(config.playback.initial_volume, 0.5);
    }
}
