//! Playlist entries and the JSON manifest format.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, VisualizerError};

/// One playlist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Track {
    /// A file the user picked locally
    LocalFile { path: PathBuf },

    /// A named remote audio URL, fetched on demand
    Remote { name: String, url: String },

    /// A video hosted elsewhere; its audio cannot be analyzed, so the
    /// synthetic spectrum stands in
    ExternalVideo {
        name: String,
        external_id: String,
        thumbnail: Option<String>,
    },
}

impl Track {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::LocalFile { path: path.into() }
    }

    pub fn remote(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Remote {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::LocalFile { path } => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Remote { name, .. } | Self::ExternalVideo { name, .. } => name.clone(),
        }
    }

    /// Whether the analyzer can attach to this track
    pub fn is_analyzable(&self) -> bool {
        !matches!(self, Self::ExternalVideo { .. })
    }
}

/// Manifest entry as it appears on the wire
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestEntry {
    External {
        name: String,
        #[serde(rename = "externalId", alias = "youtubeId")]
        external_id: String,
        #[serde(default)]
        thumbnail: Option<String>,
    },
    Remote {
        name: String,
        url: String,
    },
    Local {
        path: PathBuf,
    },
}

/// Parse a JSON manifest (`[{ "name": ..., "url": ... }, ...]`)
///
/// Relative URLs are resolved against `base_url` when one is given. Any
/// malformed entry rejects the whole manifest.
pub fn parse_manifest(text: &str, base_url: Option<&str>) -> Result<Vec<Track>> {
    let entries: Vec<ManifestEntry> = serde_json::from_str(text)
        .map_err(|e| VisualizerError::network(base_url.unwrap_or("manifest"), format!("invalid manifest: {}", e)))?;

    let base = base_url.and_then(|b| reqwest::Url::parse(b).ok());
    entries
        .into_iter()
        .map(|entry| match entry {
            ManifestEntry::External {
                name,
                external_id,
                thumbnail,
            } => Ok(Track::ExternalVideo {
                name,
                external_id,
                thumbnail,
            }),
            ManifestEntry::Remote { name, url } => Ok(Track::Remote {
                name,
                url: resolve_url(base.as_ref(), &url)?,
            }),
            ManifestEntry::Local { path } => Ok(Track::LocalFile { path }),
        })
        .collect()
}

fn resolve_url(base: Option<&reqwest::Url>, url: &str) -> Result<String> {
    if reqwest::Url::parse(url).is_ok() {
        return Ok(url.to_string());
    }
    match base {
        Some(base) => base
            .join(url)
            .map(|u| u.to_string())
            .map_err(|e| VisualizerError::network(url, format!("bad track url: {}", e))),
        // no base: keep as-is, the fetcher will report it
        None => Ok(url.to_string()),
    }
}

/// Build tracks from command line arguments: URLs become remote tracks,
/// everything else a local file
pub fn track_from_arg(arg: &str) -> Track {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        let name = Path::new(arg)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| arg.to_string());
        Track::remote(name, arg)
    } else {
        Track::local(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_entries_with_base() {
        let text = r#"[
            {"name": "Night Drive", "url": "/demo-songs/Night Drive.mp3"},
            {"name": "Absolute", "url": "https://cdn.example.com/a.mp3"}
        ]"#;
        let tracks = parse_manifest(text, Some("http://localhost:5173/demo-songs/demo-playlist.json")).unwrap();
        assert_eq!(
            tracks[0],
            Track::remote("Night Drive", "http://localhost:5173/demo-songs/Night%20Drive.mp3")
        );
        assert_eq!(tracks[1], Track::remote("Absolute", "https://cdn.example.com/a.mp3"));
    }

    #[test]
    fn test_parse_external_video_entry() {
        let text = r#"[{"name": "Live set", "externalId": "abc123", "kind": "external-video", "thumbnail": "https://img/x.jpg"}]"#;
        let tracks = parse_manifest(text, None).unwrap();
        assert_eq!(
            tracks[0],
            Track::ExternalVideo {
                name: "Live set".into(),
                external_id: "abc123".into(),
                thumbnail: Some("https://img/x.jpg".into()),
            }
        );
        assert!(!tracks[0].is_analyzable());
    }

    #[test]
    fn test_malformed_manifest_rejected_whole() {
        let text = r#"[{"name": "ok", "url": "a.mp3"}, {"title": "broken"}]"#;
        let err = parse_manifest(text, None).unwrap_err();
        assert!(matches!(err, VisualizerError::NetworkFetch { .. }));
    }

    #[test]
    fn test_track_names() {
        assert_eq!(Track::local("/music/Song One.mp3").name(), "Song One");
        assert_eq!(Track::remote("R", "http://x/y.mp3").name(), "R");
    }

    #[test]
    fn test_track_from_arg() {
        assert_eq!(track_from_arg("song.wav"), Track::local("song.wav"));
        assert_eq!(
            track_from_arg("https://example.com/music/beat.mp3"),
            Track::remote("beat", "https://example.com/music/beat.mp3")
        );
    }
}
