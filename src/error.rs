//! Error types for the visualizer.
//!
//! Audio and playlist failures are reported to the playback controller as
//! values. The scene layer has no error type: it wraps and clamps instead.

use thiserror::Error;

/// Main error type for spectrascape
#[derive(Error, Debug)]
pub enum VisualizerError {
    /// The source could not be decoded. Not retried.
    #[error("Unsupported source '{source_name}': {reason}")]
    UnsupportedSource { source_name: String, reason: String },

    /// The platform audio context could not be created or started.
    #[error("Audio graph attach failed: {0}")]
    GraphAttach(String),

    /// A playlist manifest or remote track could not be fetched.
    #[error("Fetch of {url} failed: {reason}")]
    NetworkFetch { url: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VisualizerError {
    pub fn unsupported(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnsupportedSource {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::NetworkFetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the controller may detach and try the attach once more
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GraphAttach(_))
    }
}

impl From<toml::de::Error> for VisualizerError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type alias for spectrascape
pub type Result<T> = std::result::Result<T, VisualizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_graph_attach_is_retryable() {
        assert!(VisualizerError::GraphAttach("busy".into()).is_retryable());
        assert!(!VisualizerError::unsupported("a.xyz", "no codec").is_retryable());
        assert!(!VisualizerError::network("http://x", "timeout").is_retryable());
    }

    #[test]
    fn messages_name_the_source() {
        let e = VisualizerError::unsupported("song.xyz", "no decoder");
        assert_eq!(e.to_string(), "Unsupported source 'song.xyz': no decoder");
    }
}
