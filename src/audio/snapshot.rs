//! Frequency snapshot shared between the audio side and the scenes.

/// Identifies the stream a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Snapshots produced by the synthetic generator
    pub const SYNTHETIC: SessionId = SessionId(0);
}

/// One frame of per-bin magnitudes (0 = silence, 255 = clipping)
///
/// The producer owns a single instance and overwrites it in place every tick;
/// the length never changes within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySnapshot {
    session: SessionId,
    bins: Vec<u8>,
}

impl FrequencySnapshot {
    pub fn new(session: SessionId, len: usize) -> Self {
        Self {
            session,
            bins: vec![0; len],
        }
    }

    /// Wrap existing magnitudes (mostly for tests and tools)
    pub fn from_bins(session: SessionId, bins: Vec<u8>) -> Self {
        Self { session, bins }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub(crate) fn bins_mut(&mut self) -> &mut [u8] {
        &mut self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Zero every bin and retag (length may change only here)
    pub(crate) fn reset(&mut self, session: SessionId, len: usize) {
        self.session = session;
        self.bins.clear();
        self.bins.resize(len, 0);
    }

    /// Normalized magnitude of bin `index mod len`; 0.0 for an empty snapshot
    pub fn level_wrapped(&self, index: usize) -> f32 {
        if self.bins.is_empty() {
            return 0.0;
        }
        self.bins[index % self.bins.len()] as f32 / 255.0
    }

    /// Normalized magnitude at `floor(fraction * (len - 1))`, wrapped
    pub fn level_at_fraction(&self, fraction: f32) -> f32 {
        if self.bins.is_empty() {
            return 0.0;
        }
        let last = (self.bins.len() - 1) as f32;
        let index = (fraction.max(0.0) * last).floor() as usize;
        self.level_wrapped(index)
    }

    /// Mean normalized level across all bins
    pub fn average_level(&self) -> f32 {
        if self.bins.is_empty() {
            return 0.0;
        }
        self.bins.iter().map(|&b| b as f32).sum::<f32>() / (self.bins.len() as f32 * 255.0)
    }
}
