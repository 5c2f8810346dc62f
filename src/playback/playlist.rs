//! Ordered track list with a cursor, shuffle and repeat.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::track::{parse_manifest, Track};
use crate::error::Result;

pub struct Playlist {
    tracks: Vec<Track>,
    cursor: Option<usize>,
    shuffle: bool,
    repeat: bool,
    rng: StdRng,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self::with_seed(tracks, 0x5EED)
    }

    /// Shuffle order is reproducible for a given seed
    pub fn with_seed(tracks: Vec<Track>, seed: u64) -> Self {
        Self {
            cursor: if tracks.is_empty() { None } else { Some(0) },
            tracks,
            shuffle: false,
            repeat: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_manifest_json(text: &str, base_url: Option<&str>) -> Result<Self> {
        Ok(Self::new(parse_manifest(text, base_url)?))
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn is_repeat(&self) -> bool {
        self.repeat
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    /// Index `next` would move to, without moving
    pub fn peek_next(&mut self) -> Option<usize> {
        let current = self.cursor?;
        let len = self.tracks.len();
        if self.shuffle && len > 1 {
            // any other track
            let offset = self.rng.gen_range(1..len);
            return Some((current + offset) % len);
        }
        if current + 1 < len {
            Some(current + 1)
        } else if self.repeat {
            Some(0)
        } else {
            None
        }
    }

    /// Index `prev` would move to, without moving
    pub fn peek_prev(&self) -> Option<usize> {
        let current = self.cursor?;
        if current > 0 {
            Some(current - 1)
        } else if self.repeat {
            Some(self.tracks.len() - 1)
        } else {
            None
        }
    }

    /// Move the cursor; out-of-range indices leave it unchanged
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        if index >= self.tracks.len() {
            return None;
        }
        self.cursor = Some(index);
        self.tracks.get(index)
    }

    pub fn next(&mut self) -> Option<&Track> {
        let index = self.peek_next()?;
        self.select(index)
    }

    pub fn prev(&mut self) -> Option<&Track> {
        let index = self.peek_prev()?;
        self.select(index)
    }

    pub fn push(&mut self, track: Track) {
        self.tracks.push(track);
        if self.cursor.is_none() {
            self.cursor = Some(0);
        }
    }

    /// Swap in a whole new track list, cursor at the first entry
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.cursor = if tracks.is_empty() { None } else { Some(0) };
        self.tracks = tracks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> Playlist {
        Playlist::new(vec![
            Track::remote("a", "http://x/a.mp3"),
            Track::remote("b", "http://x/b.mp3"),
            Track::remote("c", "http://x/c.mp3"),
        ])
    }

    #[test]
    fn test_empty_playlist_has_no_current() {
        let mut list = Playlist::new(Vec::new());
        assert!(list.current().is_none());
        assert!(list.next().is_none());
        assert!(list.prev().is_none());
    }

    #[test]
    fn test_next_stops_at_end_without_repeat() {
        let mut list = three();
        assert_eq!(list.next().unwrap().name(), "b");
        assert_eq!(list.next().unwrap().name(), "c");
        assert!(list.next().is_none());
        assert_eq!(list.cursor(), Some(2));
    }

    #[test]
    fn test_repeat_wraps_both_ways() {
        let mut list = three();
        list.toggle_repeat();
        assert_eq!(list.prev().unwrap().name(), "c");
        assert_eq!(list.next().unwrap().name(), "a");
    }

    #[test]
    fn test_shuffle_never_repeats_current() {
        let mut list = three();
        list.toggle_shuffle();
        for _ in 0..50 {
            let before = list.cursor().unwrap();
            list.next();
            assert_ne!(list.cursor().unwrap(), before);
        }
    }

    #[test]
    fn test_shuffle_is_reproducible() {
        let run = || {
            let mut list = three();
            list.toggle_shuffle();
            (0..10).map(|_| { list.next(); list.cursor().unwrap() }).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_select_out_of_range_is_ignored() {
        let mut list = three();
        assert!(list.select(7).is_none());
        assert_eq!(list.cursor(), Some(0));
        assert_eq!(list.select(2).unwrap().name(), "c");
    }

    #[test]
    fn test_from_manifest() {
        let list = Playlist::from_manifest_json(r#"[{"name":"x","url":"http://h/x.mp3"}]"#, None).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.current().unwrap().name(), "x");
    }
}
