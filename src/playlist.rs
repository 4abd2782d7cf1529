use std::path::PathBuf;

use crate::progress::TrackTiming;

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub cover: PathBuf,
    pub audio: PathBuf,
    pub timing: TrackTiming,
    duration_corrected: bool,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        cover: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        timing: TrackTiming,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            cover: cover.into(),
            audio: audio.into(),
            timing,
            duration_corrected: false,
        }
    }
}

/// Fixed, ordered list of tracks. Its length never changes after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    tracks: Vec<Track>,
}

const DEFAULT_TRACKS: [(&str, &str, f64, f64); 5] = [
    ("Season", "Marlow Reed", 235.0, 60.0),
    ("Lanterns", "June Harbor", 260.0, 80.0),
    ("Paper Boats", "The Quiet Field", 190.0, 40.0),
    ("Low Tide", "Ada Vale", 300.0, 120.0),
    ("Northern Lights", "Northwind", 285.0, 100.0),
];

impl Default for Playlist {
    fn default() -> Self {
        let tracks = DEFAULT_TRACKS
            .iter()
            .enumerate()
            .map(|(i, &(title, artist, duration, start))| {
                Track::new(
                    title,
                    artist,
                    format!("covers/song{}.jpg", i + 1),
                    format!("songs/song{}.mp3", i + 1),
                    TrackTiming::new(duration, start),
                )
            })
            .collect();
        Self { tracks }
    }
}

impl Playlist {
    /// Returns `None` for an empty track list.
    pub fn new(tracks: Vec<Track>) -> Option<Self> {
        if tracks.is_empty() {
            None
        } else {
            Some(Self { tracks })
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn timing(&self, index: usize) -> TrackTiming {
        self.tracks
            .get(index)
            .map(|track| track.timing)
            .unwrap_or(TrackTiming::new(0.0, 0.0))
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.len()
    }

    pub fn prev_index(&self, index: usize) -> usize {
        (index + self.len() - 1) % self.len()
    }

    /// Replaces the configured duration with the decoder's value. Only the
    /// first valid report is taken.
    pub fn correct_duration(&mut self, index: usize, seconds: f64) -> bool {
        let Some(track) = self.tracks.get_mut(index) else {
            return false;
        };
        if track.duration_corrected || !seconds.is_finite() || seconds <= 0.0 {
            return false;
        }
        track.timing.duration = seconds;
        track.duration_corrected = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_playlist_has_five_tracks() {
        let playlist = Playlist::default();
        assert_eq!(playlist.len(), 5);
        assert_eq!(playlist.timing(3), TrackTiming::new(300.0, 120.0));
        assert_eq!(playlist.tracks()[4].audio, PathBuf::from("songs/song5.mp3"));
    }

    #[test]
    fn indices_wrap_both_ways() {
        let playlist = Playlist::default();
        assert_eq!(playlist.next_index(4), 0);
        assert_eq!(playlist.prev_index(0), 4);
        assert_eq!(playlist.next_index(1), 2);
    }

    #[test]
    fn duration_is_corrected_once() {
        let mut playlist = Playlist::default();
        assert!(!playlist.correct_duration(0, f64::NAN));
        assert!(playlist.correct_duration(0, 241.5));
        assert!(!playlist.correct_duration(0, 100.0));
        assert_eq!(playlist.timing(0).duration, 241.5);
        assert!(!playlist.correct_duration(9, 10.0));
    }

    #[test]
    fn empty_playlist_is_rejected() {
        assert!(Playlist::new(Vec::new()).is_none());
    }
}
