use anyhow::Context;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

use crate::{
    player::PlayerSettings,
    playlist::{Playlist, Track},
    progress::TrackTiming,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub player: PlayerSettings,
    pub ui: UiConfig,
    pub playlist: Playlist,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: PlayerSettings::default(),
            ui: UiConfig::default(),
            playlist: Playlist::default(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.extend(candidate_paths(&current_dir));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.extend(candidate_paths(dir));
            }
        }

        for path in candidates {
            if path.exists() {
                info!("loading config from {}", path.display());
                return Self::load_from(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let doc: ConfigDocument = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(doc.resolve(base))
    }
}

fn candidate_paths(dir: &Path) -> [PathBuf; 3] {
    [
        dir.join("config.toml"),
        dir.join("config").join("config.toml"),
        dir.join("config").join("coverdeck.toml"),
    ]
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub heading: String,
    pub paragraph: String,
    pub show_welcome: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            heading: "Now Playing".to_string(),
            paragraph: "Pick a cover to start listening.".to_string(),
            show_welcome: true,
        }
    }
}

const TICK_MS_RANGE: (u64, u64) = (16, 1000);
const ADVANCE_DELAY_MAX_MS: u64 = 10_000;

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    player: PlayerSection,
    #[serde(default)]
    ui: UiSection,
    #[serde(default)]
    tracks: Vec<TrackSection>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerSection {
    tick_ms: Option<u64>,
    advance_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct UiSection {
    heading: Option<String>,
    paragraph: Option<String>,
    show_welcome: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TrackSection {
    title: String,
    #[serde(default)]
    artist: String,
    cover: PathBuf,
    audio: PathBuf,
    duration: f64,
    #[serde(default)]
    start: f64,
}

impl ConfigDocument {
    fn resolve(self, base: &Path) -> Config {
        let defaults = Config::default();

        let tick_ms = self
            .player
            .tick_ms
            .unwrap_or(defaults.player.tick.as_millis() as u64)
            .clamp(TICK_MS_RANGE.0, TICK_MS_RANGE.1);
        let advance_delay_ms = self
            .player
            .advance_delay_ms
            .unwrap_or(defaults.player.advance_delay.as_millis() as u64)
            .min(ADVANCE_DELAY_MAX_MS);

        let ui = UiConfig {
            heading: self.ui.heading.unwrap_or(defaults.ui.heading),
            paragraph: self.ui.paragraph.unwrap_or(defaults.ui.paragraph),
            show_welcome: self.ui.show_welcome.unwrap_or(defaults.ui.show_welcome),
        };

        let tracks = self
            .tracks
            .into_iter()
            .filter_map(|section| section.resolve(base))
            .collect();
        let playlist = Playlist::new(tracks).unwrap_or(defaults.playlist);

        Config {
            player: PlayerSettings {
                tick: Duration::from_millis(tick_ms),
                advance_delay: Duration::from_millis(advance_delay_ms),
            },
            ui,
            playlist,
        }
    }
}

impl TrackSection {
    fn resolve(self, base: &Path) -> Option<Track> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            warn!("skipping track {:?}: duration must be positive", self.title);
            return None;
        }
        let start = if self.start.is_finite() {
            self.start.clamp(0.0, self.duration)
        } else {
            0.0
        };

        Some(Track::new(
            self.title,
            self.artist,
            base.join(self.cover),
            base.join(self.audio),
            TrackTiming::new(self.duration, start),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let (_dir, path) = write_config("");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.player, PlayerSettings::default());
        assert_eq!(config.playlist, Playlist::default());
        assert!(config.ui.show_welcome);
    }

    #[test]
    fn tracks_resolve_relative_to_config() {
        let (dir, path) = write_config(
            r#"
            [player]
            tick_ms = 5
            advance_delay_ms = 250

            [ui]
            heading = "Evening mix"
            show_welcome = false

            [[tracks]]
            title = "One"
            cover = "art/one.png"
            audio = "audio/one.ogg"
            duration = 120.0
            start = 500.0

            [[tracks]]
            title = "Broken"
            cover = "art/two.png"
            audio = "audio/two.ogg"
            duration = -3.0
            "#,
        );
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.player.tick, Duration::from_millis(16));
        assert_eq!(config.player.advance_delay, Duration::from_millis(250));
        assert_eq!(config.ui.heading, "Evening mix");
        assert!(!config.ui.show_welcome);

        assert_eq!(config.playlist.len(), 1);
        let track = &config.playlist.tracks()[0];
        assert_eq!(track.cover, dir.path().join("art/one.png"));
        assert_eq!(track.timing, TrackTiming::new(120.0, 120.0));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let (_dir, path) = write_config("[player\ntick_ms = ");
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }
}
