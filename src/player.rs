use std::{
    path::Path,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
    color::ThemeSample,
    media::{MediaClock, MediaError, MediaEvent},
    playlist::{Playlist, Track},
    progress::{ProgressSampler, Tick, TimeIndicator},
    surface::RenderSurface,
    theme::{apply_card_theme, apply_modal_theme, apply_soft_theme, SampleCache},
    timer::Scheduler,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSettings {
    pub tick: Duration,
    pub advance_delay: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            advance_delay: Duration::from_millis(1000),
        }
    }
}

/// Transport state for the playlist: which track is active, whether it is
/// paused, and how far every track has progressed.
pub struct Player {
    playlist: Playlist,
    settings: PlayerSettings,
    current: usize,
    paused: bool,
    fractions: Vec<f64>,
    sampler: Option<ProgressSampler>,
    scheduler: Scheduler,
    media: Vec<Option<Box<dyn MediaClock>>>,
    pending_play: Vec<bool>,
    samples: SampleCache,
}

impl Player {
    /// Starts on the first track, paused, with the neutral theme applied.
    pub fn new<S: RenderSurface + ?Sized>(
        playlist: Playlist,
        settings: PlayerSettings,
        surface: &mut S,
    ) -> Self {
        let len = playlist.len();
        let mut player = Self {
            playlist,
            settings,
            current: 0,
            paused: true,
            fractions: vec![0.0; len],
            sampler: None,
            scheduler: Scheduler::new(),
            media: (0..len).map(|_| None).collect(),
            pending_play: vec![false; len],
            samples: SampleCache::new(len),
        };
        player.activate(0, false, Instant::now(), surface);
        player
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_track(&self) -> &Track {
        &self.playlist.tracks()[self.current]
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn fraction(&self, index: usize) -> f64 {
        self.fractions.get(index).copied().unwrap_or(0.0)
    }

    pub fn indicator(&self, index: usize) -> TimeIndicator {
        self.playlist.timing(index).indicator(self.fraction(index))
    }

    pub fn sample(&self, index: usize) -> ThemeSample {
        self.samples.get(index)
    }

    pub fn samples_complete(&self) -> bool {
        self.samples.is_complete()
    }

    pub fn active_timers(&self) -> usize {
        self.scheduler.active_timers()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn select<S: RenderSurface + ?Sized>(&mut self, index: usize, now: Instant, surface: &mut S) {
        if index >= self.playlist.len() {
            return;
        }
        self.paused = false;
        self.activate(index, true, now, surface);
    }

    pub fn next<S: RenderSurface + ?Sized>(&mut self, now: Instant, surface: &mut S) {
        let index = self.playlist.next_index(self.current);
        self.select(index, now, surface);
    }

    pub fn prev<S: RenderSurface + ?Sized>(&mut self, now: Instant, surface: &mut S) {
        let index = self.playlist.prev_index(self.current);
        self.select(index, now, surface);
    }

    /// Makes `index` the only active track. Every other track is stopped,
    /// rewound and its progress cleared.
    pub fn activate<S: RenderSurface + ?Sized>(
        &mut self,
        index: usize,
        play: bool,
        now: Instant,
        surface: &mut S,
    ) {
        self.scheduler.cancel_all();
        self.sampler = None;

        for (i, slot) in self.media.iter_mut().enumerate() {
            if i == index {
                continue;
            }
            if let Some(media) = slot.as_mut() {
                media.pause();
                if let Err(err) = media.seek(0.0) {
                    debug!(index = i, "rewind failed: {err}");
                }
            }
        }
        for (i, fraction) in self.fractions.iter_mut().enumerate() {
            if i != index {
                *fraction = 0.0;
                self.pending_play[i] = false;
            }
        }

        self.current = index;
        if play {
            self.start_playback(index, None, now);
        } else {
            self.fractions[index] = 0.0;
            self.pending_play[index] = false;
        }

        apply_soft_theme(&self.samples.get(index), surface);
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        let index = self.current;
        if self.paused {
            self.paused = false;
            let fraction = self.fraction(index);
            self.start_playback(index, Some(fraction), now);
        } else {
            self.scheduler.cancel_all();
            self.sampler = None;
            self.pending_play[index] = false;
            if let Some(media) = self.media[index].as_mut() {
                media.pause();
            }
            self.paused = true;
        }
    }

    fn start_playback(&mut self, index: usize, resume_from: Option<f64>, now: Instant) {
        let timing = self.playlist.timing(index);
        let sampler = ProgressSampler::start(timing, resume_from, self.settings.tick);
        self.fractions[index] = sampler.fraction();
        self.sampler = Some(sampler);
        self.pending_play[index] = true;
        self.flush_pending_play();
        self.scheduler.start_sampler(self.settings.tick, now);
    }

    /// Starts the active track's media once it can play, at the position
    /// the progress bar currently shows.
    fn flush_pending_play(&mut self) {
        let index = self.current;
        if !self.pending_play[index] {
            return;
        }
        let Some(media) = self.media[index].as_mut() else {
            return;
        };
        if !media.is_ready() {
            return;
        }

        self.pending_play[index] = false;
        let target = self.playlist.timing(index).elapsed(self.fractions[index]);
        if let Err(err) = media.seek(target) {
            debug!(index, "seek to {target:.1}s failed: {err}");
        }
        if let Err(err) = media.play() {
            warn!(index, "audio play failed: {err}");
        }
    }

    /// Runs due timers. Call once per frame.
    pub fn tick<S: RenderSurface + ?Sized>(&mut self, now: Instant, surface: &mut S) {
        if self.scheduler.take_due_advance(now) {
            self.next(now, surface);
            return;
        }

        self.flush_pending_play();

        let index = self.current;
        let timing = self.playlist.timing(index);
        for _ in 0..self.scheduler.due_ticks(now) {
            let Some(sampler) = self.sampler.as_mut() else {
                break;
            };
            let clock = self.media[index].as_deref();
            match sampler.tick(timing, clock) {
                Tick::Progress(fraction) => self.fractions[index] = fraction,
                Tick::Finished => {
                    self.finish(index, now);
                    break;
                }
            }
        }

        let ended = self.media[index]
            .as_deref()
            .map(|media| media.has_ended())
            .unwrap_or(false);
        if ended && self.scheduler.sampler_running() {
            debug!(index, "audio ended");
            self.next(now, surface);
        }
    }

    fn finish(&mut self, index: usize, now: Instant) {
        self.fractions[index] = 100.0;
        self.sampler = None;
        self.scheduler.cancel_sampler();
        if let Some(media) = self.media[index].as_mut() {
            media.pause();
        }
        self.scheduler
            .schedule_advance(now + self.settings.advance_delay);
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Loaded { index, media } => self.attach_media(index, media),
            MediaEvent::Failed { index, path, error } => self.media_failed(index, &path, &error),
        }
    }

    pub fn attach_media(&mut self, index: usize, media: Box<dyn MediaClock>) {
        if index >= self.playlist.len() {
            return;
        }

        if let Some(duration) = media.duration() {
            if self.playlist.correct_duration(index, duration) {
                info!(index, duration, "track duration updated from audio metadata");
                if index == self.current && self.sampler.is_some() {
                    let timing = self.playlist.timing(index);
                    self.sampler = Some(ProgressSampler::start(
                        timing,
                        Some(self.fractions[index]),
                        self.settings.tick,
                    ));
                }
            }
        }

        info!("audio {} loaded", index + 1);
        self.media[index] = Some(media);
        self.flush_pending_play();
    }

    fn media_failed(&mut self, index: usize, path: &Path, error: &MediaError) {
        if let Some(pending) = self.pending_play.get_mut(index) {
            *pending = false;
        }
        match error {
            MediaError::Unsupported => {
                debug!(index, "no audio backend, progress is simulated")
            }
            _ => warn!(
                "audio {} failed to load, check that {} exists: {error}",
                index + 1,
                path.display()
            ),
        }
    }

    /// Stores a track's sample and restyles its card. When the last sample
    /// arrives the active theme and the modal theme are applied.
    pub fn resolve_sample<S: RenderSurface + ?Sized>(
        &mut self,
        index: usize,
        sample: ThemeSample,
        surface: &mut S,
    ) {
        if self.samples.is_resolved(index) {
            return;
        }
        let completed = self.samples.insert(index, sample);
        apply_card_theme(index, &sample, surface);

        if completed {
            debug!("all cover samples resolved");
            apply_soft_theme(&self.samples.get(self.current), surface);
            apply_modal_theme(&self.samples.get(0), surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        color::Rgb,
        media::testing::{shared, FakeClock},
        progress::TrackTiming,
        surface::{Palette, Property, Surface},
    };

    fn setup() -> (Player, Palette) {
        let mut palette = Palette::new(5);
        let player = Player::new(Playlist::default(), PlayerSettings::default(), &mut palette);
        (player, palette)
    }

    fn run_for(player: &mut Player, palette: &mut Palette, start: Instant, millis: u64) -> Instant {
        let mut now = start;
        for _ in 0..millis / 100 {
            now += Duration::from_millis(100);
            player.tick(now, palette);
        }
        now
    }

    #[test]
    fn starts_paused_without_timers() {
        let (player, _) = setup();
        assert_eq!(player.current(), 0);
        assert!(player.is_paused());
        assert_eq!(player.active_timers(), 0);
        assert_eq!(player.indicator(0).elapsed, "1:00");
    }

    #[test]
    fn switching_tracks_keeps_one_timer() {
        let (mut player, mut palette) = setup();
        let now = Instant::now();
        player.select(1, now, &mut palette);
        assert_eq!(player.active_timers(), 1);
        player.next(now, &mut palette);
        player.select(4, now, &mut palette);
        player.prev(now, &mut palette);
        assert_eq!(player.active_timers(), 1);
        assert_eq!(player.current(), 3);
        assert!(!player.is_paused());
    }

    #[test]
    fn out_of_range_select_is_ignored() {
        let (mut player, mut palette) = setup();
        player.select(7, Instant::now(), &mut palette);
        assert_eq!(player.current(), 0);
        assert!(player.is_paused());
    }

    #[test]
    fn switching_resets_other_tracks() {
        let (mut player, mut palette) = setup();
        let start = Instant::now();
        player.select(0, start, &mut palette);
        run_for(&mut player, &mut palette, start, 2_000);
        assert!(player.fraction(0) > 0.0);

        player.select(2, start, &mut palette);
        assert_eq!(player.fraction(0), 0.0);
        assert_eq!(player.fraction(2), 0.0);
    }

    #[test]
    fn pause_cancels_and_resume_continues() {
        let (mut player, mut palette) = setup();
        let start = Instant::now();
        player.select(0, start, &mut palette);
        let now = run_for(&mut player, &mut palette, start, 3_000);
        let paused_at = player.fraction(0);

        player.toggle_pause(now);
        assert!(player.is_paused());
        assert_eq!(player.active_timers(), 0);
        let later = run_for(&mut player, &mut palette, now, 5_000);
        assert_eq!(player.fraction(0), paused_at);

        player.toggle_pause(later);
        assert_eq!(player.active_timers(), 1);
        let timing = player.playlist().timing(0);
        assert_eq!(
            player.indicator(0).elapsed,
            timing.indicator(paused_at).elapsed
        );
        run_for(&mut player, &mut palette, later, 1_000);
        assert!(player.fraction(0) > paused_at);
    }

    #[test]
    fn finished_track_advances_after_delay() {
        let tracks = vec![
            Track::new("a", "x", "a.jpg", "a.mp3", TrackTiming::new(11.0, 10.0)),
            Track::new("b", "y", "b.jpg", "b.mp3", TrackTiming::new(20.0, 0.0)),
        ];
        let playlist = Playlist::new(tracks).unwrap();
        let mut palette = Palette::new(2);
        let mut player = Player::new(playlist, PlayerSettings::default(), &mut palette);
        let start = Instant::now();
        player.select(0, start, &mut palette);

        let now = run_for(&mut player, &mut palette, start, 1_000);
        assert_eq!(player.fraction(0), 100.0);
        assert_eq!(player.active_timers(), 0);
        assert_eq!(player.current(), 0);

        run_for(&mut player, &mut palette, now, 1_000);
        assert_eq!(player.current(), 1);
        assert_eq!(player.active_timers(), 1);
        assert_eq!(player.fraction(0), 0.0);
    }

    #[test]
    fn play_waits_for_media_to_become_ready() {
        let (mut player, mut palette) = setup();
        let clock = shared(FakeClock {
            duration: Some(235.0),
            ..FakeClock::default()
        });
        player.attach_media(0, Box::new(clock.clone()));

        let start = Instant::now();
        player.select(0, start, &mut palette);
        assert_eq!(clock.borrow().plays, 0);

        clock.borrow_mut().ready = true;
        player.tick(start + Duration::from_millis(10), &mut palette);
        assert_eq!(clock.borrow().plays, 1);
        assert_eq!(clock.borrow().seeks.last().copied(), Some(60.0));
    }

    #[test]
    fn resume_seeks_media_to_paused_position() {
        let (mut player, mut palette) = setup();
        let clock = shared(FakeClock::ready(235.0));
        player.attach_media(0, Box::new(clock.clone()));
        let start = Instant::now();
        player.select(0, start, &mut palette);
        clock.borrow_mut().position = 147.5;
        let now = run_for(&mut player, &mut palette, start, 100);
        assert_eq!(player.fraction(0), 50.0);

        player.toggle_pause(now);
        assert!(!clock.borrow().playing);
        player.toggle_pause(now);
        assert_eq!(clock.borrow().seeks.last().copied(), Some(147.5));
        assert_eq!(clock.borrow().plays, 2);
    }

    #[test]
    fn switching_pauses_and_rewinds_other_media() {
        let (mut player, mut palette) = setup();
        let first = shared(FakeClock::ready(235.0));
        player.attach_media(0, Box::new(first.clone()));
        let now = Instant::now();
        player.select(0, now, &mut palette);
        player.select(1, now, &mut palette);
        let first = first.borrow();
        assert!(!first.playing);
        assert_eq!(first.position, 0.0);
    }

    #[test]
    fn media_duration_corrects_track() {
        let (mut player, _) = setup();
        player.attach_media(2, Box::new(shared(FakeClock::ready(201.0))));
        assert_eq!(player.playlist().timing(2).duration, 201.0);
    }

    #[test]
    fn ended_media_advances_immediately() {
        let (mut player, mut palette) = setup();
        let clock = shared(FakeClock::ready(235.0));
        player.attach_media(0, Box::new(clock.clone()));
        let now = Instant::now();
        player.select(0, now, &mut palette);
        clock.borrow_mut().ended = true;
        player.tick(now + Duration::from_millis(100), &mut palette);
        assert_eq!(player.current(), 1);
    }

    #[test]
    fn failed_media_keeps_simulated_progress() {
        let (mut player, mut palette) = setup();
        player.handle_media_event(MediaEvent::Failed {
            index: 0,
            path: "songs/song1.mp3".into(),
            error: MediaError::Seek("gone".into()),
        });
        let start = Instant::now();
        player.select(0, start, &mut palette);
        run_for(&mut player, &mut palette, start, 500);
        assert!(player.fraction(0) > 0.0);
    }

    #[test]
    fn theme_is_applied_once_all_samples_resolve() {
        let (mut player, mut palette) = setup();
        let now = Instant::now();
        player.select(1, now, &mut palette);
        let first = ThemeSample::from_average(Rgb::new(30, 60, 120));
        let active = ThemeSample::from_average(Rgb::new(200, 40, 40));

        player.resolve_sample(1, active, &mut palette);
        assert_eq!(palette.card(1).background, active.average);
        assert_eq!(
            palette.color(Surface::ProgressFill, Property::Background),
            ThemeSample::UNRESOLVED.dark
        );

        player.resolve_sample(0, first, &mut palette);
        for index in 2..5 {
            player.resolve_sample(index, ThemeSample::fallback(), &mut palette);
        }
        assert!(player.samples_complete());
        assert_eq!(
            palette.color(Surface::ProgressFill, Property::Background),
            active.dark
        );
        assert_eq!(palette.color(Surface::Modal, Property::Text), first.dark);

        player.select(0, now, &mut palette);
        assert_eq!(
            palette.color(Surface::ProgressTrack, Property::Background),
            first.average
        );
    }
}
