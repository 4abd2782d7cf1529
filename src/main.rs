mod color;
mod config;
mod covers;
mod media;
mod player;
mod playlist;
mod progress;
mod surface;
mod theme;
mod timer;
mod ui_skin;

use crate::{
    config::{Config, UiConfig},
    covers::CoverLoader,
    media::MediaLoader,
    player::Player,
    surface::{Palette, Property, Surface},
    ui_skin::{cover_card, paint_body_gradient, palette_color, progress_bar, themed_frame, transport_button},
};
use eframe::egui::{
    self, Color32, LayerId, RichText, TextureHandle, TextureOptions, Vec2, ViewportBuilder,
};
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CARD_SIZE: f32 = 116.0;
const IDLE_REPAINT: Duration = Duration::from_millis(250);
const LOADING_REPAINT: Duration = Duration::from_millis(50);
const FAVORITE_COLOR: Color32 = Color32::from_rgb(214, 64, 96);

#[derive(Clone, Copy)]
enum TransportAction {
    Previous,
    TogglePause,
    Next,
}

struct App {
    player: Player,
    palette: Palette,
    covers: CoverLoader,
    cover_textures: Vec<Option<TextureHandle>>,
    media: MediaLoader,
    ui: UiConfig,
    favorite: bool,
    show_welcome: bool,
}

impl App {
    fn new(config: Config) -> Self {
        let Config {
            player: settings,
            ui,
            playlist,
        } = config;

        let mut palette = Palette::new(playlist.len());
        let covers = CoverLoader::spawn(playlist.tracks().iter().map(|track| track.cover.clone()));
        let media = MediaLoader::start(
            playlist
                .tracks()
                .iter()
                .map(|track| track.audio.clone())
                .collect(),
        );
        let cover_textures = vec![None; playlist.len()];
        info!(tracks = playlist.len(), "playlist ready");
        let player = Player::new(playlist, settings, &mut palette);

        Self {
            player,
            palette,
            covers,
            cover_textures,
            media,
            show_welcome: ui.show_welcome,
            ui,
            favorite: false,
        }
    }

    fn poll_background(&mut self, ctx: &egui::Context) {
        for cover in self.covers.poll() {
            if let Some(image) = cover.image {
                let texture = ctx.load_texture(
                    format!("cover-{}", cover.index),
                    image,
                    TextureOptions::LINEAR,
                );
                if let Some(slot) = self.cover_textures.get_mut(cover.index) {
                    *slot = Some(texture);
                }
            }
            self.player
                .resolve_sample(cover.index, cover.sample, &mut self.palette);
        }

        for event in self.media.poll() {
            self.player.handle_media_event(event);
        }
    }

    fn repaint_interval(&self, now: Instant) -> Duration {
        if !self.covers.is_finished() || !self.media.is_finished() {
            return LOADING_REPAINT;
        }
        match self.player.next_deadline() {
            Some(at) => at.saturating_duration_since(now).min(IDLE_REPAINT),
            None => IDLE_REPAINT,
        }
    }

    fn apply_transport(&mut self, action: TransportAction, now: Instant) {
        match action {
            TransportAction::Previous => self.player.prev(now, &mut self.palette),
            TransportAction::Next => self.player.next(now, &mut self.palette),
            TransportAction::TogglePause => self.player.toggle_pause(now),
        }
    }

    fn shortcut(&self, ctx: &egui::Context) -> Option<TransportAction> {
        if self.show_welcome {
            return None;
        }
        ctx.input(|input| {
            if input.key_pressed(egui::Key::Space) {
                Some(TransportAction::TogglePause)
            } else if input.key_pressed(egui::Key::ArrowLeft) {
                Some(TransportAction::Previous)
            } else if input.key_pressed(egui::Key::ArrowRight) {
                Some(TransportAction::Next)
            } else {
                None
            }
        })
    }

    fn render_header(&self, ui: &mut egui::Ui) {
        ui.label(
            RichText::new(&self.ui.heading)
                .size(28.0)
                .strong()
                .color(palette_color(&self.palette, Surface::Heading, Property::Text)),
        );
        ui.label(
            RichText::new(&self.ui.paragraph)
                .size(15.0)
                .color(palette_color(&self.palette, Surface::Paragraph, Property::Text)),
        );
    }

    fn render_cards(&self, ui: &mut egui::Ui) -> Option<usize> {
        let current = self.player.current();
        let mut selected = None;

        egui::ScrollArea::horizontal().show(ui, |ui| {
            ui.horizontal(|row| {
                row.spacing_mut().item_spacing.x = 14.0;
                for (index, track) in self.player.playlist().tracks().iter().enumerate() {
                    let response = cover_card(
                        row,
                        self.cover_textures.get(index).and_then(Option::as_ref),
                        self.palette.card(index),
                        &track.title,
                        index == current,
                        Vec2::splat(CARD_SIZE),
                    )
                    .on_hover_text(format!("{} by {}", track.title, track.artist));
                    if response.clicked() && index != current {
                        selected = Some(index);
                    }
                }
            });
        });

        selected
    }

    fn render_player(&mut self, ui: &mut egui::Ui) -> Option<TransportAction> {
        let index = self.player.current();
        let track = self.player.current_track();
        let text = palette_color(&self.palette, Surface::Player, Property::Text);
        let controls = palette_color(&self.palette, Surface::ControlButtons, Property::Text);
        let indicator = self.player.indicator(index);
        let fraction = self.player.fraction(index);
        let paused = self.player.is_paused();
        let mut action = None;
        let mut favorite = self.favorite;

        themed_frame(&self.palette, Surface::Player).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(&track.title).size(20.0).strong().color(text));
            ui.label(RichText::new(&track.artist).size(14.0).color(text));
            ui.add_space(8.0);

            progress_bar(
                ui,
                fraction,
                palette_color(&self.palette, Surface::ProgressTrack, Property::Background),
                palette_color(&self.palette, Surface::ProgressFill, Property::Background),
            );
            ui.horizontal(|row| {
                row.label(RichText::new(&indicator.elapsed).size(12.0).color(text));
                row.with_layout(egui::Layout::right_to_left(egui::Align::Center), |right| {
                    right.label(RichText::new(&indicator.remaining).size(12.0).color(text));
                });
            });

            ui.horizontal(|row| {
                if transport_button(row, "⏮", controls, "Previous track").clicked() {
                    action = Some(TransportAction::Previous);
                }
                let (glyph, hint) = if paused { ("▶", "Play") } else { ("⏸", "Pause") };
                if transport_button(row, glyph, controls, hint).clicked() {
                    action = Some(TransportAction::TogglePause);
                }
                if transport_button(row, "⏭", controls, "Next track").clicked() {
                    action = Some(TransportAction::Next);
                }
                row.with_layout(egui::Layout::right_to_left(egui::Align::Center), |right| {
                    let color = if favorite { FAVORITE_COLOR } else { controls };
                    if transport_button(right, "♥", color, "Favorite").clicked() {
                        favorite = !favorite;
                    }
                });
            });
        });

        self.favorite = favorite;
        action
    }

    fn render_welcome(&mut self, ctx: &egui::Context) {
        let text = palette_color(&self.palette, Surface::Modal, Property::Text);
        let mut dismissed = false;

        let response = egui::Modal::new(egui::Id::new("welcome"))
            .frame(themed_frame(&self.palette, Surface::Modal))
            .show(ctx, |ui| {
                ui.set_max_width(360.0);
                ui.label(RichText::new("Welcome").size(22.0).strong().color(text));
                ui.label(
                    RichText::new(
                        "Pick a cover to play it. The page takes its colours from the artwork.",
                    )
                    .color(text),
                );
                ui.add_space(8.0);
                if ui
                    .button(RichText::new("Start listening").color(text))
                    .clicked()
                {
                    dismissed = true;
                }
            });

        if dismissed || response.should_close() {
            self.show_welcome = false;
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.poll_background(ctx);
        self.player.tick(now, &mut self.palette);
        ui_skin::apply_style(ctx, &self.palette);

        let root_painter = ctx.layer_painter(LayerId::background());
        paint_body_gradient(&root_painter, ctx.screen_rect(), &self.palette.body_gradient());

        let mut selected = None;
        let mut action = self.shortcut(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::new().inner_margin(egui::Margin::same(24)))
            .show(ctx, |ui| {
                themed_frame(&self.palette, Surface::Container).show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    self.render_header(ui);
                    ui.add_space(12.0);
                    selected = self.render_cards(ui);
                    ui.add_space(16.0);
                    if let Some(clicked) = self.render_player(ui) {
                        action = Some(clicked);
                    }
                });
            });

        if self.show_welcome {
            self.render_welcome(ctx);
        }

        if let Some(index) = selected {
            self.player.select(index, now, &mut self.palette);
        } else if let Some(action) = action {
            self.apply_transport(action, now);
        }

        ctx.request_repaint_after(self.repaint_interval(now));
    }
}

fn configure_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    configure_logging();

    let config = Config::load().unwrap_or_else(|err| {
        error!("{err:#}; using built-in defaults");
        Config::default()
    });

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([780.0, 560.0])
            .with_min_inner_size([520.0, 420.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Cover Deck",
        native_options,
        Box::new(
            move |_cc| -> std::result::Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > { Ok(Box::new(App::new(config))) },
        ),
    )
    .map_err(|e| anyhow::anyhow!("eframe exited with an error: {e}"))
}
