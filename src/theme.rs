//! Propagates a track's theme sample across the window.

use crate::{
    color::{shift_lightness, Rgb, ThemeSample},
    surface::{BodyGradient, CardStyle, Property, RenderSurface, Surface},
};

const BODY_TINT: f64 = 0.3;
const CONTAINER_TINT: f64 = 0.6;
const PLAYER_TINT: f64 = 0.45;
const MODAL_TINT: f64 = 0.6;
const BODY_GRADIENT_STOP: f32 = 0.8;

/// Restyles the page around the active track's cover.
pub fn apply_soft_theme<S: RenderSurface + ?Sized>(sample: &ThemeSample, surface: &mut S) {
    let ThemeSample { average, dark } = *sample;

    surface.set_body_gradient(BodyGradient {
        start: shift_lightness(average, BODY_TINT),
        end: Rgb::WHITE,
        end_stop: BODY_GRADIENT_STOP,
    });

    surface.set_color(Surface::Container, Property::Border, dark);
    surface.set_color(Surface::Container, Property::Text, dark);
    surface.set_color(
        Surface::Container,
        Property::Background,
        shift_lightness(average, CONTAINER_TINT),
    );

    surface.set_color(Surface::Player, Property::Border, dark);
    surface.set_color(Surface::Player, Property::Text, dark);
    surface.set_color(
        Surface::Player,
        Property::Background,
        shift_lightness(average, PLAYER_TINT),
    );

    surface.set_color(Surface::ProgressTrack, Property::Background, average);
    surface.set_color(Surface::ProgressFill, Property::Background, dark);

    surface.set_color(Surface::Heading, Property::Text, dark);
    surface.set_color(Surface::Paragraph, Property::Text, dark);
    surface.set_color(Surface::ControlButtons, Property::Text, dark);
}

/// The modal always follows the first card.
pub fn apply_modal_theme<S: RenderSurface + ?Sized>(sample: &ThemeSample, surface: &mut S) {
    surface.set_color(
        Surface::Modal,
        Property::Background,
        shift_lightness(sample.average, MODAL_TINT),
    );
    surface.set_color(Surface::Modal, Property::Border, sample.dark);
    surface.set_color(Surface::Modal, Property::Text, sample.dark);
}

pub fn apply_card_theme<S: RenderSurface + ?Sized>(
    index: usize,
    sample: &ThemeSample,
    surface: &mut S,
) {
    surface.set_card(
        index,
        CardStyle {
            background: sample.average,
            border: sample.dark,
        },
    );
}

/// Per-track samples. Once stored a sample is never replaced.
#[derive(Debug, Clone)]
pub struct SampleCache {
    samples: Vec<Option<ThemeSample>>,
}

impl SampleCache {
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![None; len],
        }
    }

    /// Returns `true` when this insert resolved the last missing sample.
    pub fn insert(&mut self, index: usize, sample: ThemeSample) -> bool {
        let Some(slot) = self.samples.get_mut(index) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(sample);
        self.is_complete()
    }

    pub fn get(&self, index: usize) -> ThemeSample {
        self.samples
            .get(index)
            .copied()
            .flatten()
            .unwrap_or(ThemeSample::UNRESOLVED)
    }

    pub fn is_resolved(&self, index: usize) -> bool {
        matches!(self.samples.get(index), Some(Some(_)))
    }

    pub fn is_complete(&self) -> bool {
        self.samples.iter().all(Option::is_some)
    }
}
