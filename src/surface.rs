use std::collections::HashMap;

use crate::color::{Rgb, ThemeSample};

/// Named parts of the window that the theme can restyle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Container,
    Player,
    ProgressTrack,
    ProgressFill,
    Heading,
    Paragraph,
    ControlButtons,
    Modal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Background,
    Border,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyGradient {
    pub start: Rgb,
    pub end: Rgb,
    /// Position in `[0, 1]` along the diagonal where `end` is reached.
    pub end_stop: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardStyle {
    pub background: Rgb,
    pub border: Rgb,
}

/// Every style mutation the theme performs goes through this trait.
pub trait RenderSurface {
    fn set_color(&mut self, surface: Surface, property: Property, color: Rgb);
    fn set_body_gradient(&mut self, gradient: BodyGradient);
    fn set_card(&mut self, index: usize, style: CardStyle);
}

/// Resolved colours the shell paints from each frame.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: HashMap<(Surface, Property), Rgb>,
    body: BodyGradient,
    cards: Vec<CardStyle>,
}

impl Palette {
    pub fn new(card_count: usize) -> Self {
        let neutral = ThemeSample::UNRESOLVED;
        Self {
            colors: HashMap::new(),
            body: BodyGradient {
                start: Rgb::WHITE,
                end: Rgb::WHITE,
                end_stop: 1.0,
            },
            cards: vec![
                CardStyle {
                    background: neutral.average,
                    border: neutral.dark,
                };
                card_count
            ],
        }
    }

    pub fn color(&self, surface: Surface, property: Property) -> Rgb {
        self.colors
            .get(&(surface, property))
            .copied()
            .unwrap_or(match property {
                Property::Background => Rgb::WHITE,
                Property::Border | Property::Text => ThemeSample::UNRESOLVED.dark,
            })
    }

    pub fn body_gradient(&self) -> BodyGradient {
        self.body
    }

    pub fn card(&self, index: usize) -> CardStyle {
        self.cards.get(index).copied().unwrap_or(CardStyle {
            background: ThemeSample::UNRESOLVED.average,
            border: ThemeSample::UNRESOLVED.dark,
        })
    }
}

impl RenderSurface for Palette {
    fn set_color(&mut self, surface: Surface, property: Property, color: Rgb) {
        self.colors.insert((surface, property), color);
    }

    fn set_body_gradient(&mut self, gradient: BodyGradient) {
        self.body = gradient;
    }

    fn set_card(&mut self, index: usize, style: CardStyle) {
        if let Some(card) = self.cards.get_mut(index) {
            *card = style;
        }
    }
}
