use eframe::egui::Color32;
use image::RgbaImage;

/// Substituted whenever a cover cannot be sampled.
pub const FALLBACK_GRAY: Rgb = Rgb::new(200, 200, 200);

/// Lightness factor used to derive the accent from the average colour.
pub const DARK_FACTOR: f64 = -0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for Color32 {
    fn from(value: Rgb) -> Self {
        Color32::from_rgb(value.r, value.g, value.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

pub fn rgb_to_hsl(color: Rgb) -> Hsl {
    let r = color.r as f64 / 255.0;
    let g = color.g as f64 / 255.0;
    let b = color.b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Hsl { h: h / 6.0, s, l }
}

/// Returns unrounded channels in `[0, 255]`.
pub fn hsl_to_rgb(hsl: Hsl) -> [f64; 3] {
    let Hsl { h, s, l } = hsl;
    if s == 0.0 {
        return [l * 255.0; 3];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_channel(p, q, h + 1.0 / 3.0) * 255.0,
        hue_to_channel(p, q, h) * 255.0,
        hue_to_channel(p, q, h - 1.0 / 3.0) * 255.0,
    ]
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Scales lightness by `1 + factor`. Positive factors tint towards white,
/// negative ones shade towards black.
pub fn shift_lightness(color: Rgb, factor: f64) -> Rgb {
    let factor = factor.clamp(-1.0, 1.0);
    let mut hsl = rgb_to_hsl(color);
    hsl.l = (hsl.l + factor * hsl.l).clamp(0.0, 1.0);
    let [r, g, b] = hsl_to_rgb(hsl);
    Rgb::new(to_channel(r), to_channel(g), to_channel(b))
}

fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Mean of each channel over every pixel, floored. Alpha is ignored.
pub fn average_color(image: &RgbaImage) -> Option<Rgb> {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return None;
    }

    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        sums[0] += pixel[0] as u64;
        sums[1] += pixel[1] as u64;
        sums[2] += pixel[2] as u64;
    }

    Some(Rgb::new(
        (sums[0] / total) as u8,
        (sums[1] / total) as u8,
        (sums[2] / total) as u8,
    ))
}

/// Average/dark pair derived from one cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeSample {
    pub average: Rgb,
    pub dark: Rgb,
}

impl ThemeSample {
    /// Used for a track whose cover has not been sampled yet.
    pub const UNRESOLVED: ThemeSample = ThemeSample {
        average: FALLBACK_GRAY,
        dark: Rgb::new(70, 70, 70),
    };

    pub fn from_average(average: Rgb) -> Self {
        Self {
            average,
            dark: shift_lightness(average, DARK_FACTOR),
        }
    }

    pub fn fallback() -> Self {
        Self::from_average(FALLBACK_GRAY)
    }
}
