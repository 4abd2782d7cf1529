use eframe::egui::{
    self,
    epaint::{Mesh, Vertex},
    Color32, CornerRadius, FontId, Pos2, Rect, Rgba, RichText, Sense, Stroke, StrokeKind,
    TextureHandle, Vec2,
};

use crate::surface::{BodyGradient, CardStyle, Palette, Property, Surface};

const GRADIENT_GRID: usize = 24;
const CARD_RADIUS: f32 = 14.0;
const PROGRESS_HEIGHT: f32 = 6.0;

pub fn to_corner_radius(value: f32) -> CornerRadius {
    CornerRadius::same(value.clamp(0.0, u8::MAX as f32).round() as u8)
}

pub fn palette_color(palette: &Palette, surface: Surface, property: Property) -> Color32 {
    palette.color(surface, property).into()
}

/// Base widget visuals for the current palette.
pub fn apply_style(ctx: &egui::Context, palette: &Palette) {
    let mut style = (*ctx.style()).clone();
    let text = palette_color(palette, Surface::Container, Property::Text);
    let border = palette_color(palette, Surface::Player, Property::Border);
    let player_bg = palette_color(palette, Surface::Player, Property::Background);

    style.visuals = egui::Visuals::light();
    style.visuals.override_text_color = Some(text);
    style.visuals.window_fill = palette_color(palette, Surface::Modal, Property::Background);
    style.visuals.window_stroke = Stroke::new(
        2.0,
        palette_color(palette, Surface::Modal, Property::Border),
    );
    style.visuals.panel_fill = Color32::TRANSPARENT;

    for widget in [
        &mut style.visuals.widgets.inactive,
        &mut style.visuals.widgets.hovered,
        &mut style.visuals.widgets.active,
    ] {
        widget.bg_fill = Color32::TRANSPARENT;
        widget.weak_bg_fill = Color32::TRANSPARENT;
        widget.corner_radius = to_corner_radius(10.0);
    }
    style.visuals.widgets.hovered.weak_bg_fill = player_bg.gamma_multiply(0.6);
    style.visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, border);
    style.visuals.widgets.active.weak_bg_fill = player_bg;
    style.visuals.selection.bg_fill = border;

    style.spacing.item_spacing = Vec2::new(10.0, 8.0);
    style.spacing.button_padding = Vec2::new(14.0, 8.0);

    ctx.set_style(style);
}

/// Paints a 135° gradient from `start` at the top-left corner to `end` at
/// `end_stop` along the diagonal.
pub fn paint_body_gradient(painter: &egui::Painter, rect: Rect, gradient: &BodyGradient) {
    let start = Color32::from(gradient.start);
    let end = Color32::from(gradient.end);
    if start == end || rect.width() <= f32::EPSILON || rect.height() <= f32::EPSILON {
        painter.rect_filled(rect, CornerRadius::ZERO, start);
        return;
    }

    let span = rect.width() + rect.height();
    let stop = gradient.end_stop.clamp(f32::EPSILON, 1.0);
    let color_at = |pos: Pos2| {
        let t = ((pos.x - rect.min.x) + (pos.y - rect.min.y)) / span;
        lerp_color(start, end, t / stop)
    };

    let mut mesh = Mesh::default();
    let columns = GRADIENT_GRID + 1;
    for row in 0..=GRADIENT_GRID {
        for col in 0..=GRADIENT_GRID {
            let pos = Pos2::new(
                rect.min.x + rect.width() * col as f32 / GRADIENT_GRID as f32,
                rect.min.y + rect.height() * row as f32 / GRADIENT_GRID as f32,
            );
            push_vertex(&mut mesh, pos, color_at(pos));
        }
    }
    for row in 0..GRADIENT_GRID {
        for col in 0..GRADIENT_GRID {
            let v0 = (row * columns + col) as u32;
            let v1 = v0 + 1;
            let v2 = v0 + columns as u32;
            let v3 = v2 + 1;
            mesh.add_triangle(v0, v2, v1);
            mesh.add_triangle(v1, v2, v3);
        }
    }

    painter.add(egui::Shape::mesh(mesh));
}

fn lerp_color(start: Color32, end: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let a = Rgba::from(start);
    let b = Rgba::from(end);
    Color32::from(a * (1.0 - t) + b * t)
}

fn push_vertex(mesh: &mut Mesh, pos: Pos2, color: Color32) -> u32 {
    let idx = mesh.vertices.len() as u32;
    mesh.vertices.push(Vertex {
        pos,
        uv: Pos2::new(0.0, 0.0),
        color,
    });
    idx
}

/// Rounded track with a fill proportional to `fraction` (0–100).
pub fn progress_bar(ui: &mut egui::Ui, fraction: f64, track: Color32, fill: Color32) -> egui::Response {
    let width = ui.available_width().max(1.0);
    let (rect, response) =
        ui.allocate_exact_size(Vec2::new(width, PROGRESS_HEIGHT), Sense::hover());
    let painter = ui.painter_at(rect);
    let rounding = to_corner_radius(PROGRESS_HEIGHT / 2.0);
    painter.rect_filled(rect, rounding, track);

    let t = (fraction / 100.0).clamp(0.0, 1.0) as f32;
    if t > 0.0 {
        let fill_rect = Rect::from_min_max(
            rect.min,
            Pos2::new(rect.min.x + rect.width() * t, rect.max.y),
        );
        painter.rect_filled(fill_rect, rounding, fill);
    }
    response
}

/// Clickable cover card. Falls back to the card colour when the cover
/// failed to load.
pub fn cover_card(
    ui: &mut egui::Ui,
    texture: Option<&TextureHandle>,
    style: CardStyle,
    label: &str,
    active: bool,
    size: Vec2,
) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(size, Sense::click());
    if response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }

    let painter = ui.painter_at(rect.expand(4.0));
    let rounding = to_corner_radius(CARD_RADIUS);
    let background = Color32::from(style.background);
    let border = Color32::from(style.border);
    painter.rect_filled(rect, rounding, background);

    match texture {
        Some(texture) => {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(texture.id(), rect.shrink(2.0), uv, Color32::WHITE);
        }
        None => {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                label,
                FontId::proportional(14.0),
                border,
            );
        }
    }

    let stroke_width = if active { 4.0 } else { 2.0 };
    painter.rect_stroke(
        rect,
        rounding,
        Stroke::new(stroke_width, border),
        StrokeKind::Outside,
    );
    if !active {
        painter.rect_filled(rect, rounding, Color32::from_white_alpha(40));
    }

    response
}

pub fn transport_button(
    ui: &mut egui::Ui,
    glyph: &str,
    color: Color32,
    hint: &str,
) -> egui::Response {
    ui.add(egui::Button::new(RichText::new(glyph).size(22.0).color(color)).frame(false))
        .on_hover_text(hint)
}

pub fn themed_frame(palette: &Palette, surface: Surface) -> egui::Frame {
    egui::Frame::new()
        .fill(palette_color(palette, surface, Property::Background))
        .stroke(Stroke::new(
            2.0,
            palette_color(palette, surface, Property::Border),
        ))
        .corner_radius(to_corner_radius(18.0))
        .inner_margin(egui::Margin::same(18))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_endpoints() {
        let a = Color32::from_rgb(10, 20, 30);
        let b = Color32::WHITE;
        assert_eq!(lerp_color(a, b, 0.0), a);
        assert_eq!(lerp_color(a, b, 1.0), b);
        assert_eq!(lerp_color(a, b, 7.0), b);
    }

    #[test]
    fn corner_radius_is_clamped() {
        assert_eq!(to_corner_radius(-4.0), CornerRadius::same(0));
        assert_eq!(to_corner_radius(1000.0), CornerRadius::same(255));
    }
}
