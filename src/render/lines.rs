use super::canvas::Canvas;
use super::resources::ResourceProvider;
use super::text::TextAlign;
use super::ui::{UiContext, draw_ui_element};
use crate::chart::{AttachUi, Chart, JudgeLine};
use crate::config::Settings;
use crate::geometry::{Rect, Vec2};
use crate::timeline::LineState;

/// Canvas pixel position of a world point (origin at the centre, y up).
pub fn to_screen(canvas: &Canvas, world: Vec2) -> Vec2 {
    let (width, height) = canvas.size();
    Vec2::new(width / 2.0 + world.x, height / 2.0 - world.y)
}

/// Line indices in draw order: ascending z-order, chart order among equals.
pub fn draw_order(lines: &[JudgeLine]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..lines.len()).collect();
    order.sort_by_key(|&i| (lines[i].z_order, i));
    order
}

/// Moves the canvas into the line's local frame: origin on the line, x along it.
pub fn enter_line_frame(canvas: &mut Canvas, state: &LineState) {
    let screen = to_screen(canvas, state.position());
    canvas.translate(screen.x, screen.y);
    canvas.rotate_degrees(state.angle);
}

fn line_color(state: &LineState, settings: &Settings) -> [f64; 4] {
    match state.color {
        Some(color) => {
            let [r, g, b] = color.to_unit();
            [r as f64, g as f64, b as f64, 1.0]
        }
        None => settings.skin.line_rgba,
    }
}

pub fn draw_lines(
    canvas: &mut Canvas,
    chart: &Chart,
    states: &[LineState],
    resources: &dyn ResourceProvider,
    settings: &Settings,
    ui: &UiContext,
) {
    for index in draw_order(chart.lines()) {
        let (Some(line), Some(state)) = (chart.lines().get(index), states.get(index)) else {
            continue;
        };
        canvas.save();
        enter_line_frame(canvas, state);
        if state.alpha > 0.0 {
            canvas.save();
            canvas.scale(state.scale_x, state.scale_y);
            canvas.set_alpha(state.opacity());
            draw_line_body(canvas, line, state, resources, settings, ui);
            canvas.restore();
        }
        if settings.display.show_line_numbers {
            let size = settings.display.text_size * 0.5;
            canvas.translate(0.0, -size);
            canvas.draw_text(&index.to_string(), size, TextAlign::Center, [1.0; 4]);
        }
        canvas.restore();
    }
}

fn draw_line_body(
    canvas: &mut Canvas,
    line: &JudgeLine,
    state: &LineState,
    resources: &dyn ResourceProvider,
    settings: &Settings,
    ui: &UiContext,
) {
    let color = line_color(state, settings);
    if let Some(text) = &state.text {
        canvas.draw_text(text, settings.display.text_size, TextAlign::Center, color);
        return;
    }
    if line.attach_ui != AttachUi::None {
        let ui_color = match state.color {
            Some(_) => color,
            None => [1.0; 4],
        };
        draw_ui_element(canvas, line.attach_ui, ui, settings, ui_color);
        return;
    }
    if let Some(texture) = line.texture.as_deref().and_then(|name| resources.line_texture(name)) {
        let (w, h) = resources.texture_size(texture);
        let (w, h) = (w as f64, h as f64);
        let [ax, ay] = line.anchor;
        let tint = match state.color {
            Some(_) => color,
            None => [1.0; 4],
        };
        canvas.draw_image(texture, Rect::new(-ax * w, -ay * h, (1.0 - ax) * w, (1.0 - ay) * h), tint);
        return;
    }
    let length = settings.display.line_length;
    let thickness = settings.display.line_thickness;
    canvas.fill_rect(Rect::centered(Vec2::new(0.0, 0.0), length, thickness), color);
}
