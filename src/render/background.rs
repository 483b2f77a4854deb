use super::canvas::Canvas;
use super::resources::ResourceProvider;
use crate::config::Settings;
use crate::geometry::Rect;

/// Scales an `iw`x`ih` image to fill a `cw`x`ch` canvas keeping its aspect ratio and crops the
/// overflowing axis around the centre. Returns the destination rect and the source uv rect.
pub fn cover_fit(iw: f64, ih: f64, cw: f64, ch: f64) -> (Rect, Rect) {
    let dest = Rect::new(0.0, 0.0, cw, ch);
    if iw <= 0.0 || ih <= 0.0 {
        return (dest, Rect::UNIT);
    }
    let image_aspect = iw / ih;
    let canvas_aspect = cw / ch;
    let uv = if image_aspect > canvas_aspect {
        let visible = canvas_aspect / image_aspect;
        let margin = (1.0 - visible) / 2.0;
        Rect::new(margin, 0.0, 1.0 - margin, 1.0)
    } else {
        let visible = image_aspect / canvas_aspect;
        let margin = (1.0 - visible) / 2.0;
        Rect::new(0.0, margin, 1.0, 1.0 - margin)
    };
    (dest, uv)
}

pub fn draw_background(canvas: &mut Canvas, resources: &dyn ResourceProvider, settings: &Settings) {
    let (cw, ch) = canvas.size();
    let full = Rect::new(0.0, 0.0, cw, ch);
    let Some(texture) = resources.background() else {
        canvas.fill_rect(full, [0.0, 0.0, 0.0, 1.0]);
        return;
    };
    let (iw, ih) = resources.texture_size(texture);
    let (dest, uv) = cover_fit(iw as f64, ih as f64, cw, ch);
    canvas.draw_image_uv(texture, dest, uv, [1.0; 4]);
    let dim = settings.display.background_dim.clamp(0.0, 1.0);
    if dim > 0.0 {
        canvas.fill_rect(full, [0.0, 0.0, 0.0, dim]);
    }
}
