use std::collections::HashSet;

use super::canvas::Canvas;
use super::text::TextAlign;
use crate::chart::{AttachUi, Chart};
use crate::config::Settings;
use crate::geometry::Rect;
use crate::judge::JudgementStats;

/// Combo readouts stay hidden below this streak.
pub const MIN_VISIBLE_COMBO: usize = 3;

const BAR_HEIGHT: f64 = 6.0;

/// Values the UI elements display for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct UiContext {
    pub combo: usize,
    pub score_text: String,
    pub name: String,
    pub level: String,
    /// Playback progress in `[0, 1]`.
    pub progress: f64,
}

impl UiContext {
    pub fn new(chart: &Chart, now: f64) -> Self {
        let stats = JudgementStats::collect(chart);
        let duration = chart.duration_seconds();
        let progress = if duration > 0.0 {
            (now / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        UiContext {
            combo: stats.combo,
            score_text: stats.score_text(),
            name: chart.meta().name.clone(),
            level: chart.meta().level.clone(),
            progress,
        }
    }
}

/// Draws one UI element centred on the canvas origin. Returns whether anything was drawn.
pub fn draw_ui_element(
    canvas: &mut Canvas,
    kind: AttachUi,
    ui: &UiContext,
    settings: &Settings,
    color: [f64; 4],
) -> bool {
    let size = settings.display.text_size;
    match kind {
        AttachUi::None => return false,
        AttachUi::ComboNumber => {
            if ui.combo < MIN_VISIBLE_COMBO {
                return false;
            }
            canvas.draw_text(&ui.combo.to_string(), size * 1.6, TextAlign::Center, color);
        }
        AttachUi::Combo => {
            if ui.combo < MIN_VISIBLE_COMBO {
                return false;
            }
            canvas.draw_text("COMBO", size * 0.6, TextAlign::Center, color);
        }
        AttachUi::Score => canvas.draw_text(&ui.score_text, size, TextAlign::Center, color),
        AttachUi::Name => canvas.draw_text(&ui.name, size * 0.75, TextAlign::Center, color),
        AttachUi::Level => canvas.draw_text(&ui.level, size * 0.75, TextAlign::Center, color),
        AttachUi::Pause => {
            let h = size * 0.9;
            let w = h * 0.25;
            canvas.fill_rect(Rect::new(-w * 1.5, -h / 2.0, -w * 0.5, h / 2.0), color);
            canvas.fill_rect(Rect::new(w * 0.5, -h / 2.0, w * 1.5, h / 2.0), color);
        }
        AttachUi::Bar => {
            let (width, _) = canvas.size();
            let left = -width / 2.0;
            let filled = width * ui.progress.clamp(0.0, 1.0);
            let half = BAR_HEIGHT / 2.0;
            canvas.fill_rect(Rect::new(left, -half, left + filled, half), color);
        }
    }
    true
}

struct FreeAnchor {
    x: f64,
    y: f64,
    align: TextAlign,
}

/// Default screen placement of UI elements no judge line carries.
fn free_anchor(kind: AttachUi, width: f64, height: f64) -> FreeAnchor {
    let (x, y, align) = match kind {
        AttachUi::ComboNumber => (width / 2.0, 40.0, TextAlign::Center),
        AttachUi::Combo => (width / 2.0, 80.0, TextAlign::Center),
        AttachUi::Score => (width - 30.0, 45.0, TextAlign::Right),
        AttachUi::Pause => (40.0, 45.0, TextAlign::Center),
        AttachUi::Name => (30.0, height - 40.0, TextAlign::Left),
        AttachUi::Level => (width - 30.0, height - 40.0, TextAlign::Right),
        AttachUi::Bar => (width / 2.0, BAR_HEIGHT / 2.0, TextAlign::Center),
        AttachUi::None => (width / 2.0, height / 2.0, TextAlign::Center),
    };
    FreeAnchor { x, y, align }
}

/// Elements no judge line is attached to, in draw order.
pub fn free_elements(chart: &Chart) -> Vec<AttachUi> {
    let attached: HashSet<AttachUi> = chart.lines().iter().map(|l| l.attach_ui).collect();
    AttachUi::FREE_FLOATING
        .into_iter()
        .filter(|kind| !attached.contains(kind))
        .collect()
}

/// Draws every unattached element at its default anchor, white and fully opaque.
pub fn draw_free_ui(canvas: &mut Canvas, chart: &Chart, ui: &UiContext, settings: &Settings) {
    let (width, height) = canvas.size();
    let size = settings.display.text_size;
    for kind in free_elements(chart) {
        let anchor = free_anchor(kind, width, height);
        canvas.save();
        canvas.translate(anchor.x, anchor.y);
        match (kind, anchor.align) {
            // side-anchored text keeps its edge on the anchor
            (AttachUi::Score, align) => {
                canvas.draw_text(&ui.score_text, size, align, [1.0; 4]);
            }
            (AttachUi::Name, align) => {
                canvas.draw_text(&ui.name, size * 0.75, align, [1.0; 4]);
            }
            (AttachUi::Level, align) => {
                canvas.draw_text(&ui.level, size * 0.75, align, [1.0; 4]);
            }
            _ => {
                draw_ui_element(canvas, kind, ui, settings, [1.0; 4]);
            }
        }
        canvas.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::JudgeLine;
    use crate::chart::tests::chart_of;
    use crate::render::canvas::DrawCmd;

    fn ui(combo: usize) -> UiContext {
        UiContext {
            combo,
            score_text: "0123456".to_string(),
            name: "Song".to_string(),
            level: "IN Lv.12".to_string(),
            progress: 0.5,
        }
    }

    #[test]
    fn attached_elements_are_not_free() {
        let chart = chart_of(vec![
            JudgeLine {
                attach_ui: AttachUi::Score,
                ..JudgeLine::default()
            },
            JudgeLine::default(),
        ]);
        let free = free_elements(&chart);
        assert_eq!(free.len(), 6);
        assert!(!free.contains(&AttachUi::Score));
    }

    #[test]
    fn combo_hides_below_three() {
        let settings = Settings::default();
        let mut canvas = Canvas::new(100.0, 100.0);
        assert!(!draw_ui_element(&mut canvas, AttachUi::ComboNumber, &ui(2), &settings, [1.0; 4]));
        assert!(draw_ui_element(&mut canvas, AttachUi::ComboNumber, &ui(3), &settings, [1.0; 4]));
        let list = canvas.finish();
        assert!(matches!(&list.commands[0], DrawCmd::Text { text, .. } if text == "3"));
    }

    #[test]
    fn free_ui_is_white_and_opaque() {
        let settings = Settings::default();
        let chart = chart_of(vec![JudgeLine::default()]);
        let mut canvas = Canvas::new(1350.0, 900.0);
        draw_free_ui(&mut canvas, &chart, &ui(10), &settings);
        let list = canvas.finish();
        assert!(!list.is_empty());
        for cmd in &list.commands {
            let color = match cmd {
                DrawCmd::Text { color, .. } | DrawCmd::Fill { color, .. } => *color,
                DrawCmd::Image { tint, .. } => *tint,
            };
            assert_eq!(color, [1.0; 4]);
        }
    }

    #[test]
    fn progress_bar_fills_from_the_left() {
        let settings = Settings::default();
        let mut canvas = Canvas::new(200.0, 100.0);
        draw_ui_element(&mut canvas, AttachUi::Bar, &ui(0), &settings, [1.0; 4]);
        let list = canvas.finish();
        let DrawCmd::Fill { rect, .. } = &list.commands[0] else {
            panic!("bar should be a fill");
        };
        assert_eq!((rect.x0, rect.x1), (-100.0, 0.0));
    }
}
