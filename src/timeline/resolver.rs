use bitflags::bitflags;

use crate::chart::Chart;
use crate::chart::event::Color;
use crate::geometry::Vec2;

use super::curve::evaluate;

bitflags! {
    /// Fields a caller wants from [`resolve`]; anything not requested is left at its default.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResolveFields: u16 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const ANGLE = 1 << 2;
        const ALPHA = 1 << 3;
        const SPEED = 1 << 4;
        const SCALE_X = 1 << 5;
        const SCALE_Y = 1 << 6;
        const COLOR = 1 << 7;
        const PAINT = 1 << 8;
        const TEXT = 1 << 9;

        const POSITION = Self::X.bits() | Self::Y.bits();
        const POSE = Self::POSITION.bits() | Self::ANGLE.bits();
    }
}

/// Resolved state of one judge line. Position is in canvas units with the origin at the centre
/// and y pointing up; angle is in degrees, clockwise on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct LineState {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub alpha: f64,
    pub speed: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub color: Option<Color>,
    pub paint: f64,
    pub text: Option<String>,
}

impl Default for LineState {
    fn default() -> Self {
        LineState {
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            alpha: 0.0,
            speed: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            color: None,
            paint: 0.0,
            text: None,
        }
    }
}

impl LineState {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Alpha events are authored on a 0..255 scale.
    pub fn opacity(&self) -> f64 {
        (self.alpha / 255.0).clamp(0.0, 1.0)
    }
}

/// A father link that closed a cycle and was cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleHealed {
    pub line: usize,
    pub former_father: i32,
}

impl std::fmt::Display for CycleHealed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "judge line {} closed a father cycle through line {}; father reset to -1",
            self.line, self.former_father
        )
    }
}

/// Resolves `line` at `beat`, following father links.
///
/// A father link that points back into the chain being resolved is removed from the chart for
/// good and reported through `healed`; the line then resolves as a root.
pub fn resolve(
    chart: &mut Chart,
    line: usize,
    beat: f64,
    fields: ResolveFields,
    healed: &mut Vec<CycleHealed>,
) -> LineState {
    let mut visited = Vec::new();
    resolve_inner(chart, line, beat, fields, &mut visited, healed)
}

/// Resolves every line with the same field set.
pub fn resolve_all(
    chart: &mut Chart,
    beat: f64,
    fields: ResolveFields,
    healed: &mut Vec<CycleHealed>,
) -> Vec<LineState> {
    (0..chart.lines().len())
        .map(|line| resolve(chart, line, beat, fields, healed))
        .collect()
}

fn resolve_inner(
    chart: &mut Chart,
    index: usize,
    beat: f64,
    fields: ResolveFields,
    visited: &mut Vec<usize>,
    healed: &mut Vec<CycleHealed>,
) -> LineState {
    let mut state = LineState::default();
    let Some(line) = chart.lines().get(index) else {
        return state;
    };

    let needs_position = fields.intersects(ResolveFields::POSITION);
    let (mut x, mut y, mut angle, mut alpha, mut speed) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for layer in &line.layers {
        if needs_position {
            x += evaluate(&layer.move_x, beat).unwrap_or(0.0);
            y += evaluate(&layer.move_y, beat).unwrap_or(0.0);
        }
        if fields.contains(ResolveFields::ANGLE) {
            angle += evaluate(&layer.rotate, beat).unwrap_or(0.0);
        }
        if fields.contains(ResolveFields::ALPHA) {
            alpha += evaluate(&layer.alpha, beat).unwrap_or(0.0);
        }
        if fields.contains(ResolveFields::SPEED) {
            speed += evaluate(&layer.speed, beat).unwrap_or(0.0);
        }
    }

    let extended = &line.extended;
    if fields.contains(ResolveFields::SCALE_X) {
        state.scale_x = evaluate(&extended.scale_x, beat).unwrap_or(1.0);
    }
    if fields.contains(ResolveFields::SCALE_Y) {
        state.scale_y = evaluate(&extended.scale_y, beat).unwrap_or(1.0);
    }
    if fields.contains(ResolveFields::COLOR) {
        state.color = evaluate(&extended.color, beat);
    }
    if fields.contains(ResolveFields::PAINT) {
        state.paint = evaluate(&extended.paint, beat).unwrap_or(0.0);
    }
    if fields.contains(ResolveFields::TEXT) {
        state.text = evaluate(&extended.text, beat);
    }

    let father = line.father;
    let line_count = chart.lines().len();
    let inherits = fields.intersects(ResolveFields::POSE);
    if inherits && father >= 0 && (father as usize) < line_count {
        let father_index = father as usize;
        visited.push(index);
        if visited.contains(&father_index) {
            let warning = CycleHealed {
                line: index,
                former_father: father,
            };
            log::warn!("{warning}");
            // index is in range, checked above
            let _ = chart.set_father(index, -1);
            healed.push(warning);
        } else {
            let mut parent_fields = ResolveFields::ANGLE;
            if needs_position {
                parent_fields |= ResolveFields::POSITION;
            }
            let parent = resolve_inner(chart, father_index, beat, parent_fields, visited, healed);
            if needs_position {
                let world = parent.position() + Vec2::new(x, y).rotate(-parent.angle.to_radians());
                x = world.x;
                y = world.y;
            }
            angle += parent.angle;
        }
        visited.pop();
    }

    if fields.contains(ResolveFields::X) {
        state.x = x;
    }
    if fields.contains(ResolveFields::Y) {
        state.y = y;
    }
    if fields.contains(ResolveFields::ANGLE) {
        state.angle = angle;
    }
    state.alpha = alpha;
    state.speed = speed;
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::beat::Beat;
    use crate::chart::easing::Easing;
    use crate::chart::event::Event;
    use crate::chart::judge_line::JudgeLine;
    use crate::chart::tests::chart_of;
    use proptest::prelude::*;

    fn moving_line(from: (f64, f64), to: (f64, f64)) -> JudgeLine {
        let mut line = JudgeLine::default();
        line.layers[0].move_x = vec![Event::new(
            Beat::whole(0),
            Beat::whole(1),
            from.0,
            to.0,
            Easing::Linear,
        )];
        line.layers[0].move_y = vec![Event::new(
            Beat::whole(0),
            Beat::whole(1),
            from.1,
            to.1,
            Easing::Linear,
        )];
        line
    }

    fn child_of(father: i32, local: (f64, f64)) -> JudgeLine {
        let mut line = moving_line(local, local);
        line.father = father;
        line
    }

    #[test]
    fn child_follows_parent_at_midpoint() {
        let mut chart = chart_of(vec![moving_line((0.0, 0.0), (100.0, 0.0)), child_of(0, (0.0, 0.0))]);
        let mut healed = Vec::new();
        let state = resolve(&mut chart, 1, 0.5, ResolveFields::all(), &mut healed);
        assert!((state.x - 50.0).abs() < 1e-9);
        assert!(state.y.abs() < 1e-9);
        assert!(healed.is_empty());
    }

    #[test]
    fn rotated_parent_turns_child_offset() {
        let mut parent = moving_line((10.0, 20.0), (10.0, 20.0));
        parent.layers[0].rotate = vec![Event::constant(Beat::whole(0), Beat::whole(1), 90.0)];
        let mut chart = chart_of(vec![parent, child_of(0, (5.0, 0.0))]);
        let state = resolve(&mut chart, 1, 0.0, ResolveFields::POSE, &mut Vec::new());
        // clockwise quarter turn sends +x to -y
        assert!((state.x - 10.0).abs() < 1e-9);
        assert!((state.y - 15.0).abs() < 1e-9);
        assert_eq!(state.angle, 90.0);
    }

    #[test]
    fn layers_are_summed() {
        let mut line = moving_line((1.0, 2.0), (1.0, 2.0));
        line.layers.push(Default::default());
        line.layers[1].move_x = vec![Event::constant(Beat::whole(0), Beat::whole(1), 10.0)];
        line.layers[1].alpha = vec![Event::constant(Beat::whole(0), Beat::whole(1), 128.0)];
        let mut chart = chart_of(vec![line]);
        let state = resolve(&mut chart, 0, 0.5, ResolveFields::all(), &mut Vec::new());
        assert_eq!(state.x, 11.0);
        assert_eq!(state.alpha, 128.0);
    }

    #[test]
    fn extended_fields_only_when_requested() {
        let mut line = JudgeLine::default();
        line.extended.scale_x = vec![Event::constant(Beat::whole(0), Beat::whole(1), 3.0)];
        line.extended.paint = vec![Event::constant(Beat::whole(0), Beat::whole(1), 0.75)];
        line.extended.text = vec![Event::constant(
            Beat::whole(0),
            Beat::whole(1),
            "hello".to_string(),
        )];
        let mut chart = chart_of(vec![line]);
        let bare = resolve(&mut chart, 0, 0.5, ResolveFields::X, &mut Vec::new());
        assert_eq!(bare.scale_x, 1.0);
        assert_eq!(bare.text, None);
        assert_eq!(bare.paint, 0.0);
        let full = resolve(&mut chart, 0, 0.5, ResolveFields::all(), &mut Vec::new());
        assert_eq!(full.scale_x, 3.0);
        assert_eq!(full.paint, 0.75);
        assert_eq!(full.text.as_deref(), Some("hello"));
    }

    #[test]
    fn self_parent_is_healed() {
        let mut chart = chart_of(vec![child_of(0, (1.0, 1.0))]);
        let mut healed = Vec::new();
        let state = resolve(&mut chart, 0, 0.0, ResolveFields::all(), &mut healed);
        assert_eq!(state.x, 1.0);
        assert_eq!(chart.lines()[0].father, -1);
        assert_eq!(
            healed,
            vec![CycleHealed {
                line: 0,
                former_father: 0
            }]
        );
    }

    fn father_chain_terminates(chart: &Chart) -> bool {
        let count = chart.lines().len();
        (0..count).all(|start| {
            let mut current = start as i32;
            for _ in 0..=count {
                let father = chart.lines()[current as usize].father;
                if father < 0 || father as usize >= count {
                    return true;
                }
                current = father;
            }
            false
        })
    }

    proptest! {
        #[test]
        fn cycles_are_broken(len in 2usize..6, start in 0usize..6) {
            let lines = (0..len)
                .map(|i| child_of(((i + 1) % len) as i32, (i as f64, 0.0)))
                .collect();
            let mut chart = chart_of(lines);
            let mut healed = Vec::new();
            resolve(&mut chart, start % len, 0.0, ResolveFields::all(), &mut healed);
            prop_assert_eq!(healed.len(), 1);
            prop_assert!(father_chain_terminates(&chart));
        }

        #[test]
        fn fewer_fields_do_not_change_requested_ones(
            bits in 0u16..(1 << 10),
            beat in 0.0..1.0f64,
            angle in -360.0..360.0f64,
        ) {
            let mut root = moving_line((0.0, -50.0), (200.0, 80.0));
            root.layers[0].rotate = vec![Event::new(Beat::whole(0), Beat::whole(1), 0.0, angle, Easing::OutSine)];
            root.layers[0].alpha = vec![Event::constant(Beat::whole(0), Beat::whole(1), 200.0)];
            let middle = child_of(0, (30.0, 10.0));
            let mut leaf = child_of(1, (-5.0, 40.0));
            leaf.extended.scale_y = vec![Event::constant(Beat::whole(0), Beat::whole(1), 2.0)];
            let mut chart = chart_of(vec![root, middle, leaf]);

            let fields = ResolveFields::from_bits_truncate(bits);
            let full = resolve(&mut chart, 2, beat, ResolveFields::all(), &mut Vec::new());
            let part = resolve(&mut chart, 2, beat, fields, &mut Vec::new());
            if fields.contains(ResolveFields::X) { prop_assert_eq!(part.x, full.x); }
            if fields.contains(ResolveFields::Y) { prop_assert_eq!(part.y, full.y); }
            if fields.contains(ResolveFields::ANGLE) { prop_assert_eq!(part.angle, full.angle); }
            if fields.contains(ResolveFields::ALPHA) { prop_assert_eq!(part.alpha, full.alpha); }
            if fields.contains(ResolveFields::SCALE_Y) { prop_assert_eq!(part.scale_y, full.scale_y); }
        }
    }
}
