use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::canvas::Canvas;
use super::lines::{draw_order, enter_line_frame};
use super::resources::{NoteSprite, ResourceProvider, TextureId};
use crate::chart::{Chart, Easing, JudgeLine, Judgement, Note, NoteKind};
use crate::config::Settings;
use crate::geometry::{Rect, Vec2};
use crate::judge::MISS_WINDOW;
use crate::timeline::{FloorTrack, LineState};

/// Repeat interval of hit effects along a held hold, in seconds.
pub const HOLD_FX_INTERVAL: f64 = 0.25;

const PARTICLES: usize = 4;
const PARTICLE_SIZE: f64 = 22.0;
const PARTICLE_DISTANCE: std::ops::Range<f64> = 185.0..265.0;
/// Texture space the particle distances are authored in.
const FX_REFERENCE_SIZE: f64 = 256.0;

/// Draw passes; notes are grouped by kind rather than drawn in chart order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteLayer {
    Hold,
    Drag,
    Tap,
    Flick,
    HitFx,
}

impl NoteLayer {
    pub const NOTE_PASSES: [NoteLayer; 4] =
        [NoteLayer::Hold, NoteLayer::Drag, NoteLayer::Tap, NoteLayer::Flick];
}

pub fn note_layer(kind: NoteKind) -> NoteLayer {
    match kind {
        NoteKind::Hold => NoteLayer::Hold,
        NoteKind::Drag => NoteLayer::Drag,
        NoteKind::Tap => NoteLayer::Tap,
        NoteKind::Flick => NoteLayer::Flick,
    }
}

/// Distance of a note's head and tail from its line, in floor units scaled by the note speed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteLayout {
    pub start_y: f64,
    pub end_y: f64,
}

pub fn note_layout(note: &Note, floor: &FloorTrack, now: f64) -> NoteLayout {
    let here = floor.at(now);
    let start_y = if note.is_being_held(now) {
        0.0
    } else {
        (floor.at(note.start_seconds) - here) * note.speed
    };
    let end_y = if note.is_hold() {
        (floor.at(note.end_seconds) - here) * note.speed
    } else {
        start_y
    };
    NoteLayout { start_y, end_y }
}

/// Whether the note's body is drawn this frame.
pub fn is_note_visible(
    note: &Note,
    line: &JudgeLine,
    state: &LineState,
    layout: &NoteLayout,
    now: f64,
) -> bool {
    if note.start_seconds - now > note.visible_time {
        return false;
    }
    if state.alpha < 0.0 {
        return false;
    }
    if note.fake {
        return now <= note.end_seconds && !(line.is_cover && layout.start_y < 0.0);
    }
    match note.judgement {
        Judgement::None => {
            if now - note.end_seconds > MISS_WINDOW {
                return false;
            }
        }
        Judgement::Bad => return false,
        Judgement::Perfect | Judgement::Good => {
            if !note.is_hold() || now >= note.end_seconds {
                return false;
            }
        }
    }
    !(line.is_cover && layout.start_y < 0.0)
}

/// Hit-effect instances alive at `now` as `(instance index, age in seconds)`.
///
/// Single notes have one instance at the hit time. Holds with `repeat` get one every
/// [`HOLD_FX_INTERVAL`] while the hold lasts.
pub fn hit_fx_instances(
    note: &Note,
    now: f64,
    interval: f64,
    duration: f64,
    repeat: bool,
) -> Vec<(u32, f64)> {
    let hit = note.hit_time.unwrap_or(note.start_seconds);
    if now < hit || duration <= 0.0 {
        return Vec::new();
    }
    let last = if note.is_hold() && repeat && interval > 0.0 {
        let by_length = ((note.end_seconds - hit) / interval).floor();
        let by_time = ((now - hit) / interval).floor();
        by_length.min(by_time).max(0.0) as u32
    } else {
        0
    };
    (0..=last)
        .filter_map(|n| {
            let age = now - (hit + n as f64 * interval);
            (age >= 0.0 && age < duration).then_some((n, age))
        })
        .collect()
}

/// Sum of squares of the three indices; each instance of an effect gets its own stream.
pub fn particle_seed(line: usize, note: usize, instance: u32) -> u64 {
    let (l, n, i) = (line as u64, note as u64, instance as u64);
    l * l + n * n + i * i
}

/// Outward-flying particles of one effect instance at `progress` in `[0, 1]`:
/// offsets from the hit point in reference units, and their alpha.
pub fn particles(seed: u64, progress: f64) -> Vec<(Vec2, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let progress = progress.clamp(0.0, 1.0);
    let radius = Easing::OutSine.apply(progress);
    let alpha = 1.0 - Easing::InCubic.apply(progress);
    (0..PARTICLES)
        .map(|_| {
            let angle = rng.gen_range(0.0..TAU);
            let distance = rng.gen_range(PARTICLE_DISTANCE);
            (Vec2::from_polar(distance * radius, angle), alpha)
        })
        .collect()
}

fn sprite_height(resources: &dyn ResourceProvider, texture: TextureId, width: f64) -> f64 {
    let (tw, th) = resources.texture_size(texture);
    if tw == 0 {
        return 0.0;
    }
    width * th as f64 / tw as f64
}

pub fn draw_notes(
    canvas: &mut Canvas,
    chart: &Chart,
    states: &[LineState],
    resources: &dyn ResourceProvider,
    settings: &Settings,
    now: f64,
) {
    let order = draw_order(chart.lines());
    let floors: Vec<FloorTrack> = chart
        .lines()
        .iter()
        .map(|line| FloorTrack::new(line, chart.bpm()))
        .collect();

    for pass in NoteLayer::NOTE_PASSES {
        for &index in &order {
            let (Some(line), Some(state)) = (chart.lines().get(index), states.get(index)) else {
                continue;
            };
            let floor = &floors[index];
            canvas.save();
            enter_line_frame(canvas, state);
            for note in line.notes.iter().filter(|n| note_layer(n.kind) == pass) {
                let layout = note_layout(note, floor, now);
                if !is_note_visible(note, line, state, &layout, now) {
                    continue;
                }
                draw_note(canvas, note, &layout, resources, settings);
            }
            canvas.restore();
        }
    }

    for &index in &order {
        let (Some(line), Some(state)) = (chart.lines().get(index), states.get(index)) else {
            continue;
        };
        for (note_index, note) in line.notes.iter().enumerate() {
            if note.fake {
                continue;
            }
            draw_note_fx(canvas, index, note_index, note, state, resources, settings, now);
        }
    }
}

fn draw_note(
    canvas: &mut Canvas,
    note: &Note,
    layout: &NoteLayout,
    resources: &dyn ResourceProvider,
    settings: &Settings,
) {
    let width = settings.display.note_width * note.size;
    let px = settings.display.note_speed_px;
    canvas.save();
    // below-side notes are drawn as above-side ones in a mirrored frame
    if !note.above {
        canvas.scale(1.0, -1.0);
    }
    let head = -(layout.start_y * px + note.y_offset);
    let x = note.position_x;
    match resources.note_sprite(note.kind, note.highlighted) {
        NoteSprite::Single(texture) => {
            let h = sprite_height(resources, texture, width);
            canvas.draw_image(texture, Rect::centered(Vec2::new(x, head), width, h), [1.0; 4]);
        }
        NoteSprite::Hold { head: head_tex, body, tail } => {
            let mut head = head;
            let mut tail_y = -(layout.end_y * px + note.y_offset);
            // a hold running down the screen is drawn upward in a flipped frame
            if tail_y > head {
                canvas.scale(1.0, -1.0);
                head = -head;
                tail_y = -tail_y;
            }
            if tail_y < head {
                draw_hold_body(canvas, resources, settings, body, x, width, tail_y, head);
            }
            let tail_h = sprite_height(resources, tail, width);
            canvas.draw_image(
                tail,
                Rect::new(x - width / 2.0, tail_y - tail_h, x + width / 2.0, tail_y),
                [1.0; 4],
            );
            let head_h = sprite_height(resources, head_tex, width);
            canvas.draw_image(head_tex, Rect::centered(Vec2::new(x, head), width, head_h), [1.0; 4]);
        }
    }
    canvas.restore();
}

#[allow(clippy::too_many_arguments)]
fn draw_hold_body(
    canvas: &mut Canvas,
    resources: &dyn ResourceProvider,
    settings: &Settings,
    body: TextureId,
    x: f64,
    width: f64,
    top: f64,
    bottom: f64,
) {
    let (x0, x1) = (x - width / 2.0, x + width / 2.0);
    let tile = sprite_height(resources, body, width);
    if !settings.skin.hold_body_tiled || tile <= 0.0 {
        canvas.draw_image(body, Rect::new(x0, top, x1, bottom), [1.0; 4]);
        return;
    }
    // tiles start at the head and the last one is cropped
    let mut y = bottom;
    while y > top {
        let next = (y - tile).max(top);
        let visible = (y - next) / tile;
        canvas.draw_image_uv(
            body,
            Rect::new(x0, next, x1, y),
            Rect::new(0.0, 1.0 - visible, 1.0, 1.0),
            [1.0; 4],
        );
        y = next;
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_note_fx(
    canvas: &mut Canvas,
    line_index: usize,
    note_index: usize,
    note: &Note,
    state: &LineState,
    resources: &dyn ResourceProvider,
    settings: &Settings,
    now: f64,
) {
    let skin = resources.skin_config();
    let duration = skin.hit_fx_duration;
    match note.judgement {
        Judgement::None => {}
        Judgement::Bad => {
            let age = now - note.hit_time.unwrap_or(note.start_seconds);
            if !(0.0..duration).contains(&age) {
                return;
            }
            let mut tint = skin.bad_rgba;
            tint[3] *= 1.0 - age / duration;
            let texture = match resources.note_sprite(note.kind, false) {
                NoteSprite::Single(texture) => texture,
                NoteSprite::Hold { head, .. } => head,
            };
            let width = settings.display.note_width * note.size;
            let h = sprite_height(resources, texture, width);
            canvas.save();
            enter_line_frame(canvas, state);
            canvas.draw_image(
                texture,
                Rect::centered(Vec2::new(note.position_x, 0.0), width, h),
                tint,
            );
            canvas.restore();
        }
        Judgement::Perfect | Judgement::Good => {
            let frames = resources.hit_fx_frames(note.judgement);
            let tint = if note.judgement == Judgement::Perfect {
                skin.perfect_rgba
            } else {
                skin.good_rgba
            };
            let instances =
                hit_fx_instances(note, now, HOLD_FX_INTERVAL, duration, skin.hold_repeat_fx);
            if instances.is_empty() {
                return;
            }
            // effects stay upright at the hit point on the line
            canvas.save();
            enter_line_frame(canvas, state);
            let at = canvas.map(Vec2::new(note.position_x, 0.0));
            canvas.restore();

            let size = settings.display.hit_fx_size;
            let scale = size / FX_REFERENCE_SIZE;
            for (instance, age) in instances {
                let progress = age / duration;
                canvas.save();
                canvas.translate(at.x, at.y);
                if !frames.is_empty() {
                    let frame = ((progress * frames.len() as f64) as usize).min(frames.len() - 1);
                    canvas.draw_image(
                        frames[frame],
                        Rect::centered(Vec2::new(0.0, 0.0), size, size),
                        tint,
                    );
                }
                if skin.show_particles {
                    let seed = particle_seed(line_index, note_index, instance);
                    let side = PARTICLE_SIZE * scale;
                    for (offset, alpha) in particles(seed, progress) {
                        let mut color = tint;
                        color[3] *= alpha;
                        canvas.fill_rect(Rect::centered(offset * scale, side, side), color);
                    }
                }
                canvas.restore();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Beat;
    use crate::chart::event::Event;
    use crate::chart::judge_line::EventLayer;
    use crate::chart::tests::chart_of;
    use crate::render::canvas::DrawCmd;
    use crate::render::resources::Skin;

    fn constant_speed_line(notes: Vec<Note>) -> JudgeLine {
        JudgeLine {
            layers: vec![EventLayer {
                speed: vec![Event::constant(Beat::whole(0), Beat::whole(100), 1.0)],
                alpha: vec![Event::constant(Beat::whole(0), Beat::whole(100), 255.0)],
                ..EventLayer::default()
            }],
            notes,
            ..JudgeLine::default()
        }
    }

    fn opaque() -> LineState {
        LineState {
            alpha: 255.0,
            speed: 1.0,
            ..LineState::default()
        }
    }

    #[test]
    fn held_hold_is_pinned_to_the_line() {
        let chart = chart_of(vec![constant_speed_line(vec![Note::hold(
            Beat::whole(0),
            Beat::whole(4),
        )])]);
        let line = &chart.lines()[0];
        let floor = FloorTrack::new(line, chart.bpm());
        // beat 2 at 120 bpm
        let now = chart.bpm().beat_to_seconds(2.0);
        let layout = note_layout(&line.notes[0], &floor, now);
        assert_eq!(layout.start_y, 0.0);
        let delta = floor.at(line.notes[0].end_seconds) - floor.at(now);
        assert!(delta > 0.0);
        assert!((layout.end_y - layout.start_y - delta).abs() < 1e-9);
    }

    #[test]
    fn upcoming_note_sits_above_the_line() {
        let mut note = Note::tap(Beat::whole(4));
        note.speed = 2.0;
        let chart = chart_of(vec![constant_speed_line(vec![note])]);
        let line = &chart.lines()[0];
        let floor = FloorTrack::new(line, chart.bpm());
        let layout = note_layout(&line.notes[0], &floor, 1.0);
        // one second away at speed 1, doubled by the note speed
        assert!((layout.start_y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn visibility_rules() {
        let line = JudgeLine::default();
        let layout = NoteLayout {
            start_y: 1.0,
            end_y: 1.0,
        };
        let mut note = Note::tap(Beat::whole(4));
        note.start_seconds = 2.0;
        note.end_seconds = 2.0;
        assert!(is_note_visible(&note, &line, &opaque(), &layout, 1.0));

        note.visible_time = 0.5;
        assert!(!is_note_visible(&note, &line, &opaque(), &layout, 1.0));
        note.visible_time = f64::INFINITY;

        let hidden = LineState {
            alpha: -1.0,
            ..opaque()
        };
        assert!(!is_note_visible(&note, &line, &hidden, &layout, 1.0));

        let cover = JudgeLine {
            is_cover: true,
            ..JudgeLine::default()
        };
        let below = NoteLayout {
            start_y: -0.5,
            end_y: -0.5,
        };
        assert!(!is_note_visible(&note, &cover, &opaque(), &below, 1.0));
        assert!(is_note_visible(&note, &line, &opaque(), &below, 2.1));
        assert!(!is_note_visible(&note, &line, &opaque(), &below, 2.0 + MISS_WINDOW + 0.01));

        note.judgement = Judgement::Perfect;
        assert!(!is_note_visible(&note, &line, &opaque(), &layout, 2.0));
    }

    #[test]
    fn hold_fx_repeat_instances() {
        let mut note = Note::hold(Beat::whole(0), Beat::whole(2));
        note.start_seconds = 0.0;
        note.end_seconds = 1.0;
        note.judgement = Judgement::Perfect;
        note.hit_time = Some(0.0);
        let instances: Vec<u32> = hit_fx_instances(&note, 0.6, HOLD_FX_INTERVAL, 0.5, true)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(instances, vec![1, 2]);

        // instances stop at the end of the hold
        let late: Vec<u32> = hit_fx_instances(&note, 1.2, HOLD_FX_INTERVAL, 0.5, true)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(late, vec![3, 4]);

        assert_eq!(hit_fx_instances(&note, 0.6, HOLD_FX_INTERVAL, 0.5, false), vec![]);
    }

    #[test]
    fn tap_fx_plays_once() {
        let mut note = Note::tap(Beat::whole(0));
        note.start_seconds = 1.0;
        note.end_seconds = 1.0;
        assert_eq!(hit_fx_instances(&note, 0.9, HOLD_FX_INTERVAL, 0.5, true), vec![]);
        let live = hit_fx_instances(&note, 1.2, HOLD_FX_INTERVAL, 0.5, true);
        assert_eq!(live.len(), 1);
        assert!((live[0].1 - 0.2).abs() < 1e-12);
        assert_eq!(hit_fx_instances(&note, 1.5, HOLD_FX_INTERVAL, 0.5, true), vec![]);
    }

    #[test]
    fn particles_are_deterministic() {
        let seed = particle_seed(1, 2, 3);
        assert_eq!(seed, 14);
        assert_eq!(particles(seed, 0.4), particles(seed, 0.4));
        assert_ne!(particles(seed, 0.4), particles(particle_seed(0, 0, 1), 0.4));

        let start = particles(seed, 0.0);
        assert!(start.iter().all(|(p, a)| p.len() < 1e-9 && *a == 1.0));
        let end = particles(seed, 1.0);
        for (p, a) in end {
            assert!(p.len() >= PARTICLE_DISTANCE.start - 1e-9);
            assert!(p.len() < PARTICLE_DISTANCE.end);
            assert!(a.abs() < 1e-12);
        }
    }

    #[test]
    fn holds_draw_before_taps() {
        let settings = Settings::default();
        let skin = Skin::fallback(settings.skin.clone());
        let chart = chart_of(vec![constant_speed_line(vec![
            Note::tap(Beat::whole(8)),
            Note::hold(Beat::whole(6), Beat::whole(10)),
        ])]);
        let mut canvas = Canvas::new(1350.0, 900.0);
        draw_notes(&mut canvas, &chart, &[opaque()], &skin, &settings, 0.0);
        let list = canvas.finish();
        let textures: Vec<TextureId> = list
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCmd::Image { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect();
        let NoteSprite::Single(tap) = skin.note_sprite(NoteKind::Tap, false) else {
            panic!("tap should be a single sprite");
        };
        // body, tail and head of the hold come first
        assert_eq!(textures.len(), 4);
        assert_eq!(textures[3], tap);
    }

    #[test]
    fn reversed_holds_keep_their_body() {
        let settings = Settings::default();
        let skin = Skin::fallback(settings.skin.clone());
        let line = JudgeLine {
            layers: vec![EventLayer {
                speed: vec![Event::constant(Beat::whole(0), Beat::whole(100), -1.0)],
                alpha: vec![Event::constant(Beat::whole(0), Beat::whole(100), 255.0)],
                ..EventLayer::default()
            }],
            notes: vec![Note::hold(Beat::whole(4), Beat::whole(8))],
            ..JudgeLine::default()
        };
        let chart = chart_of(vec![line]);
        let mut canvas = Canvas::new(1350.0, 900.0);
        draw_notes(&mut canvas, &chart, &[opaque()], &skin, &settings, 0.0);
        let list = canvas.finish();
        let images: Vec<_> = list
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCmd::Image {
                    texture,
                    dest,
                    transform,
                    ..
                } => Some((*texture, *dest, *transform)),
                _ => None,
            })
            .collect();
        let NoteSprite::Hold { body, .. } = skin.note_sprite(NoteKind::Hold, false) else {
            panic!("hold should have three parts");
        };
        assert_eq!(images.len(), 3);
        let (texture, dest, transform) = images[0];
        assert_eq!(texture, body);
        assert!(transform.is_mirrored());
        // head 2 s and tail 4 s away on a line moving backwards: the body hangs below the line
        let centre = Vec2::new(0.0, (dest.y0 + dest.y1) / 2.0) * transform;
        assert!((centre.y - (450.0 + 360.0)).abs() < 1e-6);
    }

    #[test]
    fn below_side_notes_are_mirrored() {
        let settings = Settings::default();
        let skin = Skin::fallback(settings.skin.clone());
        let mut note = Note::tap(Beat::whole(2));
        note.above = false;
        let chart = chart_of(vec![constant_speed_line(vec![note])]);
        let mut canvas = Canvas::new(1350.0, 900.0);
        draw_notes(&mut canvas, &chart, &[opaque()], &skin, &settings, 0.0);
        let list = canvas.finish();
        let DrawCmd::Image { dest, transform, .. } = &list.commands[0] else {
            panic!("note should be an image");
        };
        assert!(transform.is_mirrored());
        let centre = Vec2::new(0.0, (dest.y0 + dest.y1) / 2.0) * *transform;
        // one second ahead at 120 px per floor unit, below the line centre
        assert!((centre.y - (450.0 + 120.0)).abs() < 1e-6);
    }
}
