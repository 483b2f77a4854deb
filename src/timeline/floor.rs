use crate::chart::beat::BpmList;
use crate::chart::judge_line::JudgeLine;

use super::curve::evaluate;

const SIMPSON_PANELS: usize = 8;

/// Summed speed of every layer of `line` at `beat`; layers with no started event contribute 0.
pub fn speed_at(line: &JudgeLine, beat: f64) -> f64 {
    line.layers
        .iter()
        .map(|layer| evaluate(&layer.speed, beat).unwrap_or(0.0))
        .sum()
}

/// Cumulative scroll distance of one judge line, integrated over seconds from 0.
///
/// Breakpoints sit on every speed event boundary and tempo change, so each piece is smooth and
/// Simpson's rule is exact for constant and linear speed.
pub struct FloorTrack<'a> {
    line: &'a JudgeLine,
    bpm: &'a BpmList,
    points: Vec<f64>,
    cumulative: Vec<f64>,
}

impl<'a> FloorTrack<'a> {
    pub fn new(line: &'a JudgeLine, bpm: &'a BpmList) -> Self {
        let mut points = vec![0.0];
        points.extend(bpm.change_points());
        for layer in &line.layers {
            for event in layer.speed.iter().filter(|e| !e.disabled) {
                points.push(bpm.beat_to_seconds(event.start.value()));
                points.push(bpm.beat_to_seconds(event.end.value()));
            }
        }
        points.sort_by(f64::total_cmp);
        points.dedup();

        let mut track = FloorTrack {
            line,
            bpm,
            points: Vec::new(),
            cumulative: Vec::new(),
        };
        // integral from 0 to each breakpoint
        let zero = points.partition_point(|p| *p < 0.0);
        let mut cumulative = vec![0.0; points.len()];
        for i in zero + 1..points.len() {
            cumulative[i] = cumulative[i - 1] + track.integrate(points[i - 1], points[i]);
        }
        for i in (0..zero).rev() {
            cumulative[i] = cumulative[i + 1] - track.integrate(points[i], points[i + 1]);
        }
        track.points = points;
        track.cumulative = cumulative;
        track
    }

    fn speed_at_seconds(&self, seconds: f64) -> f64 {
        speed_at(self.line, self.bpm.seconds_to_beat(seconds))
    }

    fn integrate(&self, from: f64, to: f64) -> f64 {
        if to == from {
            return 0.0;
        }
        let h = (to - from) / SIMPSON_PANELS as f64;
        let mut sum = self.speed_at_seconds(from) + self.speed_at_seconds(to);
        for i in 1..SIMPSON_PANELS {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * self.speed_at_seconds(from + h * i as f64);
        }
        sum * h / 3.0
    }

    pub fn at(&self, seconds: f64) -> f64 {
        let index = self
            .points
            .partition_point(|p| *p <= seconds)
            .saturating_sub(1);
        self.cumulative[index] + self.integrate(self.points[index], seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::beat::{Beat, BpmPoint};
    use crate::chart::easing::Easing;
    use crate::chart::event::Event;

    fn line_with_speed(events: Vec<Event<f64>>) -> JudgeLine {
        let mut line = JudgeLine::default();
        line.layers[0].speed = events;
        line
    }

    #[test]
    fn constant_speed_is_linear_in_seconds() {
        let line = line_with_speed(vec![Event::constant(Beat::whole(0), Beat::whole(1), 2.0)]);
        let bpm = BpmList::default();
        let track = FloorTrack::new(&line, &bpm);
        assert!((track.at(3.0) - 6.0).abs() < 1e-9);
        // nothing has started before beat 0
        assert!(track.at(-1.0).abs() < 1e-9);
    }

    #[test]
    fn linear_ramp_is_exact() {
        // 120 bpm: speed goes 0 -> 4 over one second
        let line = line_with_speed(vec![Event::new(
            Beat::whole(0),
            Beat::whole(2),
            0.0,
            4.0,
            Easing::Linear,
        )]);
        let bpm = BpmList::default();
        let track = FloorTrack::new(&line, &bpm);
        assert!((track.at(1.0) - 2.0).abs() < 1e-9);
        assert!((track.at(0.5) - 0.5).abs() < 1e-9);
        assert!((track.at(2.0) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn layers_add_up() {
        let mut line = line_with_speed(vec![Event::constant(Beat::whole(0), Beat::whole(1), 1.0)]);
        line.layers.push(Default::default());
        line.layers[1].speed = vec![Event::constant(Beat::whole(0), Beat::whole(1), 0.5)];
        assert_eq!(speed_at(&line, 0.5), 1.5);
    }

    #[test]
    fn tempo_changes_are_breakpoints() {
        let line = line_with_speed(vec![Event::constant(Beat::whole(0), Beat::whole(1), 1.0)]);
        let bpm = BpmList::new(&[
            BpmPoint {
                start: Beat::whole(0),
                bpm: 120.0,
            },
            BpmPoint {
                start: Beat::whole(2),
                bpm: 60.0,
            },
        ]);
        let track = FloorTrack::new(&line, &bpm);
        assert!((track.at(3.0) - 3.0).abs() < 1e-9);
    }
}
