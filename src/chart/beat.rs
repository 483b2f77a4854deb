use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Musical time as `measure + numerator / denominator`, serialised as `[measure, numerator, denominator]`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
#[serde(from = "[i32; 3]", into = "[i32; 3]")]
pub struct Beat {
    pub measure: i32,
    pub numerator: i32,
    pub denominator: i32,
}

impl From<[i32; 3]> for Beat {
    fn from(value: [i32; 3]) -> Self {
        Beat::new(value[0], value[1], value[2])
    }
}

impl From<Beat> for [i32; 3] {
    fn from(beat: Beat) -> Self {
        [beat.measure, beat.numerator, beat.denominator]
    }
}

impl Beat {
    pub const ZERO: Beat = Beat {
        measure: 0,
        numerator: 0,
        denominator: 1,
    };

    /// A zero denominator is read as 1.
    pub fn new(measure: i32, numerator: i32, denominator: i32) -> Self {
        Beat {
            measure,
            numerator,
            denominator: if denominator == 0 { 1 } else { denominator },
        }
    }

    pub fn whole(measure: i32) -> Self {
        Beat::new(measure, 0, 1)
    }

    /// Nearest beat on a grid of `division` steps per beat.
    pub fn snapped(value: f64, division: i32) -> Self {
        let division = division.max(1);
        // float to int casts saturate, NaN lands on 0
        let steps = (value * division as f64).round() as i64;
        let steps = i32::try_from(steps).unwrap_or(if steps < 0 { i32::MIN } else { i32::MAX });
        Beat::new(steps.div_euclid(division), steps.rem_euclid(division), division)
    }

    pub fn value(&self) -> f64 {
        self.measure as f64 + self.numerator as f64 / self.denominator as f64
    }

    // (measure * den + num) / den, exact in i64
    fn as_fraction(&self) -> (i64, i64) {
        let den = self.denominator as i64;
        let num = self.measure as i64 * den + self.numerator as i64;
        if den < 0 { (-num, -den) } else { (num, den) }
    }
}

impl PartialEq for Beat {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Beat {}

impl Hash for Beat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (num, den) = self.as_fraction();
        let divisor = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i64;
        (num / divisor, den / divisor).hash(state);
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl PartialOrd for Beat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Beat {
    fn cmp(&self, other: &Self) -> Ordering {
        let (an, ad) = self.as_fraction();
        let (bn, bd) = other.as_fraction();
        (an as i128 * bd as i128).cmp(&(bn as i128 * ad as i128))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BpmPoint {
    pub start: Beat,
    pub bpm: f64,
}

const FALLBACK_BPM: f64 = 120.0;

/// Piecewise-constant tempo map used to convert beats to seconds and back.
#[derive(Clone, Debug, PartialEq)]
pub struct BpmList {
    // (start beat, start seconds, seconds per beat)
    segments: Vec<(f64, f64, f64)>,
}

impl Default for BpmList {
    fn default() -> Self {
        BpmList::new(&[])
    }
}

impl BpmList {
    pub fn new(points: &[BpmPoint]) -> Self {
        let mut sorted: Vec<&BpmPoint> = points.iter().filter(|p| p.bpm > 0.0).collect();
        sorted.sort_by(|a, b| a.start.cmp(&b.start));

        let mut segments = Vec::with_capacity(sorted.len().max(1));
        if sorted.is_empty() {
            segments.push((0.0, 0.0, 60.0 / FALLBACK_BPM));
            return BpmList { segments };
        }

        let mut seconds = 0.0;
        let mut prev: Option<(f64, f64)> = None;
        for point in sorted {
            let beat = point.start.value();
            if let Some((prev_beat, prev_spb)) = prev {
                seconds += (beat - prev_beat) * prev_spb;
            }
            let spb = 60.0 / point.bpm;
            segments.push((beat, seconds, spb));
            prev = Some((beat, spb));
        }
        // the first tempo extends backwards from its start
        let (first_beat, first_seconds, first_spb) = segments[0];
        if first_beat != 0.0 {
            let shift = first_seconds - first_beat * first_spb;
            for segment in segments.iter_mut() {
                segment.1 -= shift;
            }
        }
        BpmList { segments }
    }

    pub fn beat_to_seconds(&self, beat: f64) -> f64 {
        let index = self
            .segments
            .partition_point(|(start, _, _)| *start <= beat)
            .saturating_sub(1);
        let (start, seconds, spb) = self.segments[index];
        seconds + (beat - start) * spb
    }

    pub fn seconds_to_beat(&self, seconds: f64) -> f64 {
        let index = self
            .segments
            .partition_point(|(_, start_seconds, _)| *start_seconds <= seconds)
            .saturating_sub(1);
        let (start, start_seconds, spb) = self.segments[index];
        start + (seconds - start_seconds) / spb
    }

    /// Seconds at which each tempo change takes effect.
    pub fn change_points(&self) -> impl Iterator<Item = f64> + '_ {
        self.segments.iter().map(|(_, seconds, _)| *seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beats_compare_exactly() {
        assert_eq!(Beat::new(1, 1, 2), Beat::new(1, 2, 4));
        assert!(Beat::new(0, 1, 3) < Beat::new(0, 1, 2));
        assert!(Beat::new(2, 0, 1) > Beat::new(1, 7, 8));
    }

    #[test]
    fn snapping_rounds_to_the_grid() {
        assert_eq!(Beat::snapped(2.26, 4), Beat::new(2, 1, 4));
        assert_eq!(Beat::snapped(-0.3, 4), Beat::new(-1, 3, 4));
        assert_eq!(Beat::snapped(1.0, 0), Beat::whole(1));
        let far = Beat::snapped(1e12, 4);
        assert_eq!(far, Beat::new(i32::MAX / 4, 3, 4));
        assert!(Beat::snapped(-1e12, 4) < Beat::ZERO);
    }

    #[test]
    fn extreme_fractions_still_order() {
        let big = Beat::new(i32::MAX, i32::MAX - 1, i32::MAX);
        let bigger = Beat::new(i32::MAX, i32::MAX - 1, i32::MAX - 1);
        assert!(big < bigger);
        assert!(Beat::new(i32::MIN, 0, i32::MAX) < Beat::new(i32::MIN, 1, i32::MAX));
        assert_eq!(big, big);
    }

    #[test]
    fn beat_serialises_as_triple() {
        let text = serde_json::to_string(&Beat::new(3, 1, 4)).unwrap();
        assert_eq!(text, "[3,1,4]");
        let back: Beat = serde_json::from_str("[3,1,0]").unwrap();
        assert_eq!(back.denominator, 1);
    }

    #[test]
    fn tempo_changes_accumulate() {
        let bpm = BpmList::new(&[
            BpmPoint {
                start: Beat::whole(0),
                bpm: 120.0,
            },
            BpmPoint {
                start: Beat::whole(4),
                bpm: 60.0,
            },
        ]);
        assert!((bpm.beat_to_seconds(4.0) - 2.0).abs() < 1e-12);
        assert!((bpm.beat_to_seconds(6.0) - 4.0).abs() < 1e-12);
        assert!((bpm.seconds_to_beat(4.0) - 6.0).abs() < 1e-12);
        assert!((bpm.seconds_to_beat(1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_list_falls_back_to_default_tempo() {
        let bpm = BpmList::default();
        assert!((bpm.beat_to_seconds(2.0) - 1.0).abs() < 1e-12);
        assert!((bpm.beat_to_seconds(-2.0) + 1.0).abs() < 1e-12);
    }
}
