use crate::chart::{Chart, Judgement};

/// Unjudged notes further than this past their time count as missed.
pub const MISS_WINDOW: f64 = 0.16;

const MAX_SCORE: f64 = 1_000_000.0;
const GOOD_WEIGHT: f64 = 0.65;

/// Judges the chart as a perfect player at `now`: every real note whose time has come is
/// `Perfect` at its own time, and anything after `now` goes back to unjudged, so seeking
/// backwards works. This is playback state and bypasses history.
pub fn autoplay(chart: &mut Chart, now: f64) {
    for line in chart.lines_mut() {
        for note in line.notes.iter_mut().filter(|n| !n.fake) {
            if note.start_seconds <= now {
                if note.judgement == Judgement::None {
                    note.judgement = Judgement::Perfect;
                    note.hit_time = Some(note.start_seconds);
                }
            } else {
                note.judgement = Judgement::None;
                note.hit_time = None;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct JudgementStats {
    pub perfect: usize,
    pub good: usize,
    pub bad: usize,
    /// Real notes in the chart.
    pub total: usize,
    pub combo: usize,
    pub max_combo: usize,
}

impl JudgementStats {
    pub fn collect(chart: &Chart) -> Self {
        let mut stats = JudgementStats::default();
        let mut judged: Vec<(f64, Judgement)> = Vec::new();
        for note in chart.lines().iter().flat_map(|l| l.notes.iter()) {
            if note.fake {
                continue;
            }
            stats.total += 1;
            match note.judgement {
                Judgement::None => continue,
                Judgement::Perfect => stats.perfect += 1,
                Judgement::Good => stats.good += 1,
                Judgement::Bad => stats.bad += 1,
            }
            judged.push((note.hit_time.unwrap_or(note.start_seconds), note.judgement));
        }
        judged.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, judgement) in judged {
            if judgement == Judgement::Bad {
                stats.combo = 0;
            } else {
                stats.combo += 1;
                stats.max_combo = stats.max_combo.max(stats.combo);
            }
        }
        stats
    }

    pub fn score(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let weighted = self.perfect as f64 + GOOD_WEIGHT * self.good as f64;
        (MAX_SCORE * weighted / self.total as f64).round() as u32
    }

    /// Seven digits, zero padded, the way the score readout shows it.
    pub fn score_text(&self) -> String {
        format!("{:07}", self.score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::beat::Beat;
    use crate::chart::note::Note;
    use crate::chart::tests::{chart_of, line_with_notes};

    fn three_taps() -> Chart {
        let mut fake = Note::tap(Beat::whole(1));
        fake.fake = true;
        chart_of(vec![line_with_notes(vec![
            Note::tap(Beat::whole(0)),
            Note::tap(Beat::whole(2)),
            Note::tap(Beat::whole(4)),
            fake,
        ])])
    }

    #[test]
    fn autoplay_follows_the_playhead() {
        let mut chart = three_taps();
        autoplay(&mut chart, 1.5);
        let judgements: Vec<Judgement> =
            chart.lines()[0].notes.iter().map(|n| n.judgement).collect();
        assert_eq!(
            judgements,
            vec![
                Judgement::Perfect,
                Judgement::Perfect,
                Judgement::None,
                Judgement::None
            ]
        );
        assert_eq!(chart.lines()[0].notes[1].hit_time, Some(1.0));

        autoplay(&mut chart, 0.5);
        assert_eq!(chart.lines()[0].notes[1].judgement, Judgement::None);
        assert_eq!(chart.lines()[0].notes[1].hit_time, None);
    }

    #[test]
    fn stats_and_score() {
        let mut chart = three_taps();
        autoplay(&mut chart, 10.0);
        let stats = JudgementStats::collect(&chart);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.combo, 3);
        assert_eq!(stats.score(), 1_000_000);
        assert_eq!(stats.score_text(), "1000000");
    }

    #[test]
    fn bad_breaks_combo() {
        let mut chart = three_taps();
        autoplay(&mut chart, 10.0);
        chart.lines_mut()[0].notes[1].judgement = Judgement::Bad;
        chart.lines_mut()[0].notes[2].judgement = Judgement::Good;
        let stats = JudgementStats::collect(&chart);
        assert_eq!(stats.combo, 1);
        assert_eq!(stats.max_combo, 1);
        assert_eq!(stats.score(), 550_000);
        assert_eq!(JudgementStats::default().score_text(), "0000000");
    }
}
