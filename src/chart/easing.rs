use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Progress curve of an event. Named curves map `[0, 1]` onto `[0, 1]` with `f(0) = 0`, `f(1) = 1`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    OutSine,
    InSine,
    OutQuad,
    InQuad,
    InOutSine,
    InOutQuad,
    OutCubic,
    InCubic,
    OutQuart,
    InQuart,
    InOutCubic,
    InOutQuart,
    OutQuint,
    InQuint,
    OutExpo,
    InExpo,
    OutCirc,
    InCirc,
    OutBack,
    InBack,
    InOutCirc,
    InOutBack,
    OutElastic,
    InElastic,
    OutBounce,
    InBounce,
    InOutBounce,
    InOutElastic,
    /// CSS-style `cubic-bezier(x1, y1, x2, y2)`.
    Bezier([f64; 4]),
}

impl Easing {
    pub const NAMED: [Easing; 29] = [
        Easing::Linear,
        Easing::OutSine,
        Easing::InSine,
        Easing::OutQuad,
        Easing::InQuad,
        Easing::InOutSine,
        Easing::InOutQuad,
        Easing::OutCubic,
        Easing::InCubic,
        Easing::OutQuart,
        Easing::InQuart,
        Easing::InOutCubic,
        Easing::InOutQuart,
        Easing::OutQuint,
        Easing::InQuint,
        Easing::OutExpo,
        Easing::InExpo,
        Easing::OutCirc,
        Easing::InCirc,
        Easing::OutBack,
        Easing::InBack,
        Easing::InOutCirc,
        Easing::InOutBack,
        Easing::OutElastic,
        Easing::InElastic,
        Easing::OutBounce,
        Easing::InBounce,
        Easing::InOutBounce,
        Easing::InOutElastic,
    ];

    /// Back, elastic and bezier curves may leave `[0, 1]` between the endpoints.
    pub fn may_overshoot(&self) -> bool {
        matches!(
            self,
            Easing::OutBack
                | Easing::InBack
                | Easing::InOutBack
                | Easing::OutElastic
                | Easing::InElastic
                | Easing::InOutElastic
                | Easing::Bezier(_)
        )
    }

    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::OutSine => (t * PI / 2.0).sin(),
            Easing::InSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::InQuad => t.powi(2),
            Easing::OutQuad => out_pow(t, 2),
            Easing::InOutQuad => in_out_pow(t, 2),
            Easing::InCubic => t.powi(3),
            Easing::OutCubic => out_pow(t, 3),
            Easing::InOutCubic => in_out_pow(t, 3),
            Easing::InQuart => t.powi(4),
            Easing::OutQuart => out_pow(t, 4),
            Easing::InOutQuart => in_out_pow(t, 4),
            Easing::InQuint => t.powi(5),
            Easing::OutQuint => out_pow(t, 5),
            Easing::InExpo => {
                if t <= 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * t - 10.0)
                }
            }
            Easing::OutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
            Easing::InCirc => 1.0 - (1.0 - t * t).sqrt(),
            Easing::OutCirc => (1.0 - (t - 1.0).powi(2)).sqrt(),
            Easing::InOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Easing::InBack => {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                C3 * t.powi(3) - C1 * t.powi(2)
            }
            Easing::OutBack => {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Easing::InOutBack => {
                const C2: f64 = 1.70158 * 1.525;
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((C2 + 1.0) * 2.0 * t - C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((C2 + 1.0) * (t * 2.0 - 2.0) + C2) + 2.0) / 2.0
                }
            }
            Easing::InElastic => {
                const C4: f64 = 2.0 * PI / 3.0;
                if t <= 0.0 || t >= 1.0 {
                    t
                } else {
                    -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * C4).sin()
                }
            }
            Easing::OutElastic => {
                const C4: f64 = 2.0 * PI / 3.0;
                if t <= 0.0 || t >= 1.0 {
                    t
                } else {
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0
                }
            }
            Easing::InOutElastic => {
                const C5: f64 = 2.0 * PI / 4.5;
                if t <= 0.0 || t >= 1.0 {
                    t
                } else if t < 0.5 {
                    -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0
                } else {
                    (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0 + 1.0
                }
            }
            Easing::OutBounce => out_bounce(t),
            Easing::InBounce => 1.0 - out_bounce(1.0 - t),
            Easing::InOutBounce => {
                if t < 0.5 {
                    (1.0 - out_bounce(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + out_bounce(2.0 * t - 1.0)) / 2.0
                }
            }
            Easing::Bezier([x1, y1, x2, y2]) => cubic_bezier(x1, y1, x2, y2, t),
        }
    }

    /// Evaluates the curve over the sub-range `[left, right]` of its domain and renormalises the
    /// result so the output still runs from 0 to 1.
    pub fn apply_range(&self, t: f64, left: f64, right: f64) -> f64 {
        let left = left.clamp(0.0, 1.0);
        let right = right.clamp(0.0, 1.0);
        if left == 0.0 && right == 1.0 {
            return self.apply(t);
        }
        let low = self.apply(left);
        let high = self.apply(right);
        if (high - low).abs() < f64::EPSILON {
            return t.clamp(0.0, 1.0);
        }
        let x = left + (right - left) * t.clamp(0.0, 1.0);
        (self.apply(x) - low) / (high - low)
    }
}

fn out_pow(t: f64, n: i32) -> f64 {
    1.0 - (1.0 - t).powi(n)
}

fn in_out_pow(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        2f64.powi(n - 1) * t.powi(n)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(n) / 2.0
    }
}

fn out_bounce(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

fn bezier_axis(a1: f64, a2: f64, s: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * a1 + 3.0 * inv * s * s * a2 + s * s * s
}

fn bezier_axis_slope(a1: f64, a2: f64, s: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * a1 + 6.0 * inv * s * (a2 - a1) + 3.0 * s * s * (1.0 - a2)
}

/// Finds the curve parameter whose x equals `x` (Newton first, bisection as fallback) and returns
/// the matching y.
pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    const EPSILON: f64 = 1e-7;
    let x = x.clamp(0.0, 1.0);
    let x1 = x1.clamp(0.0, 1.0);
    let x2 = x2.clamp(0.0, 1.0);

    let mut s = x;
    for _ in 0..8 {
        let err = bezier_axis(x1, x2, s) - x;
        if err.abs() < EPSILON {
            return bezier_axis(y1, y2, s);
        }
        let slope = bezier_axis_slope(x1, x2, s);
        if slope.abs() < 1e-6 {
            break;
        }
        s -= err / slope;
    }

    let (mut low, mut high) = (0.0, 1.0);
    s = x;
    while high - low > EPSILON {
        let value = bezier_axis(x1, x2, s);
        if (value - x).abs() < EPSILON {
            break;
        }
        if value < x {
            low = s;
        } else {
            high = s;
        }
        s = (low + high) / 2.0;
    }
    bezier_axis(y1, y2, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_curve_is_anchored() {
        for easing in Easing::NAMED {
            assert!(easing.apply(0.0).abs() < 1e-9, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{easing:?} at 1");
        }
    }

    #[test]
    fn bezier_matches_closed_form_when_x_is_linear() {
        // x1 = 1/3 and x2 = 2/3 make x(s) = s, so y can be read off directly.
        let (y1, y2) = (1.4, -0.3);
        for s in [0.0, 0.5, 1.0] {
            let inv = 1.0 - s;
            let expected = 3.0 * inv * inv * s * y1 + 3.0 * inv * s * s * y2 + s * s * s;
            let got = Easing::Bezier([1.0 / 3.0, y1, 2.0 / 3.0, y2]).apply(s);
            assert!((got - expected).abs() < 1e-6, "s={s} got={got} expected={expected}");
        }
    }

    #[test]
    fn bezier_ease_is_monotone_for_css_ease() {
        let ease = Easing::Bezier([0.25, 0.1, 0.25, 1.0]);
        let mut prev = 0.0;
        for i in 1..=100 {
            let v = ease.apply(i as f64 / 100.0);
            assert!(v >= prev - 1e-9);
            prev = v;
        }
    }

    #[test]
    fn partial_range_is_renormalised() {
        let e = Easing::InQuad;
        assert!(e.apply_range(0.0, 0.5, 1.0).abs() < 1e-12);
        assert!((e.apply_range(1.0, 0.5, 1.0) - 1.0).abs() < 1e-12);
        // second half of a quadratic: (x^2 - 0.25) / 0.75 at x = 0.75
        let expected = (0.5625 - 0.25) / 0.75;
        assert!((e.apply_range(0.5, 0.5, 1.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn easing_names_are_snake_case() {
        assert_eq!(serde_json::to_string(&Easing::InOutBack).unwrap(), "\"in_out_back\"");
        let bezier: Easing = serde_json::from_str(r#"{"bezier":[0.1,0.2,0.3,0.4]}"#).unwrap();
        assert_eq!(bezier, Easing::Bezier([0.1, 0.2, 0.3, 0.4]));
    }
}
