use crate::chart::event::{Event, Interpolate};
use crate::chart::shader_effect::{ShaderValue, VarBinding};

/// Value of an event sequence at `beat`.
///
/// `events` must be sorted by start and non-overlapping. The active segment is the latest enabled
/// event starting at or before `beat`; past its end the end value holds. `None` means nothing has
/// started yet and the caller picks the channel default.
pub fn evaluate<V: Interpolate>(events: &[Event<V>], beat: f64) -> Option<V> {
    let upper = events.partition_point(|e| e.start.value() <= beat);
    let event = events[..upper].iter().rev().find(|e| !e.disabled)?;

    let start = event.start.value();
    let end = event.end.value();
    if beat >= end || end <= start {
        return Some(event.end_value.clone());
    }

    let t = ((beat - start) / (end - start)).clamp(0.0, 1.0);
    let eased = event
        .easing
        .apply_range(t, event.easing_left, event.easing_right);
    Some(V::interpolate(&event.start_value, &event.end_value, eased))
}

/// Resolves a shader variable binding at `beat`; animated components without an active event read 0.
pub fn evaluate_binding(binding: &VarBinding, beat: f64) -> Option<ShaderValue> {
    match binding {
        VarBinding::Literal(value) => Some(*value),
        VarBinding::Animated(events) => Some(ShaderValue::Float(
            evaluate(events, beat).unwrap_or_default(),
        )),
        VarBinding::AnimatedVector(channels) => {
            let values: Vec<f64> = channels
                .iter()
                .map(|events| evaluate(events, beat).unwrap_or_default())
                .collect();
            ShaderValue::from_components(&values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::beat::Beat;
    use crate::chart::easing::Easing;
    use crate::chart::event::Color;
    use proptest::prelude::*;

    fn ev(start: i32, end: i32, from: f64, to: f64, easing: Easing) -> Event<f64> {
        Event::new(Beat::whole(start), Beat::whole(end), from, to, easing)
    }

    #[test]
    fn nothing_before_first_event() {
        let events = vec![ev(2, 4, 0.0, 10.0, Easing::Linear)];
        assert_eq!(evaluate(&events, 1.0), None);
        assert_eq!(evaluate::<f64>(&[], 1.0), None);
    }

    #[test]
    fn value_holds_in_gaps_and_after_end() {
        let events = vec![
            ev(0, 1, 0.0, 10.0, Easing::Linear),
            ev(3, 4, 20.0, 30.0, Easing::Linear),
        ];
        assert_eq!(evaluate(&events, 0.5), Some(5.0));
        assert_eq!(evaluate(&events, 2.0), Some(10.0));
        assert_eq!(evaluate(&events, 9.0), Some(30.0));
    }

    #[test]
    fn disabled_events_are_invisible() {
        let mut events = vec![
            ev(0, 1, 0.0, 10.0, Easing::Linear),
            ev(1, 2, 50.0, 60.0, Easing::Linear),
        ];
        events[1].disabled = true;
        assert_eq!(evaluate(&events, 1.5), Some(10.0));
    }

    #[test]
    fn instant_event_jumps() {
        let events = vec![ev(1, 1, 0.0, 7.0, Easing::Linear)];
        assert_eq!(evaluate(&events, 1.0), Some(7.0));
    }

    #[test]
    fn easing_shapes_progress() {
        let events = vec![ev(0, 2, 0.0, 100.0, Easing::InQuad)];
        let v = evaluate(&events, 1.0).unwrap();
        assert!((v - 25.0).abs() < 1e-9);
    }

    #[test]
    fn colors_and_text() {
        let colors = vec![Event::new(
            Beat::whole(0),
            Beat::whole(1),
            Color::new(0, 0, 0),
            Color::new(200, 100, 50),
            Easing::Linear,
        )];
        assert_eq!(evaluate(&colors, 0.5), Some(Color::new(100, 50, 25)));

        let texts = vec![Event::new(
            Beat::whole(0),
            Beat::whole(2),
            "3".to_string(),
            "2".to_string(),
            Easing::Linear,
        )];
        assert_eq!(evaluate(&texts, 1.9).as_deref(), Some("3"));
        assert_eq!(evaluate(&texts, 2.0).as_deref(), Some("2"));
    }

    #[test]
    fn animated_vector_binding() {
        let binding = VarBinding::AnimatedVector(vec![
            vec![ev(0, 2, 0.0, 1.0, Easing::Linear)],
            vec![],
        ]);
        assert_eq!(
            evaluate_binding(&binding, 1.0),
            Some(ShaderValue::Vec2([0.5, 0.0]))
        );
    }

    fn monotone_easing() -> impl Strategy<Value = Easing> {
        prop::sample::select(
            Easing::NAMED
                .iter()
                .copied()
                .filter(|e| !e.may_overshoot())
                .collect::<Vec<_>>(),
        )
    }

    fn any_easing() -> impl Strategy<Value = Easing> {
        prop_oneof![
            prop::sample::select(Easing::NAMED.to_vec()),
            (0.0..1.0f64, -1.0..2.0f64, 0.0..1.0f64, -1.0..2.0f64)
                .prop_map(|(a, b, c, d)| Easing::Bezier([a, b, c, d])),
        ]
    }

    proptest! {
        #[test]
        fn boundary_closure(
            start in -8i32..8,
            len in 1i32..8,
            from in -1000.0..1000.0f64,
            to in -1000.0..1000.0f64,
            easing in any_easing(),
            after in 0.0..10.0f64,
        ) {
            let events = vec![ev(start, start + len, from, to, easing)];
            let at_start = evaluate(&events, start as f64).unwrap();
            prop_assert!((at_start - from).abs() < 1e-6);
            let at_end = evaluate(&events, (start + len) as f64 + after).unwrap();
            prop_assert_eq!(at_end, to);
        }

        #[test]
        fn monotone_families_never_overshoot(
            from in -1000.0..1000.0f64,
            to in -1000.0..1000.0f64,
            easing in monotone_easing(),
            beat in 0.0..4.0f64,
        ) {
            let events = vec![ev(0, 4, from, to, easing)];
            let v = evaluate(&events, beat).unwrap();
            prop_assert!(v >= from.min(to) - 1e-9 && v <= from.max(to) + 1e-9);
        }

        #[test]
        fn evaluation_is_deterministic(
            easing in any_easing(),
            beat in -2.0..6.0f64,
        ) {
            let events = vec![ev(0, 2, 3.0, -3.0, easing), ev(2, 4, 1.0, 9.0, easing)];
            let first = evaluate(&events, beat);
            let again = evaluate(&events.clone(), beat);
            prop_assert_eq!(first, again);
        }
    }
}
