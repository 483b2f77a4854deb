use serde::{Deserialize, Serialize};

use super::EventId;
use super::beat::Beat;
use super::easing::Easing;

/// Text events switch to their end text once eased progress reaches this value.
pub const TEXT_SWITCH_PROGRESS: f64 = 1.0;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl From<[u8; 3]> for Color {
    fn from(value: [u8; 3]) -> Self {
        Color::new(value[0], value[1], value[2])
    }
}

impl From<Color> for [u8; 3] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b]
    }
}

/// Values an event can carry.
pub trait Interpolate: Clone {
    /// `t` is eased progress; it may leave `[0, 1]` for overshooting curves.
    fn interpolate(start: &Self, end: &Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(start: &f64, end: &f64, t: f64) -> f64 {
        start + (end - start) * t
    }
}

impl Interpolate for Color {
    fn interpolate(start: &Color, end: &Color, t: f64) -> Color {
        let channel = |a: u8, b: u8| {
            let v = a as f64 + (b as f64 - a as f64) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Color {
            r: channel(start.r, end.r),
            g: channel(start.g, end.g),
            b: channel(start.b, end.b),
        }
    }
}

impl Interpolate for String {
    fn interpolate(start: &String, end: &String, t: f64) -> String {
        if t >= TEXT_SWITCH_PROGRESS {
            end.clone()
        } else {
            start.clone()
        }
    }
}

fn full_range_end() -> f64 {
    1.0
}

/// One animation segment. Times are in beats; `id` is runtime identity and is never serialised.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event<V> {
    #[serde(skip)]
    pub id: EventId,
    pub start: Beat,
    pub end: Beat,
    pub start_value: V,
    pub end_value: V,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default)]
    pub easing_left: f64,
    #[serde(default = "full_range_end")]
    pub easing_right: f64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub link_group: i32,
}

impl<V> Event<V> {
    pub fn new(start: Beat, end: Beat, start_value: V, end_value: V, easing: Easing) -> Self {
        Event {
            id: EventId::default(),
            start,
            end,
            start_value,
            end_value,
            easing,
            easing_left: 0.0,
            easing_right: 1.0,
            disabled: false,
            link_group: 0,
        }
    }

    pub fn constant(start: Beat, end: Beat, value: V) -> Self
    where
        V: Clone,
    {
        Event::new(start, end, value.clone(), value, Easing::Linear)
    }

    /// `[start, end]` intersects `other` with positive length, or both are the same instant.
    pub fn overlaps(&self, start: Beat, end: Beat) -> bool {
        (start < self.end && self.start < end) || (start == self.start && end == self.end)
    }
}

/// Type-erased event, as stored by history records.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyEvent {
    Numeric(Event<f64>),
    Color(Event<Color>),
    Text(Event<String>),
}

impl AnyEvent {
    pub fn id(&self) -> EventId {
        match self {
            AnyEvent::Numeric(e) => e.id,
            AnyEvent::Color(e) => e.id,
            AnyEvent::Text(e) => e.id,
        }
    }

    pub fn set_id(&mut self, id: EventId) {
        match self {
            AnyEvent::Numeric(e) => e.id = id,
            AnyEvent::Color(e) => e.id = id,
            AnyEvent::Text(e) => e.id = id,
        }
    }

    pub fn range(&self) -> (Beat, Beat) {
        match self {
            AnyEvent::Numeric(e) => (e.start, e.end),
            AnyEvent::Color(e) => (e.start, e.end),
            AnyEvent::Text(e) => (e.start, e.end),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AnyEvent::Numeric(_) => "numeric",
            AnyEvent::Color(_) => "color",
            AnyEvent::Text(_) => "text",
        }
    }
}

impl From<Event<f64>> for AnyEvent {
    fn from(event: Event<f64>) -> Self {
        AnyEvent::Numeric(event)
    }
}

impl From<Event<Color>> for AnyEvent {
    fn from(event: Event<Color>) -> Self {
        AnyEvent::Color(event)
    }
}

impl From<Event<String>> for AnyEvent {
    fn from(event: Event<String>) -> Self {
        AnyEvent::Text(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_channels_round_independently() {
        let a = Color::new(0, 100, 255);
        let b = Color::new(255, 100, 0);
        assert_eq!(Color::interpolate(&a, &b, 0.5), Color::new(128, 100, 128));
        assert_eq!(Color::interpolate(&a, &b, 1.4), Color::new(255, 100, 0));
    }

    #[test]
    fn text_is_a_discrete_switch() {
        let a = "ready".to_string();
        let b = "go".to_string();
        assert_eq!(String::interpolate(&a, &b, 0.99), "ready");
        assert_eq!(String::interpolate(&a, &b, 1.0), "go");
    }

    #[test]
    fn touching_events_do_not_overlap() {
        let e = Event::constant(Beat::whole(1), Beat::whole(2), 0.0);
        assert!(!e.overlaps(Beat::whole(2), Beat::whole(3)));
        assert!(!e.overlaps(Beat::whole(0), Beat::whole(1)));
        assert!(e.overlaps(Beat::new(1, 1, 2), Beat::whole(3)));
        let instant = Event::constant(Beat::whole(4), Beat::whole(4), 0.0);
        assert!(instant.overlaps(Beat::whole(4), Beat::whole(4)));
    }

    #[test]
    fn optional_fields_default_on_load() {
        let json = r#"{"start":[0,0,1],"end":[1,0,1],"start_value":0.0,"end_value":10.0}"#;
        let event: Event<f64> = serde_json::from_str(json).unwrap();
        assert_eq!(event.easing, Easing::Linear);
        assert_eq!(event.easing_right, 1.0);
        assert!(!event.disabled);
    }
}
