use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::beat::{Beat, BpmList};
use super::event::Event;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(untagged)]
pub enum ShaderValue {
    Float(f64),
    Vec2([f64; 2]),
    Vec3([f64; 3]),
    Vec4([f64; 4]),
}

impl ShaderValue {
    pub fn components(&self) -> &[f64] {
        match self {
            ShaderValue::Float(v) => std::slice::from_ref(v),
            ShaderValue::Vec2(v) => v,
            ShaderValue::Vec3(v) => v,
            ShaderValue::Vec4(v) => v,
        }
    }

    pub fn from_components(values: &[f64]) -> Option<Self> {
        match *values {
            [x] => Some(ShaderValue::Float(x)),
            [x, y] => Some(ShaderValue::Vec2([x, y])),
            [x, y, z] => Some(ShaderValue::Vec3([x, y, z])),
            [x, y, z, w] => Some(ShaderValue::Vec4([x, y, z, w])),
            _ => None,
        }
    }
}

/// A uniform value: fixed, or driven by one event sequence per component.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum VarBinding {
    Literal(ShaderValue),
    Animated(Vec<Event<f64>>),
    AnimatedVector(Vec<Vec<Event<f64>>>),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShaderEffect {
    pub shader: String,
    /// Global passes run after the free-floating UI is drawn and therefore affect it.
    #[serde(default)]
    pub global: bool,
    pub start: Beat,
    pub end: Beat,
    #[serde(skip)]
    pub start_seconds: f64,
    #[serde(skip)]
    pub end_seconds: f64,
    #[serde(default)]
    pub vars: BTreeMap<String, VarBinding>,
}

impl ShaderEffect {
    pub fn new(shader: &str, global: bool, start: Beat, end: Beat) -> Self {
        ShaderEffect {
            shader: shader.to_string(),
            global,
            start,
            end,
            start_seconds: 0.0,
            end_seconds: 0.0,
            vars: BTreeMap::new(),
        }
    }

    pub fn cache_seconds(&mut self, bpm: &BpmList) {
        self.start_seconds = bpm.beat_to_seconds(self.start.value());
        self.end_seconds = bpm.beat_to_seconds(self.end.value());
    }

    pub fn is_active(&self, now: f64) -> bool {
        self.start_seconds <= now && now <= self.end_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_parse_by_shape() {
        let json = r#"{
            "shader": "vignette",
            "start": [0, 0, 1],
            "end": [8, 0, 1],
            "vars": {
                "power": 0.4,
                "tint": [1.0, 0.5, 0.5],
                "radius": [{"start":[0,0,1],"end":[4,0,1],"start_value":0.2,"end_value":0.8}]
            }
        }"#;
        let effect: ShaderEffect = serde_json::from_str(json).unwrap();
        assert!(!effect.global);
        assert_eq!(
            effect.vars["power"],
            VarBinding::Literal(ShaderValue::Float(0.4))
        );
        assert_eq!(
            effect.vars["tint"],
            VarBinding::Literal(ShaderValue::Vec3([1.0, 0.5, 0.5]))
        );
        assert!(matches!(effect.vars["radius"], VarBinding::Animated(ref e) if e.len() == 1));
    }

    #[test]
    fn active_window_is_inclusive() {
        let mut effect = ShaderEffect::new("grayscale", true, Beat::whole(2), Beat::whole(4));
        effect.cache_seconds(&BpmList::default());
        assert!(!effect.is_active(0.99));
        assert!(effect.is_active(1.0));
        assert!(effect.is_active(2.0));
        assert!(!effect.is_active(2.01));
    }
}
