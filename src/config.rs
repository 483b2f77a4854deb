use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

// no default values and no aliases, everything is required.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    pub canvas: CanvasConfig,
    pub display: DisplayConfig,
    pub skin: SkinConfig,
    pub performance: PerformanceConfig,
}

// no default values and no aliases, everything is required.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

// no default values and no aliases, everything is required.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DisplayConfig {
    pub line_thickness: f64,
    pub line_length: f64,
    pub note_width: f64,
    /// Canvas pixels per unit of floor position (speed 1 for one second).
    pub note_speed_px: f64,
    pub text_size: f64,
    pub hit_fx_size: f64,
    pub background_dim: f64,
    pub show_line_numbers: bool,
}

// no default values and no aliases, everything is required.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SkinConfig {
    pub hit_fx_duration: f64,
    pub show_particles: bool,
    pub hold_repeat_fx: bool,
    pub hold_body_tiled: bool,
    pub perfect_rgba: [f64; 4],
    pub good_rgba: [f64; 4],
    pub bad_rgba: [f64; 4],
    pub line_rgba: [f64; 4],
}

// no default values and no aliases, everything is required.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PerformanceConfig {
    pub fps_limiter: f64,
    /// Mailbox or FIFO presentation instead of immediate.
    pub prefer_vrr: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            canvas: CanvasConfig {
                width: 1350,
                height: 900,
            },
            display: DisplayConfig {
                line_thickness: 4.0,
                line_length: 4000.0,
                note_width: 180.0,
                note_speed_px: 120.0,
                text_size: 32.0,
                hit_fx_size: 200.0,
                background_dim: 0.6,
                show_line_numbers: false,
            },
            skin: SkinConfig {
                hit_fx_duration: 0.5,
                show_particles: true,
                hold_repeat_fx: true,
                hold_body_tiled: false,
                perfect_rgba: [1.0, 0.925, 0.627, 0.88],
                good_rgba: [0.706, 0.882, 1.0, 0.92],
                bad_rgba: [0.424, 0.263, 0.263, 1.0],
                line_rgba: [1.0, 1.0, 0.667, 1.0],
            },
            performance: PerformanceConfig {
                fps_limiter: 240.0,
                prefer_vrr: true,
            },
        }
    }
}

impl Settings {
    pub fn canvas_size(&self) -> (f64, f64) {
        (self.canvas.width as f64, self.canvas.height as f64)
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(settings)
}
