use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use super::font;
use crate::chart::{Judgement, NoteKind};
use crate::config::SkinConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn from_fn(width: u32, height: u32, mut pixel: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                rgba.extend_from_slice(&pixel(x, y));
            }
        }
        Texture {
            rgba,
            width,
            height,
        }
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        Texture::from_fn(width, height, |_, _| color)
    }
}

pub fn decode_image(bytes: &[u8]) -> anyhow::Result<Texture> {
    let img = image::load_from_memory(bytes).context("failed to decode image")?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Texture {
        rgba: rgba.into_raw(),
        width,
        height,
    })
}

pub fn load_image(path: &Path) -> anyhow::Result<Texture> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    decode_image(&bytes).with_context(|| format!("failed to decode {}", path.display()))
}

/// Handle into a [`TextureStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Default)]
pub struct TextureStore {
    textures: Vec<Texture>,
}

impl TextureStore {
    pub fn insert(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() as u32 - 1)
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// What a note draws with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteSprite {
    Single(TextureId),
    Hold {
        head: TextureId,
        body: TextureId,
        tail: TextureId,
    },
}

/// Read-only per-frame view of skin, textures and glyphs.
pub trait ResourceProvider {
    fn note_sprite(&self, kind: NoteKind, highlighted: bool) -> NoteSprite;
    /// Animation frames for a perfect or good hit; empty for anything else.
    fn hit_fx_frames(&self, judgement: Judgement) -> &[TextureId];
    fn line_texture(&self, name: &str) -> Option<TextureId>;
    fn background(&self) -> Option<TextureId>;
    fn glyph(&self, c: char) -> Option<TextureId>;
    /// 1x1 opaque white, used for solid fills.
    fn white(&self) -> TextureId;
    fn texture_size(&self, id: TextureId) -> (u32, u32);
    fn texture(&self, id: TextureId) -> Option<&Texture>;
    fn skin_config(&self) -> &SkinConfig;
}

const HIT_FX_FRAMES: u32 = 16;

pub struct Skin {
    store: TextureStore,
    notes: HashMap<(NoteKind, bool), NoteSprite>,
    perfect_fx: Vec<TextureId>,
    good_fx: Vec<TextureId>,
    glyphs: HashMap<char, TextureId>,
    line_textures: HashMap<String, TextureId>,
    background: Option<TextureId>,
    white: TextureId,
    config: SkinConfig,
}

fn note_bar(width: u32, height: u32, fill: [u8; 3], highlight: bool) -> Texture {
    const GOLD: [u8; 4] = [255, 236, 160, 255];
    Texture::from_fn(width, height, |x, y| {
        let edge = x.min(width - 1 - x).min(y).min(height - 1 - y);
        if highlight && edge < 4 {
            return GOLD;
        }
        if edge < 2 {
            return [255, 255, 255, 255];
        }
        [fill[0], fill[1], fill[2], 255]
    })
}

fn hold_body(width: u32, height: u32, fill: [u8; 3], highlight: bool) -> Texture {
    Texture::from_fn(width, height, |x, _| {
        let edge = x.min(width - 1 - x);
        if highlight && edge < 4 {
            return [255, 236, 160, 255];
        }
        if edge < 2 {
            return [255, 255, 255, 220];
        }
        [fill[0], fill[1], fill[2], 200]
    })
}

/// Square ring that grows and fades over the frame sequence; white so it can be tinted.
fn hit_fx_frame(frame: u32, frames: u32) -> Texture {
    const SIZE: u32 = 128;
    let p = frame as f64 / (frames - 1).max(1) as f64;
    let half = 20.0 + 40.0 * p;
    let thickness = 1.0 + 6.0 * (1.0 - p);
    let alpha = (255.0 * (1.0 - p)).round() as u8;
    let center = SIZE as f64 / 2.0;
    Texture::from_fn(SIZE, SIZE, |x, y| {
        let dx = (x as f64 + 0.5 - center).abs();
        let dy = (y as f64 + 0.5 - center).abs();
        let d = dx.max(dy);
        if d <= half && d >= half - thickness {
            [255, 255, 255, alpha]
        } else {
            [0, 0, 0, 0]
        }
    })
}

const GLYPH_SCALE: u32 = 4;

fn glyph_texture(rows: [u8; 7]) -> Texture {
    let width = font::GLYPH_WIDTH * GLYPH_SCALE;
    let height = font::GLYPH_HEIGHT * GLYPH_SCALE;
    Texture::from_fn(width, height, |x, y| {
        let row = rows[(y / GLYPH_SCALE) as usize];
        let column = x / GLYPH_SCALE;
        if row & (0x10 >> column) != 0 {
            [255, 255, 255, 255]
        } else {
            [255, 255, 255, 0]
        }
    })
}

const TAP_RGB: [u8; 3] = [10, 195, 255];
const DRAG_RGB: [u8; 3] = [240, 215, 80];
const FLICK_RGB: [u8; 3] = [255, 80, 100];

const NOTE_FILES: [(NoteKind, &str); 3] = [
    (NoteKind::Tap, "tap"),
    (NoteKind::Drag, "drag"),
    (NoteKind::Flick, "flick"),
];

impl Skin {
    /// A complete skin drawn procedurally, so nothing on disk is required.
    pub fn fallback(config: SkinConfig) -> Self {
        let mut store = TextureStore::default();
        let white = store.insert(Texture::solid(1, 1, [255, 255, 255, 255]));

        let mut notes = HashMap::new();
        for highlight in [false, true] {
            for (kind, rgb) in [
                (NoteKind::Tap, TAP_RGB),
                (NoteKind::Drag, DRAG_RGB),
                (NoteKind::Flick, FLICK_RGB),
            ] {
                let id = store.insert(note_bar(256, 28, rgb, highlight));
                notes.insert((kind, highlight), NoteSprite::Single(id));
            }
            let hold = NoteSprite::Hold {
                head: store.insert(note_bar(256, 28, TAP_RGB, highlight)),
                body: store.insert(hold_body(256, 64, TAP_RGB, highlight)),
                tail: store.insert(note_bar(256, 8, TAP_RGB, highlight)),
            };
            notes.insert((NoteKind::Hold, highlight), hold);
        }

        let perfect_fx: Vec<TextureId> = (0..HIT_FX_FRAMES)
            .map(|f| store.insert(hit_fx_frame(f, HIT_FX_FRAMES)))
            .collect();
        let good_fx = perfect_fx.clone();

        let mut glyphs = HashMap::new();
        for c in font::supported_chars() {
            if let Some(rows) = font::glyph_rows(c) {
                glyphs.insert(c, store.insert(glyph_texture(rows)));
            }
        }

        Skin {
            store,
            notes,
            perfect_fx,
            good_fx,
            glyphs,
            line_textures: HashMap::new(),
            background: None,
            white,
            config,
        }
    }

    /// Loads a skin directory; every missing file falls back to the procedural texture.
    ///
    /// Layout: `tap.png`, `drag.png`, `flick.png`, `hold_head.png`, `hold_body.png`,
    /// `hold_tail.png` (each with an optional `_hl` highlighted variant), `hit_fx-N.png` frames
    /// and optional `hit_fx_good-N.png` frames.
    pub fn load(dir: &Path, config: SkinConfig) -> Self {
        let mut skin = Skin::fallback(config);
        for highlight in [false, true] {
            let suffix = if highlight { "_hl" } else { "" };
            for (kind, name) in NOTE_FILES {
                if let Some(tex) = try_load_skin_texture(dir, &format!("{name}{suffix}")) {
                    let id = skin.store.insert(tex);
                    skin.notes.insert((kind, highlight), NoteSprite::Single(id));
                }
            }
            if let Some(NoteSprite::Hold { head, body, tail }) =
                skin.notes.get(&(NoteKind::Hold, highlight)).copied()
            {
                let mut part = |name: &str, fallback: TextureId| {
                    match try_load_skin_texture(dir, &format!("{name}{suffix}")) {
                        Some(tex) => skin.store.insert(tex),
                        None => fallback,
                    }
                };
                let hold = NoteSprite::Hold {
                    head: part("hold_head", head),
                    body: part("hold_body", body),
                    tail: part("hold_tail", tail),
                };
                skin.notes.insert((NoteKind::Hold, highlight), hold);
            }
        }

        if let Some(frames) = try_load_skin_animation(dir, "hit_fx") {
            skin.perfect_fx = frames.into_iter().map(|t| skin.store.insert(t)).collect();
            skin.good_fx = skin.perfect_fx.clone();
        }
        if let Some(frames) = try_load_skin_animation(dir, "hit_fx_good") {
            skin.good_fx = frames.into_iter().map(|t| skin.store.insert(t)).collect();
        }
        log::info!(
            "skin loaded from {} ({} textures)",
            dir.display(),
            skin.store.len()
        );
        skin
    }

    pub fn set_background(&mut self, texture: Texture) {
        self.background = Some(self.store.insert(texture));
    }

    pub fn add_line_texture(&mut self, name: &str, texture: Texture) {
        let id = self.store.insert(texture);
        self.line_textures.insert(name.to_string(), id);
    }

    /// Loads every texture the chart's judge lines reference from `dir`.
    pub fn load_line_textures<'a>(&mut self, dir: &Path, names: impl Iterator<Item = &'a str>) {
        for name in names {
            if self.line_textures.contains_key(name) {
                continue;
            }
            match load_image(&dir.join(name)) {
                Ok(tex) => self.add_line_texture(name, tex),
                Err(e) => log::warn!("line texture {name} unavailable, drawing a plain line: {e:#}"),
            }
        }
    }

    pub fn store(&self) -> &TextureStore {
        &self.store
    }
}

fn try_load_skin_texture(dir: &Path, name: &str) -> Option<Texture> {
    let path = dir.join(format!("{name}.png"));
    if !path.exists() {
        log::debug!("skin texture {name} not found, using the built-in one");
        return None;
    }
    match load_image(&path) {
        Ok(tex) => Some(tex),
        Err(e) => {
            log::warn!("skin texture {name} failed to load: {e:#}");
            None
        }
    }
}

fn try_load_skin_animation(dir: &Path, name: &str) -> Option<Vec<Texture>> {
    let mut frames = Vec::new();
    for frame in 0.. {
        match try_load_skin_texture(dir, &format!("{name}-{frame}")) {
            Some(tex) => frames.push(tex),
            None => break,
        }
    }
    if frames.is_empty() { None } else { Some(frames) }
}

impl ResourceProvider for Skin {
    fn note_sprite(&self, kind: NoteKind, highlighted: bool) -> NoteSprite {
        match self.notes.get(&(kind, highlighted)) {
            Some(sprite) => *sprite,
            None => NoteSprite::Single(self.white),
        }
    }

    fn hit_fx_frames(&self, judgement: Judgement) -> &[TextureId] {
        match judgement {
            Judgement::Perfect => &self.perfect_fx,
            Judgement::Good => &self.good_fx,
            Judgement::Bad | Judgement::None => &[],
        }
    }

    fn line_texture(&self, name: &str) -> Option<TextureId> {
        self.line_textures.get(name).copied()
    }

    fn background(&self) -> Option<TextureId> {
        self.background
    }

    fn glyph(&self, c: char) -> Option<TextureId> {
        self.glyphs
            .get(&c)
            .or_else(|| self.glyphs.get(&c.to_ascii_uppercase()))
            .copied()
    }

    fn white(&self) -> TextureId {
        self.white
    }

    fn texture_size(&self, id: TextureId) -> (u32, u32) {
        match self.store.get(id) {
            Some(tex) => (tex.width, tex.height),
            None => (1, 1),
        }
    }

    fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.store.get(id)
    }

    fn skin_config(&self) -> &SkinConfig {
        &self.config
    }
}
