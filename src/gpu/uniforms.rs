//! Uniform block of post-processing shaders.
//!
//! A pass shader declares its variables as `struct Params` in WGSL. A trailing comment of the
//! form `// %0.5%` or `// %1.0, 0.2, 0.2%` gives a field's default. `time` and `screen_size` are
//! filled in by the compositor on every pass.

use crate::chart::ShaderValue;

pub const TIME: &str = "time";
pub const SCREEN_SIZE: &str = "screen_size";
const PARAMS: &str = "Params";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    F32,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    fn from_naga(inner: &naga::TypeInner) -> Option<Self> {
        match *inner {
            naga::TypeInner::Scalar(naga::Scalar::F32) => Some(UniformKind::F32),
            naga::TypeInner::Vector {
                size,
                scalar: naga::Scalar::F32,
            } => Some(match size {
                naga::VectorSize::Bi => UniformKind::Vec2,
                naga::VectorSize::Tri => UniformKind::Vec3,
                naga::VectorSize::Quad => UniformKind::Vec4,
            }),
            _ => None,
        }
    }

    pub fn components(self) -> usize {
        match self {
            UniformKind::F32 => 1,
            UniformKind::Vec2 => 2,
            UniformKind::Vec3 => 3,
            UniformKind::Vec4 => 4,
        }
    }

    /// WGSL uniform address space alignment in bytes.
    pub fn align(self) -> usize {
        match self {
            UniformKind::F32 => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 | UniformKind::Vec4 => 16,
        }
    }

    pub fn size(self) -> usize {
        4 * self.components()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
    pub default: [f32; 4],
}

#[derive(Clone, Debug, PartialEq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: usize,
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// `(member, default)` for every `name: type, // %..%` line in the `Params` body.
fn default_comments(source: &str) -> Vec<(String, [f32; 4])> {
    let Some(start) = source.find(&format!("struct {PARAMS}")) else {
        return Vec::new();
    };
    let body = &source[start..];
    let body = match body.find('}') {
        Some(end) => &body[..end],
        None => body,
    };
    let mut out = Vec::new();
    for line in body.lines() {
        let Some((decl, comment)) = line.split_once("//") else {
            continue;
        };
        let Some(default) = parse_default(comment) else {
            continue;
        };
        // the comment belongs to the last member declared on its line
        let name = decl
            .split(',')
            .filter_map(|part| part.split_once(':'))
            .filter_map(|(name, _)| name.trim().rsplit(['{', ' ', '\t']).next())
            .last();
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            out.push((name.to_string(), default));
        }
    }
    out
}

fn parse_default(comment: &str) -> Option<[f32; 4]> {
    let start = comment.find('%')?;
    let rest = &comment[start + 1..];
    let end = rest.find('%')?;
    let mut out = [0.0f32; 4];
    for (slot, part) in out.iter_mut().zip(rest[..end].split(',')) {
        *slot = part.trim().parse().ok()?;
    }
    Some(out)
}

impl UniformLayout {
    /// Layout of a shader that declares nothing but the built-ins.
    pub fn builtin() -> Self {
        let mut layout = UniformLayout {
            fields: Vec::new(),
            size: 0,
        };
        layout.push(TIME, UniformKind::F32, [0.0; 4]);
        layout.push(SCREEN_SIZE, UniformKind::Vec2, [0.0; 4]);
        layout.finish();
        layout
    }

    /// Reads `struct Params` from WGSL source. Names, types and offsets come from the parsed
    /// module; only the default comments are read from the text. Returns the built-in layout
    /// when the source declares no such struct or does not parse, and a list of members that
    /// cannot be filled.
    pub fn parse(source: &str) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let module = match naga::front::wgsl::parse_str(source) {
            Ok(module) => module,
            Err(e) => {
                warnings.push(format!("cannot read uniforms: {}", e.message()));
                return (UniformLayout::builtin(), warnings);
            }
        };
        let Some((_, params)) = module
            .types
            .iter()
            .find(|(_, ty)| ty.name.as_deref() == Some(PARAMS))
        else {
            return (UniformLayout::builtin(), warnings);
        };
        let naga::TypeInner::Struct { members, span } = &params.inner else {
            return (UniformLayout::builtin(), warnings);
        };

        let defaults = default_comments(source);
        let mut fields = Vec::new();
        for member in members {
            let Some(name) = member.name.as_deref() else {
                continue;
            };
            let Some(kind) = UniformKind::from_naga(&module.types[member.ty].inner) else {
                warnings.push(format!("uniform `{name}` has an unsupported type"));
                continue;
            };
            fields.push(UniformField {
                name: name.to_string(),
                kind,
                offset: member.offset as usize,
                default: defaults
                    .iter()
                    .find(|(n, _)| n == name)
                    .map_or([0.0; 4], |(_, d)| *d),
            });
        }
        let layout = UniformLayout {
            fields,
            size: round_up((*span as usize).max(1), 16),
        };
        (layout, warnings)
    }

    fn push(&mut self, name: &str, kind: UniformKind, default: [f32; 4]) {
        let offset = round_up(self.size, kind.align());
        self.fields.push(UniformField {
            name: name.to_string(),
            kind,
            offset,
            default,
        });
        self.size = offset + kind.size();
    }

    fn finish(&mut self) {
        self.size = round_up(self.size.max(1), 16);
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Buffer size in bytes, a multiple of 16.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Fills the uniform buffer: declared defaults first, then the bindings, then the built-ins.
    /// Bindings the shader does not declare, or whose shape does not fit, are skipped and
    /// reported.
    pub fn pack(
        &self,
        time: f64,
        screen_size: (u32, u32),
        bindings: &[(String, ShaderValue)],
    ) -> (Vec<u8>, Vec<String>) {
        let mut bytes = vec![0u8; self.size];
        let mut warnings = Vec::new();
        let mut write = |field: &UniformField, values: &[f32]| {
            for (i, v) in values.iter().take(field.kind.components()).enumerate() {
                let at = field.offset + 4 * i;
                bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
            }
        };

        for field in &self.fields {
            write(field, &field.default);
        }
        for (name, value) in bindings {
            let Some(field) = self.field(name) else {
                warnings.push(format!("uniform `{name}` is not declared, skipped"));
                continue;
            };
            let components = value.components();
            if components.len() != field.kind.components() {
                warnings.push(format!(
                    "uniform `{name}` expects {} components, got {}; default kept",
                    field.kind.components(),
                    components.len()
                ));
                continue;
            }
            let values: Vec<f32> = components.iter().map(|v| *v as f32).collect();
            write(field, &values);
        }
        if let Some(field) = self.field(TIME) {
            write(field, &[time as f32]);
        }
        if let Some(field) = self.field(SCREEN_SIZE) {
            write(field, &[screen_size.0 as f32, screen_size.1 as f32]);
        }
        (bytes, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
struct Params {
    time: f32,
    screen_size: vec2<f32>,
    power: f32, // %0.4%
    tint: vec3<f32>, // %1.0, 0.5, 0.25%
    extra: vec4f,
}
@group(0) @binding(2) var<uniform> params: Params;
"#;

    fn read_f32(bytes: &[u8], at: usize) -> f32 {
        f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn offsets_follow_wgsl_alignment() {
        let (layout, warnings) = UniformLayout::parse(SOURCE);
        assert!(warnings.is_empty());
        let offsets: Vec<usize> = layout.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16, 32, 48]);
        assert_eq!(layout.size(), 64);
    }

    #[test]
    fn defaults_bindings_and_builtins() {
        let (layout, _) = UniformLayout::parse(SOURCE);
        let (bytes, warnings) = layout.pack(
            2.5,
            (1350, 900),
            &[
                ("tint".to_string(), ShaderValue::Vec3([0.0, 1.0, 0.0])),
                ("glow".to_string(), ShaderValue::Float(1.0)),
                ("power".to_string(), ShaderValue::Vec2([1.0, 1.0])),
            ],
        );
        assert_eq!(warnings.len(), 2);
        assert_eq!(read_f32(&bytes, 0), 2.5);
        assert_eq!(read_f32(&bytes, 8), 1350.0);
        assert_eq!(read_f32(&bytes, 12), 900.0);
        // mismatched shape keeps the declared default
        assert_eq!(read_f32(&bytes, 16), 0.4);
        assert_eq!(read_f32(&bytes, 32), 0.0);
        assert_eq!(read_f32(&bytes, 36), 1.0);
    }

    #[test]
    fn missing_struct_means_builtins_only() {
        let (layout, warnings) = UniformLayout::parse("@fragment fn fs_main() {}");
        assert!(warnings.is_empty());
        assert_eq!(layout, UniformLayout::builtin());
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn unsupported_members_keep_later_offsets() {
        let (layout, warnings) = UniformLayout::parse(
            "struct Params {\n time: f32,\n m: mat4x4<f32>,\n gain: f32, // %0.5%\n}",
        );
        assert_eq!(warnings.len(), 1);
        let names: Vec<&str> = layout.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["time", "gain"]);
        // the matrix still occupies 16..80
        let gain = layout.field("gain").unwrap();
        assert_eq!(gain.offset, 80);
        assert_eq!(gain.default[0], 0.5);
        assert_eq!(layout.size(), 96);

        let (bytes, _) = layout.pack(0.0, (1, 1), &[]);
        assert_eq!(read_f32(&bytes, 80), 0.5);
    }

    #[test]
    fn single_line_struct() {
        let (layout, warnings) =
            UniformLayout::parse("struct Params { time: f32, gain: f32, tint: vec3f }");
        assert!(warnings.is_empty());
        let offsets: Vec<(&str, usize)> = layout
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.offset))
            .collect();
        assert_eq!(offsets, vec![("time", 0), ("gain", 4), ("tint", 16)]);
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn unparsable_source_falls_back_to_builtins() {
        let (layout, warnings) = UniformLayout::parse("struct Params { time: f32");
        assert_eq!(layout, UniformLayout::builtin());
        assert_eq!(warnings.len(), 1);
    }
}
