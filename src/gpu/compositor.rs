use super::uniforms::UniformLayout;
use crate::error::CompositorError;
use crate::render::{PassOutcome, ShaderPass};

#[derive(Clone, Debug, PartialEq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SourceState {
    Ready(ShaderSource),
    /// Still loading; ask again next frame.
    Pending,
    Missing,
}

pub trait ShaderSourceProvider {
    fn poll(&mut self, name: &str) -> SourceState;
}

/// The GPU side of a post-processing pass.
pub trait ShaderDevice {
    /// Everything a pass needs besides the program: target surface, quad geometry, samplers.
    type Context;
    type Program;
    type Surface;

    fn create_context(&mut self, size: (u32, u32)) -> Result<Self::Context, CompositorError>;
    fn compile(
        &mut self,
        context: &mut Self::Context,
        name: &str,
        source: &ShaderSource,
        layout: &UniformLayout,
    ) -> Result<Self::Program, CompositorError>;
    /// Draws the full-screen quad with `input` bound, leaving the result in the context's target.
    fn run_pass(
        &mut self,
        context: &mut Self::Context,
        program: &Self::Program,
        uniforms: &[u8],
        input: &Self::Surface,
    ) -> Result<(), CompositorError>;
    /// Copies the context's target back into `surface`.
    fn copy_output(
        &mut self,
        context: &mut Self::Context,
        surface: &Self::Surface,
    ) -> Result<(), CompositorError>;
    fn surface_size(&self, surface: &Self::Surface) -> (u32, u32);
}

struct CachedProgram<P> {
    name: String,
    program: P,
    layout: UniformLayout,
}

/// Runs shader passes over a surface, creating its GPU context on first use and keeping the
/// most recently used program compiled.
pub struct ShaderCompositor<D: ShaderDevice> {
    device: D,
    context: Option<D::Context>,
    cached: Option<CachedProgram<D::Program>>,
}

impl<D: ShaderDevice> ShaderCompositor<D> {
    pub fn new(device: D) -> Self {
        ShaderCompositor {
            device,
            context: None,
            cached: None,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn cached_program(&self) -> Option<&str> {
        self.cached.as_ref().map(|c| c.name.as_str())
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Drops the context and the cached program; the next pass starts from scratch.
    pub fn release(&mut self) {
        self.cached = None;
        self.context = None;
    }

    /// Applies `pass` to `surface`. On error the surface is left as it was.
    pub fn apply(
        &mut self,
        sources: &mut dyn ShaderSourceProvider,
        pass: &ShaderPass,
        surface: &D::Surface,
    ) -> Result<PassOutcome, CompositorError> {
        let size = self.device.surface_size(surface);
        if self.context.is_none() {
            log::debug!("creating shader compositor context {}x{}", size.0, size.1);
            self.context = Some(self.device.create_context(size)?);
        }
        let Some(context) = self.context.as_mut() else {
            return Err(CompositorError::NoContext("context was not created".to_string()));
        };

        let is_cached = self
            .cached
            .as_ref()
            .is_some_and(|c| c.name == pass.shader);
        if !is_cached {
            self.cached = None;
            let source = match sources.poll(&pass.shader) {
                SourceState::Ready(source) => source,
                SourceState::Pending => return Ok(PassOutcome::Deferred),
                SourceState::Missing => {
                    return Err(CompositorError::MissingSource(pass.shader.clone()));
                }
            };
            let (layout, warnings) = UniformLayout::parse(&source.fragment);
            for warning in warnings {
                log::warn!("shader `{}`: {warning}", pass.shader);
            }
            log::debug!("compiling shader `{}`", pass.shader);
            let program = self
                .device
                .compile(context, &pass.shader, &source, &layout)?;
            self.cached = Some(CachedProgram {
                name: pass.shader.clone(),
                program,
                layout,
            });
        }
        let Some(cached) = self.cached.as_ref() else {
            return Err(CompositorError::NoContext("no program".to_string()));
        };

        let (uniforms, warnings) = cached.layout.pack(pass.time, size, &pass.uniforms);
        for warning in warnings {
            log::warn!("shader `{}`: {warning}", pass.shader);
        }
        self.device
            .run_pass(context, &cached.program, &uniforms, surface)?;
        self.device.copy_output(context, surface)?;
        Ok(PassOutcome::Applied)
    }
}
