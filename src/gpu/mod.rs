pub mod backend;
pub mod batch;
pub mod compositor;
pub mod device;
pub mod source;
pub mod textures;
pub mod types;
pub mod uniforms;

pub use backend::GpuFrameBackend;
pub use compositor::{ShaderCompositor, ShaderDevice, ShaderSource, ShaderSourceProvider, SourceState};
pub use source::{BuiltinShaders, ShaderLoader};
pub use uniforms::UniformLayout;
