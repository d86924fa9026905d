// Renderer setup and upload failures. Mesh generation itself cannot fail.

use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("No GPU adapter compatible with the window surface")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Surface reports no supported texture formats")]
    NoSurfaceFormat,

    #[error("{label} needs {bytes} bytes, device buffer limit is {limit}")]
    MeshTooLarge { label: &'static str, bytes: u64, limit: u64 },

    #[error("Shader '{label}' failed validation: {message}")]
    Shader { label: &'static str, message: String },
}
