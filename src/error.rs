use std::fmt;

/// Fatal start-up failures. No frame can be drawn without these resources.
#[derive(Debug)]
pub enum RenderInitError {
    /// Another renderer is already alive in this process.
    AlreadyRunning,
    Surface(wgpu::CreateSurfaceError),
    NoAdapter,
    /// The surface reports no texture format the adapter can render to.
    UnsupportedSurface,
    Device(wgpu::RequestDeviceError),
    /// Shader compilation or pipeline validation failed.
    Pipeline { label: &'static str, message: String },
}

impl fmt::Display for RenderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderInitError::AlreadyRunning => {
                write!(f, "a renderer is already running; one renderer per window is supported")
            }
            RenderInitError::Surface(e) => write!(f, "failed to create window surface: {e}"),
            RenderInitError::NoAdapter => write!(f, "no compatible GPU adapter found"),
            RenderInitError::UnsupportedSurface => {
                write!(f, "window surface offers no texture format for this adapter")
            }
            RenderInitError::Device(e) => write!(f, "failed to create GPU device: {e}"),
            RenderInitError::Pipeline { label, message } => {
                write!(f, "failed to build {label}: {message}")
            }
        }
    }
}

impl std::error::Error for RenderInitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderInitError::Surface(e) => Some(e),
            RenderInitError::Device(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for RenderInitError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        RenderInitError::Surface(e)
    }
}

impl From<wgpu::RequestDeviceError> for RenderInitError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        RenderInitError::Device(e)
    }
}
