//! Error types for neon-swarm.
//!
//! GPU bring-up, configuration loading, per-tick numeric validation and the
//! top-level run loop each have their own error type.

use std::fmt;

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The surface reports no usable texture format.
    NoSurfaceFormat,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::NoSurfaceFormat => write!(f, "Surface reports no supported texture format"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur while loading or validating a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read or write the config file.
    Io(std::io::Error),
    /// The file is not valid config JSON.
    Parse(serde_json::Error),
    /// A value is outside its allowed range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// A tick produced state that must not reach the renderer.
///
/// The session rolls back to the pre-tick state when this is returned, so the
/// caller only has to skip drawing the frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TickError {
    /// A node position or velocity became NaN or infinite.
    NonFiniteNode {
        /// Id of the first offending node.
        id: usize,
    },
    /// The camera pose became NaN or infinite.
    NonFiniteCamera,
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickError::NonFiniteNode { id } => write!(f, "Node {} has a non-finite position or velocity", id),
            TickError::NonFiniteCamera => write!(f, "Camera pose is non-finite"),
        }
    }
}

impl std::error::Error for TickError {}

/// Errors that can occur when running the visualization.
#[derive(Debug)]
pub enum SwarmError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// Configuration could not be loaded or is invalid.
    Config(ConfigError),
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwarmError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SwarmError::Window(e) => write!(f, "Failed to create window: {}", e),
            SwarmError::Gpu(e) => write!(f, "GPU error: {}", e),
            SwarmError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SwarmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SwarmError::EventLoop(e) => Some(e),
            SwarmError::Window(e) => Some(e),
            SwarmError::Gpu(e) => Some(e),
            SwarmError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for SwarmError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SwarmError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SwarmError {
    fn from(e: winit::error::OsError) -> Self {
        SwarmError::Window(e)
    }
}

impl From<GpuError> for SwarmError {
    fn from(e: GpuError) -> Self {
        SwarmError::Gpu(e)
    }
}

impl From<ConfigError> for SwarmError {
    fn from(e: ConfigError) -> Self {
        SwarmError::Config(e)
    }
}
