//! Error types for the particle field.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
  /// `initialize` was called while a field is already mounted or waiting for layout.
  #[error("field is already mounted")]
  AlreadyMounted,

  /// The operation needs a running field.
  #[error("field is not running")]
  NotRunning,

  /// Mounting failed once a deferred viewport was laid out. The field is torn down.
  #[error("deferred mount failed: {0}")]
  DeferredMount(#[source] Box<FieldError>),

  #[error("failed to create render surface: {0}")]
  Surface(#[from] wgpu::CreateSurfaceError),

  #[error("no compatible GPU adapter found")]
  NoAdapter,

  #[error("failed to create GPU device: {0}")]
  Device(#[from] wgpu::RequestDeviceError),

  #[error("surface has no supported configuration for this adapter")]
  UnsupportedSurface,

  #[error("failed to acquire frame: {0}")]
  Frame(#[from] wgpu::SurfaceError),

  #[error("window error: {0}")]
  Window(String),
}

pub type FieldResult<T> = Result<T, FieldError>;
