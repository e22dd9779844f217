pub mod animator;
pub mod camera;
pub mod contact;
pub mod error;
pub mod field;
pub mod geometry;
pub mod headless;
pub mod initialize;
pub mod render;
pub mod state;

pub use error::{FieldError, FieldResult};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FieldParams {
  /// Half-width of the bounding cube particles reflect off.
  pub bound: f32,
  pub attraction_radius: f32,
  /// Fraction of the distance to the pointer target covered per tick.
  pub attraction_strength: f32,
  /// Scale from normalised pointer coordinates into world units.
  pub pointer_reach: f32,
  pub max_speed: f32,
  pub size_range: [f32; 2],
  pub desktop_particles: u32,
  pub mobile_particles: u32,
  /// Logical width below which the smaller particle count is used.
  pub mobile_breakpoint: f32,
  pub point_size: f32,
  /// Cloud rotation rate around x and y, radians per second.
  pub cloud_spin: [f32; 2],
}

impl Default for FieldParams {
  fn default() -> Self {
    Self {
      bound: 10.0,
      attraction_radius: 3.0,
      attraction_strength: 0.01,
      pointer_reach: 5.0,
      max_speed: 0.01,
      size_range: [1.0, 4.0],
      desktop_particles: 500,
      mobile_particles: 150,
      mobile_breakpoint: 768.0,
      point_size: 0.15,
      cloud_spin: [0.03, 0.05],
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pulse {
  Sine,
  Cosine,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShellParams {
  pub radius: f32,
  pub detail: u32,
  pub spin: [f32; 2],
  pub pulse_amplitude: f32,
  pub pulse: Pulse,
  pub color: [f32; 3],
  pub opacity: f32,
}

impl ShellParams {
  pub fn outer() -> Self {
    Self {
      radius: 2.0,
      detail: 2,
      spin: [0.3, 0.5],
      pulse_amplitude: 0.1,
      pulse: Pulse::Sine,
      color: rgb(0xA855F7),
      opacity: 0.3,
    }
  }

  pub fn inner() -> Self {
    Self {
      radius: 1.5,
      detail: 2,
      spin: [-0.4, -0.6],
      pulse_amplitude: 0.1,
      pulse: Pulse::Cosine,
      color: rgb(0x3B82F6),
      opacity: 0.2,
    }
  }
}

pub struct CameraParams {
  pub fovy: f32,
  pub znear: f32,
  pub zfar: f32,
  pub distance: f32,
  /// How far the eye follows the pointer on x and y.
  pub sway: f32,
}

impl Default for CameraParams {
  fn default() -> Self {
    Self {
      fovy: 75.0,
      znear: 0.1,
      zfar: 1000.0,
      distance: 8.0,
      sway: 0.5,
    }
  }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
  pub pos: [f32; 3],
  pub vel: [f32; 3],
  pub color: [f32; 3],
  pub size: f32,
}

/// Splits a `0xRRGGBB` literal into normalised channels.
pub fn rgb(hex: u32) -> [f32; 3] {
  [
    ((hex >> 16) & 0xff) as f32 / 255.0,
    ((hex >> 8) & 0xff) as f32 / 255.0,
    (hex & 0xff) as f32 / 255.0,
  ]
}
