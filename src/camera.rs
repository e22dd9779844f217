use crate::field::Pointer;
use crate::CameraParams;
use cgmath::{Matrix4, Point3, SquareMatrix, Vector3};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Size of the area the field is drawn into, in physical pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
  pub width: u32,
  pub height: u32,
}

impl Viewport {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  /// The first layout pass may report no size at all.
  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }
}

/// Output surface dimensions and the aspect ratio derived from them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Projection {
  pub viewport: Viewport,
  pub aspect: f32,
}

impl Projection {
  /// `None` for an empty viewport, which has no meaningful aspect.
  pub fn from_viewport(viewport: Viewport) -> Option<Self> {
    if viewport.is_empty() {
      return None;
    }
    Some(Self {
      viewport,
      aspect: viewport.width as f32 / viewport.height as f32,
    })
  }
}

pub struct Camera {
  pub eye: Point3<f32>,
  pub target: Point3<f32>,
  pub up: Vector3<f32>,
  pub aspect: f32,
  pub fovy: f32,
  pub znear: f32,
  pub zfar: f32,
}

impl Camera {
  /// Camera pulled back along +z, swaying with the pointer and always facing the origin.
  pub fn following(pointer: &Pointer, projection: &Projection, params: &CameraParams) -> Self {
    Self {
      eye: Point3::new(pointer.x * params.sway, pointer.y * params.sway, params.distance),
      target: Point3::new(0.0, 0.0, 0.0),
      up: Vector3::unit_y(),
      aspect: projection.aspect,
      fovy: params.fovy,
      znear: params.znear,
      zfar: params.zfar,
    }
  }

  fn view_matrix(&self) -> Matrix4<f32> {
    Matrix4::look_at_rh(self.eye, self.target, self.up)
  }

  fn projection_matrix(&self) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(cgmath::Deg(self.fovy), self.aspect, self.znear, self.zfar)
  }
}

/// View and projection kept apart so particle sprites can be expanded in view space.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
  view: [[f32; 4]; 4],
  proj: [[f32; 4]; 4],
}

impl CameraUniform {
  pub fn new() -> Self {
    Self {
      view: Matrix4::identity().into(),
      proj: Matrix4::identity().into(),
    }
  }

  pub fn update(&mut self, camera: &Camera) {
    self.view = camera.view_matrix().into();
    self.proj = camera.projection_matrix().into();
  }
}

impl Default for CameraUniform {
  fn default() -> Self {
    Self::new()
  }
}
