//! Lifecycle of a mounted particle field.
//!
//! An [`Animator`] moves through `Unstarted -> AwaitingLayout -> Running -> TornDown`.
//! It owns every handle it acquires from its [`Host`] (the pending frame
//! callback, the pointer/resize listeners and the render target) and gives them
//! all back in [`Animator::teardown`], which also runs on drop.

use crate::camera::{Camera, CameraUniform, Projection, Viewport};
use crate::field::{ParticleField, Pointer, Transforms};
use crate::initialize::ParticleSource;
use crate::{CameraParams, FieldError, FieldParams, FieldResult, Particle, ShellParams};
use log::{debug, info};

/// Identifies one requested frame callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Identifies one set of attached pointer and resize listeners.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u64);

/// The view a field is mounted into.
pub trait Host {
  type Target: RenderTarget;

  /// Current size of the mount region.
  fn viewport(&self) -> Viewport;

  /// Asks for [`Animator::frame`] to be called once on the next display refresh.
  fn request_frame(&mut self) -> FrameToken;

  fn cancel_frame(&mut self, token: FrameToken);

  fn attach_listeners(&mut self) -> ListenerHandle;

  fn detach_listeners(&mut self, handle: ListenerHandle);

  fn create_target(&mut self, viewport: Viewport) -> FieldResult<Self::Target>;
}

/// Everything a render target needs to draw one frame.
pub struct Frame<'a> {
  pub particles: &'a [Particle],
  pub transforms: Transforms,
  pub camera: CameraUniform,
  pub elapsed: f32,
}

pub trait RenderTarget {
  fn resize(&mut self, viewport: Viewport);

  fn render(&mut self, frame: &Frame<'_>) -> FieldResult<()>;

  /// Frees buffers, textures and the surface. Called exactly once.
  fn release(&mut self);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
  Unstarted,
  AwaitingLayout,
  Running,
  TornDown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InitOutcome {
  Started,
  /// The viewport had no extent yet; initialisation retries on the next frame.
  Deferred,
}

struct Mounted<T> {
  field: ParticleField,
  projection: Projection,
  target: T,
  listeners: ListenerHandle,
}

enum Stage<T> {
  Unstarted,
  AwaitingLayout(ParticleSource),
  Running(Mounted<T>),
  TornDown,
}

pub struct Animator<H: Host> {
  host: H,
  params: FieldParams,
  shells: [ShellParams; 2],
  camera: CameraParams,
  stage: Stage<H::Target>,
  pending_frame: Option<FrameToken>,
  frames: u64,
}

impl<H: Host> Animator<H> {
  pub fn new(host: H) -> Self {
    Self {
      host,
      params: FieldParams::default(),
      shells: [ShellParams::outer(), ShellParams::inner()],
      camera: CameraParams::default(),
      stage: Stage::Unstarted,
      pending_frame: None,
      frames: 0,
    }
  }

  pub fn with_params(mut self, params: FieldParams) -> Self {
    self.params = params;
    self
  }

  pub fn with_shells(mut self, shells: [ShellParams; 2]) -> Self {
    self.shells = shells;
    self
  }

  pub fn with_camera(mut self, camera: CameraParams) -> Self {
    self.camera = camera;
    self
  }

  pub fn phase(&self) -> Phase {
    match self.stage {
      Stage::Unstarted => Phase::Unstarted,
      Stage::AwaitingLayout(_) => Phase::AwaitingLayout,
      Stage::Running(_) => Phase::Running,
      Stage::TornDown => Phase::TornDown,
    }
  }

  pub fn field(&self) -> Option<&ParticleField> {
    match &self.stage {
      Stage::Running(mounted) => Some(&mounted.field),
      _ => None,
    }
  }

  pub fn projection(&self) -> Option<&Projection> {
    match &self.stage {
      Stage::Running(mounted) => Some(&mounted.projection),
      _ => None,
    }
  }

  pub fn host(&self) -> &H {
    &self.host
  }

  pub fn host_mut(&mut self) -> &mut H {
    &mut self.host
  }

  pub fn has_pending_frame(&self) -> bool {
    self.pending_frame.is_some()
  }

  /// Frames ticked and rendered since the animator was created.
  pub fn frames_rendered(&self) -> u64 {
    self.frames
  }

  /// Mounts the field. Allowed from `Unstarted` or after a teardown (remount).
  pub fn initialize(&mut self, viewport: Viewport, source: ParticleSource) -> FieldResult<InitOutcome> {
    match self.stage {
      Stage::AwaitingLayout(_) | Stage::Running(_) => return Err(FieldError::AlreadyMounted),
      Stage::Unstarted | Stage::TornDown => {}
    }

    let Some(projection) = Projection::from_viewport(viewport) else {
      debug!("viewport {viewport:?} not laid out yet, deferring initialisation");
      self.stage = Stage::AwaitingLayout(source);
      self.pending_frame = Some(self.host.request_frame());
      return Ok(InitOutcome::Deferred);
    };

    self.mount(projection, source)?;
    Ok(InitOutcome::Started)
  }

  fn mount(&mut self, projection: Projection, source: ParticleSource) -> FieldResult<()> {
    let viewport = projection.viewport;
    let target = self.host.create_target(viewport)?;
    let field = ParticleField::new(source.generate(&self.params), self.params);
    let listeners = self.host.attach_listeners();
    info!(
      "particle field running: {} particles, {}x{}",
      field.len(),
      viewport.width,
      viewport.height
    );
    self.stage = Stage::Running(Mounted {
      field,
      projection,
      target,
      listeners,
    });
    self.pending_frame = Some(self.host.request_frame());
    Ok(())
  }

  /// The per-frame callback. Does nothing unless a frame was requested and is
  /// still outstanding, so a cancelled callback that fires anyway is harmless.
  ///
  /// Returns whether a frame was ticked and rendered.
  pub fn frame(&mut self, elapsed: f32, pointer: &Pointer) -> FieldResult<bool> {
    if self.pending_frame.take().is_none() {
      return Ok(false);
    }
    match self.stage {
      Stage::AwaitingLayout(_) => self.retry_layout(),
      Stage::Running(_) => self.advance(elapsed, pointer),
      Stage::Unstarted | Stage::TornDown => Ok(false),
    }
  }

  /// A failed mount leaves the field `TornDown` with nothing scheduled, so the
  /// error comes back as [`FieldError::DeferredMount`] for the caller to stop on.
  fn retry_layout(&mut self) -> FieldResult<bool> {
    let Some(projection) = Projection::from_viewport(self.host.viewport()) else {
      self.pending_frame = Some(self.host.request_frame());
      return Ok(false);
    };
    match std::mem::replace(&mut self.stage, Stage::TornDown) {
      Stage::AwaitingLayout(source) => {
        self
          .mount(projection, source)
          .map_err(|e| FieldError::DeferredMount(Box::new(e)))?;
        Ok(false)
      }
      other => {
        self.stage = other;
        Ok(false)
      }
    }
  }

  fn advance(&mut self, elapsed: f32, pointer: &Pointer) -> FieldResult<bool> {
    let Stage::Running(mounted) = &mut self.stage else {
      return Ok(false);
    };
    mounted.field.tick(pointer);

    let transforms = Transforms::at(elapsed, &self.params, &self.shells);
    let mut camera = CameraUniform::new();
    camera.update(&Camera::following(pointer, &mounted.projection, &self.camera));
    let rendered = mounted.target.render(&Frame {
      particles: mounted.field.particles(),
      transforms,
      camera,
      elapsed,
    });

    self.pending_frame = Some(self.host.request_frame());
    self.frames += 1;
    rendered.map(|()| true)
  }

  /// Updates the projection and output size. Particle buffers are untouched.
  pub fn resize(&mut self, viewport: Viewport) -> FieldResult<()> {
    let Stage::Running(mounted) = &mut self.stage else {
      return Err(FieldError::NotRunning);
    };
    let Some(projection) = Projection::from_viewport(viewport) else {
      debug!("ignoring resize to empty viewport {viewport:?}");
      return Ok(());
    };
    mounted.projection = projection;
    mounted.target.resize(viewport);
    Ok(())
  }

  /// Cancels the pending frame, detaches listeners and releases the render
  /// target. Safe to call any number of times.
  pub fn teardown(&mut self) {
    if let Some(token) = self.pending_frame.take() {
      self.host.cancel_frame(token);
    }
    if let Stage::Running(mut mounted) = std::mem::replace(&mut self.stage, Stage::TornDown) {
      self.host.detach_listeners(mounted.listeners);
      mounted.target.release();
      info!("particle field torn down after {} frames", self.frames);
    }
  }
}

impl<H: Host> Drop for Animator<H> {
  fn drop(&mut self) {
    self.teardown();
  }
}
