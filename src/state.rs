use crate::animator::{Animator, FrameToken, Host, ListenerHandle};
use crate::camera::Viewport;
use crate::field::Pointer;
use crate::initialize::{particle_count_for, ParticleSource};
use crate::render::{FieldRenderer, GpuContext};
use crate::{FieldError, FieldParams, FieldResult, ShellParams};
use log::{debug, error, warn};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use winit::event::ElementState;
use winit::keyboard::*;
use winit::{
  event::{Event, KeyEvent, StartCause, WindowEvent},
  event_loop::{EventLoop, EventLoopWindowTarget},
  window::Window,
};

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
  /// Overrides the viewport based particle count.
  pub particles: Option<u32>,
  pub seed: Option<u64>,
  /// Use the constrained-device particle count regardless of window width.
  pub mobile: bool,
}

impl RunOptions {
  pub fn particle_count(&self, logical_width: f32, params: &FieldParams) -> u32 {
    match self.particles {
      Some(count) => count,
      None if self.mobile => params.mobile_particles,
      None => particle_count_for(logical_width, params),
    }
  }
}

/// Redraw requests stand in for frame callbacks. winit cannot withdraw a
/// `request_redraw`, so cancelling drops the token and the matching
/// `RedrawRequested` is swallowed instead.
#[derive(Debug, Default)]
struct RedrawGate {
  next_token: u64,
  pending: Option<FrameToken>,
}

impl RedrawGate {
  fn issue(&mut self) -> FrameToken {
    self.next_token += 1;
    let token = FrameToken(self.next_token);
    self.pending = Some(token);
    token
  }

  fn cancel(&mut self, token: FrameToken) {
    if self.pending == Some(token) {
      self.pending = None;
    }
  }

  /// Whether a redraw event answers an outstanding request. Consumes it.
  fn consume(&mut self) -> bool {
    self.pending.take().is_some()
  }
}

/// Mounts the field into a winit window. Frame callbacks are redraw requests
/// and listeners gate which window events reach the animator.
pub struct WindowHost {
  window: Arc<Window>,
  gpu: Rc<GpuContext>,
  params: FieldParams,
  shells: [ShellParams; 2],
  redraws: RedrawGate,
  next_listener: u64,
  listeners: Option<ListenerHandle>,
}

impl WindowHost {
  pub fn new(window: Arc<Window>, gpu: Rc<GpuContext>, params: FieldParams, shells: [ShellParams; 2]) -> Self {
    Self {
      window,
      gpu,
      params,
      shells,
      redraws: RedrawGate::default(),
      next_listener: 0,
      listeners: None,
    }
  }

  pub fn is_listening(&self) -> bool {
    self.listeners.is_some()
  }

  /// Takes the outstanding frame request, if any, for an incoming redraw.
  pub fn take_redraw(&mut self) -> bool {
    self.redraws.consume()
  }
}

impl Host for WindowHost {
  type Target = FieldRenderer;

  fn viewport(&self) -> Viewport {
    let size = self.window.inner_size();
    Viewport::new(size.width, size.height)
  }

  fn request_frame(&mut self) -> FrameToken {
    let token = self.redraws.issue();
    self.window.request_redraw();
    token
  }

  fn cancel_frame(&mut self, token: FrameToken) {
    self.redraws.cancel(token);
  }

  fn attach_listeners(&mut self) -> ListenerHandle {
    self.next_listener += 1;
    let handle = ListenerHandle(self.next_listener);
    self.listeners = Some(handle);
    handle
  }

  fn detach_listeners(&mut self, handle: ListenerHandle) {
    if self.listeners == Some(handle) {
      self.listeners = None;
    }
  }

  fn create_target(&mut self, viewport: Viewport) -> FieldResult<FieldRenderer> {
    FieldRenderer::init(
      self.gpu.clone(),
      self.window.clone(),
      viewport,
      &self.params,
      &self.shells,
    )
  }
}

fn window_error(e: impl std::fmt::Display) -> FieldError {
  FieldError::Window(e.to_string())
}

async fn start(options: RunOptions) -> FieldResult<()> {
  let event_loop = EventLoop::new().map_err(window_error)?;
  let window = Arc::new(
    winit::window::WindowBuilder::new()
      .with_title("Neon Field")
      .build(&event_loop)
      .map_err(window_error)?,
  );
  let gpu = Rc::new(GpuContext::init().await?);

  let params = FieldParams::default();
  let shells = [ShellParams::outer(), ShellParams::inner()];
  let host = WindowHost::new(window.clone(), gpu, params, shells);
  let mut animator = Animator::new(host).with_params(params).with_shells(shells);
  let mut pointer = Pointer::default();
  let clock = Instant::now();

  event_loop
    .run(move |event, target: &EventLoopWindowTarget<()>| match event {
      Event::NewEvents(StartCause::Init) => {
        let logical = window.inner_size().to_logical::<f32>(window.scale_factor());
        let count = options.particle_count(logical.width, &params);
        let viewport = animator.host().viewport();
        match animator.initialize(viewport, ParticleSource::random(count, options.seed)) {
          Ok(outcome) => debug!("initialise: {outcome:?}"),
          Err(e) => {
            error!("failed to start particle field: {e}");
            target.exit();
          }
        }
      }
      Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
        WindowEvent::CloseRequested
        | WindowEvent::KeyboardInput {
          event:
            KeyEvent {
              state: ElementState::Pressed,
              physical_key: PhysicalKey::Code(KeyCode::Escape),
              ..
            },
          ..
        } => {
          animator.teardown();
          target.exit();
        }
        WindowEvent::CursorMoved { position, .. } if animator.host().is_listening() => {
          let size = window.inner_size();
          pointer = Pointer::from_cursor(position.x, position.y, size.width as f64, size.height as f64);
        }
        WindowEvent::Resized(size) if animator.host().is_listening() => {
          if let Err(e) = animator.resize(Viewport::new(size.width, size.height)) {
            warn!("resize to {size:?} failed: {e}");
          }
        }
        WindowEvent::RedrawRequested => {
          if !animator.host_mut().take_redraw() {
            return;
          }
          match animator.frame(clock.elapsed().as_secs_f32(), &pointer) {
            Ok(_) => {}
            Err(e @ FieldError::DeferredMount(_)) => {
              error!("failed to start particle field: {e}");
              target.exit();
            }
            Err(FieldError::Frame(wgpu::SurfaceError::OutOfMemory)) => {
              error!("out of memory, shutting down");
              animator.teardown();
              target.exit();
            }
            Err(e) => warn!("frame {} failed: {e}", animator.frames_rendered()),
          }
        }
        _ => {}
      },
      Event::LoopExiting => animator.teardown(),
      _ => {}
    })
    .map_err(window_error)
}

pub fn run(options: RunOptions) -> FieldResult<()> {
  pollster::block_on(start(options))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn redraws_only_answer_outstanding_requests() {
    let mut gate = RedrawGate::default();
    assert!(!gate.consume());

    gate.issue();
    assert!(gate.consume());
    assert!(!gate.consume());

    let token = gate.issue();
    gate.cancel(token);
    assert!(!gate.consume());
  }

  #[test]
  fn cancelling_a_stale_token_keeps_the_newer_request() {
    let mut gate = RedrawGate::default();
    let stale = gate.issue();
    let fresh = gate.issue();
    assert_ne!(stale, fresh);
    gate.cancel(stale);
    assert!(gate.consume());
  }

  #[test]
  fn explicit_count_wins() {
    let params = FieldParams::default();
    let options = RunOptions {
      particles: Some(42),
      mobile: true,
      ..Default::default()
    };
    assert_eq!(options.particle_count(1920.0, &params), 42);
  }

  #[test]
  fn mobile_flag_forces_the_small_pool() {
    let params = FieldParams::default();
    let options = RunOptions {
      mobile: true,
      ..Default::default()
    };
    assert_eq!(options.particle_count(1920.0, &params), 150);
    assert_eq!(RunOptions::default().particle_count(1920.0, &params), 500);
    assert_eq!(RunOptions::default().particle_count(600.0, &params), 150);
  }
}
