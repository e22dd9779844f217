//! Runs the field without a window: a fixed 60 Hz clock, a pointer that
//! orbits the centre, and a render target that only counts frames.

use crate::animator::{Animator, Frame, FrameToken, Host, ListenerHandle, RenderTarget};
use crate::camera::Viewport;
use crate::field::{FieldStats, Pointer};
use crate::initialize::ParticleSource;
use crate::FieldResult;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const FRAME_RATE: f32 = 60.0;

#[derive(Clone, Debug)]
pub struct HeadlessOptions {
  pub frames: u64,
  pub particles: u32,
  pub seed: Option<u64>,
  pub viewport: Viewport,
  /// Log field statistics every this many frames; 0 disables.
  pub log_every: u64,
}

impl Default for HeadlessOptions {
  fn default() -> Self {
    Self {
      frames: 600,
      particles: 500,
      seed: None,
      viewport: Viewport::new(1280, 720),
      log_every: 60,
    }
  }
}

#[derive(Default)]
pub struct NullTarget {
  frames: u64,
}

impl RenderTarget for NullTarget {
  fn resize(&mut self, _viewport: Viewport) {}

  fn render(&mut self, _frame: &Frame<'_>) -> FieldResult<()> {
    self.frames += 1;
    Ok(())
  }

  fn release(&mut self) {
    info!("null target released after {} frames", self.frames);
  }
}

pub struct HeadlessHost {
  viewport: Viewport,
  next_token: u64,
}

impl HeadlessHost {
  pub fn new(viewport: Viewport) -> Self {
    Self {
      viewport,
      next_token: 0,
    }
  }
}

impl Host for HeadlessHost {
  type Target = NullTarget;

  fn viewport(&self) -> Viewport {
    self.viewport
  }

  fn request_frame(&mut self) -> FrameToken {
    self.next_token += 1;
    FrameToken(self.next_token)
  }

  // The loop below only drives the animator, which already drops cancelled tokens.
  fn cancel_frame(&mut self, _token: FrameToken) {}

  fn attach_listeners(&mut self) -> ListenerHandle {
    ListenerHandle(0)
  }

  fn detach_listeners(&mut self, _handle: ListenerHandle) {}

  fn create_target(&mut self, _viewport: Viewport) -> FieldResult<NullTarget> {
    Ok(NullTarget::default())
  }
}

#[derive(Clone, Debug)]
pub struct Summary {
  pub frames: u64,
  pub stats: Option<FieldStats>,
  pub interrupted: bool,
}

/// Slow Lissajous path around the middle of the screen.
pub fn orbit_pointer(elapsed: f32) -> Pointer {
  Pointer::new((elapsed * 0.5).cos() * 0.8, (elapsed * 0.7).sin() * 0.6)
}

/// Runs until the frame budget is spent or Ctrl-C is pressed.
pub fn run(options: &HeadlessOptions) -> FieldResult<Summary> {
  let stop = Arc::new(AtomicBool::new(false));
  let handler_stop = stop.clone();
  if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst)) {
    warn!("could not install Ctrl-C handler: {e}");
  }
  simulate(options, &stop)
}

pub fn simulate(options: &HeadlessOptions, stop: &AtomicBool) -> FieldResult<Summary> {
  let mut animator = Animator::new(HeadlessHost::new(options.viewport));
  animator.initialize(
    options.viewport,
    ParticleSource::random(options.particles, options.seed),
  )?;

  let mut frame = 0;
  while frame < options.frames && !stop.load(Ordering::SeqCst) {
    let elapsed = frame as f32 / FRAME_RATE;
    animator.frame(elapsed, &orbit_pointer(elapsed))?;
    if options.log_every > 0 && frame % options.log_every == 0 {
      if let Some(stats) = animator.field().map(|field| field.stats()) {
        info!(
          "frame {frame}: {} particles, centroid ({:.3}, {:.3}, {:.3}), extent {:.3}",
          stats.count, stats.centroid[0], stats.centroid[1], stats.centroid[2], stats.max_extent
        );
      }
    }
    frame += 1;
  }

  let stats = animator.field().map(|field| field.stats());
  animator.teardown();
  Ok(Summary {
    frames: animator.frames_rendered(),
    stats,
    interrupted: stop.load(Ordering::SeqCst),
  })
}
