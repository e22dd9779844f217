//! The particle field: per-frame integration, pointer attraction and
//! reflection off the bounding cube, plus the time-driven transforms of the
//! cloud and the two shells.

use crate::{FieldParams, Particle, Pulse, ShellParams};
use cgmath::{Matrix4, Rad};

/// Pointer position normalised to `[-1, 1]` on both axes, y up.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Pointer {
  pub x: f32,
  pub y: f32,
}

impl Pointer {
  pub fn new(x: f32, y: f32) -> Self {
    Self {
      x: x.clamp(-1.0, 1.0),
      y: y.clamp(-1.0, 1.0),
    }
  }

  /// Maps a cursor position in window pixels (origin top left) into
  /// normalised coordinates. A zero-sized window maps everything to the centre.
  pub fn from_cursor(x: f64, y: f64, width: f64, height: f64) -> Self {
    if width <= 0.0 || height <= 0.0 {
      return Self::default();
    }
    Self::new(
      ((x / width) * 2.0 - 1.0) as f32,
      (-(y / height) * 2.0 + 1.0) as f32,
    )
  }

  /// World-space point particles are drawn towards.
  pub fn target(&self, reach: f32) -> [f32; 2] {
    [self.x * reach, self.y * reach]
  }
}

/// A fixed pool of particles. The count never changes after construction.
#[derive(Clone, Debug)]
pub struct ParticleField {
  particles: Vec<Particle>,
  params: FieldParams,
}

impl ParticleField {
  pub fn new(particles: Vec<Particle>, params: FieldParams) -> Self {
    Self { particles, params }
  }

  pub fn particles(&self) -> &[Particle] {
    &self.particles
  }

  pub fn len(&self) -> usize {
    self.particles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.particles.is_empty()
  }

  pub fn params(&self) -> &FieldParams {
    &self.params
  }

  /// Largest per-axis velocity magnitude in the pool. Reflection only flips
  /// signs, so this never changes over the life of the field.
  pub fn max_speed(&self) -> f32 {
    self
      .particles
      .iter()
      .flat_map(|p| p.vel)
      .fold(0.0, |acc: f32, v| acc.max(v.abs()))
  }

  /// Advances every particle by one step.
  ///
  /// Attraction works in the view plane (x and y) only. Reflection flips the
  /// velocity of any axis whose position left the cube but does not clamp the
  /// position, so a particle can sit outside by up to one velocity step.
  pub fn tick(&mut self, pointer: &Pointer) {
    let FieldParams {
      bound,
      attraction_radius,
      attraction_strength,
      pointer_reach,
      ..
    } = self.params;
    let [tx, ty] = pointer.target(pointer_reach);

    for p in &mut self.particles {
      for axis in 0..3 {
        p.pos[axis] += p.vel[axis];
      }

      let dx = tx - p.pos[0];
      let dy = ty - p.pos[1];
      let distance = (dx * dx + dy * dy).sqrt();
      if distance < attraction_radius {
        p.pos[0] += dx * attraction_strength;
        p.pos[1] += dy * attraction_strength;
      }

      for axis in 0..3 {
        if p.pos[axis] > bound || p.pos[axis] < -bound {
          p.vel[axis] = -p.vel[axis];
        }
      }
    }
  }

  pub fn stats(&self) -> FieldStats {
    let count = self.particles.len();
    let mut centroid = [0.0f32; 3];
    let mut max_extent = 0.0f32;
    for p in &self.particles {
      for axis in 0..3 {
        centroid[axis] += p.pos[axis];
        max_extent = max_extent.max(p.pos[axis].abs());
      }
    }
    if count > 0 {
      for c in &mut centroid {
        *c /= count as f32;
      }
    }
    FieldStats {
      count,
      centroid,
      max_extent,
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FieldStats {
  pub count: usize,
  pub centroid: [f32; 3],
  /// Largest absolute position component over all particles.
  pub max_extent: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShellTransform {
  /// Euler rotation around x then y, radians.
  pub rotation: [f32; 2],
  pub scale: f32,
}

impl ShellTransform {
  pub fn at(elapsed: f32, shell: &ShellParams) -> Self {
    let wave = match shell.pulse {
      Pulse::Sine => (elapsed * 2.0).sin(),
      Pulse::Cosine => (elapsed * 2.0).cos(),
    };
    Self {
      rotation: [shell.spin[0] * elapsed, shell.spin[1] * elapsed],
      scale: 1.0 + shell.pulse_amplitude * wave,
    }
  }

  pub fn model(&self) -> Matrix4<f32> {
    rotation_matrix(self.rotation) * Matrix4::from_scale(self.scale)
  }
}

/// Everything that is a pure function of elapsed time. Nothing here is kept
/// between frames.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transforms {
  pub cloud_rotation: [f32; 2],
  pub shells: [ShellTransform; 2],
}

impl Transforms {
  pub fn at(elapsed: f32, params: &FieldParams, shells: &[ShellParams; 2]) -> Self {
    Self {
      cloud_rotation: [params.cloud_spin[0] * elapsed, params.cloud_spin[1] * elapsed],
      shells: [
        ShellTransform::at(elapsed, &shells[0]),
        ShellTransform::at(elapsed, &shells[1]),
      ],
    }
  }

  pub fn cloud_model(&self) -> Matrix4<f32> {
    rotation_matrix(self.cloud_rotation)
  }
}

fn rotation_matrix(rotation: [f32; 2]) -> Matrix4<f32> {
  Matrix4::from_angle_x(Rad(rotation[0])) * Matrix4::from_angle_y(Rad(rotation[1]))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::initialize::seed_particles;
  use rand::{rngs::SmallRng, SeedableRng};

  fn particle(pos: [f32; 3], vel: [f32; 3]) -> Particle {
    Particle {
      pos,
      vel,
      color: [1.0, 1.0, 1.0],
      size: 1.0,
    }
  }

  fn planar_distance(p: &Particle, target: [f32; 2]) -> f32 {
    let dx = target[0] - p.pos[0];
    let dy = target[1] - p.pos[1];
    (dx * dx + dy * dy).sqrt()
  }

  #[test]
  fn pointer_maps_window_corners() {
    let top_left = Pointer::from_cursor(0.0, 0.0, 800.0, 600.0);
    assert_eq!(top_left, Pointer { x: -1.0, y: 1.0 });
    let bottom_right = Pointer::from_cursor(800.0, 600.0, 800.0, 600.0);
    assert_eq!(bottom_right, Pointer { x: 1.0, y: -1.0 });
    let centre = Pointer::from_cursor(400.0, 300.0, 800.0, 600.0);
    assert_eq!(centre, Pointer { x: 0.0, y: 0.0 });
  }

  #[test]
  fn pointer_outside_window_is_clamped() {
    let p = Pointer::from_cursor(-100.0, 900.0, 800.0, 600.0);
    assert_eq!(p, Pointer { x: -1.0, y: -1.0 });
    assert_eq!(Pointer::from_cursor(10.0, 10.0, 0.0, 600.0), Pointer::default());
  }

  #[test]
  fn positions_stay_within_one_step_of_the_cube() {
    let params = FieldParams::default();
    let mut rng = SmallRng::seed_from_u64(11);
    let mut field = ParticleField::new(seed_particles(&mut rng, 300, &params), params);
    let limit = params.bound + field.max_speed();

    for frame in 0..20_000 {
      let t = frame as f32 * 0.01;
      field.tick(&Pointer::new(t.cos(), (t * 0.7).sin()));
      for p in field.particles() {
        for axis in 0..3 {
          assert!(p.pos[axis].abs() <= limit + 1e-4, "frame {frame}: {:?}", p.pos);
        }
      }
    }
  }

  #[test]
  fn reflection_flips_only_the_offending_axis() {
    let params = FieldParams::default();
    let mut field = ParticleField::new(vec![particle([9.995, 0.0, -9.995], [0.01, 0.01, -0.01])], params);
    field.tick(&Pointer::new(-1.0, -1.0));
    let p = field.particles()[0];
    assert_eq!(p.vel, [-0.01, 0.01, 0.01]);
    // Not clamped.
    assert!(p.pos[0] > params.bound);
    assert!(p.pos[2] < -params.bound);
  }

  #[test]
  fn attracted_particles_settle_on_the_target() {
    let params = FieldParams::default();
    let pointer = Pointer::new(0.2, -0.4);
    let target = pointer.target(params.pointer_reach);
    let mut field = ParticleField::new(
      vec![
        particle([target[0] + 2.0, target[1], 1.0], [0.0; 3]),
        particle([target[0] - 1.0, target[1] + 1.5, -3.0], [0.0; 3]),
        particle([target[0], target[1] - 0.5, 0.0], [0.0; 3]),
      ],
      params,
    );

    let mut last: Vec<f32> = field.particles().iter().map(|p| planar_distance(p, target)).collect();
    for _ in 0..2000 {
      field.tick(&pointer);
      for (p, prev) in field.particles().iter().zip(last.iter_mut()) {
        let d = planar_distance(p, target);
        if *prev > 1e-4 {
          assert!(d < *prev, "distance grew from {prev} to {d}");
        } else {
          assert!(d <= 1e-4);
        }
        *prev = d;
      }
    }
    for d in last {
      assert!(d < 1e-3);
    }
    // z never takes part in attraction.
    assert_eq!(field.particles()[0].pos[2], 1.0);
  }

  #[test]
  fn particles_outside_the_radius_only_drift() {
    let params = FieldParams::default();
    let start = particle([-8.0, 6.0, 2.0], [0.004, -0.002, 0.001]);
    let mut field = ParticleField::new(vec![start], params);
    field.tick(&Pointer::new(1.0, -1.0));
    let p = field.particles()[0];
    assert_eq!(p.pos, [-8.0 + 0.004, 6.0 - 0.002, 2.0 + 0.001]);
    assert_eq!(p.vel, start.vel);
  }

  #[test]
  fn count_is_fixed() {
    let params = FieldParams::default();
    let mut rng = SmallRng::seed_from_u64(5);
    let mut field = ParticleField::new(seed_particles(&mut rng, 64, &params), params);
    for _ in 0..100 {
      field.tick(&Pointer::default());
    }
    assert_eq!(field.len(), 64);
    assert_eq!(field.stats().count, 64);
  }

  #[test]
  fn shells_pulse_out_of_phase() {
    let shells = [ShellParams::outer(), ShellParams::inner()];
    let params = FieldParams::default();

    let start = Transforms::at(0.0, &params, &shells);
    assert_eq!(start.cloud_rotation, [0.0, 0.0]);
    assert!((start.shells[0].scale - 1.0).abs() < 1e-6);
    assert!((start.shells[1].scale - 1.1).abs() < 1e-6);

    let quarter = std::f32::consts::FRAC_PI_4;
    let later = Transforms::at(quarter, &params, &shells);
    assert!((later.shells[0].scale - 1.1).abs() < 1e-5);
    assert!((later.shells[1].scale - 1.0).abs() < 1e-5);
  }

  #[test]
  fn rotations_scale_with_time() {
    let shells = [ShellParams::outer(), ShellParams::inner()];
    let t = Transforms::at(10.0, &FieldParams::default(), &shells);
    assert!((t.cloud_rotation[0] - 0.3).abs() < 1e-5);
    assert!((t.cloud_rotation[1] - 0.5).abs() < 1e-5);
    assert!((t.shells[0].rotation[0] - 3.0).abs() < 1e-5);
    assert!((t.shells[1].rotation[1] + 6.0).abs() < 1e-5);
  }
}
