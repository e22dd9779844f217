use crate::{rgb, FieldParams, Particle};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

/// Neon purple, blue, pink and cyan.
pub const NEON_PALETTE: [u32; 4] = [0xA855F7, 0x3B82F6, 0xEC4899, 0x06B6D4];

/// Where a field's initial particles come from.
#[derive(Clone, Debug, PartialEq)]
pub enum ParticleSource {
  /// Uniform draws from a `SmallRng`, seeded for reproducible runs or from entropy.
  Random { count: u32, seed: Option<u64> },
  /// Literal particles used as-is.
  Fixed(Vec<Particle>),
}

impl ParticleSource {
  pub fn random(count: u32, seed: Option<u64>) -> Self {
    Self::Random { count, seed }
  }

  #[must_use]
  pub fn generate(&self, params: &FieldParams) -> Vec<Particle> {
    match self {
      Self::Random { count, seed } => {
        let mut rng = match seed {
          Some(seed) => SmallRng::seed_from_u64(*seed),
          None => SmallRng::from_entropy(),
        };
        seed_particles(&mut rng, *count, params)
      }
      Self::Fixed(particles) => particles.clone(),
    }
  }
}

/// Fills a cube of side `2 * bound` with slowly drifting particles.
#[must_use]
pub fn seed_particles<R: Rng>(rng: &mut R, count: u32, params: &FieldParams) -> Vec<Particle> {
  let position = Uniform::new_inclusive(-params.bound, params.bound);
  let velocity = Uniform::new_inclusive(-params.max_speed, params.max_speed);
  let size = Uniform::new_inclusive(params.size_range[0], params.size_range[1]);

  let mut particles = Vec::with_capacity(count as usize);
  for _ in 0..count {
    let color = rgb(NEON_PALETTE[rng.gen_range(0..NEON_PALETTE.len())]);
    particles.push(Particle {
      pos: [position.sample(rng), position.sample(rng), position.sample(rng)],
      vel: [velocity.sample(rng), velocity.sample(rng), velocity.sample(rng)],
      color,
      size: size.sample(rng),
    });
  }
  particles
}

/// Fewer particles on narrow (phone sized) viewports.
pub fn particle_count_for(logical_width: f32, params: &FieldParams) -> u32 {
  if logical_width < params.mobile_breakpoint {
    params.mobile_particles
  } else {
    params.desktop_particles
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seeded_particles_respect_ranges() {
    let params = FieldParams::default();
    let mut rng = SmallRng::seed_from_u64(7);
    let particles = seed_particles(&mut rng, 1000, &params);
    assert_eq!(particles.len(), 1000);

    let palette: Vec<[f32; 3]> = NEON_PALETTE.iter().map(|&hex| rgb(hex)).collect();
    for p in &particles {
      for axis in 0..3 {
        assert!(p.pos[axis].abs() <= params.bound);
        assert!(p.vel[axis].abs() <= params.max_speed);
      }
      assert!(p.size >= 1.0 && p.size <= 4.0);
      assert!(palette.contains(&p.color));
    }
  }

  #[test]
  fn every_palette_entry_is_used() {
    let mut rng = SmallRng::seed_from_u64(3);
    let particles = seed_particles(&mut rng, 400, &FieldParams::default());
    for hex in NEON_PALETTE {
      assert!(particles.iter().any(|p| p.color == rgb(hex)), "{hex:06x} never drawn");
    }
  }

  #[test]
  fn same_seed_same_field() {
    let params = FieldParams::default();
    let a = ParticleSource::random(50, Some(42)).generate(&params);
    let b = ParticleSource::random(50, Some(42)).generate(&params);
    assert_eq!(a, b);
  }

  #[test]
  fn fixed_source_is_passed_through() {
    let fixed = vec![Particle { pos: [1.0, 2.0, 3.0], ..Particle::default() }];
    let source = ParticleSource::Fixed(fixed.clone());
    assert_eq!(source.generate(&FieldParams::default()), fixed);
  }

  #[test]
  fn narrow_viewports_get_fewer_particles() {
    let params = FieldParams::default();
    assert_eq!(particle_count_for(375.0, &params), 150);
    assert_eq!(particle_count_for(767.9, &params), 150);
    assert_eq!(particle_count_for(768.0, &params), 500);
    assert_eq!(particle_count_for(1920.0, &params), 500);
  }
}
