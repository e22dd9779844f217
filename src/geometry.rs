//! Procedural geometry for the shells and the particle sprite.

use cgmath::{InnerSpace, Vector3};
use std::collections::{BTreeSet, HashMap};

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
  [0, 11, 5],
  [0, 5, 1],
  [0, 1, 7],
  [0, 7, 10],
  [0, 10, 11],
  [1, 5, 9],
  [5, 11, 4],
  [11, 10, 2],
  [10, 7, 6],
  [7, 1, 8],
  [3, 9, 4],
  [3, 4, 2],
  [3, 2, 6],
  [3, 6, 8],
  [3, 8, 9],
  [4, 9, 5],
  [2, 4, 11],
  [6, 2, 10],
  [8, 6, 7],
  [9, 8, 1],
];

fn icosahedron_vertices() -> [Vector3<f32>; 12] {
  let t = (1.0 + 5.0f32.sqrt()) / 2.0;
  [
    Vector3::new(-1.0, t, 0.0),
    Vector3::new(1.0, t, 0.0),
    Vector3::new(-1.0, -t, 0.0),
    Vector3::new(1.0, -t, 0.0),
    Vector3::new(0.0, -1.0, t),
    Vector3::new(0.0, 1.0, t),
    Vector3::new(0.0, -1.0, -t),
    Vector3::new(0.0, 1.0, -t),
    Vector3::new(t, 0.0, -1.0),
    Vector3::new(t, 0.0, 1.0),
    Vector3::new(-t, 0.0, -1.0),
    Vector3::new(-t, 0.0, 1.0),
  ]
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
  pub vertices: Vec<[f32; 3]>,
  pub triangles: Vec<[u32; 3]>,
}

/// An icosahedron with every face split into `(detail + 1)^2` triangles and
/// all vertices pushed out onto a sphere of the given radius.
///
/// Grid points are identified by their integer barycentric weights over the
/// icosahedron's corners, so points on shared edges weld exactly.
#[must_use]
pub fn icosphere(radius: f32, detail: u32) -> Mesh {
  let corners = icosahedron_vertices();
  let n = detail + 1;
  let mut mesh = Mesh::default();
  let mut welded: HashMap<Vec<(u32, u32)>, u32> = HashMap::new();

  for face in ICOSAHEDRON_FACES {
    let [a, b, c] = face;
    // grid[i][j] has weights (n - i - j, j, i) over (a, b, c)
    let mut grid: Vec<Vec<u32>> = Vec::with_capacity(n as usize + 1);
    for i in 0..=n {
      let mut row = Vec::with_capacity((n - i + 1) as usize);
      for j in 0..=(n - i) {
        let mut key: Vec<(u32, u32)> = [(a, n - i - j), (b, j), (c, i)]
          .into_iter()
          .filter(|&(_, w)| w > 0)
          .collect();
        key.sort_unstable();

        let index = *welded.entry(key).or_insert_with(|| {
          let point = (corners[a as usize] * (n - i - j) as f32
            + corners[b as usize] * j as f32
            + corners[c as usize] * i as f32)
            .normalize()
            * radius;
          mesh.vertices.push(point.into());
          (mesh.vertices.len() - 1) as u32
        });
        row.push(index);
      }
      grid.push(row);
    }

    for i in 0..n as usize {
      let cols = n as usize - i;
      for j in 0..(2 * cols - 1) {
        let k = j / 2;
        if j % 2 == 0 {
          mesh.triangles.push([grid[i][k + 1], grid[i + 1][k], grid[i][k]]);
        } else {
          mesh.triangles.push([grid[i][k + 1], grid[i + 1][k + 1], grid[i + 1][k]]);
        }
      }
    }
  }
  mesh
}

/// Unique undirected edges of a mesh, ready for a line list.
#[must_use]
pub fn wireframe_edges(mesh: &Mesh) -> Vec<[u32; 2]> {
  let mut edges = BTreeSet::new();
  for &[a, b, c] in &mesh.triangles {
    for (u, v) in [(a, b), (b, c), (c, a)] {
      edges.insert([u.min(v), u.max(v)]);
    }
  }
  edges.into_iter().collect()
}

const GLOW_STOPS: [(f32, f32); 4] = [(0.0, 1.0), (0.3, 0.8), (0.6, 0.3), (1.0, 0.0)];

fn glow_alpha(t: f32) -> f32 {
  let t = t.clamp(0.0, 1.0);
  for pair in GLOW_STOPS.windows(2) {
    let (t0, a0) = pair[0];
    let (t1, a1) = pair[1];
    if t <= t1 {
      return a0 + (a1 - a0) * (t - t0) / (t1 - t0);
    }
  }
  0.0
}

/// White RGBA8 sprite whose alpha falls off radially from the centre.
#[must_use]
pub fn glow_sprite(size: u32) -> Vec<u8> {
  let centre = size as f32 / 2.0;
  let mut pixels = Vec::with_capacity((size * size * 4) as usize);
  for y in 0..size {
    for x in 0..size {
      let dx = x as f32 + 0.5 - centre;
      let dy = y as f32 + 0.5 - centre;
      let t = (dx * dx + dy * dy).sqrt() / centre;
      let alpha = (glow_alpha(t) * 255.0).round() as u8;
      pixels.extend_from_slice(&[255, 255, 255, alpha]);
    }
  }
  pixels
}
