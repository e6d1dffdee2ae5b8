//! Tesseract geometry for the 4D visualizer surfaces.
//!
//! Vertices are rotated in 4D, projected to 3D with a perspective divide on
//! `w`, then to 2D clip space with a second divide on `z`.

use crate::params::ParameterSet;

pub type Vec4 = [f64; 4];

/// One of the six rotation planes in four dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    XY,
    XZ,
    XW,
    YZ,
    YW,
    ZW,
}

impl Plane {
    pub const ALL: [Plane; 6] = [Plane::XY, Plane::XZ, Plane::XW, Plane::YZ, Plane::YW, Plane::ZW];

    const fn axes(self) -> (usize, usize) {
        match self {
            Plane::XY => (0, 1),
            Plane::XZ => (0, 2),
            Plane::XW => (0, 3),
            Plane::YZ => (1, 2),
            Plane::YW => (1, 3),
            Plane::ZW => (2, 3),
        }
    }

    /// Planes that mix in the fourth axis.
    pub const fn involves_w(self) -> bool {
        matches!(self, Plane::XW | Plane::YW | Plane::ZW)
    }
}

pub fn rotate(v: Vec4, plane: Plane, angle: f64) -> Vec4 {
    let (a, b) = plane.axes();
    let (s, c) = angle.sin_cos();
    let mut out = v;
    out[a] = c * v[a] - s * v[b];
    out[b] = s * v[a] + c * v[b];
    out
}

/// The 16 vertices of the unit tesseract, `±1` on every axis.
pub fn tesseract_vertices() -> [Vec4; 16] {
    std::array::from_fn(|i| {
        let bit = |k: usize| if (i >> k) & 1 == 1 { 1.0 } else { -1.0 };
        [bit(0), bit(1), bit(2), bit(3)]
    })
}

/// The 32 edges: vertex pairs differing in exactly one coordinate.
pub fn tesseract_edges() -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(32);
    for i in 0..16usize {
        for k in 0..4 {
            let j = i ^ (1 << k);
            if i < j {
                edges.push((i, j));
            }
        }
    }
    edges
}

/// Perspective projection 4D to 3D from a camera at `w = camera_w`.
pub fn project_to_3d(v: Vec4, camera_w: f64) -> [f64; 3] {
    let d = (camera_w - v[3]).max(1e-3);
    let k = 1.0 / d;
    [v[0] * k, v[1] * k, v[2] * k]
}

/// Perspective projection 3D to 2D from a camera at `z = camera_z`.
pub fn project_to_2d(p: [f64; 3], camera_z: f64) -> [f64; 2] {
    let d = (camera_z - p[2]).max(1e-3);
    let k = 1.0 / d;
    [p[0] * k, p[1] * k]
}

/// Small deterministic offset in `[-1, 1]` per vertex and axis.
fn jitter(vertex: usize, axis: usize, phase: f64) -> f64 {
    let seed = (vertex * 4 + axis) as f64;
    (seed * 12.9898 + phase * 78.233).sin()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionSettings {
    pub camera_w: f64,
    pub camera_z: f64,
    pub scale: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            camera_w: 3.0,
            camera_z: 4.0,
            scale: 2.4,
        }
    }
}

/// Project the tesseract for one frame of `params`.
///
/// Returns 2D points in clip space, one per vertex. Rotation drives every
/// plane; `morph_factor` scales the planes that involve `w`, and `chaos`
/// perturbs vertices before projection.
pub fn project_tesseract(params: &ParameterSet, settings: &ProjectionSettings) -> [[f64; 2]; 16] {
    let angle = params.rotation;
    let morph = params.morph_factor;
    let chaos = params.chaos.clamp(0.0, 1.0) * 0.15;

    let mut out = [[0.0; 2]; 16];
    for (i, v) in tesseract_vertices().into_iter().enumerate() {
        let mut v = v;
        for (axis, c) in v.iter_mut().enumerate() {
            *c += chaos * jitter(i, axis, angle);
        }
        for (n, plane) in Plane::ALL.into_iter().enumerate() {
            let rate = if plane.involves_w() { morph } else { 0.5 };
            v = rotate(v, plane, angle * rate * (1.0 + n as f64 * 0.1));
        }
        let p3 = project_to_3d(v, settings.camera_w);
        let p2 = project_to_2d(p3, settings.camera_z);
        out[i] = [p2[0] * settings.scale, p2[1] * settings.scale];
    }
    out
}

/// Line-list vertex buffer (`x0, y0, x1, y1, ...`) for the projected edges.
pub fn edge_lines(points: &[[f64; 2]; 16], edges: &[(usize, usize)]) -> Vec<f32> {
    let mut buf = Vec::with_capacity(edges.len() * 4);
    for &(a, b) in edges {
        buf.extend_from_slice(&[
            points[a][0] as f32,
            points[a][1] as f32,
            points[b][0] as f32,
            points[b][1] as f32,
        ]);
    }
    buf
}

/// HSV (`h` in degrees) to linear RGB in `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f32; 3] {
    let h = h.rem_euclid(360.0) / 60.0;
    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    [(r + m) as f32, (g + m) as f32, (b + m) as f32]
}
