mod bvh;

pub use bvh::*;

use glam::{Vec2, Vec3A};

use crate::core::interaction::Ray;

/// Triangle in world space carrying its owning scene node and face
/// index; the scene resolves surface attributes from those.
#[derive(Copy, Clone, Debug)]
pub struct FlatTriangle {
    pub p1: Vec3A,
    pub p2: Vec3A,
    pub p3: Vec3A,
    pub node: u32,
    pub face: u32,
}

/// Closest-hit query result. `uv` are the barycentric coordinates
/// weighting `(p2, p3)` against `p1`.
#[derive(Copy, Clone, Debug)]
pub struct Hit {
    pub t: f32,
    pub uv: Vec2,
    pub node: u32,
    pub face: u32,
}

impl FlatTriangle {
    /// Moeller-Trumbore intersection over the open range `(tmin, tmax)`.
    pub fn intersect(&self, ray: &Ray, tmin: f32, tmax: f32) -> Option<(f32, Vec2)> {
        let e1 = self.p2 - self.p1;
        let e2 = self.p3 - self.p1;
        let q = ray.d.cross(e2);
        let det = e1.dot(q);
        if det == 0.0 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.o - self.p1;
        let u = s.dot(q) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let r = s.cross(e1);
        let v = ray.d.dot(r) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(r) * inv_det;
        (t > tmin && t < tmax).then_some((t, Vec2::new(u, v)))
    }
}
