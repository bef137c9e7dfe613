use glam::Vec3A;

use crate::core::interaction::Ray;

use super::{FlatTriangle, Hit};

#[derive(Copy, Clone, Debug)]
struct Aabb {
    p_min: Vec3A,
    p_max: Vec3A,
}

impl Aabb {
    fn empty() -> Self {
        Self {
            p_min: Vec3A::splat(f32::MAX),
            p_max: Vec3A::splat(f32::MIN),
        }
    }

    fn of_triangle(tri: &FlatTriangle) -> Self {
        Self {
            p_min: tri.p1.min(tri.p2).min(tri.p3),
            p_max: tri.p1.max(tri.p2).max(tri.p3),
        }
    }

    fn merge(&self, other: &Aabb) -> Self {
        Self {
            p_min: self.p_min.min(other.p_min),
            p_max: self.p_max.max(other.p_max),
        }
    }

    fn centroid(&self) -> Vec3A {
        0.5 * (self.p_min + self.p_max)
    }

    fn surface_area(&self) -> f32 {
        let d = (self.p_max - self.p_min).max(Vec3A::ZERO);
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    fn intersect_test(&self, ray: &Ray, tmax: f32) -> bool {
        let mut t0 = 0.0f32;
        let mut t1 = tmax;
        for axis in 0..3 {
            let inv = 1.0 / ray.d[axis];
            let mut near = (self.p_min[axis] - ray.o[axis]) * inv;
            let mut far = (self.p_max[axis] - ray.o[axis]) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t0 = t0.max(near);
            t1 = t1.min(far);
            if t0 > t1 {
                return false;
            }
        }
        true
    }
}

struct BvhNode {
    bbox: Aabb,
    lc: Option<Box<BvhNode>>,
    rc: Option<Box<BvhNode>>,
    start: usize,
    end: usize,
}

impl BvhNode {
    fn new(start: usize, end: usize, bbox: Aabb) -> Self {
        Self {
            bbox,
            lc: None,
            rc: None,
            start,
            end,
        }
    }

    fn is_leaf(&self) -> bool {
        self.lc.is_none()
    }
}

/// Binned SAH BVH over the flattened triangle soup of a scene.
pub struct Bvh {
    root: Option<Box<BvhNode>>,
    triangles: Vec<FlatTriangle>,
}

const MAX_LEAF_SIZE: usize = 4;
const BUCKETS: usize = 16;

impl Bvh {
    pub fn build(triangles: Vec<FlatTriangle>) -> Self {
        if triangles.is_empty() {
            return Self {
                root: None,
                triangles,
            };
        }

        let mut triangles = triangles;
        let bbox = triangles
            .iter()
            .fold(Aabb::empty(), |b, t| b.merge(&Aabb::of_triangle(t)));
        let mut root = Box::new(BvhNode::new(0, triangles.len(), bbox));

        let mut stack = vec![&mut root];
        while let Some(node) = stack.pop() {
            if node.end - node.start <= MAX_LEAF_SIZE {
                continue;
            }
            let Some((axis, split)) = Self::best_split(&triangles[node.start..node.end]) else {
                continue;
            };
            let mid = node.start
                + partition(&mut triangles[node.start..node.end], |t| {
                    Aabb::of_triangle(t).centroid()[axis] < split
                });
            if mid == node.start || mid == node.end {
                continue;
            }
            let lbox = triangles[node.start..mid]
                .iter()
                .fold(Aabb::empty(), |b, t| b.merge(&Aabb::of_triangle(t)));
            let rbox = triangles[mid..node.end]
                .iter()
                .fold(Aabb::empty(), |b, t| b.merge(&Aabb::of_triangle(t)));
            node.lc = Some(Box::new(BvhNode::new(node.start, mid, lbox)));
            node.rc = Some(Box::new(BvhNode::new(mid, node.end, rbox)));
            // Safe to push both: disjoint ranges, parent no longer used.
            if let Some(lc) = node.lc.as_mut() {
                stack.push(lc);
            }
            if let Some(rc) = node.rc.as_mut() {
                stack.push(rc);
            }
        }

        Self {
            root: Some(root),
            triangles,
        }
    }

    /// Binned SAH: pick the axis/plane minimizing area-weighted counts.
    fn best_split(tris: &[FlatTriangle]) -> Option<(usize, f32)> {
        let cbox = tris.iter().fold(Aabb::empty(), |b, t| {
            let c = Aabb::of_triangle(t).centroid();
            b.merge(&Aabb { p_min: c, p_max: c })
        });
        let extent = cbox.p_max - cbox.p_min;
        let mut best: Option<(usize, f32, f32)> = None;
        for axis in 0..3 {
            if extent[axis] < 1e-4 {
                continue;
            }
            let mut boxes = [Aabb::empty(); BUCKETS];
            let mut counts = [0usize; BUCKETS];
            for t in tris {
                let c = Aabb::of_triangle(t).centroid()[axis];
                let b = (((c - cbox.p_min[axis]) / extent[axis] * BUCKETS as f32) as usize)
                    .min(BUCKETS - 1);
                boxes[b] = boxes[b].merge(&Aabb::of_triangle(t));
                counts[b] += 1;
            }
            for cut in 1..BUCKETS {
                let (mut lbox, mut rbox) = (Aabb::empty(), Aabb::empty());
                let (mut ln, mut rn) = (0usize, 0usize);
                for b in 0..cut {
                    lbox = lbox.merge(&boxes[b]);
                    ln += counts[b];
                }
                for b in cut..BUCKETS {
                    rbox = rbox.merge(&boxes[b]);
                    rn += counts[b];
                }
                if ln == 0 || rn == 0 {
                    continue;
                }
                let cost = lbox.surface_area() * ln as f32 + rbox.surface_area() * rn as f32;
                if best.map_or(true, |(_, _, c)| cost < c) {
                    let split = cbox.p_min[axis] + extent[axis] * cut as f32 / BUCKETS as f32;
                    best = Some((axis, split, cost));
                }
            }
        }
        best.map(|(axis, split, _)| (axis, split))
    }

    /// Closest hit over `(tmin, tmax)`.
    pub fn intersect(&self, ray: &Ray, tmin: f32, tmax: f32) -> Option<Hit> {
        let root = self.root.as_ref()?;
        let mut closest: Option<Hit> = None;
        let mut limit = tmax;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !node.bbox.intersect_test(ray, limit) {
                continue;
            }
            if node.is_leaf() {
                for tri in &self.triangles[node.start..node.end] {
                    if let Some((t, uv)) = tri.intersect(ray, tmin, limit) {
                        limit = t;
                        closest = Some(Hit {
                            t,
                            uv,
                            node: tri.node,
                            face: tri.face,
                        });
                    }
                }
            } else {
                if let Some(lc) = node.lc.as_ref() {
                    stack.push(lc);
                }
                if let Some(rc) = node.rc.as_ref() {
                    stack.push(rc);
                }
            }
        }
        closest
    }

    /// Any-hit query for shadow rays.
    pub fn intersect_test(&self, ray: &Ray, tmin: f32, tmax: f32) -> bool {
        let Some(root) = self.root.as_ref() else {
            return false;
        };
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !node.bbox.intersect_test(ray, tmax) {
                continue;
            }
            if node.is_leaf() {
                for tri in &self.triangles[node.start..node.end] {
                    if tri.intersect(ray, tmin, tmax).is_some() {
                        return true;
                    }
                }
            } else {
                if let Some(lc) = node.lc.as_ref() {
                    stack.push(lc);
                }
                if let Some(rc) = node.rc.as_ref() {
                    stack.push(rc);
                }
            }
        }
        false
    }
}

fn partition<T>(slice: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut i = 0;
    for j in 0..slice.len() {
        if pred(&slice[j]) {
            slice.swap(i, j);
            i += 1;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::RAY_EPS;
    use crate::core::rng::Rng;

    fn tri(p1: Vec3A, p2: Vec3A, p3: Vec3A, node: u32, face: u32) -> FlatTriangle {
        FlatTriangle {
            p1,
            p2,
            p3,
            node,
            face,
        }
    }

    fn random_soup(count: usize, seed: u64) -> Vec<FlatTriangle> {
        let mut rng = Rng::seeded(seed);
        (0..count)
            .map(|i| {
                let base = Vec3A::new(rng.u(), rng.u(), rng.u()) * 10.0;
                tri(
                    base,
                    base + Vec3A::new(rng.u(), rng.u(), rng.u()),
                    base + Vec3A::new(rng.u(), rng.u(), rng.u()),
                    0,
                    i as u32,
                )
            })
            .collect()
    }

    /// Brute-force reference for the closest hit.
    fn closest_linear(
        tris: &[FlatTriangle],
        ray: &Ray,
        tmin: f32,
        tmax: f32,
    ) -> Option<(f32, u32)> {
        let mut best: Option<(f32, u32)> = None;
        for t in tris {
            if let Some((d, _)) = t.intersect(ray, tmin, tmax) {
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, t.face));
                }
            }
        }
        best
    }

    #[test]
    fn agrees_with_linear_scan() {
        let soup = random_soup(300, 111);
        let bvh = Bvh::build(soup.clone());
        let mut rng = Rng::seeded(113);
        for _ in 0..2000 {
            let o = Vec3A::new(rng.u(), rng.u(), rng.u()) * 12.0 - Vec3A::splat(1.0);
            let d = rng.uniform_on_sphere();
            let ray = Ray::new(o, d);
            let expected = closest_linear(&soup, &ray, RAY_EPS, f32::INFINITY);
            let got = bvh.intersect(&ray, RAY_EPS, f32::INFINITY);
            match (expected, got) {
                (None, None) => {}
                (Some((t, face)), Some(hit)) => {
                    assert!((hit.t - t).abs() < 1e-4);
                    assert_eq!(hit.face, face);
                }
                (e, g) => panic!("mismatch: expected {:?}, got {:?}", e, g.map(|h| h.t)),
            }
            assert_eq!(
                bvh.intersect_test(&ray, RAY_EPS, f32::INFINITY),
                expected.is_some()
            );
        }
    }

    #[test]
    fn tmax_bounds_the_query() {
        let soup = vec![tri(
            Vec3A::new(-1.0, -1.0, 5.0),
            Vec3A::new(1.0, -1.0, 5.0),
            Vec3A::new(0.0, 1.0, 5.0),
            0,
            0,
        )];
        let bvh = Bvh::build(soup);
        let ray = Ray::new(Vec3A::ZERO, Vec3A::Z);
        assert!(bvh.intersect(&ray, RAY_EPS, 4.0).is_none());
        assert!(bvh.intersect(&ray, RAY_EPS, 6.0).is_some());
        assert!(!bvh.intersect_test(&ray, RAY_EPS, 4.0));
    }

    #[test]
    fn empty_scene_never_hits() {
        let bvh = Bvh::build(vec![]);
        let ray = Ray::new(Vec3A::ZERO, Vec3A::Z);
        assert!(bvh.intersect(&ray, RAY_EPS, f32::INFINITY).is_none());
    }
}
