use glam::{Mat3A, Mat4, Vec2, Vec3A};

/// Ray t-range epsilon used to avoid self-intersection.
pub const RAY_EPS: f32 = 1e-4;

/// Finite stand-in for an unbounded ray range. `intersect` treats any
/// `tmax` below `f32::INFINITY` as excluding the environment light, so a
/// shadow ray toward an infinite endpoint uses this bound.
pub const TMAX_NO_ENV: f32 = f32::MAX;

pub fn safe_sqrt(v: f32) -> f32 {
    v.max(0.0).sqrt()
}

pub fn sq(v: f32) -> f32 {
    v * v
}

/// Balance heuristic for two-strategy MIS. `0/0` is defined as 0.
pub fn balance_heuristic(p1: f32, p2: f32) -> f32 {
    if p1 == 0.0 && p2 == 0.0 {
        0.0
    } else {
        p1 / (p1 + p2)
    }
}

/// Reflected direction of `wi` around `n`.
pub fn reflection(wi: Vec3A, n: Vec3A) -> Vec3A {
    2.0 * wi.dot(n) * n - wi
}

/// Refracted direction of `wi` through an interface with normal `n`
/// (`wi` on the same side as `n`) and relative index `eta = ni/nt`.
/// The boolean is true on total internal reflection, in which case the
/// returned direction is the reflection of `wi`.
pub fn refraction(wi: Vec3A, n: Vec3A, eta: f32) -> (Vec3A, bool) {
    let cos_i = wi.dot(n);
    let t2 = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if t2 < 0.0 {
        return (reflection(wi, n), true);
    }
    (-eta * wi + (eta * cos_i - t2.sqrt()) * n, false)
}

pub fn mix_barycentric(a: Vec3A, b: Vec3A, c: Vec3A, uv: Vec2) -> Vec3A {
    a * (1.0 - uv.x - uv.y) + b * uv.x + c * uv.y
}

pub fn mix_barycentric_uv(a: Vec2, b: Vec2, c: Vec2, uv: Vec2) -> Vec2 {
    a * (1.0 - uv.x - uv.y) + b * uv.x + c * uv.y
}

pub fn geometry_normal(p1: Vec3A, p2: Vec3A, p3: Vec3A) -> Vec3A {
    (p2 - p1).cross(p3 - p1).normalize()
}

/// Orthonormal basis around `n` (Duff et al. branchless construction).
pub fn orthonormal_basis(n: Vec3A) -> (Vec3A, Vec3A) {
    let s = 1.0f32.copysign(n.z);
    let a = -1.0 / (s + n.z);
    let b = n.x * n.y * a;
    let u = Vec3A::new(1.0 + s * n.x * n.x * a, s * b, -s * n.x);
    let v = Vec3A::new(b, s + n.y * n.y * a, -n.y);
    (u, v)
}

/// Geometric point on (or off) scene surfaces as seen by the samplers.
///
/// `infinite` marks a point at infinity (environment hits); only `wo` is
/// meaningful then and `p` must not be read. `degenerated` marks a point
/// whose positional density is a Dirac delta (pinhole camera, point
/// light, medium events); directional densities at such points are in
/// solid-angle measure instead of projected solid angle.
#[derive(Copy, Clone, Debug, Default)]
pub struct PointGeometry {
    pub p: Vec3A,
    pub n: Vec3A,
    pub t: Vec2,
    pub wo: Vec3A,
    pub degenerated: bool,
    pub infinite: bool,
}

impl PointGeometry {
    pub fn on_surface(p: Vec3A, n: Vec3A, t: Vec2) -> Self {
        Self {
            p,
            n,
            t,
            ..Default::default()
        }
    }

    pub fn degenerated(p: Vec3A) -> Self {
        Self {
            p,
            degenerated: true,
            ..Default::default()
        }
    }

    pub fn infinite(wo: Vec3A) -> Self {
        // Infinite points are samplable by the direction strategy, so
        // they are not marked degenerated.
        Self {
            wo,
            infinite: true,
            ..Default::default()
        }
    }

    /// True if `wi` and `wo` lie in opposite half-spaces of the shading
    /// normal.
    pub fn opposite(&self, wi: Vec3A, wo: Vec3A) -> bool {
        wi.dot(self.n) * wo.dot(self.n) <= 0.0
    }

    /// Orthonormal basis with the normal flipped toward `wi`'s side.
    pub fn orthonormal_basis_twosided(&self, wi: Vec3A) -> (Vec3A, Vec3A, Vec3A) {
        let n = if wi.dot(self.n) >= 0.0 {
            self.n
        } else {
            -self.n
        };
        let (u, v) = orthonormal_basis(n);
        (n, u, v)
    }
}

/// Geometry term between two points, in projected-solid-angle form:
/// degenerated endpoints contribute no cosine, an infinite endpoint
/// collapses the term to the single remaining cosine.
pub fn geometry_term(s1: &PointGeometry, s2: &PointGeometry) -> f32 {
    if s2.infinite {
        let d = -s2.wo;
        return s1.n.dot(d).abs();
    }
    let v = s2.p - s1.p;
    let dist2 = v.length_squared();
    if dist2 == 0.0 {
        return 0.0;
    }
    let d = v / dist2.sqrt();
    let t1 = if s1.degenerated { 1.0 } else { s1.n.dot(d).abs() };
    let t2 = if s2.degenerated {
        1.0
    } else {
        s2.n.dot(-d).abs()
    };
    t1 * t2 / dist2
}

/// Convert a solid-angle density at `geom` in direction `d` to projected
/// solid angle. Densities at degenerated points stay in solid angle.
pub fn convert_sa_to_proj_sa(pdf_sa: f32, geom: &PointGeometry, d: Vec3A) -> f32 {
    if geom.degenerated {
        return pdf_sa;
    }
    let cos = geom.n.dot(d).abs();
    if cos == 0.0 {
        0.0
    } else {
        pdf_sa / cos
    }
}

/// Affine transform with cached normal matrix and Jacobian.
#[derive(Copy, Clone, Debug)]
pub struct Transform {
    pub m: Mat4,
    pub normal_m: Mat3A,
    pub j: f32,
}

impl Transform {
    pub fn new(m: Mat4) -> Self {
        let m3 = Mat3A::from_mat4(m);
        Self {
            m,
            normal_m: m3.inverse().transpose(),
            j: m3.determinant().abs(),
        }
    }

    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY)
    }

    pub fn point(&self, p: Vec3A) -> Vec3A {
        Vec3A::from(self.m.transform_point3(p.into()))
    }

    pub fn normal(&self, n: Vec3A) -> Vec3A {
        (self.normal_m * n).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3A, b: Vec3A) {
        assert!((a - b).length() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn reflection_is_an_involution() {
        let n = Vec3A::new(0.3, 0.5, 0.8).normalize();
        let v = Vec3A::new(0.1, -0.7, 0.7).normalize();
        assert_close(reflection(reflection(v, n), n), v);
    }

    #[test]
    fn refraction_roundtrip_recovers_direction() {
        let n = Vec3A::Z;
        let eta = 1.0 / 1.5;
        let wi = Vec3A::new(0.4, 0.2, 0.89).normalize();
        let (wt, tir) = refraction(wi, n, eta);
        assert!(!tir);
        // Refract back from the other side with the inverse ratio.
        let (back, tir2) = refraction(-wt, -n, 1.0 / eta);
        assert!(!tir2);
        assert_close(back, -wi);
    }

    #[test]
    fn refraction_flags_total_internal() {
        let n = Vec3A::Z;
        // Grazing direction from the dense side.
        let wi = Vec3A::new(0.95, 0.0, 0.3122).normalize();
        let (_, tir) = refraction(wi, n, 1.5);
        assert!(tir);
    }

    #[test]
    fn orthonormal_basis_is_orthonormal() {
        for n in [Vec3A::Z, -Vec3A::Z, Vec3A::new(0.5, -0.3, 0.2).normalize()] {
            let (u, v) = orthonormal_basis(n);
            assert!(u.dot(v).abs() < 1e-5);
            assert!(u.dot(n).abs() < 1e-5);
            assert!(v.dot(n).abs() < 1e-5);
            assert!((u.length() - 1.0).abs() < 1e-5);
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn geometry_term_is_symmetric() {
        let a = PointGeometry::on_surface(Vec3A::ZERO, Vec3A::Z, Vec2::ZERO);
        let b = PointGeometry::on_surface(
            Vec3A::new(0.3, 0.4, 2.0),
            Vec3A::new(0.0, 0.6, -0.8),
            Vec2::ZERO,
        );
        let g1 = geometry_term(&a, &b);
        let g2 = geometry_term(&b, &a);
        assert!((g1 - g2).abs() < 1e-6);
    }

    #[test]
    fn balance_heuristic_handles_zero() {
        assert_eq!(balance_heuristic(0.0, 0.0), 0.0);
        assert_eq!(balance_heuristic(1.0, 0.0), 1.0);
        assert!((balance_heuristic(1.0, 3.0) - 0.25).abs() < 1e-6);
    }
}
