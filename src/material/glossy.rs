use glam::Vec3A;

use crate::core::{
    color::Color,
    geometry::{reflection, safe_sqrt, sq, PointGeometry},
    interaction::{TransDir, COMP_DONT_CARE},
    loader::InputParams,
    rng::Rng,
};

use super::{MaterialDirectionSample, MaterialT};

const PI: f32 = std::f32::consts::PI;
const EPS: f32 = 1e-6;

/// Anisotropic GGX microfacet BRDF with Smith masking and a Schlick
/// Fresnel term. Roughness is `(ax, ay)` along the local tangent frame.
pub struct Glossy {
    ks: Color,
    ax: f32,
    ay: f32,
}

impl Glossy {
    pub fn new(ks: Color, ax: f32, ay: f32) -> Self {
        Self { ks, ax, ay }
    }

    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        let ks = params.get_float3("Ks")?.into();
        let ax = params.get_float("ax")?;
        let ay = params.get_float("ay")?;
        Ok(Self::new(ks, ax, ay))
    }

    // Anisotropic GGX normal distribution.
    fn normal_dist(&self, wh: Vec3A, u: Vec3A, v: Vec3A, n: Vec3A) -> f32 {
        1.0 / (PI
            * self.ax
            * self.ay
            * sq(sq(wh.dot(u) / self.ax) + sq(wh.dot(v) / self.ay) + sq(wh.dot(n))))
    }

    // Smith G term matching the anisotropic GGX.
    fn shadow_g(&self, wi: Vec3A, wo: Vec3A, u: Vec3A, v: Vec3A, n: Vec3A) -> f32 {
        let g1 = |w: Vec3A| {
            let c = w.dot(n);
            if c == 0.0 {
                return 0.0;
            }
            let s = safe_sqrt(1.0 - c * c).max(EPS);
            let cp = w.dot(u) / s;
            let cs = w.dot(v) / s;
            let a2 = sq(cp * self.ax) + sq(cs * self.ay);
            2.0 / (1.0 + safe_sqrt(1.0 + a2 * sq(s / c)))
        };
        g1(wi) * g1(wo)
    }
}

impl MaterialT for Glossy {
    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        false
    }

    fn sample_direction(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        wi: Vec3A,
        trans_dir: TransDir,
    ) -> Option<MaterialDirectionSample> {
        let (n, u, v) = geom.orthonormal_basis_twosided(wi);
        let u1 = rng.u() * 2.0 * PI;
        let u2 = rng.u();
        let wh = (safe_sqrt(u2 / (1.0 - u2)) * (self.ax * u1.cos() * u + self.ay * u1.sin() * v)
            + n)
            .normalize();
        let wo = reflection(wi, wh);
        if geom.opposite(wi, wo) {
            return None;
        }
        let f = self.eval(geom, COMP_DONT_CARE, wi, wo, trans_dir, false);
        let p = self.pdf_direction(geom, COMP_DONT_CARE, wi, wo, false);
        if p <= 0.0 {
            return None;
        }
        Some(MaterialDirectionSample {
            wo,
            comp: COMP_DONT_CARE,
            weight: f / p,
        })
    }

    fn pdf_direction(
        &self,
        geom: &PointGeometry,
        _comp: i32,
        wi: Vec3A,
        wo: Vec3A,
        _eval_delta: bool,
    ) -> f32 {
        if geom.opposite(wi, wo) {
            return 0.0;
        }
        let wh = (wi + wo).normalize();
        let (n, u, v) = geom.orthonormal_basis_twosided(wi);
        self.normal_dist(wh, u, v, n) * wh.dot(n) / (4.0 * wo.dot(wh) * wo.dot(n))
    }

    fn eval(
        &self,
        geom: &PointGeometry,
        _comp: i32,
        wi: Vec3A,
        wo: Vec3A,
        _trans_dir: TransDir,
        _eval_delta: bool,
    ) -> Color {
        if geom.opposite(wi, wo) {
            return Color::BLACK;
        }
        let wh = (wi + wo).normalize();
        let (n, u, v) = geom.orthonormal_basis_twosided(wi);
        let fr = self.ks + (Color::WHITE - self.ks) * (1.0 - wo.dot(wh)).powi(5);
        self.ks
            * fr
            * (self.normal_dist(wh, u, v, n) * self.shadow_g(wi, wo, u, v, n)
                / (4.0 * wi.dot(n) * wo.dot(n)))
    }

    fn reflectance(&self, _geom: &PointGeometry) -> Option<Color> {
        Some(self.ks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn surface() -> PointGeometry {
        PointGeometry::on_surface(Vec3A::ZERO, Vec3A::Z, Vec2::ZERO)
    }

    #[test]
    fn pdf_integrates_to_one() {
        let mat = Glossy::new(Color::gray(0.8), 0.2, 0.4);
        let geom = surface();
        let wi = Vec3A::new(0.4, -0.2, 0.89).normalize();
        let mut rng = Rng::seeded(17);
        let n = 1_000_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let wo = rng.uniform_on_sphere();
            let p = mat.pdf_direction(&geom, COMP_DONT_CARE, wi, wo, false);
            sum += (p * wo.z.abs() * 4.0 * PI) as f64;
        }
        let estimate = sum / n as f64;
        assert!((estimate - 1.0).abs() < 0.02, "estimate {}", estimate);
    }

    #[test]
    fn samples_agree_with_pdf_support() {
        let mat = Glossy::new(Color::gray(0.5), 0.1, 0.1);
        let geom = surface();
        let wi = Vec3A::new(0.2, 0.3, 0.93).normalize();
        let mut rng = Rng::seeded(23);
        for _ in 0..10_000 {
            let Some(s) = mat.sample_direction(&mut rng, &geom, wi, TransDir::EL) else {
                continue;
            };
            assert!(s.weight.is_finite());
            assert!(mat.pdf_direction(&geom, s.comp, wi, s.wo, false) > 0.0);
            assert!(!geom.opposite(wi, s.wo));
        }
    }

    #[test]
    fn rough_lobe_spreads_more_than_smooth() {
        // Mean alignment with the mirror direction drops with roughness.
        let geom = surface();
        let wi = Vec3A::new(0.0, 0.6, 0.8).normalize();
        let mirror = reflection(wi, Vec3A::Z);
        let mean_cos = |ax: f32, seed: u64| {
            let mat = Glossy::new(Color::gray(0.5), ax, ax);
            let mut rng = Rng::seeded(seed);
            let mut sum = 0.0;
            let mut count = 0;
            for _ in 0..20_000 {
                if let Some(s) = mat.sample_direction(&mut rng, &geom, wi, TransDir::EL) {
                    sum += s.wo.dot(mirror);
                    count += 1;
                }
            }
            sum / count as f32
        };
        assert!(mean_cos(0.05, 31) > mean_cos(0.5, 37));
    }
}
