use glam::Vec3A;

use crate::core::{
    color::Color,
    geometry::{reflection, refraction, PointGeometry},
    interaction::TransDir,
    loader::InputParams,
    rng::Rng,
};

use super::{MaterialDirectionSample, MaterialT};

pub const COMP_GLASS_REFLECT: i32 = 0;
pub const COMP_GLASS_REFRACT: i32 = 1;

/// Fresnel reflection and refraction:
///
/// `f_s = F delta(refl, wo) + (1-F) delta(refr, wo)`
///
/// with Schlick's approximation for `F`. Reflection or refraction is
/// chosen by sampling `F`; the refraction weight carries the `eta^2`
/// radiance Jacobian in eye-to-light transport.
pub struct Glass {
    ni: f32,
}

impl Glass {
    pub fn new(ni: f32) -> Self {
        Self { ni }
    }

    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        Ok(Self::new(params.get_float("Ni")?))
    }

    fn eta(&self, geom: &PointGeometry, wi: Vec3A) -> (Vec3A, f32) {
        let entering = wi.dot(geom.n) > 0.0;
        if entering {
            (geom.n, 1.0 / self.ni)
        } else {
            (-geom.n, self.ni)
        }
    }

    /// Schlick approximation. `wt` is the refracted direction of `wi`.
    fn fresnel(&self, geom: &PointGeometry, wi: Vec3A, wt: Vec3A) -> f32 {
        let entering = wi.dot(geom.n) > 0.0;
        let cos = if entering {
            wi.dot(geom.n)
        } else {
            wt.dot(geom.n)
        };
        let r = (1.0 - self.ni) / (1.0 + self.ni);
        let r2 = r * r;
        r2 + (1.0 - r2) * (1.0 - cos).powi(5)
    }

    /// Fresnel coefficient seen by `wi`, with total internal reflection
    /// folded in.
    fn reflect_probability(&self, geom: &PointGeometry, wi: Vec3A) -> f32 {
        let (n, eta) = self.eta(geom, wi);
        let (wt, total) = refraction(wi, n, eta);
        if total {
            1.0
        } else {
            self.fresnel(geom, wi, wt)
        }
    }
}

impl MaterialT for Glass {
    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        true
    }

    fn sample_direction(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        wi: Vec3A,
        trans_dir: TransDir,
    ) -> Option<MaterialDirectionSample> {
        let (n, eta) = self.eta(geom, wi);
        let (wt, total) = refraction(wi, n, eta);
        let fr = if total { 1.0 } else { self.fresnel(geom, wi, wt) };
        if rng.u() < fr {
            // Reflection: Fr / p_sel = 1.
            return Some(MaterialDirectionSample {
                wo: reflection(wi, geom.n),
                comp: COMP_GLASS_REFLECT,
                weight: Color::WHITE,
            });
        }
        // Refraction: (1-Fr) / p_sel = 1, times the radiance Jacobian.
        let jacobian = match trans_dir {
            TransDir::EL => eta * eta,
            TransDir::LE => 1.0,
        };
        Some(MaterialDirectionSample {
            wo: wt,
            comp: COMP_GLASS_REFRACT,
            weight: Color::gray(jacobian),
        })
    }

    fn pdf_direction(
        &self,
        geom: &PointGeometry,
        comp: i32,
        wi: Vec3A,
        _wo: Vec3A,
        eval_delta: bool,
    ) -> f32 {
        if !eval_delta {
            return 0.0;
        }
        let fr = self.reflect_probability(geom, wi);
        match comp {
            COMP_GLASS_REFLECT => fr,
            COMP_GLASS_REFRACT => 1.0 - fr,
            _ => 0.0,
        }
    }

    fn eval(
        &self,
        geom: &PointGeometry,
        comp: i32,
        wi: Vec3A,
        _wo: Vec3A,
        trans_dir: TransDir,
        eval_delta: bool,
    ) -> Color {
        if !eval_delta {
            return Color::BLACK;
        }
        let fr = self.reflect_probability(geom, wi);
        match comp {
            COMP_GLASS_REFLECT => Color::gray(fr),
            COMP_GLASS_REFRACT => {
                let (_, eta) = self.eta(geom, wi);
                let jacobian = match trans_dir {
                    TransDir::EL => eta * eta,
                    TransDir::LE => 1.0,
                };
                Color::gray((1.0 - fr) * jacobian)
            }
            _ => Color::BLACK,
        }
    }

    fn reflectance(&self, _geom: &PointGeometry) -> Option<Color> {
        None
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
    fn fresnel_at_normal_incidence_matches_r0() {
        let ni = 1.5f32;
        let glass = Glass::new(ni);
        let geom = surface();
        let fr = glass.reflect_probability(&geom, Vec3A::Z);
        let r0 = ((1.0 - ni) / (1.0 + ni)).powi(2);
        assert!((fr - r0).abs() < 1e-4, "fr {} r0 {}", fr, r0);
    }

    #[test]
    fn fresnel_approaches_one_at_grazing() {
        let glass = Glass::new(1.5);
        let geom = surface();
        let wi = Vec3A::new(0.9999, 0.0, 0.0141).normalize();
        assert!(glass.reflect_probability(&geom, wi) > 0.95);
    }

    #[test]
    fn total_internal_reflection_from_the_dense_side() {
        let glass = Glass::new(1.5);
        let geom = surface();
        // Beyond the critical angle (~41.8 deg) from inside.
        let wi = Vec3A::new(-0.8, 0.0, -0.6).normalize();
        assert_eq!(glass.reflect_probability(&geom, wi), 1.0);
        // Near-normal exit refracts.
        let wi = Vec3A::new(0.1, 0.0, -0.99).normalize();
        assert!(glass.reflect_probability(&geom, wi) < 1.0);
    }

    #[test]
    fn sampling_frequency_matches_schlick() {
        // The observed reflect:refract ratio converges to F.
        let glass = Glass::new(1.5);
        let geom = surface();
        let wi = Vec3A::new(0.5, 0.0, 0.866).normalize();
        let expected = glass.reflect_probability(&geom, wi);
        let mut rng = Rng::seeded(41);
        let n = 200_000;
        let mut reflected = 0u32;
        for _ in 0..n {
            let s = glass
                .sample_direction(&mut rng, &geom, wi, TransDir::EL)
                .unwrap();
            if s.comp == COMP_GLASS_REFLECT {
                reflected += 1;
            }
        }
        let observed = reflected as f32 / n as f32;
        assert!(
            (observed - expected).abs() / expected < 0.05,
            "observed {} expected {}",
            observed,
            expected
        );
    }

    #[test]
    fn refraction_weight_carries_eta_squared() {
        let glass = Glass::new(1.5);
        let geom = surface();
        let wi = Vec3A::Z;
        let mut rng = Rng::seeded(3);
        loop {
            let s = glass
                .sample_direction(&mut rng, &geom, wi, TransDir::EL)
                .unwrap();
            if s.comp == COMP_GLASS_REFRACT {
                let eta = 1.0 / 1.5f32;
                assert!((s.weight.r - eta * eta).abs() < 1e-5);
                break;
            }
        }
    }
}
