use std::sync::Arc;

use glam::Vec3A;

use crate::{
    core::{
        color::Color,
        geometry::PointGeometry,
        interaction::{TransDir, COMP_DONT_CARE},
        loader::InputParams,
        rng::Rng,
    },
    scene::SceneResources,
    texture::{Texture, TextureT},
};

use super::{MaterialDirectionSample, MaterialT};

const FRAC_1_PI: f32 = std::f32::consts::FRAC_1_PI;

/// Lambertian BRDF: `f_r = Kd / pi`, cosine-weighted sampling around the
/// shading normal flipped to the incident side.
pub struct Diffuse {
    kd: Color,
    map_kd: Option<Arc<Texture>>,
}

impl Diffuse {
    pub fn new(kd: Color, map_kd: Option<Arc<Texture>>) -> Self {
        Self { kd, map_kd }
    }

    pub fn load(rsc: &mut SceneResources, params: &mut InputParams) -> anyhow::Result<Self> {
        let kd = params.get_float3_or("Kd", [1.0, 1.0, 1.0]).into();
        let map_kd = if params.contains_key("mapKd") {
            Some(rsc.clone_texture(&params.get_str("mapKd")?)?)
        } else {
            None
        };
        Ok(Self::new(kd, map_kd))
    }

    fn albedo(&self, geom: &PointGeometry) -> Color {
        match &self.map_kd {
            Some(map) => map.eval(geom.t),
            None => self.kd,
        }
    }
}

impl MaterialT for Diffuse {
    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        false
    }

    fn sample_direction(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        wi: Vec3A,
        _trans_dir: TransDir,
    ) -> Option<MaterialDirectionSample> {
        let (n, u, v) = geom.orthonormal_basis_twosided(wi);
        let d = rng.cosine_weighted_on_hemisphere();
        Some(MaterialDirectionSample {
            wo: u * d.x + v * d.y + n * d.z,
            comp: COMP_DONT_CARE,
            weight: self.albedo(geom),
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
            0.0
        } else {
            FRAC_1_PI
        }
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
            Color::BLACK
        } else {
            self.albedo(geom) * FRAC_1_PI
        }
    }

    fn reflectance(&self, geom: &PointGeometry) -> Option<Color> {
        Some(self.albedo(geom))
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
        // The projected-solid-angle density integrates to one over the
        // hemisphere: estimate with uniform sphere samples.
        let mat = Diffuse::new(Color::WHITE, None);
        let geom = surface();
        let wi = Vec3A::new(0.3, 0.1, 0.95).normalize();
        let mut rng = Rng::seeded(5);
        let n = 1_000_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let wo = rng.uniform_on_sphere();
            let p = mat.pdf_direction(&geom, COMP_DONT_CARE, wi, wo, false);
            // projSA -> SA needs the cosine; uniform sphere pdf is 1/4pi.
            sum += (p * wo.z.abs() * 4.0 * std::f32::consts::PI) as f64;
        }
        let estimate = sum / n as f64;
        assert!((estimate - 1.0).abs() < 0.01, "estimate {}", estimate);
    }

    #[test]
    fn sampled_directions_stay_on_incident_side() {
        let mat = Diffuse::new(Color::WHITE, None);
        let geom = surface();
        let mut rng = Rng::seeded(9);
        for _ in 0..1000 {
            let wi = Vec3A::new(0.2, -0.4, 0.89).normalize();
            let s = mat.sample_direction(&mut rng, &geom, wi, TransDir::EL).unwrap();
            assert!(s.wo.dot(geom.n) > 0.0);
            assert_eq!(s.weight, Color::WHITE);
        }
        // Sampling from below flips the lobe.
        let wi = Vec3A::new(0.2, 0.4, -0.89).normalize();
        let s = mat.sample_direction(&mut rng, &geom, wi, TransDir::EL).unwrap();
        assert!(s.wo.dot(geom.n) < 0.0);
    }

    #[test]
    fn eval_is_zero_across_the_surface() {
        let mat = Diffuse::new(Color::WHITE, None);
        let geom = surface();
        let wi = Vec3A::Z;
        let wo = -Vec3A::Z;
        assert!(mat
            .eval(&geom, COMP_DONT_CARE, wi, wo, TransDir::EL, false)
            .is_black());
        assert_eq!(mat.pdf_direction(&geom, COMP_DONT_CARE, wi, wo, false), 0.0);
    }
}
