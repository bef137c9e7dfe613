use glam::{Mat3A, Vec3A};

use crate::core::{
    color::Color,
    geometry::{orthonormal_basis, safe_sqrt, PointGeometry},
    rng::Rng,
};

use super::{PhaseDirectionSample, PhaseT};

const PI: f32 = std::f32::consts::PI;
const G_EPS: f32 = 1e-3;

/// Henyey-Greenstein phase function with asymmetry `g` in [-1, 1].
/// Sampling inverts the closed-form CDF, so the weight is always one.
pub struct HenyeyGreenstein {
    g: f32,
}

impl HenyeyGreenstein {
    pub fn new(g: f32) -> Self {
        Self { g }
    }
}

impl PhaseT for HenyeyGreenstein {
    fn sample_direction(
        &self,
        rng: &mut Rng,
        _geom: &PointGeometry,
        wi: Vec3A,
    ) -> Option<PhaseDirectionSample> {
        let g = self.g;
        let cos_theta = if g.abs() < G_EPS {
            1.0 - 2.0 * rng.u()
        } else {
            let s = (1.0 - g * g) / (1.0 - g + 2.0 * g * rng.u());
            (1.0 + g * g - s * s) / (2.0 * g)
        };
        let sin_theta = safe_sqrt(1.0 - cos_theta * cos_theta);
        let phi = 2.0 * PI * rng.u();
        let local = Vec3A::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
        // Frame around the continuation direction -wi.
        let fwd = -wi;
        let (u, v) = orthonormal_basis(fwd);
        let wo = Mat3A::from_cols(u, v, fwd) * local;
        Some(PhaseDirectionSample {
            wo,
            weight: Color::WHITE,
        })
    }

    fn pdf_direction(&self, _geom: &PointGeometry, wi: Vec3A, wo: Vec3A) -> f32 {
        let g = self.g;
        let t = 1.0 + g * g + 2.0 * g * wi.dot(wo);
        (1.0 - g * g) / (t * t.sqrt()) / (4.0 * PI)
    }

    fn eval(&self, geom: &PointGeometry, wi: Vec3A, wo: Vec3A) -> Color {
        Color::gray(self.pdf_direction(geom, wi, wo))
    }
}
