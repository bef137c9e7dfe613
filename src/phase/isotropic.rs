use glam::Vec3A;

use crate::core::{color::Color, geometry::PointGeometry, rng::Rng};

use super::{PhaseDirectionSample, PhaseT};

/// Uniform scattering over the sphere, pdf `1/4pi`.
pub struct Isotropic;

impl Isotropic {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl PhaseT for Isotropic {
    fn sample_direction(
        &self,
        rng: &mut Rng,
        _geom: &PointGeometry,
        _wi: Vec3A,
    ) -> Option<PhaseDirectionSample> {
        Some(PhaseDirectionSample {
            wo: rng.uniform_on_sphere(),
            weight: Color::WHITE,
        })
    }

    fn pdf_direction(&self, _geom: &PointGeometry, _wi: Vec3A, _wo: Vec3A) -> f32 {
        1.0 / (4.0 * std::f32::consts::PI)
    }

    fn eval(&self, geom: &PointGeometry, wi: Vec3A, wo: Vec3A) -> Color {
        Color::gray(self.pdf_direction(geom, wi, wo))
    }
}
