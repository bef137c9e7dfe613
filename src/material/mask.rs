use glam::Vec3A;

use crate::core::{
    color::Color,
    geometry::PointGeometry,
    interaction::{TransDir, COMP_DONT_CARE},
    rng::Rng,
};

use super::{MaterialDirectionSample, MaterialT};

/// Pass-through material used for alpha-masked surfaces:
///
/// `f_s = delta(-wi, wo)`
pub struct Mask;

impl Mask {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl MaterialT for Mask {
    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        true
    }

    fn sample_direction(
        &self,
        _rng: &mut Rng,
        _geom: &PointGeometry,
        wi: Vec3A,
        _trans_dir: TransDir,
    ) -> Option<MaterialDirectionSample> {
        Some(MaterialDirectionSample {
            wo: -wi,
            comp: COMP_DONT_CARE,
            weight: Color::WHITE,
        })
    }

    fn pdf_direction(
        &self,
        _geom: &PointGeometry,
        _comp: i32,
        _wi: Vec3A,
        _wo: Vec3A,
        eval_delta: bool,
    ) -> f32 {
        if eval_delta {
            1.0
        } else {
            0.0
        }
    }

    fn eval(
        &self,
        _geom: &PointGeometry,
        _comp: i32,
        _wi: Vec3A,
        _wo: Vec3A,
        _trans_dir: TransDir,
        eval_delta: bool,
    ) -> Color {
        if eval_delta {
            Color::WHITE
        } else {
            Color::BLACK
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

    #[test]
    fn passes_straight_through() {
        let mask = Mask::new();
        let geom = PointGeometry::on_surface(Vec3A::ZERO, Vec3A::Z, Vec2::ZERO);
        let wi = Vec3A::new(0.3, -0.2, 0.93).normalize();
        let mut rng = Rng::seeded(2);
        let s = mask.sample_direction(&mut rng, &geom, wi, TransDir::EL).unwrap();
        assert!((s.wo + wi).length() < 1e-6);
        assert!(mask.is_specular(&geom, COMP_DONT_CARE));
    }
}
