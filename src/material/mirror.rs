use glam::Vec3A;

use crate::core::{
    color::Color,
    geometry::{reflection, PointGeometry},
    interaction::{TransDir, COMP_DONT_CARE},
    rng::Rng,
};

use super::{MaterialDirectionSample, MaterialT};

/// Ideal mirror: a single Dirac lobe in the reflected direction.
pub struct Mirror;

impl Mirror {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl MaterialT for Mirror {
    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        true
    }

    fn sample_direction(
        &self,
        _rng: &mut Rng,
        geom: &PointGeometry,
        wi: Vec3A,
        _trans_dir: TransDir,
    ) -> Option<MaterialDirectionSample> {
        Some(MaterialDirectionSample {
            wo: reflection(wi, geom.n),
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
