mod henyey_greenstein;
mod isotropic;

pub use henyey_greenstein::*;
pub use isotropic::*;

use glam::Vec3A;

use crate::core::{
    color::Color,
    geometry::PointGeometry,
    loader::InputParams,
    rng::Rng,
};

#[derive(Copy, Clone, Debug)]
pub struct PhaseDirectionSample {
    pub wo: Vec3A,
    pub weight: Color,
}

/// Phase function contract. Medium points are degenerated, so the
/// densities are in plain solid-angle measure.
#[enum_dispatch::enum_dispatch(Phase)]
pub trait PhaseT: Send + Sync {
    fn is_specular(&self) -> bool {
        false
    }

    fn sample_direction(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        wi: Vec3A,
    ) -> Option<PhaseDirectionSample>;

    fn pdf_direction(&self, geom: &PointGeometry, wi: Vec3A, wo: Vec3A) -> f32;

    fn eval(&self, geom: &PointGeometry, wi: Vec3A, wo: Vec3A) -> Color;
}

#[enum_dispatch::enum_dispatch]
pub enum Phase {
    HenyeyGreenstein,
    Isotropic,
}

pub fn create_phase_from_params(params: &mut InputParams) -> anyhow::Result<Phase> {
    let ty = params.get_str_or("phase", "hg");
    let res = match ty.as_str() {
        "hg" => HenyeyGreenstein::new(params.get_float_or("g", 0.0)).into(),
        "isotropic" => Isotropic::new().into(),
        _ => anyhow::bail!("{}: unknown phase '{}'", params.name(), ty),
    };
    Ok(res)
}
