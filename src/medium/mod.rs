mod heterogeneous;
mod homogeneous;

pub use heterogeneous::*;
pub use homogeneous::*;

use glam::Vec3A;

use crate::{
    core::{color::Color, interaction::Ray, loader::InputParams, rng::Rng},
    phase::{self, Phase},
    scene::SceneResources,
};

/// Result of free-flight sampling: either a scattering event inside the
/// medium (`medium = true`) or a pass-through to `tmax`. `weight` folds
/// in the transmittance divided by the sampling density.
#[derive(Copy, Clone, Debug)]
pub struct MediumDistanceSample {
    pub p: Vec3A,
    pub medium: bool,
    pub weight: Color,
}

#[enum_dispatch::enum_dispatch(Medium)]
pub trait MediumT: Send + Sync {
    fn phase(&self) -> &Phase;

    fn is_emitter(&self) -> bool {
        false
    }

    fn sample_distance(
        &self,
        rng: &mut Rng,
        ray: &Ray,
        tmin: f32,
        tmax: f32,
    ) -> Option<MediumDistanceSample>;

    /// Unbiased transmittance estimate along the ray segment;
    /// stochastic for heterogeneous media.
    fn eval_transmittance(&self, rng: &mut Rng, ray: &Ray, tmin: f32, tmax: f32) -> Color;
}

#[enum_dispatch::enum_dispatch]
pub enum Medium {
    HeterogeneousMedium,
    HomogeneousMedium,
}

pub fn create_medium_from_params(
    rsc: &mut SceneResources,
    params: &mut InputParams,
) -> anyhow::Result<()> {
    params.set_name("medium".into());
    let ty = params.get_str("type")?;
    let name = params.get_str("name")?;
    params.set_name(format!("medium-{}-{}", ty, name).into());

    let phase = phase::create_phase_from_params(params)?;
    let res = match ty.as_str() {
        "homogeneous" => HomogeneousMedium::load(params, phase)?.into(),
        "heterogeneous" => HeterogeneousMedium::load(params, phase)?.into(),
        _ => anyhow::bail!("{}: unknown type '{}'", params.name(), ty),
    };

    rsc.add_medium(name, res)?;

    params.check_unused_keys();

    Ok(())
}
