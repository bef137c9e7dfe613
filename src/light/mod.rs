mod area;
mod env;
mod point;

pub use area::*;
pub use env::*;
pub use point::*;

use glam::Vec3A;

use crate::{
    core::{
        color::Color,
        geometry::{PointGeometry, Transform},
        loader::InputParams,
        rng::Rng,
    },
    scene::SceneResources,
};

/// Result of light sampling: the sampled point on the light, the
/// direction *from* the light (callers shade with `-wo`), and the
/// emission divided by the sampling density.
#[derive(Copy, Clone, Debug)]
pub struct LightRaySample {
    pub geom: PointGeometry,
    pub wo: Vec3A,
    pub comp: i32,
    pub weight: Color,
}

/// Light endpoint contract. Densities returned by `pdf_direct` are in
/// projected solid angle at the receiving point.
#[enum_dispatch::enum_dispatch(Light)]
pub trait LightT: Send + Sync {
    /// Sample a point on the light toward `geom`.
    fn sample_direct(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        transform: &Transform,
    ) -> Option<LightRaySample>;

    fn pdf_direct(
        &self,
        geom: &PointGeometry,
        geom_l: &PointGeometry,
        comp: i32,
        transform: &Transform,
        wo: Vec3A,
    ) -> f32;

    /// Sample an emitted ray (position and direction); the dual of the
    /// camera terminator, used for light tracing.
    fn sample_ray(&self, rng: &mut Rng, transform: &Transform) -> Option<LightRaySample>;

    /// Luminance toward `wo`.
    fn eval(&self, geom: &PointGeometry, comp: i32, wo: Vec3A) -> Color;

    fn is_specular(&self, geom: &PointGeometry, comp: i32) -> bool;

    fn is_infinite(&self) -> bool;
}

#[enum_dispatch::enum_dispatch]
pub enum Light {
    AreaLight,
    EnvLight,
    PointLight,
}

pub fn create_light_from_params(
    rsc: &mut SceneResources,
    params: &mut InputParams,
) -> anyhow::Result<()> {
    params.set_name("light".into());
    let ty = params.get_str("type")?;
    let name = params.get_str("name")?;
    params.set_name(format!("light-{}-{}", ty, name).into());

    let res = match ty.as_str() {
        "area" => AreaLight::load(rsc, params)?.into(),
        "env" => EnvLight::load(params)?.into(),
        "envconst" => EnvLight::constant(
            params.get_float3("Le")?.into(),
            params.get_float3_or("scale", [1.0, 1.0, 1.0]).into(),
        )
        .into(),
        "point" => PointLight::load(params)?.into(),
        _ => anyhow::bail!("{}: unknown type '{}'", params.name(), ty),
    };

    rsc.add_light(name, res)?;

    params.check_unused_keys();

    Ok(())
}
