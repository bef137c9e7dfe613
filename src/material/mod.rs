mod diffuse;
mod glass;
mod glossy;
mod mask;
mod mirror;
mod mixture;

pub use diffuse::*;
pub use glass::*;
pub use glossy::*;
pub use mask::*;
pub use mirror::*;
pub use mixture::*;

use glam::Vec3A;

use crate::{
    core::{
        color::Color,
        geometry::PointGeometry,
        interaction::TransDir,
        loader::InputParams,
        rng::Rng,
    },
    scene::SceneResources,
};

/// Result of BSDF direction sampling. `comp` identifies the sampled lobe
/// of a composite material; `weight` is contribution over probability.
#[derive(Copy, Clone, Debug)]
pub struct MaterialDirectionSample {
    pub wo: Vec3A,
    pub comp: i32,
    pub weight: Color,
}

/// Polymorphic BSDF contract.
///
/// Directional pdfs are in projected solid angle. Lobes with a Dirac
/// delta report zero `eval`/`pdf_direction` unless `eval_delta` is set,
/// in which case they report the finite delta coefficient of the lobe
/// selected by `comp` (the deltas themselves cancel between `eval` and
/// `pdf` in any estimator that samples the same lobe).
#[enum_dispatch::enum_dispatch(Material)]
pub trait MaterialT: Send + Sync {
    fn is_specular(&self, geom: &PointGeometry, comp: i32) -> bool;

    fn sample_direction(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        wi: Vec3A,
        trans_dir: TransDir,
    ) -> Option<MaterialDirectionSample>;

    fn pdf_direction(
        &self,
        geom: &PointGeometry,
        comp: i32,
        wi: Vec3A,
        wo: Vec3A,
        eval_delta: bool,
    ) -> f32;

    fn eval(
        &self,
        geom: &PointGeometry,
        comp: i32,
        wi: Vec3A,
        wo: Vec3A,
        trans_dir: TransDir,
        eval_delta: bool,
    ) -> Color;

    /// Diffuse albedo if the material has a meaningful notion of one;
    /// used for lobe-selection heuristics.
    fn reflectance(&self, geom: &PointGeometry) -> Option<Color>;
}

#[enum_dispatch::enum_dispatch]
pub enum Material {
    Diffuse,
    Glass,
    Glossy,
    Mask,
    Mirror,
    Mixture,
    MixtureWithAlpha,
}

pub fn create_material_from_params(
    rsc: &mut SceneResources,
    params: &mut InputParams,
) -> anyhow::Result<()> {
    params.set_name("material".into());
    let ty = params.get_str("type")?;
    let name = params.get_str("name")?;
    params.set_name(format!("material-{}-{}", ty, name).into());

    let res = match ty.as_str() {
        "diffuse" => Diffuse::load(rsc, params)?.into(),
        "glass" => Glass::load(params)?.into(),
        "glossy" => Glossy::load(params)?.into(),
        "mask" => Mask::new().into(),
        "mirror" => Mirror::new().into(),
        "mixture" => Mixture::load(rsc, params)?.into(),
        "mixture_with_alpha" => MixtureWithAlpha::load(rsc, params)?.into(),
        _ => anyhow::bail!("{}: unknown type '{}'", params.name(), ty),
    };

    rsc.add_material(name, res)?;

    params.check_unused_keys();

    Ok(())
}
