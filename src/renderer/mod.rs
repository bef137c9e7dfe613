mod pt;
mod volpt;

pub use pt::*;
pub use volpt::*;

use crate::{
    core::{error::RenderError, film::Film, loader::InputParams},
    scene::Scene,
};

#[derive(Copy, Clone, Debug)]
pub struct RenderStats {
    pub processed: u64,
}

#[enum_dispatch::enum_dispatch(Renderer)]
pub trait RendererT {
    fn render(&self, scene: &Scene, film: &mut Film) -> Result<RenderStats, RenderError>;
}

#[enum_dispatch::enum_dispatch]
pub enum Renderer {
    Pt,
    VolPt,
}

pub fn create_renderer_from_params(
    params: &mut InputParams,
    film_size: (u32, u32),
) -> anyhow::Result<Renderer> {
    params.set_name("renderer".into());
    let ty = params.get_str("type")?;
    params.set_name(format!("renderer-{}", ty).into());

    let res = match ty.as_str() {
        "pt" => Pt::load(params, film_size)?.into(),
        "volpt" => VolPt::load(params, film_size)?.into(),
        _ => anyhow::bail!("{}: unknown type '{}'", params.name(), ty),
    };

    params.check_unused_keys();

    Ok(res)
}

pub(crate) fn seed_from_params(params: &mut InputParams) -> Option<u32> {
    params
        .contains_key("seed")
        .then(|| params.get_int("seed").ok().map(|s| s as u32))
        .flatten()
}
