mod bitmap;
mod constant;

pub use bitmap::*;
pub use constant::*;

use glam::Vec2;

use crate::{
    core::{color::Color, loader::InputParams},
    scene::SceneResources,
};

#[enum_dispatch::enum_dispatch(Texture)]
pub trait TextureT: Send + Sync {
    fn eval(&self, uv: Vec2) -> Color;

    fn eval_alpha(&self, uv: Vec2) -> f32;

    fn has_alpha(&self) -> bool;
}

#[enum_dispatch::enum_dispatch]
pub enum Texture {
    BitmapTexture,
    ConstantTexture,
}

pub fn create_texture_from_params(
    rsc: &mut SceneResources,
    params: &mut InputParams,
) -> anyhow::Result<()> {
    params.set_name("texture".into());
    let ty = params.get_str("type")?;
    let name = params.get_str("name")?;
    params.set_name(format!("texture-{}-{}", ty, name).into());

    let res = match ty.as_str() {
        "constant" => ConstantTexture::load(params)?.into(),
        "bitmap" => BitmapTexture::load(params)?.into(),
        _ => anyhow::bail!("{}: unknown type '{}'", params.name(), ty),
    };

    rsc.add_texture(name, res)?;

    params.check_unused_keys();

    Ok(())
}
