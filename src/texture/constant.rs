use glam::Vec2;

use crate::core::{color::Color, loader::InputParams};

use super::TextureT;

pub struct ConstantTexture {
    value: Color,
}

impl ConstantTexture {
    pub fn new(value: Color) -> Self {
        Self { value }
    }

    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        let value = params.get_float3("value")?.into();
        Ok(Self::new(value))
    }
}

impl TextureT for ConstantTexture {
    fn eval(&self, _uv: Vec2) -> Color {
        self.value
    }

    fn eval_alpha(&self, _uv: Vec2) -> f32 {
        1.0
    }

    fn has_alpha(&self) -> bool {
        false
    }
}
