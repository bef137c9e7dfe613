use glam::Vec2;
use image::GenericImageView;

use crate::core::{color::Color, loader::InputParams};

use super::TextureT;

/// Bitmap texture with bilinear filtering and wrap-around addressing.
/// Alpha is kept only when the source image actually carries a
/// non-trivial alpha channel.
pub struct BitmapTexture {
    width: usize,
    height: usize,
    rgb: Vec<Color>,
    alpha: Option<Vec<f32>>,
}

impl BitmapTexture {
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let mut rgb = Vec::with_capacity((width * height) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        let mut has_alpha = false;
        for (_, _, pixel) in image.pixels() {
            let to_linear = |v: u8| {
                let v = v as f32 / 255.0;
                // Undo the sRGB transfer of 8-bit sources.
                v.powf(2.2)
            };
            rgb.push(Color::new(
                to_linear(pixel[0]),
                to_linear(pixel[1]),
                to_linear(pixel[2]),
            ));
            let a = pixel[3] as f32 / 255.0;
            has_alpha |= a < 1.0;
            alpha.push(a);
        }
        Self {
            width: width as usize,
            height: height as usize,
            rgb,
            alpha: has_alpha.then_some(alpha),
        }
    }

    pub fn from_rows(rows: Vec<Vec<Color>>) -> Self {
        let height = rows.len();
        let width = if height > 0 { rows[0].len() } else { 0 };
        Self {
            width,
            height,
            rgb: rows.into_iter().flatten().collect(),
            alpha: None,
        }
    }

    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        let path = params.get_str("path")?;
        if path.ends_with(".exr") {
            let rows = params.get_exr_image("path")?;
            Ok(Self::from_rows(rows))
        } else {
            let image = params.get_image("path")?;
            Ok(Self::from_image(&image))
        }
    }

    fn texel(&self, x: i32, y: i32) -> usize {
        let x = x.rem_euclid(self.width as i32) as usize;
        let y = y.rem_euclid(self.height as i32) as usize;
        y * self.width + x
    }

    /// Bilinear weights and texel indices for a wrapped uv lookup.
    /// v is flipped so that uv (0,0) addresses the bottom-left texel.
    fn bilinear(&self, uv: Vec2) -> [(usize, f32); 4] {
        let x = uv.x * self.width as f32 - 0.5;
        let y = (1.0 - uv.y) * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);
        [
            (self.texel(x0, y0), (1.0 - tx) * (1.0 - ty)),
            (self.texel(x0 + 1, y0), tx * (1.0 - ty)),
            (self.texel(x0, y0 + 1), (1.0 - tx) * ty),
            (self.texel(x0 + 1, y0 + 1), tx * ty),
        ]
    }
}

impl TextureT for BitmapTexture {
    fn eval(&self, uv: Vec2) -> Color {
        if self.rgb.is_empty() {
            return Color::BLACK;
        }
        let mut c = Color::BLACK;
        for (i, w) in self.bilinear(uv) {
            c += self.rgb[i] * w;
        }
        c
    }

    fn eval_alpha(&self, uv: Vec2) -> f32 {
        match &self.alpha {
            None => 1.0,
            Some(alpha) => {
                let mut a = 0.0;
                for (i, w) in self.bilinear(uv) {
                    a += alpha[i] * w;
                }
                a
            }
        }
    }

    fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }
}
