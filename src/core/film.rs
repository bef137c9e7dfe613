use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec2;
use image::{Rgb, RgbImage};

use crate::core::color::Color;

/// Accumulation buffer for radiance splats.
///
/// `splat` is lock-free (per-channel atomic adds) and is the only film
/// operation running during the walk; `clear` and `rescale` are
/// single-threaded phase operations taking `&mut self`. Raster
/// coordinates are in [0,1]^2 with the origin at the bottom-left.
pub struct Film {
    width: u32,
    height: u32,
    data: Vec<AtomicU32>,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Self {
        let data = (0..(width * height * 3) as usize)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    fn base_index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 3) as usize
    }

    fn add(&self, index: usize, v: f32) {
        let cell = &self.data[index];
        let mut cur = cell.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(cur) + v).to_bits();
            match cell.compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(seen) => cur = seen,
            }
        }
    }

    /// Accumulate a radiance value at a fractional raster position.
    /// Splats with non-finite components or an off-film position are
    /// dropped.
    pub fn splat(&self, rp: Vec2, v: Color) {
        if !v.is_finite() {
            return;
        }
        if !(0.0..=1.0).contains(&rp.x) || !(0.0..=1.0).contains(&rp.y) {
            return;
        }
        let x = ((rp.x * self.width as f32) as u32).min(self.width - 1);
        let y = ((rp.y * self.height as f32) as u32).min(self.height - 1);
        let i = self.base_index(x, y);
        self.add(i, v.r);
        self.add(i + 1, v.g);
        self.add(i + 2, v.b);
    }

    pub fn clear(&mut self) {
        for cell in self.data.iter_mut() {
            *cell.get_mut() = 0.0f32.to_bits();
        }
    }

    pub fn rescale(&mut self, s: f32) {
        for cell in self.data.iter_mut() {
            let v = f32::from_bits(*cell.get_mut()) * s;
            *cell.get_mut() = v.to_bits();
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let i = self.base_index(x, y);
        Color::new(
            f32::from_bits(self.data[i].load(Ordering::Relaxed)),
            f32::from_bits(self.data[i + 1].load(Ordering::Relaxed)),
            f32::from_bits(self.data[i + 2].load(Ordering::Relaxed)),
        )
    }

    /// Linear values clamped to [0,1]; tone mapping is the caller's
    /// business.
    pub fn to_image(&self) -> RgbImage {
        let mut image = RgbImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                // Film row 0 is the bottom; image row 0 is the top.
                let c = self.pixel(x, self.height - 1 - y);
                image.put_pixel(x, y, color_to_rgb(c));
            }
        }
        image
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        self.to_image().save(path)?;
        Ok(())
    }
}

fn color_to_rgb(c: Color) -> Rgb<u8> {
    let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
    Rgb([to_byte(c.r), to_byte(c.g), to_byte(c.b)])
}
