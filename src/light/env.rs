use glam::Vec3A;

use crate::core::{
    color::Color,
    dist::AliasTable,
    geometry::{convert_sa_to_proj_sa, safe_sqrt, PointGeometry, Transform},
    loader::InputParams,
    rng::Rng,
};

use super::{LightRaySample, LightT};

const PI: f32 = std::f32::consts::PI;

/// Environment light over a lat-long map (y-up), importance-sampled by
/// texel luminance weighted with `sin(theta)`. Evaluation and density
/// use the same nearest-texel lookup so `weight * pdf` recovers the
/// emission exactly.
pub struct EnvLight {
    rows: Vec<Vec<Color>>,
    scale: Color,
    width: usize,
    height: usize,
    dist: AliasTable,
    rot: f32,
}

impl EnvLight {
    pub fn new(rows: Vec<Vec<Color>>, scale: Color, rot: f32) -> Self {
        let height = rows.len();
        let width = rows[0].len();
        let mut weights = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let st = (PI * (y as f32 + 0.5) / height as f32).sin();
            for pixel in row {
                weights.push(pixel.luminance() * st);
            }
        }
        Self {
            rows,
            scale,
            width,
            height,
            dist: AliasTable::new(&weights),
            rot,
        }
    }

    /// Single-color environment (uniform sky).
    pub fn constant(le: Color, scale: Color) -> Self {
        Self::new(vec![vec![le]], scale, 0.0)
    }

    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        let path = params.get_str("path")?;
        let rows = if path.ends_with(".exr") {
            params.get_exr_image("path")?
        } else {
            let image = params.get_image("path")?.to_rgb32f();
            let (w, h) = image.dimensions();
            (0..h)
                .map(|y| {
                    (0..w)
                        .map(|x| {
                            let p = image.get_pixel(x, y);
                            Color::new(p[0], p[1], p[2])
                        })
                        .collect()
                })
                .collect()
        };
        let scale = params.get_float3_or("scale", [1.0, 1.0, 1.0]).into();
        let rot = params.get_float_or("rot", 0.0).to_radians();
        Ok(Self::new(rows, scale, rot))
    }

    /// Map a world direction (scene toward environment) to texel
    /// coordinates.
    fn texel_of(&self, d: Vec3A) -> (usize, usize, f32) {
        let at = {
            let at = d.x.atan2(d.z);
            if at < 0.0 {
                at + 2.0 * PI
            } else {
                at
            }
        };
        let u = {
            let t = (at - self.rot) * 0.5 / PI;
            t - t.floor()
        };
        let v = d.y.clamp(-1.0, 1.0).acos() / PI;
        let x = ((u * self.width as f32) as usize).min(self.width - 1);
        let y = ((v * self.height as f32) as usize).min(self.height - 1);
        let st = safe_sqrt(1.0 - d.y * d.y);
        (x, y, st)
    }

    fn radiance(&self, d: Vec3A) -> Color {
        let (x, y, _) = self.texel_of(d);
        self.rows[y][x] * self.scale
    }
}

impl LightT for EnvLight {
    fn sample_direct(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        _transform: &Transform,
    ) -> Option<LightRaySample> {
        let (index, _) = self.dist.sample(rng.u());
        let x = index % self.width;
        let y = index / self.width;
        let (u1, u2) = rng.u2();
        let theta = PI * (y as f32 + u2) / self.height as f32;
        let phi = 2.0 * PI * (x as f32 + u1) / self.width as f32 + self.rot;
        let st = theta.sin();
        let d = Vec3A::new(st * phi.sin(), theta.cos(), st * phi.cos());
        let geom_l = PointGeometry::infinite(-d);
        let p_l = self.pdf_direct(geom, &geom_l, 0, &Transform::identity(), -d);
        if p_l == 0.0 {
            return None;
        }
        let le = self.eval(&geom_l, 0, -d);
        Some(LightRaySample {
            geom: geom_l,
            wo: -d,
            comp: 0,
            weight: le / p_l,
        })
    }

    fn pdf_direct(
        &self,
        geom: &PointGeometry,
        geom_l: &PointGeometry,
        _comp: i32,
        _transform: &Transform,
        _wo: Vec3A,
    ) -> f32 {
        let d = -geom_l.wo;
        let (x, y, st) = self.texel_of(d);
        if st == 0.0 {
            return 0.0;
        }
        let prob = self.dist.probability(y * self.width + x);
        let pdf_sa = prob * (self.width * self.height) as f32 / (2.0 * PI * PI * st);
        convert_sa_to_proj_sa(pdf_sa, geom, d)
    }

    fn sample_ray(&self, _rng: &mut Rng, _transform: &Transform) -> Option<LightRaySample> {
        // Walks starting from the environment are not supported.
        None
    }

    fn eval(&self, geom: &PointGeometry, _comp: i32, _wo: Vec3A) -> Color {
        self.radiance(-geom.wo)
    }

    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        false
    }

    fn is_infinite(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn weight_times_density_recovers_emission() {
        let rows = vec![
            vec![Color::gray(0.2), Color::new(3.0, 1.0, 0.5)],
            vec![Color::gray(1.0), Color::gray(0.1)],
        ];
        let light = EnvLight::new(rows, Color::WHITE, 0.3);
        let receiver = PointGeometry::on_surface(Vec3A::ZERO, Vec3A::Y, Vec2::ZERO);
        let transform = Transform::identity();
        let mut rng = Rng::seeded(19);
        for _ in 0..2000 {
            let Some(s) = light.sample_direct(&mut rng, &receiver, &transform) else {
                continue;
            };
            assert!(s.geom.infinite);
            let p = light.pdf_direct(&receiver, &s.geom, s.comp, &transform, s.wo);
            let le = light.eval(&s.geom, s.comp, s.wo);
            let recovered = s.weight * p;
            assert!(
                (recovered.r - le.r).abs() < 1e-3 * le.r.max(1.0),
                "{} vs {}",
                recovered.r,
                le.r
            );
        }
    }

    #[test]
    fn constant_sky_evaluates_everywhere() {
        let light = EnvLight::constant(Color::gray(0.7), Color::WHITE);
        let geom_l = PointGeometry::infinite(Vec3A::new(0.3, -0.8, 0.52).normalize());
        let le = light.eval(&geom_l, 0, geom_l.wo);
        assert!((le.r - 0.7).abs() < 1e-6);
        assert!(light.is_infinite());
    }
}
