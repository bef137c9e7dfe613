use glam::Vec3A;

use crate::core::{
    color::Color,
    geometry::{geometry_term, PointGeometry, Transform},
    loader::InputParams,
    rng::Rng,
};

use super::{LightRaySample, LightT};

/// Point light with intensity `Le`. The position is a Dirac delta, so
/// the sampled geometry is degenerated and the light is never samplable
/// by the direction strategy.
pub struct PointLight {
    le: Color,
    position: Vec3A,
}

impl PointLight {
    pub fn new(le: Color, position: Vec3A) -> Self {
        Self { le, position }
    }

    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        let le = params.get_float3("Le")?.into();
        let position = params.get_float3("position")?;
        Ok(Self::new(le, Vec3A::from_array(position)))
    }
}

impl LightT for PointLight {
    fn sample_direct(
        &self,
        _rng: &mut Rng,
        geom: &PointGeometry,
        transform: &Transform,
    ) -> Option<LightRaySample> {
        let geom_l = PointGeometry::degenerated(transform.point(self.position));
        let to_light = geom_l.p - geom.p;
        if to_light.length_squared() == 0.0 {
            return None;
        }
        let wo = -to_light.normalize();
        let p_l = self.pdf_direct(geom, &geom_l, 0, transform, wo);
        if p_l == 0.0 {
            return None;
        }
        Some(LightRaySample {
            geom: geom_l,
            wo,
            comp: 0,
            weight: self.le / p_l,
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
        // Delta position: unit density in the area measure, converted
        // through the geometry term.
        let g = geometry_term(geom, geom_l);
        if g == 0.0 {
            0.0
        } else {
            1.0 / g
        }
    }

    fn sample_ray(&self, rng: &mut Rng, transform: &Transform) -> Option<LightRaySample> {
        let geom_l = PointGeometry::degenerated(transform.point(self.position));
        let wo = rng.uniform_on_sphere();
        Some(LightRaySample {
            geom: geom_l,
            wo,
            comp: 0,
            weight: self.le * (4.0 * std::f32::consts::PI),
        })
    }

    fn eval(&self, _geom: &PointGeometry, _comp: i32, _wo: Vec3A) -> Color {
        self.le
    }

    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        false
    }

    fn is_infinite(&self) -> bool {
        false
    }
}
