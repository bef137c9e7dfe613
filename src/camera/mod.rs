mod pinhole;

pub use pinhole::*;

use glam::{Vec2, Vec3A, Vec4};

use crate::{
    core::{
        color::Color,
        geometry::PointGeometry,
        interaction::Ray,
        loader::InputParams,
        rng::Rng,
    },
    scene::SceneResources,
};

#[derive(Copy, Clone, Debug)]
pub struct CameraRaySample {
    pub geom: PointGeometry,
    pub wo: Vec3A,
    pub weight: Color,
}

/// Camera endpoint contract. Importance is binary: one for directions
/// that land on the film, zero elsewhere.
#[enum_dispatch::enum_dispatch(Camera)]
pub trait CameraT: Send + Sync {
    /// Deterministic primary ray for a raster position in [0,1]^2
    /// (left-to-right, bottom-to-top).
    fn primary_ray(&self, rp: Vec2, aspect: f32) -> Ray;

    /// Inverse of `primary_ray`; `None` when `wo` misses the film.
    fn raster_position(&self, wo: Vec3A, aspect: f32) -> Option<Vec2>;

    /// Uniform primary ray inside a raster window `(x, y, w, h)`.
    fn sample_ray(&self, rng: &mut Rng, window: Vec4, aspect: f32) -> Option<CameraRaySample>;

    /// Direct connection from `geom` to the camera; `wo` in the result
    /// points from the camera toward `geom`.
    fn sample_direct(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        aspect: f32,
    ) -> Option<CameraRaySample>;

    fn pdf_direct(
        &self,
        geom: &PointGeometry,
        geom_e: &PointGeometry,
        wo: Vec3A,
        aspect: f32,
    ) -> f32;

    /// Solid-angle density of `sample_ray` over the full film window
    /// (the eye point is degenerated, so the measure stays solid angle).
    fn pdf_direction(&self, wo: Vec3A, aspect: f32) -> f32;

    fn eval(&self, wo: Vec3A, aspect: f32) -> Color;
}

#[enum_dispatch::enum_dispatch]
pub enum Camera {
    PinholeCamera,
}

pub fn create_camera_from_params(
    rsc: &mut SceneResources,
    params: &mut InputParams,
) -> anyhow::Result<()> {
    params.set_name("camera".into());
    let ty = params.get_str("type")?;
    let name = params.get_str("name")?;
    params.set_name(format!("camera-{}-{}", ty, name).into());

    let res = match ty.as_str() {
        "pinhole" => PinholeCamera::load(params)?.into(),
        _ => anyhow::bail!("{}: unknown type '{}'", params.name(), ty),
    };

    rsc.add_camera(name, res)?;

    params.check_unused_keys();

    Ok(())
}
