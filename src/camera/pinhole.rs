use glam::{Vec2, Vec3A, Vec4};

use crate::core::{
    color::Color,
    geometry::{geometry_term, PointGeometry},
    interaction::{Ray, RasterWindow},
    loader::InputParams,
    rng::Rng,
};

use super::{CameraRaySample, CameraT};

/// Pinhole camera looking from `position` toward `center`.
///
/// The eye position is a degenerated point; primary rays are
/// deterministic per raster position and the importance is one for any
/// direction that lands on the film.
pub struct PinholeCamera {
    position: Vec3A,
    u: Vec3A,
    v: Vec3A,
    w: Vec3A,
    tf: f32,
}

impl PinholeCamera {
    pub fn new(position: Vec3A, center: Vec3A, up: Vec3A, vfov_deg: f32) -> Self {
        let w = (position - center).normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u);
        Self {
            position,
            u,
            v,
            w,
            tf: (vfov_deg.to_radians() * 0.5).tan(),
        }
    }

    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        let position = params.get_float3("position")?;
        let center = params.get_float3("center")?;
        let up = params.get_float3_or("up", [0.0, 1.0, 0.0]);
        let vfov = params.get_float("vfov")?;
        Ok(Self::new(position.into(), center.into(), up.into(), vfov))
    }
}

impl CameraT for PinholeCamera {
    fn primary_ray(&self, rp: Vec2, aspect: f32) -> Ray {
        let rp = 2.0 * rp - Vec2::ONE;
        let d = (rp.x * aspect * self.tf * self.u + rp.y * self.tf * self.v - self.w).normalize();
        Ray::new(self.position, d)
    }

    fn raster_position(&self, wo: Vec3A, aspect: f32) -> Option<Vec2> {
        let local = Vec3A::new(wo.dot(self.u), wo.dot(self.v), wo.dot(self.w));
        if local.z >= 0.0 {
            // Behind the eye.
            return None;
        }
        let scale = -1.0 / local.z;
        let rp = Vec2::new(
            (local.x * scale / (aspect * self.tf) + 1.0) * 0.5,
            (local.y * scale / self.tf + 1.0) * 0.5,
        );
        ((0.0..=1.0).contains(&rp.x) && (0.0..=1.0).contains(&rp.y)).then_some(rp)
    }

    fn sample_ray(&self, rng: &mut Rng, window: Vec4, aspect: f32) -> Option<CameraRaySample> {
        let rp = RasterWindow::sample(window, rng.u2());
        let ray = self.primary_ray(rp, aspect);
        Some(CameraRaySample {
            geom: PointGeometry::degenerated(ray.o),
            wo: ray.d,
            weight: Color::WHITE,
        })
    }

    fn sample_direct(
        &self,
        _rng: &mut Rng,
        geom: &PointGeometry,
        aspect: f32,
    ) -> Option<CameraRaySample> {
        let geom_e = PointGeometry::degenerated(self.position);
        let to_point = geom.p - self.position;
        if to_point.length_squared() == 0.0 {
            return None;
        }
        let wo = to_point.normalize();
        self.raster_position(wo, aspect)?;
        let p_e = self.pdf_direct(geom, &geom_e, wo, aspect);
        if p_e == 0.0 {
            return None;
        }
        Some(CameraRaySample {
            geom: geom_e,
            wo,
            weight: self.eval(wo, aspect) / p_e,
        })
    }

    fn pdf_direct(
        &self,
        geom: &PointGeometry,
        geom_e: &PointGeometry,
        _wo: Vec3A,
        _aspect: f32,
    ) -> f32 {
        let g = geometry_term(geom, geom_e);
        if g == 0.0 {
            0.0
        } else {
            1.0 / g
        }
    }

    fn pdf_direction(&self, wo: Vec3A, aspect: f32) -> f32 {
        if self.raster_position(wo, aspect).is_none() {
            return 0.0;
        }
        let cos = wo.dot(-self.w);
        if cos <= 0.0 {
            return 0.0;
        }
        // Uniform raster over a film plane at unit distance.
        1.0 / (4.0 * aspect * self.tf * self.tf * cos * cos * cos)
    }

    fn eval(&self, wo: Vec3A, aspect: f32) -> Color {
        // Directional importance equals the primary-ray density, so a
        // full-window primary sample has unit weight and camera-side
        // NEE stays consistent with the direction strategy.
        Color::gray(self.pdf_direction(wo, aspect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PinholeCamera {
        PinholeCamera::new(
            Vec3A::new(0.0, 1.0, 5.0),
            Vec3A::new(0.0, 1.0, 0.0),
            Vec3A::Y,
            40.0,
        )
    }

    #[test]
    fn raster_roundtrip_in_the_film_interior() {
        let cam = camera();
        for aspect in [1.0, 16.0 / 9.0] {
            for x in 1..10 {
                for y in 1..10 {
                    let rp = Vec2::new(x as f32 / 10.0, y as f32 / 10.0);
                    let ray = cam.primary_ray(rp, aspect);
                    let back = cam.raster_position(ray.d, aspect).unwrap();
                    assert!((back - rp).length() < 1e-4, "rp {:?} back {:?}", rp, back);
                }
            }
        }
    }

    #[test]
    fn directions_off_the_film_have_no_raster() {
        let cam = camera();
        // Looking straight backwards.
        assert!(cam.raster_position(Vec3A::Z, 1.0).is_none());
        assert_eq!(cam.eval(Vec3A::Z, 1.0), Color::BLACK);
        // On-film importance equals the primary-ray density.
        let ray = cam.primary_ray(Vec2::new(0.4, 0.6), 1.0);
        assert_eq!(cam.eval(ray.d, 1.0).r, cam.pdf_direction(ray.d, 1.0));
    }

    #[test]
    fn windowed_samples_stay_inside_the_window() {
        let cam = camera();
        let window = Vec4::new(0.25, 0.5, 0.25, 0.25);
        let mut rng = Rng::seeded(7);
        for _ in 0..1000 {
            let s = cam.sample_ray(&mut rng, window, 1.0).unwrap();
            let rp = cam.raster_position(s.wo, 1.0).unwrap();
            assert!((0.25..=0.5).contains(&rp.x));
            assert!((0.5..=0.75).contains(&rp.y));
        }
    }

    #[test]
    fn direction_density_integrates_to_one() {
        let cam = camera();
        let aspect = 1.5;
        let mut rng = Rng::seeded(59);
        let n = 1_000_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let d = rng.uniform_on_sphere();
            sum += (cam.pdf_direction(d, aspect) * 4.0 * std::f32::consts::PI) as f64;
        }
        let estimate = sum / n as f64;
        assert!((estimate - 1.0).abs() < 0.02, "estimate {}", estimate);
    }

    #[test]
    fn direct_connection_sees_points_in_front() {
        let cam = camera();
        let geom = PointGeometry::on_surface(Vec3A::new(0.0, 1.0, 0.0), Vec3A::Z, Vec2::ZERO);
        let mut rng = Rng::seeded(7);
        let s = cam.sample_direct(&mut rng, &geom, 1.0).unwrap();
        assert!(s.geom.degenerated);
        assert!(s.wo.dot(-Vec3A::Z) > 0.99);
        // Behind the camera there is no connection.
        let behind = PointGeometry::on_surface(Vec3A::new(0.0, 1.0, 9.0), Vec3A::Z, Vec2::ZERO);
        assert!(cam.sample_direct(&mut rng, &behind, 1.0).is_none());
    }
}
