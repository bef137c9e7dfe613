use std::sync::Arc;

use glam::{Vec2, Vec3A};

use crate::{
    core::{
        color::Color,
        dist::AliasTable,
        geometry::{geometry_term, mix_barycentric, safe_sqrt, PointGeometry, Transform},
        loader::InputParams,
        rng::Rng,
    },
    mesh::Mesh,
    scene::SceneResources,
};

use super::{LightRaySample, LightT};

const PI: f32 = std::f32::consts::PI;

/// One-sided area light emitting `Ke` from an attached mesh, sampled
/// uniformly over the surface (triangles weighted by area).
pub struct AreaLight {
    ke: Color,
    mesh: Arc<Mesh>,
    dist: AliasTable,
    inv_area: f32,
}

impl AreaLight {
    pub fn new(ke: Color, mesh: Arc<Mesh>) -> Self {
        // Area table is built in object space; transforms rescale the
        // density by their Jacobian at query time.
        let mut areas = Vec::with_capacity(mesh.num_triangles());
        let mut total = 0.0;
        for (_, tri) in mesh.triangles() {
            let cr = (tri.p2.p - tri.p1.p).cross(tri.p3.p - tri.p1.p);
            let area = 0.5 * safe_sqrt(cr.dot(cr));
            total += area;
            areas.push(area);
        }
        Self {
            ke,
            mesh,
            dist: AliasTable::new(&areas),
            inv_area: 1.0 / total,
        }
    }

    pub fn load(rsc: &mut SceneResources, params: &mut InputParams) -> anyhow::Result<Self> {
        let ke = params.get_float3("Ke")?.into();
        let mesh = rsc.clone_mesh(&params.get_str("mesh")?)?;
        Ok(Self::new(ke, mesh))
    }

    fn transformed_inv_area(&self, transform: &Transform) -> f32 {
        // TODO: non-uniform scaling changes area by a different factor
        // than the volume Jacobian; handle the degenerated axis case.
        self.inv_area / transform.j
    }

    fn sample_surface(&self, rng: &mut Rng, transform: &Transform) -> PointGeometry {
        let (face, _) = self.dist.sample(rng.u());
        let tri = self.mesh.triangle_at(face);
        let s = safe_sqrt(rng.u());
        let uv = Vec2::new(1.0 - s, rng.u() * s);
        let p = mix_barycentric(tri.p1.p, tri.p2.p, tri.p3.p, uv);
        let n = (tri.p2.p - tri.p1.p).cross(tri.p3.p - tri.p1.p).normalize();
        PointGeometry::on_surface(transform.point(p), transform.normal(n), Vec2::ZERO)
    }
}

impl LightT for AreaLight {
    fn sample_direct(
        &self,
        rng: &mut Rng,
        geom: &PointGeometry,
        transform: &Transform,
    ) -> Option<LightRaySample> {
        let geom_l = self.sample_surface(rng, transform);
        let to_light = geom_l.p - geom.p;
        if to_light.length_squared() == 0.0 {
            return None;
        }
        let wo = -to_light.normalize();
        let p_l = self.pdf_direct(geom, &geom_l, 0, transform, wo);
        if p_l == 0.0 {
            return None;
        }
        let le = self.eval(&geom_l, 0, wo);
        Some(LightRaySample {
            geom: geom_l,
            wo,
            comp: 0,
            weight: le / p_l,
        })
    }

    fn pdf_direct(
        &self,
        geom: &PointGeometry,
        geom_l: &PointGeometry,
        _comp: i32,
        transform: &Transform,
        _wo: Vec3A,
    ) -> f32 {
        let g = geometry_term(geom, geom_l);
        if g == 0.0 {
            0.0
        } else {
            self.transformed_inv_area(transform) / g
        }
    }

    fn sample_ray(&self, rng: &mut Rng, transform: &Transform) -> Option<LightRaySample> {
        let geom_l = self.sample_surface(rng, transform);
        let (n, u, v) = geom_l.orthonormal_basis_twosided(geom_l.n);
        let d = rng.cosine_weighted_on_hemisphere();
        let wo = u * d.x + v * d.y + n * d.z;
        // Position density invA (area), direction density 1/pi
        // (projected solid angle); Ke / (invA / pi).
        let weight = self.ke * (PI / self.transformed_inv_area(transform));
        Some(LightRaySample {
            geom: geom_l,
            wo,
            comp: 0,
            weight,
        })
    }

    fn eval(&self, geom: &PointGeometry, _comp: i32, wo: Vec3A) -> Color {
        if wo.dot(geom.n) <= 0.0 {
            Color::BLACK
        } else {
            self.ke
        }
    }

    fn is_specular(&self, _geom: &PointGeometry, _comp: i32) -> bool {
        false
    }

    fn is_infinite(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad_light() -> AreaLight {
        AreaLight::new(Color::new(2.0, 1.0, 0.5), Arc::new(Mesh::quad(0.5)))
    }

    #[test]
    fn weight_times_density_recovers_emission() {
        let light = unit_quad_light();
        let transform = Transform::identity();
        let receiver =
            PointGeometry::on_surface(Vec3A::new(0.0, 0.0, 2.0), -Vec3A::Z, Vec2::ZERO);
        let mut rng = Rng::seeded(13);
        for _ in 0..1000 {
            let s = light.sample_direct(&mut rng, &receiver, &transform).unwrap();
            let p = light.pdf_direct(&receiver, &s.geom, s.comp, &transform, s.wo);
            let le = light.eval(&s.geom, s.comp, s.wo);
            let recovered = s.weight * p;
            assert!((recovered.r - le.r).abs() < 1e-3);
            assert!((recovered.g - le.g).abs() < 1e-3);
            // wo points from the light toward the receiver.
            assert!(s.wo.dot(Vec3A::Z) > 0.0);
        }
    }

    #[test]
    fn backside_emission_is_zero() {
        let light = unit_quad_light();
        let geom_l = PointGeometry::on_surface(Vec3A::ZERO, Vec3A::Z, Vec2::ZERO);
        assert!(light.eval(&geom_l, 0, -Vec3A::Z).is_black());
    }

    #[test]
    fn direct_sampling_integrates_projected_solid_angle() {
        // E[1/pdf_direct] equals the projected solid angle subtended by
        // the light; compare against a uniform-direction estimate.
        let light = unit_quad_light();
        let transform = Transform::identity();
        let receiver =
            PointGeometry::on_surface(Vec3A::new(0.0, 0.0, 1.0), -Vec3A::Z, Vec2::ZERO);
        let mut rng = Rng::seeded(29);
        let n = 400_000;
        let mut by_light = 0.0f64;
        for _ in 0..n {
            let s = light.sample_direct(&mut rng, &receiver, &transform).unwrap();
            let p = light.pdf_direct(&receiver, &s.geom, s.comp, &transform, s.wo);
            by_light += 1.0 / p as f64;
        }
        by_light /= n as f64;

        let mut by_direction = 0.0f64;
        for _ in 0..n {
            let d = rng.uniform_on_sphere();
            if d.z >= 0.0 {
                continue;
            }
            // Does the direction from the receiver hit the quad z=0,
            // |x|,|y| <= 0.5?
            let t = -receiver.p.z / d.z;
            let hit = receiver.p + d * t;
            if hit.x.abs() <= 0.5 && hit.y.abs() <= 0.5 {
                by_direction += (d.z.abs() * 4.0 * std::f64::consts::PI as f32) as f64;
            }
        }
        by_direction /= n as f64;

        let rel = (by_light - by_direction).abs() / by_direction;
        assert!(rel < 0.02, "light {} direction {}", by_light, by_direction);
    }

    #[test]
    fn emitted_rays_leave_the_front_side() {
        let light = unit_quad_light();
        let transform = Transform::identity();
        let mut rng = Rng::seeded(43);
        for _ in 0..1000 {
            let s = light.sample_ray(&mut rng, &transform).unwrap();
            assert!(s.wo.dot(s.geom.n) >= 0.0);
            assert!(s.weight.is_finite());
        }
    }
}
