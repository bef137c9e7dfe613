mod node;
mod resources;

pub use node::*;
pub use resources::*;

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3A};

use crate::{
    accel::{Bvh, FlatTriangle},
    camera::CameraT,
    core::{
        color::Color,
        error::RenderError,
        geometry::{PointGeometry, Transform, RAY_EPS, TMAX_NO_ENV},
        interaction::{
            DirectionSample, DistanceSample, InteractionKind, Ray, RaySample, SceneInteraction,
            TransDir, COMP_DONT_CARE,
        },
        rng::Rng,
    },
    light::LightT,
    material::MaterialT,
    medium::MediumT,
    model::WavefrontObjModel,
    phase::PhaseT,
};

#[derive(Copy, Clone)]
struct LightPrimitiveIndex {
    transform: Transform,
    node: usize,
}

/// Scene graph plus the sampling contract consumed by the integrators.
///
/// The walk code never touches geometry directly; everything goes
/// through the sampling and evaluation functions here. Directional
/// densities are in projected solid angle except at degenerated points.
/// The scene is immutable during rendering and shared across workers.
pub struct Scene {
    nodes: Vec<SceneNode>,
    global_transforms: Vec<Option<Transform>>,
    accel: Option<Bvh>,
    camera: Option<usize>,
    lights: Vec<LightPrimitiveIndex>,
    light_indices: HashMap<usize, usize>,
    env_light: Option<usize>,
    medium: Option<usize>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![SceneNode::group(None)],
            global_transforms: Vec::new(),
            accel: None,
            camera: None,
            lights: Vec::new(),
            light_indices: HashMap::new(),
            env_light: None,
            medium: None,
        }
    }

    // --------------------------------------------------------------
    // Scene graph construction
    // --------------------------------------------------------------

    pub fn root_node(&self) -> usize {
        0
    }

    pub fn create_group_node(&mut self, transform: Option<Mat4>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(SceneNode::group(transform));
        index
    }

    pub fn create_primitive_node(&mut self, prim: ScenePrimitive) -> anyhow::Result<usize> {
        if prim.is_empty() {
            anyhow::bail!("primitive node carries no assets");
        }
        if prim.camera.is_some() && prim.light.is_some() {
            anyhow::bail!("a primitive cannot be both camera and light");
        }
        let index = self.nodes.len();
        if prim.camera.is_some() {
            self.camera = Some(index);
        }
        if let Some(light) = &prim.light {
            if light.is_infinite() {
                if self.env_light.is_some() {
                    anyhow::bail!("only one environment light can be registered");
                }
                self.env_light = Some(index);
            }
        }
        if prim.medium.is_some() {
            // The medium is treated as a global asset for now.
            self.medium = Some(index);
        }
        self.nodes.push(SceneNode::Primitive(prim));
        Ok(index)
    }

    pub fn add_child(&mut self, parent: usize, child: usize) -> anyhow::Result<()> {
        match self.nodes.get_mut(parent) {
            Some(SceneNode::Group { children, .. }) => {
                children.push(child);
                Ok(())
            }
            _ => anyhow::bail!("node {} is not a group", parent),
        }
    }

    /// Create a transformed primitive under the root.
    pub fn add_primitive(
        &mut self,
        prim: ScenePrimitive,
        transform: Option<Mat4>,
    ) -> anyhow::Result<usize> {
        let group = self.create_group_node(transform);
        let node = self.create_primitive_node(prim)?;
        self.add_child(group, node)?;
        self.add_child(self.root_node(), group)?;
        Ok(node)
    }

    /// Instantiate all mesh groups of a loaded model under one group.
    pub fn add_model(
        &mut self,
        model: &WavefrontObjModel,
        transform: Option<Mat4>,
    ) -> anyhow::Result<()> {
        let group = self.create_group_node(transform);
        for mg in model.groups() {
            let node = self.create_primitive_node(ScenePrimitive {
                mesh: Some(mg.mesh.clone()),
                material: Some(mg.material.clone()),
                light: mg.light.clone(),
                camera: None,
                medium: None,
            })?;
            self.add_child(group, node)?;
        }
        self.add_child(self.root_node(), group)?;
        Ok(())
    }

    /// Pre-order walk over primitive nodes with their accumulated
    /// global transforms.
    pub fn traverse_primitive_nodes(
        &self,
        visit: &mut dyn FnMut(usize, &ScenePrimitive, Mat4),
    ) {
        self.visit_node(self.root_node(), Mat4::IDENTITY, visit);
    }

    fn visit_node(
        &self,
        index: usize,
        global: Mat4,
        visit: &mut dyn FnMut(usize, &ScenePrimitive, Mat4),
    ) {
        match &self.nodes[index] {
            SceneNode::Group {
                children,
                transform,
            } => {
                let m = transform.map_or(global, |t| global * t);
                for &child in children {
                    self.visit_node(child, m, visit);
                }
            }
            SceneNode::Primitive(prim) => visit(index, prim, global),
        }
    }

    /// Resolve light references and build the acceleration structure.
    /// Must be called again after any scene-graph or asset change.
    pub fn build(&mut self) {
        let mut transforms = vec![None; self.nodes.len()];
        let mut lights = Vec::new();
        let mut light_indices = HashMap::new();
        let mut triangles = Vec::new();

        self.traverse_primitive_nodes(&mut |index, prim, global| {
            let transform = Transform::new(global);
            transforms[index] = Some(transform);
            if prim.light.is_some() {
                light_indices.insert(index, lights.len());
                lights.push(LightPrimitiveIndex {
                    transform,
                    node: index,
                });
            }
            if let Some(mesh) = &prim.mesh {
                for (face, tri) in mesh.triangles() {
                    triangles.push(FlatTriangle {
                        p1: transform.point(tri.p1.p),
                        p2: transform.point(tri.p2.p),
                        p3: transform.point(tri.p3.p),
                        node: index as u32,
                        face: face as u32,
                    });
                }
            }
        });

        log::info!(
            "scene built: {} nodes, {} lights, {} triangles",
            self.nodes.len(),
            lights.len(),
            triangles.len()
        );

        self.global_transforms = transforms;
        self.lights = lights;
        self.light_indices = light_indices;
        self.accel = Some(Bvh::build(triangles));
    }

    pub fn num_lights(&self) -> usize {
        self.lights.len()
    }

    pub fn camera_node(&self) -> Option<usize> {
        self.camera
    }

    pub fn env_light_node(&self) -> Option<usize> {
        self.env_light
    }

    pub fn medium_node(&self) -> Option<usize> {
        self.medium
    }

    /// Fails with `Unsupported` naming the missing element unless the
    /// scene can be rendered.
    pub fn require_renderable(&self) -> Result<(), RenderError> {
        if self.nodes.len() <= 1 {
            return Err(RenderError::Unsupported(
                "the scene contains no primitives".into(),
            ));
        }
        if self.camera.is_none() {
            return Err(RenderError::Unsupported(
                "the scene contains no camera".into(),
            ));
        }
        if self.lights.is_empty() {
            return Err(RenderError::Unsupported(
                "the scene contains no lights".into(),
            ));
        }
        if self.accel.is_none() {
            return Err(RenderError::Unsupported(
                "the scene has not been built".into(),
            ));
        }
        Ok(())
    }

    // --------------------------------------------------------------
    // Internal accessors
    // --------------------------------------------------------------

    fn primitive(&self, node: usize) -> &ScenePrimitive {
        self.nodes[node]
            .as_primitive()
            .expect("index does not refer to a primitive node")
    }

    fn node_transform(&self, node: usize) -> Transform {
        self.global_transforms
            .get(node)
            .and_then(|t| *t)
            .unwrap_or_else(Transform::identity)
    }

    fn camera_of(&self, node: usize) -> &crate::camera::Camera {
        self.primitive(node)
            .camera
            .as_ref()
            .expect("camera node lost its camera")
    }

    fn sample_light_selection(&self, rng: &mut Rng) -> (usize, f32) {
        let n = self.lights.len();
        let i = ((rng.u() * n as f32) as usize).min(n - 1);
        (i, 1.0 / n as f32)
    }

    fn pdf_light_selection(&self) -> f32 {
        1.0 / self.lights.len() as f32
    }

    // --------------------------------------------------------------
    // Ray-scene queries
    // --------------------------------------------------------------

    /// Deterministic camera ray for a raster coordinate.
    pub fn primary_ray(&self, rp: Vec2, aspect: f32) -> Ray {
        let node = self.camera.expect("no camera in the scene");
        self.camera_of(node).primary_ray(rp, aspect)
    }

    /// Inverse of `primary_ray`; `None` when `wo` misses the film.
    pub fn raster_position(&self, wo: Vec3A, aspect: f32) -> Option<Vec2> {
        let node = self.camera?;
        self.camera_of(node).raster_position(wo, aspect)
    }

    /// Closest hit. With an environment light and an unbounded range a
    /// miss becomes an infinite interaction carrying the ray direction.
    pub fn intersect(&self, ray: &Ray, tmin: f32, tmax: f32) -> Option<SceneInteraction> {
        let accel = self.accel.as_ref()?;
        match accel.intersect(ray, tmin, tmax) {
            None => {
                if tmax < f32::INFINITY {
                    return None;
                }
                let env = self.env_light?;
                Some(SceneInteraction::env_hit(env, -ray.d))
            }
            Some(hit) => {
                let node = hit.node as usize;
                let prim = self.primitive(node);
                let mesh = prim.mesh.as_ref()?;
                let p = mesh.surface_point(hit.face as usize, hit.uv);
                let transform = self.node_transform(node);
                Some(SceneInteraction::surface(
                    node,
                    PointGeometry::on_surface(transform.point(p.p), transform.normal(p.n), p.t),
                ))
            }
        }
    }

    /// Shadow-ray test, symmetric in its arguments. An infinite
    /// endpoint is tested with a bounded range so the environment light
    /// itself never occludes.
    pub fn visible(&self, sp1: &SceneInteraction, sp2: &SceneInteraction) -> bool {
        let test = |from: &SceneInteraction, to: &SceneInteraction| {
            debug_assert!(!from.geom.infinite);
            let (wo, tmax) = if to.geom.infinite {
                (-to.geom.wo, TMAX_NO_ENV)
            } else {
                let v = to.geom.p - from.geom.p;
                let d = v.length();
                (v / d, d * (1.0 - RAY_EPS))
            };
            self.intersect(&Ray::new(from.geom.p, wo), RAY_EPS, tmax)
                .is_none()
        };
        if sp1.geom.infinite {
            test(sp2, sp1)
        } else {
            test(sp1, sp2)
        }
    }

    // --------------------------------------------------------------
    // Primitive type checks
    // --------------------------------------------------------------

    pub fn is_light(&self, sp: &SceneInteraction) -> bool {
        if sp.is_terminator() {
            return false;
        }
        let prim = self.primitive(sp.node);
        if sp.is_medium() {
            prim.medium.as_ref().map_or(false, |m| m.is_emitter())
        } else {
            prim.light.is_some()
        }
    }

    pub fn is_specular(&self, sp: &SceneInteraction, comp: i32) -> bool {
        match sp.kind {
            InteractionKind::SurfacePoint => {
                let prim = self.primitive(sp.node);
                prim.material
                    .as_ref()
                    .map_or(false, |m| m.is_specular(&sp.geom, comp))
            }
            InteractionKind::MediumPoint => {
                let prim = self.primitive(sp.node);
                prim.medium
                    .as_ref()
                    .map_or(false, |m| m.phase().is_specular())
            }
            InteractionKind::LightEndpoint | InteractionKind::InfiniteEnvHit => {
                let prim = self.primitive(sp.node);
                prim.light
                    .as_ref()
                    .map_or(false, |l| l.is_specular(&sp.geom, comp))
            }
            _ => false,
        }
    }

    // --------------------------------------------------------------
    // Ray sampling
    // --------------------------------------------------------------

    /// Unified position+direction sampling: terminators sample a
    /// primary ray from importance/emission (ignoring `wi`), midpoints
    /// sample a direction from the material or phase function.
    pub fn sample_ray(
        &self,
        rng: &mut Rng,
        sp: &SceneInteraction,
        wi: Vec3A,
    ) -> Option<RaySample> {
        match sp.kind {
            InteractionKind::CameraTerm { window, aspect } => {
                let node = self.camera?;
                let s = self.camera_of(node).sample_ray(rng, window, aspect)?;
                Some(RaySample {
                    sp: SceneInteraction::camera_endpoint(node, s.geom, aspect),
                    comp: COMP_DONT_CARE,
                    wo: s.wo,
                    weight: s.weight,
                })
            }
            InteractionKind::LightTerm => {
                if self.lights.is_empty() {
                    return None;
                }
                let (i, p_sel) = self.sample_light_selection(rng);
                let light = self.lights[i];
                let prim = self.primitive(light.node);
                let s = prim.light.as_ref()?.sample_ray(rng, &light.transform)?;
                Some(RaySample {
                    sp: SceneInteraction::light_endpoint(light.node, s.geom),
                    comp: s.comp,
                    wo: s.wo,
                    weight: s.weight / p_sel,
                })
            }
            InteractionKind::MediumPoint => {
                let prim = self.primitive(sp.node);
                let s = prim
                    .medium
                    .as_ref()?
                    .phase()
                    .sample_direction(rng, &sp.geom, wi)?;
                Some(RaySample {
                    sp: *sp,
                    comp: COMP_DONT_CARE,
                    wo: s.wo,
                    weight: s.weight,
                })
            }
            InteractionKind::SurfacePoint => {
                let prim = self.primitive(sp.node);
                let s = prim
                    .material
                    .as_ref()?
                    .sample_direction(rng, &sp.geom, wi, TransDir::EL)?;
                Some(RaySample {
                    sp: *sp,
                    comp: s.comp,
                    wo: s.wo,
                    weight: s.weight,
                })
            }
            _ => None,
        }
    }

    /// Direction-only sampling at a midpoint.
    pub fn sample_direction(
        &self,
        rng: &mut Rng,
        sp: &SceneInteraction,
        wi: Vec3A,
    ) -> Option<DirectionSample> {
        if !(sp.is_surface() || sp.is_medium()) {
            return None;
        }
        let s = self.sample_ray(rng, sp, wi)?;
        Some(DirectionSample {
            wo: s.wo,
            comp: s.comp,
            weight: s.weight,
        })
    }

    /// Density of direction sampling: projected solid angle unless the
    /// point is degenerated.
    pub fn pdf_direction(&self, sp: &SceneInteraction, comp: i32, wi: Vec3A, wo: Vec3A) -> f32 {
        match sp.kind {
            InteractionKind::CameraEndpoint { aspect } => {
                self.camera_of(sp.node).pdf_direction(wo, aspect)
            }
            InteractionKind::MediumPoint => {
                let prim = self.primitive(sp.node);
                prim.medium
                    .as_ref()
                    .map_or(0.0, |m| m.phase().pdf_direction(&sp.geom, wi, wo))
            }
            InteractionKind::SurfacePoint => {
                let prim = self.primitive(sp.node);
                prim.material
                    .as_ref()
                    .map_or(0.0, |m| m.pdf_direction(&sp.geom, comp, wi, wo, true))
            }
            _ => 0.0,
        }
    }

    // --------------------------------------------------------------
    // Direct endpoint sampling
    // --------------------------------------------------------------

    /// Sample a point on a light. The returned `wo` points from the
    /// light toward `sp`; callers shade with `-wo`.
    pub fn sample_direct_light(
        &self,
        rng: &mut Rng,
        sp: &SceneInteraction,
    ) -> Option<RaySample> {
        if self.lights.is_empty() {
            return None;
        }
        let (i, p_sel) = self.sample_light_selection(rng);
        let light = self.lights[i];
        let prim = self.primitive(light.node);
        let s = prim
            .light
            .as_ref()?
            .sample_direct(rng, &sp.geom, &light.transform)?;
        Some(RaySample {
            sp: SceneInteraction::light_endpoint(light.node, s.geom),
            comp: s.comp,
            wo: s.wo,
            weight: s.weight / p_sel,
        })
    }

    /// Dual of `sample_direct_light` for light tracing.
    pub fn sample_direct_camera(
        &self,
        rng: &mut Rng,
        sp: &SceneInteraction,
        aspect: f32,
    ) -> Option<RaySample> {
        let node = self.camera?;
        let s = self.camera_of(node).sample_direct(rng, &sp.geom, aspect)?;
        Some(RaySample {
            sp: SceneInteraction::camera_endpoint(node, s.geom, aspect),
            comp: COMP_DONT_CARE,
            wo: s.wo,
            weight: s.weight,
        })
    }

    /// Density of direct endpoint sampling. `wo` is the outgoing
    /// direction from the endpoint, not from `sp`.
    pub fn pdf_direct(
        &self,
        sp: &SceneInteraction,
        sp_endpoint: &SceneInteraction,
        comp_endpoint: i32,
        wo: Vec3A,
    ) -> f32 {
        match sp_endpoint.kind {
            InteractionKind::CameraEndpoint { aspect } => self
                .camera_of(sp_endpoint.node)
                .pdf_direct(&sp.geom, &sp_endpoint.geom, wo, aspect),
            InteractionKind::LightEndpoint | InteractionKind::InfiniteEnvHit => {
                let Some(&light_index) = self.light_indices.get(&sp_endpoint.node) else {
                    return 0.0;
                };
                let light = self.lights[light_index];
                let prim = self.primitive(sp_endpoint.node);
                prim.light.as_ref().map_or(0.0, |l| {
                    self.pdf_light_selection()
                        * l.pdf_direct(
                            &sp.geom,
                            &sp_endpoint.geom,
                            comp_endpoint,
                            &light.transform,
                            wo,
                        )
                })
            }
            _ => 0.0,
        }
    }

    // --------------------------------------------------------------
    // Distance sampling
    // --------------------------------------------------------------

    /// Sample a medium event or the next surface along `wo`; the weight
    /// folds in the transmittance divided by the sampling density.
    pub fn sample_distance(
        &self,
        rng: &mut Rng,
        sp: &SceneInteraction,
        wo: Vec3A,
    ) -> Option<DistanceSample> {
        let ray = Ray::new(sp.geom.p, wo);
        let hit = self.intersect(&ray, RAY_EPS, f32::INFINITY);
        let Some(medium_node) = self.medium else {
            return hit.map(|sp| DistanceSample {
                sp,
                weight: Color::WHITE,
            });
        };
        let dist = match &hit {
            Some(h) if !h.geom.infinite => (h.geom.p - sp.geom.p).length(),
            _ => f32::INFINITY,
        };
        let medium = self.primitive(medium_node).medium.as_ref()?;
        match medium.sample_distance(rng, &ray, 0.0, dist) {
            Some(ds) if ds.medium => Some(DistanceSample {
                sp: SceneInteraction::medium(medium_node, PointGeometry::degenerated(ds.p)),
                weight: ds.weight,
            }),
            Some(ds) => hit.map(|sp| DistanceSample {
                sp,
                weight: ds.weight,
            }),
            None => hit.map(|sp| DistanceSample {
                sp,
                weight: Color::WHITE,
            }),
        }
    }

    /// Unbiased transmittance between two interactions; zero when the
    /// endpoints are mutually occluded, stochastic in heterogeneous
    /// media.
    pub fn eval_transmittance(
        &self,
        rng: &mut Rng,
        sp1: &SceneInteraction,
        sp2: &SceneInteraction,
    ) -> Color {
        if !self.visible(sp1, sp2) {
            return Color::BLACK;
        }
        let Some(medium_node) = self.medium else {
            return Color::WHITE;
        };
        debug_assert!(!sp1.geom.infinite);
        let (wo, dist) = if sp2.geom.infinite {
            (-sp2.geom.wo, f32::INFINITY)
        } else {
            let v = sp2.geom.p - sp1.geom.p;
            let d = v.length();
            (v / d, d)
        };
        match self.primitive(medium_node).medium.as_ref() {
            Some(medium) => {
                medium.eval_transmittance(rng, &Ray::new(sp1.geom.p, wo), 0.0, dist)
            }
            None => Color::WHITE,
        }
    }

    // --------------------------------------------------------------
    // Contribution evaluation
    // --------------------------------------------------------------

    /// Directional contribution: BSDF, phase, emission or importance
    /// depending on the interaction tag.
    pub fn eval_contrb(&self, sp: &SceneInteraction, comp: i32, wi: Vec3A, wo: Vec3A) -> Color {
        match sp.kind {
            InteractionKind::CameraEndpoint { aspect } => self.camera_of(sp.node).eval(wo, aspect),
            InteractionKind::LightEndpoint | InteractionKind::InfiniteEnvHit => {
                let prim = self.primitive(sp.node);
                prim.light
                    .as_ref()
                    .map_or(Color::BLACK, |l| l.eval(&sp.geom, comp, wo))
            }
            InteractionKind::MediumPoint => {
                let prim = self.primitive(sp.node);
                prim.medium
                    .as_ref()
                    .map_or(Color::BLACK, |m| m.phase().eval(&sp.geom, wi, wo))
            }
            InteractionKind::SurfacePoint => {
                let prim = self.primitive(sp.node);
                prim.material.as_ref().map_or(Color::BLACK, |m| {
                    m.eval(&sp.geom, comp, wi, wo, TransDir::EL, true)
                })
            }
            _ => Color::BLACK,
        }
    }

    /// Positional contribution of an endpoint (unit for the supported
    /// endpoint types).
    pub fn eval_contrb_endpoint(&self, sp: &SceneInteraction) -> Color {
        if sp.is_endpoint() {
            Color::WHITE
        } else {
            Color::BLACK
        }
    }

    /// Directional emission/importance, forcing endpoint evaluation
    /// even for an interaction still tagged as a midpoint.
    pub fn eval_contrb_endpoint_direction(&self, sp: &SceneInteraction, wo: Vec3A) -> Color {
        if sp.is_endpoint() {
            return self.eval_contrb(sp, COMP_DONT_CARE, Vec3A::ZERO, wo);
        }
        let prim = self.primitive(sp.node);
        if prim.light.is_some() {
            self.eval_contrb(
                &sp.as_type(InteractionKind::LightEndpoint),
                COMP_DONT_CARE,
                Vec3A::ZERO,
                wo,
            )
        } else {
            Color::BLACK
        }
    }

    /// Diffuse albedo at a surface point, when available.
    pub fn reflectance(&self, sp: &SceneInteraction, _comp: i32) -> Option<Color> {
        if !sp.is_surface() {
            return None;
        }
        self.primitive(sp.node)
            .material
            .as_ref()
            .and_then(|m| m.reflectance(&sp.geom))
    }
}
