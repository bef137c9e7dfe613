use std::sync::Arc;

use glam::{Mat4, Vec3A};

use raylight::{
    camera::PinholeCamera,
    core::color::Color,
    light::AreaLight,
    material::{Diffuse, Material},
    mesh::Mesh,
    scene::{Scene, ScenePrimitive},
};

pub fn add_camera(scene: &mut Scene, position: Vec3A, center: Vec3A, vfov: f32) {
    scene
        .add_primitive(
            ScenePrimitive {
                camera: Some(Arc::new(
                    PinholeCamera::new(position, center, Vec3A::Y, vfov).into(),
                )),
                ..Default::default()
            },
            None,
        )
        .unwrap();
}

pub fn add_quad(scene: &mut Scene, half_extent: f32, transform: Mat4, material: Material) {
    let mesh = Arc::new(Mesh::quad(half_extent));
    scene
        .add_primitive(
            ScenePrimitive {
                mesh: Some(mesh),
                material: Some(Arc::new(material)),
                ..Default::default()
            },
            Some(transform),
        )
        .unwrap();
}

pub fn add_quad_light(scene: &mut Scene, half_extent: f32, transform: Mat4, ke: Color) {
    let mesh = Arc::new(Mesh::quad(half_extent));
    let light = AreaLight::new(ke, mesh.clone());
    scene
        .add_primitive(
            ScenePrimitive {
                mesh: Some(mesh),
                material: Some(Arc::new(Diffuse::new(Color::BLACK, None).into())),
                light: Some(Arc::new(light.into())),
                ..Default::default()
            },
            Some(transform),
        )
        .unwrap();
}

/// Camera at (0,0,5) looking at an emissive quad in the xy-plane that
/// fills the whole field of view.
pub fn single_light_scene(light_half_extent: f32, vfov: f32) -> Scene {
    let mut scene = Scene::new();
    add_camera(&mut scene, Vec3A::new(0.0, 0.0, 5.0), Vec3A::ZERO, vfov);
    add_quad_light(&mut scene, light_half_extent, Mat4::IDENTITY, Color::WHITE);
    scene.build();
    scene
}
