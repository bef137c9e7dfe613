use std::{collections::HashMap, sync::Arc};

use crate::{
    camera::Camera,
    core::error::RenderError,
    light::Light,
    material::Material,
    medium::Medium,
    mesh::Mesh,
    model::WavefrontObjModel,
    texture::Texture,
};

/// Asset catalog: named registries per asset type.
///
/// The catalog is the root handle (`"$"` in scene files) passed
/// explicitly into the loader and the scene builder; there is no
/// process-global registry. Scene nodes resolve names into `Arc`
/// handles when the scene is built, so replacing an asset by name
/// between renders is observed by dependents at the next build.
#[derive(Default)]
pub struct SceneResources {
    cameras: HashMap<String, Arc<Camera>>,
    lights: HashMap<String, Arc<Light>>,
    materials: HashMap<String, Arc<Material>>,
    mediums: HashMap<String, Arc<Medium>>,
    meshes: HashMap<String, Arc<Mesh>>,
    models: HashMap<String, Arc<WavefrontObjModel>>,
    textures: HashMap<String, Arc<Texture>>,
}

macro_rules! registry {
    ( $( ($add:ident, $replace:ident, $clone:ident, $field:ident, $type:ty, $kind:expr) ),+ $(,)? ) => {
        $(
            pub fn $add(&mut self, name: String, asset: $type) -> anyhow::Result<()> {
                if self.$field.contains_key(&name) {
                    anyhow::bail!("duplicated {} name '{}'", $kind, name);
                }
                self.$field.insert(name, Arc::new(asset));
                Ok(())
            }

            /// Replace an asset by name; dependents re-resolve at the
            /// next scene build.
            pub fn $replace(&mut self, name: &str, asset: $type) -> Result<(), RenderError> {
                match self.$field.get_mut(name) {
                    Some(slot) => {
                        *slot = Arc::new(asset);
                        Ok(())
                    }
                    None => Err(RenderError::NotFound(format!("{} '{}'", $kind, name))),
                }
            }

            pub fn $clone(&self, name: &str) -> Result<Arc<$type>, RenderError> {
                self.$field
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RenderError::NotFound(format!("{} '{}'", $kind, name)))
            }
        )+
    };
}

impl SceneResources {
    registry! {
        (add_camera, replace_camera, clone_camera, cameras, Camera, "camera"),
        (add_light, replace_light, clone_light, lights, Light, "light"),
        (add_material, replace_material, clone_material, materials, Material, "material"),
        (add_medium, replace_medium, clone_medium, mediums, Medium, "medium"),
        (add_mesh, replace_mesh, clone_mesh, meshes, Mesh, "mesh"),
        (add_model, replace_model, clone_model, models, WavefrontObjModel, "model"),
        (add_texture, replace_texture, clone_texture, textures, Texture, "texture"),
    }
}
