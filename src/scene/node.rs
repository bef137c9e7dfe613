use std::sync::Arc;

use glam::Mat4;

use crate::{
    camera::Camera, light::Light, material::Material, medium::Medium, mesh::Mesh,
};

/// Assets attached to a primitive node. Attachments are shared handles
/// into the asset catalog; a node owns none of them.
#[derive(Default, Clone)]
pub struct ScenePrimitive {
    pub mesh: Option<Arc<Mesh>>,
    pub material: Option<Arc<Material>>,
    pub light: Option<Arc<Light>>,
    pub camera: Option<Arc<Camera>>,
    pub medium: Option<Arc<Medium>>,
}

impl ScenePrimitive {
    pub fn is_empty(&self) -> bool {
        self.mesh.is_none()
            && self.material.is_none()
            && self.light.is_none()
            && self.camera.is_none()
            && self.medium.is_none()
    }
}

/// Scene-graph node: an interior group with an optional local transform,
/// or a leaf primitive.
pub enum SceneNode {
    Group {
        children: Vec<usize>,
        transform: Option<Mat4>,
    },
    Primitive(ScenePrimitive),
}

impl SceneNode {
    pub fn group(transform: Option<Mat4>) -> Self {
        SceneNode::Group {
            children: Vec::new(),
            transform,
        }
    }

    pub fn as_primitive(&self) -> Option<&ScenePrimitive> {
        match self {
            SceneNode::Primitive(p) => Some(p),
            SceneNode::Group { .. } => None,
        }
    }
}
