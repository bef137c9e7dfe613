use std::{path::Path, sync::Arc};

use glam::{Vec2, Vec3A};

use crate::{
    core::{color::Color, error::RenderError, loader::InputParams},
    light::{AreaLight, Light},
    material::{Diffuse, Glass, Glossy, Material, Mirror, Mixture, MixtureWithAlpha},
    mesh::{FaceIndex, Mesh},
    scene::SceneResources,
    texture::{BitmapTexture, Texture, TextureT},
};

/// One OBJ group: a mesh, its material and (for `Ke > 0` groups) an
/// area light.
pub struct ModelGroup {
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
    pub light: Option<Arc<Light>>,
}

/// Wavefront OBJ/MTL model. Parsing is delegated to `tobj`; this module
/// maps the per-face MTL records onto the material set:
///
/// - `illum 5` -> mirror
/// - `illum 7` -> glass with the MTL `Ni`
/// - anything else -> diffuse+glossy mixture (with alpha lobe when the
///   `map_Kd` texture carries alpha), anisotropic GGX roughness derived
///   from `Ns` and the anisotropy `aniso`
///
/// With `skip_specular_mat` the specular illum modes fall back to a
/// black diffuse material and the mixture drops its alpha lobe.
pub struct WavefrontObjModel {
    groups: Vec<ModelGroup>,
}

struct MtlRecord {
    kd: Color,
    ks: Color,
    ke: Color,
    ns: f32,
    ni: f32,
    an: f32,
    illum: Option<u8>,
    map_kd: Option<Arc<Texture>>,
}

impl WavefrontObjModel {
    pub fn groups(&self) -> &[ModelGroup] {
        &self.groups
    }

    pub fn load(
        rsc: &mut SceneResources,
        path: &Path,
        skip_specular_mat: bool,
    ) -> Result<Self, RenderError> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                ..Default::default()
            },
        )
        .map_err(|e| RenderError::IoError(format!("{}: {}", path.display(), e)))?;
        let materials =
            materials.map_err(|e| RenderError::IoError(format!("{}: {}", path.display(), e)))?;

        // Resolve MTL records, loading each referenced texture once.
        let mut records = Vec::with_capacity(materials.len());
        for m in &materials {
            records.push(Self::resolve_mtl(rsc, path, m)?);
        }
        let fallback = MtlRecord {
            kd: Color::gray(0.8),
            ks: Color::BLACK,
            ke: Color::BLACK,
            ns: 1.0,
            ni: 1.0,
            an: 0.0,
            illum: None,
            map_kd: None,
        };

        let mut groups = Vec::with_capacity(models.len());
        for model in &models {
            let record = model
                .mesh
                .material_id
                .and_then(|id| records.get(id))
                .unwrap_or(&fallback);
            let mesh = Arc::new(Self::build_mesh(&model.mesh));
            let material = Arc::new(Self::build_material(record, skip_specular_mat));
            let light = (record.ke.max_component() > 0.0)
                .then(|| Arc::new(Light::from(AreaLight::new(record.ke, mesh.clone()))));
            groups.push(ModelGroup {
                mesh,
                material,
                light,
            });
        }

        log::info!(
            "loaded obj model '{}': {} groups, {} materials",
            path.display(),
            groups.len(),
            records.len()
        );
        Ok(Self { groups })
    }

    fn resolve_mtl(
        rsc: &mut SceneResources,
        obj_path: &Path,
        m: &tobj::Material,
    ) -> Result<MtlRecord, RenderError> {
        let map_kd = match &m.diffuse_texture {
            Some(tex_path) if !tex_path.is_empty() => {
                let name = format!("texture_{}", tex_path);
                let tex = match rsc.clone_texture(&name) {
                    Ok(tex) => tex,
                    Err(_) => {
                        let full = obj_path.with_file_name(tex_path);
                        let image = image::open(&full).map_err(|e| {
                            RenderError::IoError(format!("{}: {}", full.display(), e))
                        })?;
                        let tex = Texture::from(BitmapTexture::from_image(&image));
                        rsc.add_texture(name.clone(), tex)
                            .map_err(|e| RenderError::InvalidArgument(e.to_string()))?;
                        rsc.clone_texture(&name)?
                    }
                };
                Some(tex)
            }
            _ => None,
        };
        let float3 = |v: &Option<[f32; 3]>, fallback: [f32; 3]| Color::from(v.unwrap_or(fallback));
        Ok(MtlRecord {
            kd: float3(&m.diffuse, [1.0, 1.0, 1.0]),
            ks: float3(&m.specular, [0.0, 0.0, 0.0]),
            ke: unknown_float3(m, "Ke"),
            ns: m.shininess.unwrap_or(1.0),
            ni: m.optical_density.unwrap_or(1.0),
            an: unknown_float(m, "aniso").or(unknown_float(m, "an")).unwrap_or(0.0),
            illum: m.illumination_model,
            map_kd,
        })
    }

    fn build_material(record: &MtlRecord, skip_specular_mat: bool) -> Material {
        if record.illum == Some(5) || record.illum == Some(7) {
            if skip_specular_mat {
                // Zero-albedo stand-in keeps the geometry without the
                // specular transport.
                return Diffuse::new(Color::BLACK, None).into();
            }
            if record.illum == Some(7) {
                return Glass::new(record.ni).into();
            }
            return Mirror::new().into();
        }

        // Anisotropic GGX parameters derived from the MTL exponent.
        let r = 2.0 / (2.0 + record.ns);
        let a = (1.0 - 0.9 * record.an).max(0.0).sqrt();
        let ax = (r / a).max(1e-3);
        let ay = (r * a).max(1e-3);
        let diffuse = Diffuse::new(record.kd, record.map_kd.clone());
        let glossy = Glossy::new(record.ks, ax, ay);
        if skip_specular_mat {
            Mixture::new(diffuse, glossy).into()
        } else {
            let mask_tex = record
                .map_kd
                .clone()
                .filter(|tex| tex.has_alpha());
            MixtureWithAlpha::new(diffuse, glossy, mask_tex).into()
        }
    }

    fn build_mesh(mesh: &tobj::Mesh) -> Mesh {
        let positions: Vec<Vec3A> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| Vec3A::new(p[0], p[1], p[2]))
            .collect();
        let normals: Vec<Vec3A> = mesh
            .normals
            .chunks_exact(3)
            .map(|n| Vec3A::new(n[0], n[1], n[2]))
            .collect();
        let texcoords: Vec<Vec2> = mesh
            .texcoords
            .chunks_exact(2)
            .map(|t| Vec2::new(t[0], t[1]))
            .collect();

        let corner = |face: usize, corner: usize| -> FaceIndex {
            let i = 3 * face + corner;
            let attr = |indices: &[u32]| indices.get(i).map_or(-1, |&v| v as i32);
            FaceIndex {
                p: mesh.indices[i] as i32,
                n: attr(&mesh.normal_indices),
                t: attr(&mesh.texcoord_indices),
            }
        };
        let faces = (0..mesh.indices.len() / 3)
            .map(|f| [corner(f, 0), corner(f, 1), corner(f, 2)])
            .collect();
        Mesh::new(positions, normals, texcoords, faces)
    }
}

fn unknown_float(m: &tobj::Material, key: &str) -> Option<f32> {
    m.unknown_param.get(key)?.trim().parse().ok()
}

fn unknown_float3(m: &tobj::Material, key: &str) -> Color {
    let Some(raw) = m.unknown_param.get(key) else {
        return Color::BLACK;
    };
    let mut it = raw.split_whitespace().filter_map(|v| v.parse::<f32>().ok());
    match (it.next(), it.next(), it.next()) {
        (Some(r), Some(g), Some(b)) => Color::new(r, g, b),
        (Some(r), None, _) => Color::gray(r),
        _ => Color::BLACK,
    }
}

pub fn create_model_from_params(
    rsc: &mut SceneResources,
    params: &mut InputParams,
) -> anyhow::Result<()> {
    params.set_name("model".into());
    let name = params.get_str("name")?;
    params.set_name(format!("model-wavefrontobj-{}", name).into());

    let path = params.get_file_path("path")?;
    let skip_specular_mat = params.get_bool_or("skip_specular_mat", false);
    let model = WavefrontObjModel::load(rsc, &path, skip_specular_mat)?;
    rsc.add_model(name, model)?;

    params.check_unused_keys();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(illum: Option<u8>, ks: Color, ns: f32, an: f32) -> MtlRecord {
        MtlRecord {
            kd: Color::gray(0.5),
            ks,
            ke: Color::BLACK,
            ns,
            ni: 1.5,
            an,
            illum,
            map_kd: None,
        }
    }

    #[test]
    fn illum_modes_map_to_specular_materials() {
        let mirror = WavefrontObjModel::build_material(&record(Some(5), Color::BLACK, 1.0, 0.0), false);
        assert!(matches!(mirror, Material::Mirror(_)));
        let glass = WavefrontObjModel::build_material(&record(Some(7), Color::BLACK, 1.0, 0.0), false);
        assert!(matches!(glass, Material::Glass(_)));
        let mix = WavefrontObjModel::build_material(&record(Some(2), Color::gray(0.2), 50.0, 0.0), false);
        assert!(matches!(mix, Material::MixtureWithAlpha(_)));
    }

    #[test]
    fn skip_specular_replaces_mirror_and_glass() {
        use crate::core::geometry::PointGeometry;
        use crate::material::MaterialT;
        for illum in [5u8, 7u8] {
            let mat =
                WavefrontObjModel::build_material(&record(Some(illum), Color::BLACK, 1.0, 0.0), true);
            let Material::Diffuse(d) = &mat else {
                panic!("expected diffuse fallback");
            };
            let geom = PointGeometry::on_surface(Vec3A::ZERO, Vec3A::Z, Vec2::ZERO);
            assert_eq!(d.reflectance(&geom), Some(Color::BLACK));
        }
        let mix = WavefrontObjModel::build_material(&record(None, Color::gray(0.2), 50.0, 0.0), true);
        assert!(matches!(mix, Material::Mixture(_)));
    }

    #[test]
    fn anisotropy_splits_the_roughness_axes() {
        let ns = 50.0f32;
        let an = 0.5f32;
        let r = 2.0 / (2.0 + ns);
        let a = (1.0f32 - 0.9 * an).sqrt();
        // ax grows, ay shrinks; both are floored at 1e-3.
        assert!(r / a > r * a);
        assert!((r / a).max(1e-3) > 0.0 && (r * a).max(1e-3) > 0.0);
    }
}
