use std::{
    convert::TryInto,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    camera,
    core::{film::Film, loader::InputParams},
    light, material, medium,
    mesh::Mesh,
    model,
    renderer::{self, Renderer},
    scene::{Scene, ScenePrimitive, SceneResources},
    texture,
};

/// Everything the driver needs for one render pass.
pub struct LoadedScene {
    pub scene: Scene,
    pub renderer: Renderer,
    pub film: Film,
    pub output: String,
}

/// Load a scene/renderer description from a JSON file.
///
/// The file is a set of named asset sections (cameras, textures,
/// materials, mediums, lights, meshes, models), a primitive list wiring
/// assets into the scene graph, a film block and a renderer block.
pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<LoadedScene> {
    let path = path.as_ref().to_path_buf();
    let json_file = std::fs::File::open(&path)
        .context(format!("can't open scene file '{}'", path.display()))?;
    let json_reader = std::io::BufReader::new(json_file);
    let json_value: serde_json::Value = serde_json::from_reader(json_reader)?;

    let mut rsc = SceneResources::default();

    for_each_section(&json_value, &path, "cameras", |p| {
        camera::create_camera_from_params(&mut rsc, p)
    })?;
    for_each_section(&json_value, &path, "textures", |p| {
        texture::create_texture_from_params(&mut rsc, p)
    })?;
    for_each_section(&json_value, &path, "materials", |p| {
        material::create_material_from_params(&mut rsc, p)
    })?;
    for_each_section(&json_value, &path, "mediums", |p| {
        medium::create_medium_from_params(&mut rsc, p)
    })?;
    for_each_section(&json_value, &path, "meshes", |p| create_mesh(&mut rsc, p))?;
    for_each_section(&json_value, &path, "lights", |p| {
        light::create_light_from_params(&mut rsc, p)
    })?;
    for_each_section(&json_value, &path, "models", |p| {
        model::create_model_from_params(&mut rsc, p)
    })?;

    let film = load_film(&json_value)?;
    let output = json_value
        .get("film")
        .and_then(|f| f.get("output"))
        .and_then(|o| o.as_str())
        .unwrap_or("output.png")
        .to_owned();

    let mut scene = Scene::new();
    for_each_section(&json_value, &path, "primitives", |p| {
        create_primitive(&mut scene, &rsc, p)
    })?;
    scene.build();

    let renderer_value = json_value
        .get("renderer")
        .context("scene file has no 'renderer' block")?;
    let mut renderer_params: InputParams = renderer_value.try_into()?;
    renderer_params.set_base_path(path);
    let renderer = renderer::create_renderer_from_params(&mut renderer_params, film.size())?;

    Ok(LoadedScene {
        scene,
        renderer,
        film,
        output,
    })
}

fn for_each_section(
    json_value: &serde_json::Value,
    base_path: &PathBuf,
    section: &str,
    mut create: impl FnMut(&mut InputParams) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let Some(value) = json_value.get(section) else {
        return Ok(());
    };
    let arr = value
        .as_array()
        .context(format!("section '{}' should be an array", section))?;
    for v in arr {
        let mut params: InputParams = v.try_into()?;
        params.set_base_path(base_path.clone());
        create(&mut params).context(format!("while loading section '{}'", section))?;
    }
    Ok(())
}

fn load_film(json_value: &serde_json::Value) -> anyhow::Result<Film> {
    let film_value = json_value
        .get("film")
        .context("scene file has no 'film' block")?;
    let mut params: InputParams = film_value.try_into()?;
    params.set_name("film".into());
    let width = params.get_int("width")? as u32;
    let height = params.get_int("height")? as u32;
    Ok(Film::new(width, height))
}

fn create_mesh(rsc: &mut SceneResources, params: &mut InputParams) -> anyhow::Result<()> {
    params.set_name("mesh".into());
    let ty = params.get_str("type")?;
    let name = params.get_str("name")?;
    params.set_name(format!("mesh-{}-{}", ty, name).into());

    let res = match ty.as_str() {
        "quad" => Mesh::quad(params.get_float_or("half_extent", 1.0)),
        _ => anyhow::bail!("{}: unknown type '{}'", params.name(), ty),
    };

    rsc.add_mesh(name, res)?;

    params.check_unused_keys();

    Ok(())
}

fn create_primitive(
    scene: &mut Scene,
    rsc: &SceneResources,
    params: &mut InputParams,
) -> anyhow::Result<()> {
    params.set_name("primitive".into());
    let transform = if params.contains_key("transform") {
        Some(params.get_matrix("transform")?)
    } else {
        None
    };

    if params.contains_key("model") {
        let model = rsc.clone_model(&params.get_str("model")?)?;
        scene.add_model(&model, transform)?;
        params.check_unused_keys();
        return Ok(());
    }

    let mut prim = ScenePrimitive::default();
    if params.contains_key("mesh") {
        prim.mesh = Some(rsc.clone_mesh(&params.get_str("mesh")?)?);
    }
    if params.contains_key("material") {
        prim.material = Some(rsc.clone_material(&params.get_str("material")?)?);
    }
    if params.contains_key("light") {
        prim.light = Some(rsc.clone_light(&params.get_str("light")?)?);
    }
    if params.contains_key("camera") {
        prim.camera = Some(rsc.clone_camera(&params.get_str("camera")?)?);
    }
    if params.contains_key("medium") {
        prim.medium = Some(rsc.clone_medium(&params.get_str("medium")?)?);
    }
    scene.add_primitive(prim, transform)?;

    params.check_unused_keys();

    Ok(())
}
