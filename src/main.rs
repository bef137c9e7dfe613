use anyhow::Result;

use raylight::{loader, renderer::RendererT};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 1 {
        println!("Usage: raylight <path-to-scene-json>");
        return Ok(());
    }

    println!("Loading scene and building acceleration structure...");
    let loader::LoadedScene {
        scene,
        renderer,
        mut film,
        output,
    } = loader::load(&args[0])?;

    println!("Scene loaded. Rendering...");
    let begin = std::time::Instant::now();
    let stats = renderer.render(&scene, &mut film)?;
    println!(
        "Finished, {} samples processed in {:?}",
        stats.processed,
        begin.elapsed()
    );

    film.save(&output)?;
    println!("Wrote '{}'", output);
    Ok(())
}
