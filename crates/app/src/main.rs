//! Entry point for scene-info.
//! Loads a scene file and logs what ended up in the scene buffers.

use std::process::ExitCode;

use anyhow::{Result, anyhow};
use scene::{LoadMode, Scene};

struct Args {
    scene: String,
    mode: LoadMode,
    summary: bool,
}

fn parse_args() -> Result<Args> {
    // Accept: <scene-file> [--geometry-only] [--summary=on|off]
    let mut scene = None;
    let mut mode = LoadMode::Full;
    let mut summary = true;
    for arg in std::env::args().skip(1) {
        if arg == "--geometry-only" {
            mode = LoadMode::GeometryOnly;
        } else if let Some(val) = arg.strip_prefix("--summary=") {
            summary = matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes");
        } else if arg.starts_with("--") {
            log::warn!("Unknown flag '{}' ignored.", arg);
        } else {
            scene = Some(arg);
        }
    }
    let scene = scene.ok_or_else(|| anyhow!("usage: scene-info <scene-file> [--geometry-only] [--summary=on|off]"))?;
    Ok(Args { scene, mode, summary })
}

fn log_summary(scene: &Scene) {
    log::info!(
        "{} vertices, {} normals, {} uvs, {} tangents",
        scene.vertices.len(),
        scene.normals.len(),
        scene.uvs.len(),
        scene.tangents.len()
    );
    log::info!(
        "{} triangles in {} meshes, {} geoms, {} materials, {} textures, {} lights",
        scene.triangles.len(),
        scene.meshes.len(),
        scene.geoms.len(),
        scene.materials.len(),
        scene.textures.len(),
        scene.lights.len()
    );
    let cam = &scene.state.camera;
    log::info!(
        "camera {}x{} fov={:?} -> {:?}, {} iterations, depth {}, output '{}'",
        cam.resolution.x,
        cam.resolution.y,
        cam.fov,
        cam.view,
        scene.state.iterations,
        scene.state.trace_depth,
        scene.state.image_name
    );
}

fn run() -> Result<bool> {
    let args = parse_args()?;
    let scene = Scene::load(&args.scene, args.mode)?;
    if args.summary {
        log_summary(&scene);
    }
    if !scene.failed_geoms.is_empty() {
        log::warn!("{} object(s) could not be loaded: {:?}", scene.failed_geoms.len(), scene.failed_geoms);
    }
    Ok(scene.failed_geoms.is_empty())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
