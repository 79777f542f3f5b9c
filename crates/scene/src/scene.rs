//! Scene file parsing and the buffers it fills.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use asset::texture::TextureData;
use corelib::{Vec2, Vec3, Vec4};

use crate::{
    camera::RenderState,
    error::{SceneError, SceneResult},
    geometry::{Geom, Light},
    material::Material,
    mesh::{MeshRange, Triangle},
    tokenizer::{LineReader, tokenize},
};

/// Whether CAMERA blocks are read or the camera is configured by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    #[default]
    Full,
    GeometryOnly,
}

/// Everything parsed from one scene file. Buffers are append-only while
/// loading and left untouched afterwards.
#[derive(Debug, Default)]
pub struct Scene {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub tangents: Vec<Vec4>,
    pub triangles: Vec<Triangle>,
    pub meshes: Vec<MeshRange>,
    pub materials: Vec<Material>,
    pub textures: Vec<TextureData>,
    pub geoms: Vec<Geom>,
    pub lights: Vec<Light>,
    pub state: RenderState,
    /// Ordinals of OBJECT blocks that failed to load.
    pub failed_geoms: Vec<usize>,

    pub(crate) texture_cache: HashMap<String, usize>,
    pub(crate) material_cache: HashMap<PathBuf, usize>,
}

impl Scene {
    /// Load a scene file.
    ///
    /// A file that cannot be opened, or a mesh whose textures cannot be
    /// decoded, fails the whole load. Any other broken OBJECT or CAMERA block
    /// is logged and skipped.
    pub fn load(path: impl AsRef<Path>, mode: LoadMode) -> SceneResult<Self> {
        let path = path.as_ref();
        log::info!("Reading scene from {} ...", path.display());
        let file = File::open(path).map_err(|source| SceneError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_labelled_reader(BufReader::new(file), mode, &path.display().to_string())
    }

    /// Load a scene from any line source. Paths inside are used as written.
    pub fn from_reader<R: BufRead>(reader: R, mode: LoadMode) -> SceneResult<Self> {
        Self::from_labelled_reader(reader, mode, "<input>")
    }

    /// Like [`Scene::from_reader`], naming `source` in per-block error logs.
    pub fn from_labelled_reader<R: BufRead>(reader: R, mode: LoadMode, source: &str) -> SceneResult<Self> {
        let mut scene = Self::default();
        let mut lines = LineReader::new(reader);
        let mut objects = 0;

        while let Some(line) = lines.next_line()? {
            let tokens = tokenize(&line);
            match tokens.first() {
                Some(&"OBJECT") => {
                    let ordinal = objects;
                    objects += 1;
                    let line_no = lines.line_no();
                    if let Err(err) = scene.load_geom(&mut lines) {
                        if err.is_fatal() {
                            log::error!("FATAL: {}: OBJECT {} (line {}): {}", source, ordinal, line_no, err);
                            return Err(err);
                        }
                        log::error!("ERROR: {}: OBJECT {} (line {}) skipped: {}", source, ordinal, line_no, err);
                        scene.failed_geoms.push(ordinal);
                    }
                }
                Some(&"CAMERA") if mode == LoadMode::Full => {
                    let line_no = lines.line_no();
                    if let Err(err) = scene.load_camera(&mut lines) {
                        if err.is_fatal() {
                            log::error!("FATAL: {}: CAMERA (line {}): {}", source, line_no, err);
                            return Err(err);
                        }
                        log::error!("ERROR: {}: CAMERA (line {}) skipped: {}", source, line_no, err);
                    }
                }
                _ => {}
            }
        }

        log::info!(
            "Scene loaded: {} geoms ({} failed), {} materials, {} textures, {} lights",
            scene.geoms.len(),
            scene.failed_geoms.len(),
            scene.materials.len(),
            scene.textures.len(),
            scene.lights.len()
        );
        Ok(scene)
    }
}
