//! CAMERA blocks and the render state they configure.

use std::io::BufRead;

use corelib::{UVec2, Vec3, camera::Camera};

use crate::{
    error::{SceneError, SceneResult},
    geometry::parse_vec3,
    scene::Scene,
    tokenizer::{LineReader, tokenize},
};

/// Lines read unconditionally after `CAMERA`, blank or not.
const CAMERA_HEADER_LINES: usize = 5;

/// Camera plus the settings of a render.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderState {
    pub camera: Camera,
    pub iterations: u32,
    pub trace_depth: u32,
    pub image_name: String,
    /// Accumulated radiance, one entry per pixel, row-major.
    pub image: Vec<Vec3>,
}

impl RenderState {
    pub fn new(camera: Camera, iterations: u32, trace_depth: u32, image_name: impl Into<String>) -> Self {
        Self {
            image: vec![Vec3::ZERO; camera.pixel_count()],
            camera,
            iterations,
            trace_depth,
            image_name: image_name.into(),
        }
    }
}

/// Raw CAMERA values before derivation.
#[derive(Clone, Debug)]
struct CameraBlock {
    resolution: UVec2,
    fovy: f32,
    iterations: u32,
    depth: u32,
    file: String,
    eye: Vec3,
    look_at: Vec3,
    up: Vec3,
}

impl Default for CameraBlock {
    fn default() -> Self {
        Self {
            resolution: UVec2::ZERO,
            fovy: 45.0,
            iterations: 0,
            depth: 0,
            file: String::new(),
            eye: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            up: Vec3::Y,
        }
    }
}

impl CameraBlock {
    fn apply(&mut self, line: &str) -> SceneResult<()> {
        let tokens = tokenize(line);
        match tokens.as_slice() {
            ["RES", w, h] => self.resolution = UVec2::new(parse(line, w)?, parse(line, h)?),
            ["FOVY", deg] => self.fovy = parse(line, deg)?,
            ["ITERATIONS", n] => self.iterations = parse(line, n)?,
            ["DEPTH", n] => self.depth = parse(line, n)?,
            ["FILE", name] => self.file = name.to_string(),
            ["EYE", ..] => self.eye = parse_vec3(line, &tokens)?,
            ["LOOKAT", ..] => self.look_at = parse_vec3(line, &tokens)?,
            ["UP", ..] => self.up = parse_vec3(line, &tokens)?,
            ["RES" | "FOVY" | "ITERATIONS" | "DEPTH" | "FILE", ..] => {
                return Err(SceneError::malformed(line, "wrong number of values"));
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(line: &str, token: &str) -> SceneResult<T> {
    token
        .parse()
        .map_err(|_| SceneError::malformed(line, "not a number"))
}

impl Scene {
    /// Parse a CAMERA block into [`Scene::state`].
    ///
    /// The first five lines are read as the header; `EYE`/`LOOKAT`/`UP` lines
    /// follow up to the end of the block. Keys may come in any order.
    pub fn load_camera<R: BufRead>(&mut self, lines: &mut LineReader<R>) -> SceneResult<()> {
        log::info!("Loading Camera ...");
        let mut block = CameraBlock::default();

        for _ in 0..CAMERA_HEADER_LINES {
            let Some(line) = lines.next_line()? else {
                break;
            };
            block.apply(&line)?;
        }
        while let Some(line) = lines.next_block_line()? {
            block.apply(&line)?;
        }

        let camera = Camera::new(block.resolution, block.fovy, block.eye, block.look_at, block.up)?;
        self.state = RenderState::new(camera, block.iterations, block.depth, block.file);

        log::info!(
            "Loaded camera! {}x{}, fov {:?}, {} iterations, depth {}",
            camera.resolution.x,
            camera.resolution.y,
            camera.fov,
            self.state.iterations,
            self.state.trace_depth
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    fn load(block: &str) -> SceneResult<Scene> {
        let mut scene = Scene::default();
        let mut lines = LineReader::new(Cursor::new(block.to_string()));
        scene.load_camera(&mut lines)?;
        Ok(scene)
    }

    #[test]
    fn derives_render_state() {
        let scene = load(
            "RES 800 600\nFOVY 45\nITERATIONS 5000\nDEPTH 8\nFILE cornell\nEYE 0.0 5 10.5\nLOOKAT 0 5 0\nUP 0 1 0\n\n",
        )
        .expect("camera");
        let state = &scene.state;
        assert_eq!(state.camera.resolution, UVec2::new(800, 600));
        assert_eq!(state.iterations, 5000);
        assert_eq!(state.trace_depth, 8);
        assert_eq!(state.image_name, "cornell");
        assert_eq!(state.image.len(), 480_000);
        assert!(state.image.iter().all(|p| *p == Vec3::ZERO));

        assert!(state.camera.fov.x > 45.0);
        let view = (Vec3::new(0.0, 5.0, 0.0) - Vec3::new(0.0, 5.0, 10.5)).normalize();
        let right = view.cross(Vec3::Y).normalize();
        assert_abs_diff_eq!(state.camera.view.z, view.z, epsilon = 1e-6);
        assert_abs_diff_eq!(state.camera.right.x, right.x, epsilon = 1e-6);
        assert_abs_diff_eq!(state.camera.right.z, right.z, epsilon = 1e-6);
    }

    #[test]
    fn header_keys_are_order_independent() {
        let scene = load("FILE out\nDEPTH 3\nRES 4 2\nITERATIONS 1\nFOVY 30\nLOOKAT 1 0 0\n").expect("camera");
        assert_eq!(scene.state.camera.resolution, UVec2::new(4, 2));
        assert_eq!(scene.state.camera.fov.y, 30.0);
        assert_eq!(scene.state.camera.view, Vec3::X);
        assert_eq!(scene.state.camera.right, Vec3::Z);
    }

    #[test]
    fn camera_errors_are_recoverable() {
        let err = load("RES 0 600\nFOVY 45\nITERATIONS 1\nDEPTH 1\nFILE x\n").unwrap_err();
        assert!(matches!(err, SceneError::Camera(_)));
        assert!(!err.is_fatal());

        let err = load("RES 800\nFOVY 45\nITERATIONS 1\nDEPTH 1\nFILE x\n").unwrap_err();
        assert!(matches!(err, SceneError::MalformedLine { .. }));
    }
}
