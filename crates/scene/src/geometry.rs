//! OBJECT blocks: primitives and mesh instances, plus light extraction.

use std::{io::BufRead, path::Path};

use corelib::{Vec3, transform::{Transform, TransformMatrices}};

use crate::{
    error::{SceneError, SceneResult},
    scene::Scene,
    tokenizer::{LineReader, tokenize},
};

/// Emittance that maps to a light intensity of 1.
pub const MAX_EMITTANCE: f32 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeomKind {
    Sphere,
    Cube,
    /// Index into [`Scene::meshes`].
    Mesh { mesh: usize },
}

/// One placed object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geom {
    pub kind: GeomKind,
    pub material: usize,
    pub transform: Transform,
    pub matrices: TransformMatrices,
}

impl Geom {
    pub fn new(kind: GeomKind, material: usize, transform: Transform) -> Self {
        Self {
            kind,
            material,
            transform,
            matrices: transform.matrices(),
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, GeomKind::Mesh { .. })
    }
}

/// Point light extracted from an emissive primitive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
}

impl Scene {
    /// Parse one OBJECT block: type line, material line, transform lines.
    ///
    /// Returns the index of the new entry in [`Scene::geoms`].
    pub fn load_geom<R: BufRead>(&mut self, lines: &mut LineReader<R>) -> SceneResult<usize> {
        let id = self.geoms.len();
        log::info!("Loading Geom {}...", id);

        let kind = self.load_geom_kind(lines)?;
        let material = self.load_geom_material(lines)?;
        log::info!("Connecting Geom {} to Material {}...", id, material);
        let transform = read_transform(lines)?;

        let geom = Geom::new(kind, material, transform);

        // Lights are only extracted from primitives.
        if !geom.is_mesh() {
            let mat = &self.materials[material];
            if mat.is_emissive() {
                self.lights.push(Light {
                    color: mat.diffuse,
                    intensity: mat.emittance / MAX_EMITTANCE,
                    position: transform.translation,
                });
            }
        }

        self.geoms.push(geom);
        Ok(id)
    }

    fn load_geom_kind<R: BufRead>(&mut self, lines: &mut LineReader<R>) -> SceneResult<GeomKind> {
        let line = lines.next_block_line()?.unwrap_or_default();
        let tokens = tokenize(&line);
        match tokens.as_slice() {
            ["sphere"] => {
                log::info!("Creating new sphere...");
                Ok(GeomKind::Sphere)
            }
            ["cube"] => {
                log::info!("Creating new cube...");
                Ok(GeomKind::Cube)
            }
            // Meshes are `<format> <path>`.
            ["obj", path] => {
                let mesh = self.import_obj(Path::new(path))?;
                Ok(GeomKind::Mesh { mesh })
            }
            [format, _] => Err(SceneError::UnsupportedFormat(format.to_string())),
            _ => Err(SceneError::UnrecognizedObject(line.clone())),
        }
    }

    fn load_geom_material<R: BufRead>(&mut self, lines: &mut LineReader<R>) -> SceneResult<usize> {
        let line = lines.next_block_line()?.ok_or(SceneError::MissingMaterial)?;
        let tokens = tokenize(&line);
        match tokens.as_slice() {
            ["material", path] => self.load_material_file(path),
            ["material", ..] => Err(SceneError::malformed(&line, "expected `material <path>`")),
            [field, ..] => Err(SceneError::UnknownField(field.to_string())),
            [] => Err(SceneError::MissingMaterial),
        }
    }
}

/// `TRANS`/`ROTAT`/`SCALE` lines up to the end of the block. Other keys are ignored.
fn read_transform<R: BufRead>(lines: &mut LineReader<R>) -> SceneResult<Transform> {
    let mut transform = Transform::identity();
    while let Some(line) = lines.next_block_line()? {
        let tokens = tokenize(&line);
        match tokens.first() {
            Some(&"TRANS") => transform.translation = parse_vec3(&line, &tokens)?,
            Some(&"ROTAT") => transform.rotation_deg = parse_vec3(&line, &tokens)?,
            Some(&"SCALE") => transform.scale = parse_vec3(&line, &tokens)?,
            _ => {}
        }
    }
    Ok(transform)
}

/// Three floats following the keyword.
pub(crate) fn parse_vec3(line: &str, tokens: &[&str]) -> SceneResult<Vec3> {
    let [_, x, y, z] = tokens else {
        return Err(SceneError::malformed(line, "expected three numbers"));
    };
    let parse = |t: &str| t.parse::<f32>().map_err(|_| SceneError::malformed(line, "not a number"));
    Ok(Vec3::new(parse(*x)?, parse(*y)?, parse(*z)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{grid_obj, write_file, write_mtl};
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    fn load_block(scene: &mut Scene, block: &str) -> SceneResult<usize> {
        let mut lines = LineReader::new(Cursor::new(block.to_string()));
        scene.load_geom(&mut lines)
    }

    #[test]
    fn primitive_with_full_transform() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mtl = write_mtl(dir.path(), "white.mtl", "newmtl white\nKd 1 1 1\n");
        let block = format!(
            "sphere\nmaterial {}\nTRANS 1 2 3\nROTAT 0 90 0\nSCALE 2 2 2\nCOLOR 1 1 1\n\nOBJECT\n",
            mtl.display()
        );

        let mut scene = Scene::default();
        let id = load_block(&mut scene, &block).expect("load sphere");
        let geom = scene.geoms[id];
        assert_eq!(geom.kind, GeomKind::Sphere);
        assert_eq!(geom.material, 0);
        assert_eq!(geom.transform.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(geom.transform.scale, Vec3::splat(2.0));
        assert_eq!(geom.matrices, geom.transform.matrices());
        assert!(scene.lights.is_empty());
    }

    #[test]
    fn omitted_transform_is_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mtl = write_mtl(dir.path(), "white.mtl", "newmtl white\n");
        let mut scene = Scene::default();
        let id = load_block(&mut scene, &format!("cube\nmaterial {}\n", mtl.display())).expect("load cube");
        assert_eq!(scene.geoms[id].transform, Transform::identity());
        assert_eq!(scene.geoms[id].matrices.transform, corelib::Mat4::IDENTITY);
    }

    #[test]
    fn only_emissive_primitives_become_lights() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mtl = write_mtl(dir.path(), "lamp.mtl", "newmtl lamp\nKd 1 0.5 0.25\nemit 5\n");
        let obj = write_file(dir.path(), "panel.obj", &grid_obj(1, 1, None));

        let mut scene = Scene::default();
        load_block(&mut scene, &format!("sphere\nmaterial {}\nTRANS 0 9 0\n", mtl.display())).expect("sphere");
        load_block(&mut scene, &format!("obj {}\nmaterial {}\n", obj.display(), mtl.display())).expect("mesh");

        assert_eq!(scene.geoms.len(), 2);
        assert_eq!(scene.geoms[1].kind, GeomKind::Mesh { mesh: 0 });
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.lights.len(), 1);
        let light = scene.lights[0];
        assert_eq!(light.color, Vec3::new(1.0, 0.5, 0.25));
        assert_abs_diff_eq!(light.intensity, 5.0 / MAX_EMITTANCE);
        assert_eq!(light.position, Vec3::new(0.0, 9.0, 0.0));
    }

    #[test]
    fn malformed_blocks_fail_without_adding_a_geom() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mtl = write_mtl(dir.path(), "m.mtl", "newmtl m\n");
        let mut scene = Scene::default();

        let cases = [
            ("torus\n".to_string(), "unrecognized"),
            ("fbx model.fbx\n".to_string(), "format"),
            ("obj a b\n".to_string(), "unrecognized"),
            ("cube\ncolour red\n".to_string(), "field"),
            ("cube\n\n".to_string(), "missing"),
            (format!("cube\nmaterial {}\nTRANS 1 2\n", mtl.display()), "malformed"),
            (format!("cube\nmaterial {}\nSCALE a b c\n", mtl.display()), "malformed"),
        ];
        for (block, what) in cases {
            let err = load_block(&mut scene, &block).unwrap_err();
            assert!(!err.is_fatal(), "{what}: {err}");
            let matched = match what {
                "unrecognized" => matches!(err, SceneError::UnrecognizedObject(_)),
                "format" => matches!(err, SceneError::UnsupportedFormat(_)),
                "field" => matches!(err, SceneError::UnknownField(_)),
                "missing" => matches!(err, SceneError::MissingMaterial),
                _ => matches!(err, SceneError::MalformedLine { .. }),
            };
            assert!(matched, "{what}: {err}");
        }
        assert!(scene.geoms.is_empty());
    }

    #[test]
    fn parse_vec3_requires_exactly_three_numbers() {
        let line = "TRANS 1 2 3";
        assert_eq!(parse_vec3(line, &tokenize(line)).expect("vec3"), Vec3::new(1.0, 2.0, 3.0));
        let long = "TRANS 1 2 3 4";
        assert!(parse_vec3(long, &tokenize(long)).is_err());
    }
}
