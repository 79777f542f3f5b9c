//! Material resolution and texture caching.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use asset::{mtl::MtlMaterial, texture::TextureData};
use corelib::{EPSILON, Vec3};

use crate::{
    error::{SceneError, SceneResult},
    scene::Scene,
};

/// How the renderer scatters light off a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialType {
    Diffuse,
    Refl,
    Refr,
    Transparent,
    Glossy,
}

impl MaterialType {
    /// Classify a material from its reflective and refractive coefficients.
    pub fn classify(reflectivity: f32, refractivity: f32) -> Self {
        match (reflectivity > 0.0, refractivity > 0.0) {
            (true, true) => Self::Glossy,
            (true, false) => Self::Refl,
            (false, true) if (refractivity - 1.0).abs() <= EPSILON => Self::Transparent,
            (false, true) => Self::Refr,
            (false, false) => Self::Diffuse,
        }
    }

    /// Materials that need a non-zero roughness.
    pub fn is_rough(self) -> bool {
        matches!(self, Self::Diffuse | Self::Glossy)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Specular {
    pub color: Vec3,
    pub exponent: f32,
}

/// Indices into [`Scene::textures`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureSlots {
    pub diffuse: Option<usize>,
    pub bump: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub diffuse: Vec3,
    pub specular: Specular,
    pub reflectivity: f32,
    pub refractivity: f32,
    pub ior: f32,
    pub emittance: f32,
    pub roughness: f32,
    pub textures: TextureSlots,
    pub kind: MaterialType,
}

impl Material {
    /// Build a material from its coefficients, deriving the type and fixing
    /// up the roughness of rough materials.
    pub fn new(diffuse: Vec3, specular: Specular, params: MaterialParams, textures: TextureSlots) -> Self {
        let kind = MaterialType::classify(params.reflectivity, params.refractivity);
        let mut roughness = params.roughness;
        if kind.is_rough() && roughness.abs() <= EPSILON {
            roughness = 1.0;
        }
        Self {
            diffuse,
            specular,
            reflectivity: params.reflectivity,
            refractivity: params.refractivity,
            ior: params.ior,
            emittance: params.emittance,
            roughness,
            textures,
            kind,
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emittance > 0.0
    }
}

/// Renderer-specific coefficients read from the material's extra keys.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialParams {
    pub reflectivity: f32,
    pub refractivity: f32,
    pub ior: f32,
    pub emittance: f32,
    pub roughness: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            reflectivity: 0.0,
            refractivity: 0.0,
            ior: 1.0,
            emittance: 0.0,
            roughness: 0.0,
        }
    }
}

impl MaterialParams {
    /// Keys: `refl`, `refr`, `ior`, `emit`, `rough`.
    pub fn from_mtl(mat: &MtlMaterial) -> SceneResult<Self> {
        let defaults = Self::default();
        let read = |key: &str, default: f32| -> SceneResult<f32> {
            mat.param_f32(key)
                .map(|value| value.unwrap_or(default))
                .map_err(|err| SceneError::InvalidMaterial {
                    name: mat.name.clone(),
                    reason: format!("{err:#}"),
                })
        };
        Ok(Self {
            reflectivity: read("refl", defaults.reflectivity)?,
            refractivity: read("refr", defaults.refractivity)?,
            ior: read("ior", defaults.ior)?,
            emittance: read("emit", defaults.emittance)?,
            roughness: read("rough", defaults.roughness)?,
        })
    }
}

impl Scene {
    /// Convert one parsed MTL record, loading its textures from `tex_dir`.
    ///
    /// A texture that cannot be decoded is a fatal [`SceneError::Texture`].
    pub fn resolve_material(&mut self, mat: &MtlMaterial, tex_dir: &Path) -> SceneResult<Material> {
        let params = MaterialParams::from_mtl(mat)?;
        let textures = TextureSlots {
            diffuse: self.texture_index(mat.diffuse_texture.as_deref(), tex_dir)?,
            bump: self.texture_index(mat.bump_texture.as_deref(), tex_dir)?,
        };
        let material = Material::new(
            Vec3::from_array(mat.diffuse),
            Specular {
                color: Vec3::from_array(mat.specular),
                exponent: mat.shininess,
            },
            params,
            textures,
        );

        log::info!("loaded material {} ({:?})", mat.name, material.kind);
        log::debug!(
            "  diffuse={:?} emittance={} ior={} refl={} refr={} roughness={} spec_color={:?} spec_exp={}",
            material.diffuse,
            material.emittance,
            material.ior,
            material.reflectivity,
            material.refractivity,
            material.roughness,
            material.specular.color,
            material.specular.exponent
        );
        for (slot, id) in [("diffuse", textures.diffuse), ("bump", textures.bump)] {
            if let Some(id) = id {
                log::debug!("  {} tex = {{ id = {}, npixels = {} }}", slot, id, self.textures[id].pixel_count());
            }
        }

        Ok(material)
    }

    /// Resolve a material file referenced by a geometry, returning its index
    /// in [`Scene::materials`].
    ///
    /// Files are cached by path. Only the first material of a file is used.
    pub fn load_material_file(&mut self, path: impl AsRef<Path>) -> SceneResult<usize> {
        let path = path.as_ref();
        if let Some(&id) = self.material_cache.get(path) {
            return Ok(id);
        }

        let file = File::open(path).map_err(|_| SceneError::MaterialFileNotFound(path.to_path_buf()))?;
        let mats = asset::mtl::load_mtl_from_reader(BufReader::new(file)).map_err(|err| SceneError::MaterialFile {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        })?;
        let Some(first) = mats.first() else {
            return Err(SceneError::MaterialFile {
                path: path.to_path_buf(),
                reason: "no material defined".to_string(),
            });
        };
        if mats.len() > 1 {
            log::warn!("{} materials discarded in {}", mats.len() - 1, path.display());
        }

        let material = self.resolve_material(first, &parent_dir(path))?;
        let id = self.materials.len();
        self.materials.push(material);
        self.material_cache.insert(path.to_path_buf(), id);
        Ok(id)
    }

    /// Index of a texture, decoding it on first use. Cached by texture name.
    fn texture_index(&mut self, name: Option<&str>, dir: &Path) -> SceneResult<Option<usize>> {
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        if let Some(&id) = self.texture_cache.get(name) {
            return Ok(Some(id));
        }

        let path = dir.join(name);
        let texture = TextureData::load(&path).map_err(|err| SceneError::Texture {
            path: path.clone(),
            reason: format!("{err:#}"),
        })?;
        let id = self.textures.len();
        self.textures.push(texture);
        self.texture_cache.insert(name.to_string(), id);
        Ok(Some(id))
    }
}

/// Directory holding `path`, `.` for bare file names.
pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{write_mtl, write_png};

    #[test]
    fn classification_follows_coefficients() {
        assert_eq!(MaterialType::classify(0.5, 0.0), MaterialType::Refl);
        assert_eq!(MaterialType::classify(0.0, 1.0), MaterialType::Transparent);
        assert_eq!(MaterialType::classify(0.0, 1.0 + EPSILON / 2.0), MaterialType::Transparent);
        assert_eq!(MaterialType::classify(0.0, 0.3), MaterialType::Refr);
        assert_eq!(MaterialType::classify(0.2, 0.7), MaterialType::Glossy);
        assert_eq!(MaterialType::classify(0.0, 0.0), MaterialType::Diffuse);
    }

    #[test]
    fn rough_types_never_keep_zero_roughness() {
        let params = |refl, refr, rough| MaterialParams {
            reflectivity: refl,
            refractivity: refr,
            roughness: rough,
            ..MaterialParams::default()
        };
        let diffuse = Material::new(Vec3::ONE, Specular::default(), params(0.0, 0.0, 0.0), TextureSlots::default());
        assert_eq!(diffuse.kind, MaterialType::Diffuse);
        assert_eq!(diffuse.roughness, 1.0);

        let glossy = Material::new(Vec3::ONE, Specular::default(), params(0.3, 0.3, 0.0), TextureSlots::default());
        assert_eq!(glossy.roughness, 1.0);

        let mirror = Material::new(Vec3::ONE, Specular::default(), params(1.0, 0.0, 0.0), TextureSlots::default());
        assert_eq!(mirror.roughness, 0.0);

        let kept = Material::new(Vec3::ONE, Specular::default(), params(0.0, 0.0, 0.25), TextureSlots::default());
        assert_eq!(kept.roughness, 0.25);
    }

    #[test]
    fn params_default_when_absent() {
        let mut mtl = MtlMaterial::new("m");
        mtl.unknown_params.insert("emit".into(), "5".into());
        let params = MaterialParams::from_mtl(&mtl).expect("params");
        assert_eq!(params.emittance, 5.0);
        assert_eq!(params.ior, 1.0);
        assert_eq!(params.reflectivity, 0.0);

        mtl.unknown_params.insert("ior".into(), "glass".into());
        assert!(matches!(MaterialParams::from_mtl(&mtl), Err(SceneError::InvalidMaterial { .. })));
    }

    #[test]
    fn same_material_file_is_loaded_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_mtl(dir.path(), "red.mtl", "newmtl red\nKd 1 0 0\nrefl 0.5\n");

        let mut scene = Scene::default();
        let a = scene.load_material_file(&path).expect("first load");
        let b = scene.load_material_file(&path).expect("second load");
        assert_eq!(a, b);
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.materials[a].kind, MaterialType::Refl);
    }

    #[test]
    fn only_the_first_material_of_a_file_is_used() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_mtl(dir.path(), "two.mtl", "newmtl first\nKd 0 1 0\nnewmtl second\nKd 0 0 1\n");

        let mut scene = Scene::default();
        let id = scene.load_material_file(&path).expect("load");
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.materials[id].diffuse, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn missing_material_file_is_recoverable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut scene = Scene::default();
        let err = scene.load_material_file(dir.path().join("absent.mtl")).unwrap_err();
        assert!(matches!(err, SceneError::MaterialFileNotFound(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn shared_texture_is_decoded_once_and_slots_are_kept_apart() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(dir.path(), "wood.png", 4, 2);
        write_png(dir.path(), "bumps.png", 2, 2);
        let a = write_mtl(dir.path(), "a.mtl", "newmtl a\nmap_Kd wood.png\n");
        let b = write_mtl(dir.path(), "b.mtl", "newmtl b\nmap_Kd wood.png\nmap_Bump wood.png\n");
        let c = write_mtl(dir.path(), "c.mtl", "newmtl c\nmap_Bump bumps.png\n");

        let mut scene = Scene::default();
        let a = scene.load_material_file(&a).expect("a");
        let b = scene.load_material_file(&b).expect("b");
        let c = scene.load_material_file(&c).expect("c");

        assert_eq!(scene.textures.len(), 2);
        assert_eq!(scene.materials[a].textures.diffuse, Some(0));
        assert_eq!(scene.materials[b].textures, TextureSlots { diffuse: Some(0), bump: Some(0) });
        assert_eq!(scene.materials[c].textures, TextureSlots { diffuse: None, bump: Some(1) });
        assert_eq!(scene.textures[0].width, 4);
    }

    #[test]
    fn undecodable_texture_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_mtl(dir.path(), "broken.mtl", "newmtl broken\nmap_Kd nowhere.png\n");
        let mut scene = Scene::default();
        let err = scene.load_material_file(&path).unwrap_err();
        assert!(matches!(err, SceneError::Texture { .. }));
        assert!(err.is_fatal());
        assert!(scene.materials.is_empty());
    }
}
