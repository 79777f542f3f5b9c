//! Mesh import: appends an OBJ model to the scene-wide buffers.

use std::{collections::HashMap, path::Path};

use asset::obj::{self, ObjModel};
use corelib::{Vec2, Vec3};

use crate::{
    error::{SceneError, SceneResult},
    material::parent_dir,
    scene::Scene,
    tangent::{self, Attributes},
};

/// Grid used to merge synthesised normals that are equal up to rounding.
pub const NORMAL_DEDUP_GRID: f32 = 1e-3;

/// Triangle referencing the scene-wide buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub verts: [usize; 3],
    pub norms: [usize; 3],
    pub uvs: [Option<usize>; 3],
    /// Set only for meshes with a normal map and complete UVs.
    pub tangents: Option<[usize; 3]>,
    pub material: Option<usize>,
}

impl Triangle {
    pub fn new(verts: [usize; 3], norms: [usize; 3], uvs: [Option<usize>; 3], material: Option<usize>) -> Self {
        Self {
            verts,
            norms,
            uvs,
            tangents: None,
            material,
        }
    }
}

/// Contiguous range of [`Scene::triangles`] owned by one imported mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshRange {
    pub start: usize,
    pub end: usize,
}

impl MeshRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Buffer sizes before an import; added to every index read from the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferOffsets {
    pub vertex: usize,
    pub normal: usize,
    pub uv: usize,
    pub material: usize,
    pub tangent: usize,
}

impl BufferOffsets {
    pub fn of(scene: &Scene) -> Self {
        Self {
            vertex: scene.vertices.len(),
            normal: scene.normals.len(),
            uv: scene.uvs.len(),
            material: scene.materials.len(),
            tangent: scene.tangents.len(),
        }
    }
}

/// Deduplicates synthesised face normals by snapping them to a grid.
#[derive(Debug, Default)]
pub struct NormalCache {
    ids: HashMap<[i64; 3], usize>,
}

impl NormalCache {
    fn key(n: Vec3) -> [i64; 3] {
        (n / NORMAL_DEDUP_GRID).round().as_i64vec3().to_array()
    }

    /// Index of `n` in `normals`, appending it if no close normal exists.
    pub fn get_or_insert(&mut self, n: Vec3, normals: &mut Vec<Vec3>) -> usize {
        *self.ids.entry(Self::key(n)).or_insert_with(|| {
            normals.push(n);
            normals.len() - 1
        })
    }
}

/// Unit normal of a counter-clockwise face, zero for degenerate faces.
pub fn face_normal(p0: Vec3, p1: Vec3, p2: Vec3) -> Vec3 {
    (p1 - p0).cross(p2 - p0).normalize_or_zero()
}

impl Scene {
    /// Import an OBJ mesh, returning its index in [`Scene::meshes`].
    ///
    /// Materials are looked up next to the mesh file. A texture that fails to
    /// decode aborts the whole load; parse errors only fail this mesh.
    pub fn import_obj(&mut self, path: &Path) -> SceneResult<usize> {
        let search_dir = parent_dir(path);
        log::info!("Loading obj mesh {}", path.display());
        log::info!("set material lookup path to: {}", search_dir.display());

        let model = obj::load_obj_with_materials(path, &search_dir).map_err(|err| SceneError::MeshParse {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        })?;

        let offsets = BufferOffsets::of(self);
        let has_normal_map = self.append_materials(&model, &search_dir)?;
        self.append_attributes(&model);

        let start = self.triangles.len();
        self.append_triangles(&model, offsets);

        let missing_uv = model.mesh.has_missing_texcoords();
        if has_normal_map && !missing_uv {
            self.append_tangents(start, offsets, model.mesh.vertex_count());
        } else if has_normal_map {
            log::warn!("normal map of {} ignored: mesh has no complete uvs", path.display());
        }

        let mesh_id = self.meshes.len();
        self.meshes.push(MeshRange {
            start,
            end: self.triangles.len(),
        });

        log::info!(
            "Loaded: {} triangles, {} vertices, {} normals, {} uvs, {} meshes, {} tangents",
            self.triangles.len(),
            self.vertices.len(),
            self.normals.len(),
            self.uvs.len(),
            self.meshes.len(),
            self.tangents.len()
        );
        if missing_uv {
            log::warn!("missing uv for {}", path.display());
        }
        if model.mesh.has_missing_normals() {
            log::warn!("missing norm for {}", path.display());
        }

        Ok(mesh_id)
    }

    /// Returns whether any of the materials carries a bump map.
    fn append_materials(&mut self, model: &ObjModel, search_dir: &Path) -> SceneResult<bool> {
        let mut has_normal_map = false;
        for mat in &model.materials {
            let material = self.resolve_material(mat, search_dir)?;
            has_normal_map |= material.textures.bump.is_some();
            self.materials.push(material);
        }
        Ok(has_normal_map)
    }

    fn append_attributes(&mut self, model: &ObjModel) {
        let mesh = &model.mesh;
        self.vertices.extend(mesh.positions.iter().copied().map(Vec3::from_array));
        self.normals.extend(mesh.normals.iter().copied().map(Vec3::from_array));
        self.uvs.extend(mesh.texcoords.iter().copied().map(Vec2::from_array));
    }

    fn append_triangles(&mut self, model: &ObjModel, offsets: BufferOffsets) {
        let mut missing_norm = false;
        let mut synthesized = NormalCache::default();

        for tri in &model.mesh.triangles {
            let verts = tri.corners.map(|c| c.vertex + offsets.vertex);
            let uvs = tri.corners.map(|c| c.texcoord.map(|t| t + offsets.uv));
            let mut norms = [0; 3];
            for (slot, corner) in norms.iter_mut().zip(&tri.corners) {
                match corner.normal {
                    Some(n) => *slot = n + offsets.normal,
                    None => missing_norm = true,
                }
            }

            // Once one corner lacked a normal, every later face gets a flat one.
            if missing_norm {
                let [a, b, c] = verts.map(|v| self.vertices[v]);
                norms = [synthesized.get_or_insert(face_normal(a, b, c), &mut self.normals); 3];
            }

            let material = tri.material.map(|m| m + offsets.material);
            self.triangles.push(Triangle::new(verts, norms, uvs, material));
        }
    }

    /// One tangent per mesh vertex; tangent index = local vertex index + offset.
    fn append_tangents(&mut self, start: usize, offsets: BufferOffsets, vertex_count: usize) {
        let vertices = offsets.vertex..offsets.vertex + vertex_count;
        let attrs = Attributes {
            positions: &self.vertices,
            normals: &self.normals,
            uvs: &self.uvs,
        };
        let tangents = tangent::compute_tangents(attrs, &self.triangles[start..], vertices);
        self.tangents.extend(tangents);

        for tri in &mut self.triangles[start..] {
            tri.tangents = Some(tri.verts.map(|v| v - offsets.vertex + offsets.tangent));
        }
    }
}
