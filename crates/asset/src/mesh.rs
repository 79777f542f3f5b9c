//! CPU-side mesh representation used by loaders.
//!
//! Unlike an interleaved vertex buffer, positions, normals and texture
//! coordinates stay in separate streams, and each triangle corner refers to
//! them by index. A corner may lack a normal or a texture coordinate.

/// One corner of a triangle: 0-based indices into the attribute streams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FaceCorner {
    pub vertex: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceCorner {
    pub fn new(vertex: usize, texcoord: Option<usize>, normal: Option<usize>) -> Self {
        Self {
            vertex,
            texcoord,
            normal,
        }
    }
}

/// Triangle with an optional material index into the owning model's material list.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshTriangle {
    pub corners: [FaceCorner; 3],
    pub material: Option<usize>,
}

/// Triangle mesh with separate attribute streams.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub triangles: Vec<MeshTriangle>,
}

impl MeshData {
    /// Returns `true` if there are positions and at least one triangle.
    pub fn is_valid(&self) -> bool {
        !self.positions.is_empty() && !self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// `true` if any corner lacks a normal index.
    pub fn has_missing_normals(&self) -> bool {
        self.corners().any(|c| c.normal.is_none())
    }

    /// `true` if any corner lacks a texture coordinate index.
    pub fn has_missing_texcoords(&self) -> bool {
        self.corners().any(|c| c.texcoord.is_none())
    }

    fn corners(&self) -> impl Iterator<Item = &FaceCorner> {
        self.triangles.iter().flat_map(|t| t.corners.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_data_validity() {
        let mut data = MeshData::default();
        assert!(!data.is_valid());
        data.positions = vec![[0.0; 3]; 3];
        data.triangles.push(MeshTriangle {
            corners: [
                FaceCorner::new(0, None, Some(0)),
                FaceCorner::new(1, Some(0), Some(0)),
                FaceCorner::new(2, Some(0), Some(0)),
            ],
            material: None,
        });
        assert!(data.is_valid());
        assert!(data.has_missing_texcoords());
        assert!(!data.has_missing_normals());
    }
}
