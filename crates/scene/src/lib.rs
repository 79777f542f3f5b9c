//! Scene loading for the path tracer.
//!
//! A scene file is read top to bottom into flat, scene-wide buffers: OBJECT
//! blocks become geometry (importing OBJ meshes with their materials and
//! textures), CAMERA blocks become the render state. The finished [`Scene`]
//! can then be moved to a device in one go with [`Scene::upload`].

pub mod camera;
pub mod device;
pub mod error;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod tangent;
pub mod tokenizer;

#[cfg(test)]
mod test_util;

pub use camera::RenderState;
pub use error::{SceneError, SceneResult};
pub use geometry::{Geom, GeomKind, Light, MAX_EMITTANCE};
pub use material::{Material, MaterialType};
pub use mesh::{MeshRange, Triangle};
pub use scene::{LoadMode, Scene};
