//! Asset loading/parsers (meshes, materials, textures).
//! OBJ meshes keep their attribute streams separate so callers can remap indices.
//! MTL materials keep unknown keys for renderer-specific parameters.

pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod texture;
