//! Handing a finished scene to a compute device.
//!
//! [`DeviceMemory`] is the contract a device backend fulfils: zeroed
//! allocation and host/device copies of plain-old-data arrays. [`Span`] is the
//! bounds-checked, non-owning view kernels index through. [`HostMemory`]
//! emulates a device in host memory.

use std::{collections::HashMap, marker::PhantomData};

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::{
    geometry::{Geom, GeomKind, Light},
    material::{Material, MaterialType},
    mesh::{MeshRange, Triangle},
    scene::Scene,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("unknown device buffer {0}")]
    UnknownBuffer(u64),
    #[error("length mismatch: destination holds {dst} elements, source {src}")]
    LengthMismatch { dst: usize, src: usize },
    #[error("invalid subspan [{start}, {start}+{len}) of a {size}-element span")]
    InvalidSubspan { start: usize, len: usize, size: usize },
    #[error("index {0} does not fit the device index type")]
    IndexOverflow(usize),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Typed handle to `len` elements of a device allocation, starting at `offset`.
pub struct DeviceBuffer<T> {
    id: u64,
    offset: usize,
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for DeviceBuffer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DeviceBuffer<T> {}

impl<T> std::fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("id", &self.id)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

impl<T> DeviceBuffer<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View of `len` elements starting at `start`, sharing the allocation.
    pub fn subspan(&self, start: usize, len: usize) -> DeviceResult<Self> {
        check_subspan(start, len, self.len)?;
        Ok(Self {
            id: self.id,
            offset: self.offset + start,
            len,
            _marker: PhantomData,
        })
    }
}

fn check_subspan(start: usize, len: usize, size: usize) -> DeviceResult<()> {
    match start.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(DeviceError::InvalidSubspan { start, len, size }),
    }
}

/// Device allocation and transfer.
pub trait DeviceMemory {
    fn alloc_zeroed<T: Pod>(&mut self, len: usize) -> DeviceResult<DeviceBuffer<T>>;
    fn write<T: Pod>(&mut self, dst: &DeviceBuffer<T>, src: &[T]) -> DeviceResult<()>;
    fn read<T: Pod>(&self, src: &DeviceBuffer<T>, dst: &mut [T]) -> DeviceResult<()>;
    fn copy<T: Pod>(&mut self, dst: &DeviceBuffer<T>, src: &DeviceBuffer<T>) -> DeviceResult<()>;
    fn free<T>(&mut self, buffer: DeviceBuffer<T>);

    /// Allocate and fill from host memory.
    fn upload<T: Pod>(&mut self, src: &[T]) -> DeviceResult<DeviceBuffer<T>> {
        let buffer = self.alloc_zeroed(src.len())?;
        self.write(&buffer, src)?;
        Ok(buffer)
    }

    /// Copy back into a new host vector.
    fn download<T: Pod>(&self, src: &DeviceBuffer<T>) -> DeviceResult<Vec<T>> {
        let mut out = vec![T::zeroed(); src.len()];
        self.read(src, &mut out)?;
        Ok(out)
    }
}

/// Device emulated with host byte vectors.
#[derive(Debug, Default)]
pub struct HostMemory {
    allocations: HashMap<u64, Vec<u8>>,
    next_id: u64,
}

impl HostMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    /// Bounds-checked view over a buffer.
    pub fn view<T: Pod>(&self, buffer: &DeviceBuffer<T>) -> DeviceResult<Span<'_, T>> {
        Ok(Span {
            bytes: self.bytes(buffer)?,
            _marker: PhantomData,
        })
    }

    fn bytes<T: Pod>(&self, buffer: &DeviceBuffer<T>) -> DeviceResult<&[u8]> {
        let size = std::mem::size_of::<T>();
        let alloc = self
            .allocations
            .get(&buffer.id)
            .ok_or(DeviceError::UnknownBuffer(buffer.id))?;
        Ok(&alloc[buffer.offset * size..(buffer.offset + buffer.len) * size])
    }

    fn bytes_mut<T: Pod>(&mut self, buffer: &DeviceBuffer<T>) -> DeviceResult<&mut [u8]> {
        let size = std::mem::size_of::<T>();
        let alloc = self
            .allocations
            .get_mut(&buffer.id)
            .ok_or(DeviceError::UnknownBuffer(buffer.id))?;
        Ok(&mut alloc[buffer.offset * size..(buffer.offset + buffer.len) * size])
    }
}

impl DeviceMemory for HostMemory {
    fn alloc_zeroed<T: Pod>(&mut self, len: usize) -> DeviceResult<DeviceBuffer<T>> {
        let id = self.next_id;
        self.next_id += 1;
        self.allocations.insert(id, vec![0; len * std::mem::size_of::<T>()]);
        Ok(DeviceBuffer {
            id,
            offset: 0,
            len,
            _marker: PhantomData,
        })
    }

    fn write<T: Pod>(&mut self, dst: &DeviceBuffer<T>, src: &[T]) -> DeviceResult<()> {
        if dst.len != src.len() {
            return Err(DeviceError::LengthMismatch {
                dst: dst.len,
                src: src.len(),
            });
        }
        self.bytes_mut(dst)?.copy_from_slice(bytemuck::cast_slice::<T, u8>(src));
        Ok(())
    }

    fn read<T: Pod>(&self, src: &DeviceBuffer<T>, dst: &mut [T]) -> DeviceResult<()> {
        if dst.len() != src.len {
            return Err(DeviceError::LengthMismatch {
                dst: dst.len(),
                src: src.len,
            });
        }
        bytemuck::cast_slice_mut::<T, u8>(dst).copy_from_slice(self.bytes(src)?);
        Ok(())
    }

    fn copy<T: Pod>(&mut self, dst: &DeviceBuffer<T>, src: &DeviceBuffer<T>) -> DeviceResult<()> {
        if dst.len != src.len {
            return Err(DeviceError::LengthMismatch {
                dst: dst.len,
                src: src.len,
            });
        }
        let staged = self.bytes(src)?.to_vec();
        self.bytes_mut(dst)?.copy_from_slice(&staged);
        Ok(())
    }

    fn free<T>(&mut self, buffer: DeviceBuffer<T>) {
        self.allocations.remove(&buffer.id);
    }
}

/// Non-owning, bounds-checked view over device elements.
pub struct Span<'a, T> {
    bytes: &'a [u8],
    _marker: PhantomData<T>,
}

impl<'a, T: Pod> Span<'a, T> {
    pub fn len(&self) -> usize {
        self.bytes.len() / std::mem::size_of::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<T> {
        let size = std::mem::size_of::<T>();
        let start = idx.checked_mul(size)?;
        let bytes = self.bytes.get(start..start.checked_add(size)?)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    /// Element at `idx`; panics when out of bounds.
    pub fn at(&self, idx: usize) -> T {
        match self.get(idx) {
            Some(value) => value,
            None => panic!("array out of bounds, idx={}, size={}", idx, self.len()),
        }
    }

    pub fn subspan(&self, start: usize, len: usize) -> DeviceResult<Span<'a, T>> {
        check_subspan(start, len, self.len())?;
        let size = std::mem::size_of::<T>();
        Ok(Span {
            bytes: &self.bytes[start * size..(start + len) * size],
            _marker: PhantomData,
        })
    }
}

const NONE: i32 = -1;

fn index(i: usize) -> DeviceResult<i32> {
    i32::try_from(i).map_err(|_| DeviceError::IndexOverflow(i))
}

fn indices(idx: [usize; 3]) -> DeviceResult<[i32; 3]> {
    Ok([index(idx[0])?, index(idx[1])?, index(idx[2])?])
}

fn optional(i: Option<usize>) -> DeviceResult<i32> {
    i.map_or(Ok(NONE), index)
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    pub verts: [i32; 3],
    pub norms: [i32; 3],
    pub uvs: [i32; 3],
    pub tangents: [i32; 3],
    pub material: i32,
}

impl TryFrom<&Triangle> for GpuTriangle {
    type Error = DeviceError;

    fn try_from(tri: &Triangle) -> DeviceResult<Self> {
        Ok(Self {
            verts: indices(tri.verts)?,
            norms: indices(tri.norms)?,
            uvs: [optional(tri.uvs[0])?, optional(tri.uvs[1])?, optional(tri.uvs[2])?],
            tangents: match tri.tangents {
                Some(t) => indices(t)?,
                None => [NONE; 3],
            },
            material: optional(tri.material)?,
        })
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub diffuse: [f32; 3],
    pub specular_color: [f32; 3],
    pub specular_exponent: f32,
    pub reflectivity: f32,
    pub refractivity: f32,
    pub ior: f32,
    pub emittance: f32,
    pub roughness: f32,
    pub diffuse_texture: i32,
    pub bump_texture: i32,
    pub kind: u32,
}

impl TryFrom<&Material> for GpuMaterial {
    type Error = DeviceError;

    fn try_from(mat: &Material) -> DeviceResult<Self> {
        Ok(Self {
            diffuse: mat.diffuse.to_array(),
            specular_color: mat.specular.color.to_array(),
            specular_exponent: mat.specular.exponent,
            reflectivity: mat.reflectivity,
            refractivity: mat.refractivity,
            ior: mat.ior,
            emittance: mat.emittance,
            roughness: mat.roughness,
            diffuse_texture: optional(mat.textures.diffuse)?,
            bump_texture: optional(mat.textures.bump)?,
            kind: match mat.kind {
                MaterialType::Diffuse => 0,
                MaterialType::Refl => 1,
                MaterialType::Refr => 2,
                MaterialType::Transparent => 3,
                MaterialType::Glossy => 4,
            },
        })
    }
}

pub const GEOM_SPHERE: u32 = 0;
pub const GEOM_CUBE: u32 = 1;
pub const GEOM_MESH: u32 = 2;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuGeom {
    pub kind: u32,
    pub material: i32,
    pub mesh: i32,
    pub translation: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub transform: [f32; 16],
    pub inverse_transform: [f32; 16],
    pub inv_transpose: [f32; 16],
}

impl TryFrom<&Geom> for GpuGeom {
    type Error = DeviceError;

    fn try_from(geom: &Geom) -> DeviceResult<Self> {
        let (kind, mesh) = match geom.kind {
            GeomKind::Sphere => (GEOM_SPHERE, NONE),
            GeomKind::Cube => (GEOM_CUBE, NONE),
            GeomKind::Mesh { mesh } => (GEOM_MESH, index(mesh)?),
        };
        Ok(Self {
            kind,
            material: index(geom.material)?,
            mesh,
            translation: geom.transform.translation.to_array(),
            rotation: geom.transform.rotation_deg.to_array(),
            scale: geom.transform.scale.to_array(),
            transform: geom.matrices.transform.to_cols_array(),
            inverse_transform: geom.matrices.inverse.to_cols_array(),
            inv_transpose: geom.matrices.inv_transpose.to_cols_array(),
        })
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
}

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        Self {
            color: light.color.to_array(),
            intensity: light.intensity,
            position: light.position.to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuMesh {
    pub start: i32,
    pub end: i32,
}

impl TryFrom<&MeshRange> for GpuMesh {
    type Error = DeviceError;

    fn try_from(mesh: &MeshRange) -> DeviceResult<Self> {
        Ok(Self {
            start: index(mesh.start)?,
            end: index(mesh.end)?,
        })
    }
}

/// Where a texture's pixels live inside [`DeviceScene::texels`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuTexture {
    pub offset: u32,
    pub width: u32,
    pub height: u32,
}

/// Device copies of every scene buffer.
#[derive(Debug)]
pub struct DeviceScene {
    pub vertices: DeviceBuffer<[f32; 3]>,
    pub normals: DeviceBuffer<[f32; 3]>,
    pub uvs: DeviceBuffer<[f32; 2]>,
    pub tangents: DeviceBuffer<[f32; 4]>,
    pub triangles: DeviceBuffer<GpuTriangle>,
    pub meshes: DeviceBuffer<GpuMesh>,
    pub materials: DeviceBuffer<GpuMaterial>,
    pub textures: DeviceBuffer<GpuTexture>,
    /// RGBA8 pixels of all textures back to back.
    pub texels: DeviceBuffer<[u8; 4]>,
    pub geoms: DeviceBuffer<GpuGeom>,
    pub lights: DeviceBuffer<GpuLight>,
    pub image: DeviceBuffer<[f32; 3]>,
}

impl Scene {
    /// Copy every buffer to `device` in one go. Call only once loading is done.
    pub fn upload<D: DeviceMemory>(&self, device: &mut D) -> DeviceResult<DeviceScene> {
        let mut textures = Vec::with_capacity(self.textures.len());
        let mut texels: Vec<[u8; 4]> = Vec::new();
        for tex in &self.textures {
            textures.push(GpuTexture {
                offset: u32::try_from(texels.len()).map_err(|_| DeviceError::IndexOverflow(texels.len()))?,
                width: tex.width,
                height: tex.height,
            });
            texels.extend(tex.data.chunks_exact(4).map(|px| [px[0], px[1], px[2], px[3]]));
        }

        let scene = DeviceScene {
            vertices: device.upload(&self.vertices.iter().map(|v| v.to_array()).collect::<Vec<_>>())?,
            normals: device.upload(&self.normals.iter().map(|v| v.to_array()).collect::<Vec<_>>())?,
            uvs: device.upload(&self.uvs.iter().map(|v| v.to_array()).collect::<Vec<_>>())?,
            tangents: device.upload(&self.tangents.iter().map(|v| v.to_array()).collect::<Vec<_>>())?,
            triangles: device.upload(
                &self
                    .triangles
                    .iter()
                    .map(GpuTriangle::try_from)
                    .collect::<DeviceResult<Vec<_>>>()?,
            )?,
            meshes: device.upload(&self.meshes.iter().map(GpuMesh::try_from).collect::<DeviceResult<Vec<_>>>()?)?,
            materials: device.upload(
                &self
                    .materials
                    .iter()
                    .map(GpuMaterial::try_from)
                    .collect::<DeviceResult<Vec<_>>>()?,
            )?,
            textures: device.upload(&textures)?,
            texels: device.upload(&texels)?,
            geoms: device.upload(&self.geoms.iter().map(GpuGeom::try_from).collect::<DeviceResult<Vec<_>>>()?)?,
            lights: device.upload(&self.lights.iter().map(GpuLight::from).collect::<Vec<_>>())?,
            image: device.alloc_zeroed(self.state.image.len())?,
        };

        log::info!(
            "Uploaded scene: {} triangles, {} materials, {} texels, {} geoms",
            scene.triangles.len(),
            scene.materials.len(),
            scene.texels.len(),
            scene.geoms.len()
        );
        Ok(scene)
    }
}
