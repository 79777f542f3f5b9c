//! OBJ parser supporting positions, normals, texture coordinates and materials.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow};

use crate::{
    mesh::{FaceCorner, MeshData, MeshTriangle},
    mtl::{self, MtlMaterial},
};

/// Result of parsing a single OBJ file, before material libraries are read.
///
/// Triangle material indices point into `material_names`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjDocument {
    pub mesh: MeshData,
    pub material_names: Vec<String>,
    pub material_libs: Vec<String>,
}

/// OBJ mesh together with the materials of its libraries.
///
/// Triangle material indices point into `materials`.
#[derive(Clone, Debug, Default)]
pub struct ObjModel {
    pub mesh: MeshData,
    pub materials: Vec<MtlMaterial>,
}

/// Load an OBJ mesh and its material libraries.
///
/// `mtllib` files are looked up in `mtl_search_dir`. A library that cannot be
/// read and a `usemtl` naming no known material are warnings; the affected
/// triangles end up with no material.
pub fn load_obj_with_materials(path: impl AsRef<Path>, mtl_search_dir: impl AsRef<Path>) -> Result<ObjModel> {
    let path = path.as_ref();
    let doc = load_obj_from_path(path)?;

    let mut materials: Vec<MtlMaterial> = Vec::new();
    for lib in &doc.material_libs {
        let lib_path = mtl_search_dir.as_ref().join(lib);
        let file = match File::open(&lib_path) {
            Ok(file) => file,
            Err(err) => {
                log::warn!("{}: cannot open material library {}: {}", path.display(), lib_path.display(), err);
                continue;
            }
        };
        let parsed = mtl::load_mtl_from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse material library: {}", lib_path.display()))?;
        for mat in parsed {
            if materials.iter().any(|m| m.name == mat.name) {
                log::warn!("{}: duplicate material '{}' ignored", lib_path.display(), mat.name);
                continue;
            }
            materials.push(mat);
        }
    }

    let remap: Vec<Option<usize>> = doc
        .material_names
        .iter()
        .map(|name| {
            let found = materials.iter().position(|m| &m.name == name);
            if found.is_none() {
                log::warn!("{}: material '{}' not found", path.display(), name);
            }
            found
        })
        .collect();

    let mut mesh = doc.mesh;
    for tri in &mut mesh.triangles {
        tri.material = tri.material.and_then(|i| remap.get(i).copied().flatten());
    }

    Ok(ObjModel { mesh, materials })
}

/// Load an OBJ document from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<ObjDocument> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.as_ref().display()))?;
    load_obj_from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse OBJ file: {}", path.as_ref().display()))
}

/// Load an OBJ document from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> Result<ObjDocument> {
    parse_obj(reader)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> Result<ObjDocument> {
    parse_obj(io::Cursor::new(contents))
}

fn parse_obj<R: BufRead>(reader: R) -> Result<ObjDocument> {
    let mut mesh = MeshData::default();
    let mut material_names: Vec<String> = Vec::new();
    let mut material_ids: HashMap<String, usize> = HashMap::new();
    let mut material_libs: Vec<String> = Vec::new();
    let mut current_material: Option<usize> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let tag = parts
            .next()
            .ok_or_else(|| anyhow!("Malformed OBJ line {}: '{}'", line_no + 1, trimmed))?;

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                mesh.positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                // 1D texture coordinates are allowed.
                let v = match parts.next() {
                    Some(token) => parse_f32(Some(token), line_no, "v coordinate")?,
                    None => 0.0,
                };
                mesh.texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                mesh.normals.push([nx, ny, nz]);
            }
            "f" => {
                let mut face: Vec<FaceCorner> = Vec::new();
                for part in parts {
                    face.push(parse_face_vertex(
                        part,
                        mesh.positions.len(),
                        mesh.texcoords.len(),
                        mesh.normals.len(),
                        line_no,
                    )?);
                }

                if face.len() < 3 {
                    log::warn!("OBJ line {}: face with {} vertices skipped", line_no + 1, face.len());
                    continue;
                }
                // Triangulate fan
                for tri in 1..(face.len() - 1) {
                    mesh.triangles.push(MeshTriangle {
                        corners: [face[0], face[tri], face[tri + 1]],
                        material: current_material,
                    });
                }
            }
            "usemtl" => {
                let name = rest_of_line(trimmed, tag)
                    .ok_or_else(|| anyhow!("usemtl without a name on line {}", line_no + 1))?;
                let next_id = material_names.len();
                let id = *material_ids.entry(name.to_string()).or_insert_with(|| {
                    material_names.push(name.to_string());
                    next_id
                });
                current_material = Some(id);
            }
            "mtllib" => {
                material_libs.extend(parts.map(str::to_string));
            }
            _ => {
                // Ignore other directives (o/g/s/l/etc.)
            }
        }
    }

    if !mesh.is_valid() {
        anyhow::bail!("OBJ contained no triangles");
    }

    Ok(ObjDocument {
        mesh,
        material_names,
        material_libs,
    })
}

pub(crate) fn rest_of_line<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(tag)?.trim();
    (!rest.is_empty()).then_some(rest)
}

pub(crate) fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> Result<FaceCorner> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .ok_or_else(|| anyhow!("Malformed face element '{}' on line {}", token, line_no + 1))?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok(FaceCorner::new(pos_idx, tex_idx, norm_idx))
}

fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    if raw == 0 {
        anyhow::bail!("OBJ indices are 1-based; found 0 on line {}", line_no + 1);
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        anyhow::bail!(
            "OBJ index {} resolved out of bounds (len={}) on line {}",
            raw,
            len,
            line_no + 1
        );
    }

    Ok(idx as usize)
}
