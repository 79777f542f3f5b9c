//! MTL (material library) parser.
//!
//! Only the Phong subset the loader needs is mapped to fields. Every other
//! `key value...` line is kept verbatim in [`MtlMaterial::unknown_params`], which is
//! where renderer-specific parameters live.

use std::{
    collections::HashMap,
    io::{self, BufRead},
};

use anyhow::{Context, Result, anyhow};

use crate::obj::{parse_f32, rest_of_line};

/// One `newmtl` block.
#[derive(Clone, Debug, PartialEq)]
pub struct MtlMaterial {
    pub name: String,
    /// `Kd`
    pub diffuse: [f32; 3],
    /// `Ks`
    pub specular: [f32; 3],
    /// `Ns`
    pub shininess: f32,
    /// `map_Kd`
    pub diffuse_texture: Option<String>,
    /// `map_Bump`, `bump` or `norm`
    pub bump_texture: Option<String>,
    pub unknown_params: HashMap<String, String>,
}

impl MtlMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: [0.0; 3],
            specular: [0.0; 3],
            shininess: 1.0,
            diffuse_texture: None,
            bump_texture: None,
            unknown_params: HashMap::new(),
        }
    }

    /// Parse an unknown parameter as `f32`, `None` if absent.
    pub fn param_f32(&self, key: &str) -> Result<Option<f32>> {
        self.unknown_params
            .get(key)
            .map(|raw| {
                raw.parse::<f32>()
                    .with_context(|| format!("Material '{}': invalid value '{}' for {}", self.name, raw, key))
            })
            .transpose()
    }
}

pub fn load_mtl_from_str(contents: &str) -> Result<Vec<MtlMaterial>> {
    load_mtl_from_reader(io::Cursor::new(contents))
}

/// Parse all materials of an MTL source, in file order.
pub fn load_mtl_from_reader<R: BufRead>(reader: R) -> Result<Vec<MtlMaterial>> {
    let mut materials: Vec<MtlMaterial> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        if tag == "newmtl" {
            let name = rest_of_line(trimmed, tag)
                .ok_or_else(|| anyhow!("newmtl without a name on line {}", line_no + 1))?;
            materials.push(MtlMaterial::new(name));
            continue;
        }

        let Some(mat) = materials.last_mut() else {
            log::warn!("MTL line {}: '{}' before any newmtl, ignored", line_no + 1, tag);
            continue;
        };

        match tag {
            "Kd" => mat.diffuse = parse_color(&mut parts, line_no, tag)?,
            "Ks" => mat.specular = parse_color(&mut parts, line_no, tag)?,
            "Ns" => mat.shininess = parse_f32(parts.next(), line_no, tag)?,
            "map_Kd" => mat.diffuse_texture = Some(parse_texture_name(trimmed, tag, line_no)?),
            "map_Bump" | "map_bump" | "bump" | "norm" => {
                mat.bump_texture = Some(parse_texture_name(trimmed, tag, line_no)?)
            }
            _ => {
                let value = rest_of_line(trimmed, tag).unwrap_or_default();
                mat.unknown_params.insert(tag.to_string(), value.to_string());
            }
        }
    }

    Ok(materials)
}

fn parse_color<'a>(parts: &mut impl Iterator<Item = &'a str>, line_no: usize, what: &str) -> Result<[f32; 3]> {
    let r = parse_f32(parts.next(), line_no, what)?;
    // A single component means grey.
    let (g, b) = match parts.next() {
        Some(g) => (parse_f32(Some(g), line_no, what)?, parse_f32(parts.next(), line_no, what)?),
        None => (r, r),
    };
    Ok([r, g, b])
}

/// Texture statements may carry options (`-bm 1.0 file.png`); the file name comes last.
fn parse_texture_name(line: &str, tag: &str, line_no: usize) -> Result<String> {
    rest_of_line(line, tag)
        .and_then(|rest| rest.split_whitespace().last())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{} without a file name on line {}", tag, line_no + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_phong_subset_and_keeps_unknown_params() {
        let src = r#"
            # comment
            newmtl glass
            Kd 0.1 0.2 0.3
            Ks 1 1 1
            Ns 64
            refr 1.0
            ior 1.5
            map_Kd albedo.png
            map_Bump -bm 0.5 normal.png
        "#;
        let mats = load_mtl_from_str(src).expect("parse mtl");
        assert_eq!(mats.len(), 1);
        let m = &mats[0];
        assert_eq!(m.name, "glass");
        assert_eq!(m.diffuse, [0.1, 0.2, 0.3]);
        assert_eq!(m.specular, [1.0, 1.0, 1.0]);
        assert_eq!(m.shininess, 64.0);
        assert_eq!(m.diffuse_texture.as_deref(), Some("albedo.png"));
        assert_eq!(m.bump_texture.as_deref(), Some("normal.png"));
        assert_eq!(m.param_f32("ior").expect("ior"), Some(1.5));
        assert_eq!(m.param_f32("refl").expect("refl"), None);
    }

    #[test]
    fn keeps_file_order_of_materials() {
        let mats = load_mtl_from_str("newmtl b\nnewmtl a\nKd 0.5\n").expect("parse mtl");
        let names: Vec<_> = mats.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(mats[1].diffuse, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(load_mtl_from_str("newmtl a\nKd x y z\n").is_err());
        let mats = load_mtl_from_str("newmtl a\nemit lots\n").expect("unknown values are strings");
        assert!(mats[0].param_f32("emit").is_err());
    }
}
