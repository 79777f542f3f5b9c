//! Fixture helpers for tests.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

pub fn write_mtl(dir: &Path, name: &str, contents: &str) -> PathBuf {
    write_file(dir, name, contents)
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba([128, 128, 255, 255]))
        .save(&path)
        .expect("write png");
    path
}

/// Planar grid of `nx * ny` quads (two triangles each) in the XY plane with
/// full UVs and one shared normal. With a library, faces use the material
/// named after the library's file stem.
pub fn grid_obj(nx: usize, ny: usize, mtl_lib: Option<&str>) -> String {
    let mut src = String::new();
    if let Some(lib) = mtl_lib {
        let stem = Path::new(lib).file_stem().and_then(|s| s.to_str()).unwrap_or(lib);
        writeln!(src, "mtllib {lib}\nusemtl {stem}").unwrap();
    }
    for j in 0..=ny {
        for i in 0..=nx {
            writeln!(src, "v {} {} 0", i, j).unwrap();
            writeln!(src, "vt {} {}", i as f32 / nx as f32, j as f32 / ny as f32).unwrap();
        }
    }
    writeln!(src, "vn 0 0 1").unwrap();

    let idx = |i: usize, j: usize| j * (nx + 1) + i + 1;
    for j in 0..ny {
        for i in 0..nx {
            let (a, b, c, d) = (idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1));
            writeln!(src, "f {a}/{a}/1 {b}/{b}/1 {c}/{c}/1").unwrap();
            writeln!(src, "f {a}/{a}/1 {c}/{c}/1 {d}/{d}/1").unwrap();
        }
    }
    src
}
