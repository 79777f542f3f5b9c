//! Per-vertex tangent frames for normal mapping.
//!
//! Tangents are accumulated from every triangle touching a vertex by solving
//! the edge/UV-delta system (Lengyel, "Computing Tangent Space Basis Vectors
//! for an Arbitrary Mesh"), then orthogonalised against the vertex normal.

use std::ops::Range;

use corelib::{Vec2, Vec3, Vec4};

use crate::mesh::Triangle;

/// Smallest |det| of the UV system still treated as solvable.
const MIN_UV_DETERMINANT: f32 = 1e-12;

/// Scene-wide attribute buffers the triangles index into.
#[derive(Clone, Copy)]
pub struct Attributes<'a> {
    pub positions: &'a [Vec3],
    pub normals: &'a [Vec3],
    pub uvs: &'a [Vec2],
}

/// Tangent (`xyz`) and bitangent sign (`w`) for one face, or `None` when the
/// UV mapping of the face is degenerate.
pub fn face_tangent(p: [Vec3; 3], uv: [Vec2; 3]) -> Option<(Vec3, Vec3)> {
    let e1 = p[1] - p[0];
    let e2 = p[2] - p[0];
    let d1 = uv[1] - uv[0];
    let d2 = uv[2] - uv[0];

    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() < MIN_UV_DETERMINANT || !det.is_finite() {
        return None;
    }
    let r = det.recip();
    let tangent = (e1 * d2.y - e2 * d1.y) * r;
    let bitangent = (e2 * d1.x - e1 * d2.x) * r;
    Some((tangent, bitangent))
}

/// One tangent per vertex in `vertices`, in vertex order.
///
/// `triangles` must only reference vertices inside `vertices` and have all UV
/// indices set; corners without UVs contribute nothing.
pub fn compute_tangents(attrs: Attributes<'_>, triangles: &[Triangle], vertices: Range<usize>) -> Vec<Vec4> {
    let count = vertices.len();
    let mut tan = vec![Vec3::ZERO; count];
    let mut bitan = vec![Vec3::ZERO; count];
    let mut vert_normal = vec![Vec3::ZERO; count];

    for tri in triangles {
        let local = tri.verts.map(|v| v - vertices.start);
        for (corner, &v) in local.iter().enumerate() {
            vert_normal[v] = attrs.normals[tri.norms[corner]];
        }

        let [Some(u0), Some(u1), Some(u2)] = tri.uvs else {
            continue;
        };
        let p = tri.verts.map(|v| attrs.positions[v]);
        let uv = [attrs.uvs[u0], attrs.uvs[u1], attrs.uvs[u2]];
        if let Some((t, b)) = face_tangent(p, uv) {
            for &v in &local {
                tan[v] += t;
                bitan[v] += b;
            }
        }
    }

    (0..count)
        .map(|i| orthogonalize(vert_normal[i], tan[i], bitan[i]))
        .collect()
}

/// Gram-Schmidt `t` against `n`; `w` holds the handedness of the frame.
fn orthogonalize(n: Vec3, t: Vec3, b: Vec3) -> Vec4 {
    let n = n.normalize_or_zero();
    let tangent = (t - n * n.dot(t))
        .try_normalize()
        .unwrap_or_else(|| fallback_tangent(n));
    let w = if n.cross(t).dot(b) < 0.0 { -1.0 } else { 1.0 };
    tangent.extend(w)
}

fn fallback_tangent(n: Vec3) -> Vec3 {
    if n == Vec3::ZERO {
        Vec3::X
    } else {
        n.any_orthonormal_vector()
    }
}
