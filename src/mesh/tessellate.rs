// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Lazy triangulation cache and derived normals.
//!
//! The triangle list is rebuilt on demand whenever a topology change has
//! raised `RecalcFlags::TESSELLATE`. Faces are fan-triangulated from their
//! first corner, which is exact for convex polygons and acceptable for the
//! mildly concave ones the rest of the crate produces.

use crate::math::Vec3;
use crate::mesh::core::Mesh;
use crate::mesh::customdata::{CustomDataType, CustomDataValue};
use crate::mesh::element::{ElemFlags, RecalcFlags};

/// Per-element normal override layer name (loops).
pub const LAYER_CUSTOM_NORMAL: &str = "custom_normal";

/// One triangle of a face's tessellation. Stores loop slots; vertex and
/// edge slots follow from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTri {
    pub f: usize,
    pub l: [usize; 3],
}

impl Mesh {
    /// Rebuild the triangle cache if a topology change invalidated it, then
    /// return it. Holes are not triangulated; only outer contours are.
    pub fn looptris(&mut self) -> &[LoopTri] {
        if self.take_recalc(RecalcFlags::TESSELLATE) || self.looptris.is_empty() {
            self.tessellate();
        }
        &self.looptris
    }

    /// Triangles of one face, as a range into the shared list. Empty for
    /// faces with fewer than 3 corners.
    pub fn face_tris(&mut self, f: usize) -> &[LoopTri] {
        if self.take_recalc(RecalcFlags::TESSELLATE) || self.looptris.is_empty() {
            self.tessellate();
        }
        match self.tri_ranges.get(&f) {
            Some(&(start, len)) => &self.looptris[start..start + len],
            None => &[],
        }
    }

    fn tessellate(&mut self) {
        self.looptris.clear();
        self.tri_ranges.clear();

        for f in self.faces.indices() {
            let loops = self.face_loops(f);
            if loops.len() < 3 {
                continue;
            }
            let start = self.looptris.len();
            for i in 1..loops.len() - 1 {
                self.looptris.push(LoopTri {
                    f,
                    l: [loops[0], loops[i], loops[i + 1]],
                });
            }
            self.tri_ranges.insert(f, (start, self.looptris.len() - start));
        }
    }

    /// Recompute every face normal/centroid/area and every vertex normal.
    /// A vertex normal is the normalized sum of its faces' normals; wire and
    /// isolated vertices keep the zero normal.
    pub fn recalc_normals(&mut self) {
        for f in self.faces.indices() {
            self.recalc_face(f);
        }
        for v in self.verts.indices() {
            let mut no = Vec3::ZERO;
            for f in self.vert_faces(v) {
                no += self.faces[f].no;
            }
            self.verts[v].no = no.normalized();
        }
    }

    /// Shading normal of a face corner: the `custom_normal` layer when set
    /// to a usable vector, else the face normal for FLAT faces, else the
    /// vertex normal.
    pub fn loop_normal(&self, l: usize) -> Vec3 {
        if let Some(layer) = self.loops.layer_index(LAYER_CUSTOM_NORMAL) {
            debug_assert_eq!(self.loops.layers[layer].dtype, CustomDataType::Vec3);
            if let Some(CustomDataValue::Vec3(n)) = self.loops[l].cd.get(layer) {
                if n.length() > 1e-12 && n.is_finite() {
                    return n.normalized();
                }
            }
        }
        let f = self.loops[l].f;
        if self.faces[f].flag.contains(ElemFlags::FLAT) {
            self.faces[f].no
        } else {
            self.verts[self.loops[l].v].no
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn quad() -> (Mesh, usize) {
        let mut m = Mesh::new();
        let a = m.make_vertex(Vec3::new(0.0, 0.0, 0.0), None);
        let b = m.make_vertex(Vec3::new(1.0, 0.0, 0.0), None);
        let c = m.make_vertex(Vec3::new(1.0, 1.0, 0.0), None);
        let d = m.make_vertex(Vec3::new(0.0, 1.0, 0.0), None);
        let f = m.make_quad(a, b, c, d, None).unwrap();
        (m, f)
    }

    #[test]
    fn quad_fans_into_two_triangles() {
        let (mut m, f) = quad();
        let tris: Vec<LoopTri> = m.looptris().to_vec();
        assert_eq!(tris.len(), 2);
        assert!(tris.iter().all(|t| t.f == f));

        let loops = m.face_loops(f);
        assert_eq!(tris[0].l, [loops[0], loops[1], loops[2]]);
        assert_eq!(tris[1].l, [loops[0], loops[2], loops[3]]);
        assert_eq!(m.face_tris(f).len(), 2);
    }

    #[test]
    fn cache_invalidates_on_topology_change() {
        let (mut m, _f) = quad();
        assert_eq!(m.looptris().len(), 2);

        let a = m.make_vertex(Vec3::new(2.0, 0.0, 0.0), None);
        let b = m.make_vertex(Vec3::new(3.0, 0.0, 0.0), None);
        let c = m.make_vertex(Vec3::new(3.0, 1.0, 0.0), None);
        m.make_tri(a, b, c, None).unwrap();
        assert_eq!(m.looptris().len(), 3);
    }

    #[test]
    fn planar_quad_normal_points_up() {
        let (mut m, f) = quad();
        m.recalc_normals();
        let no = m.faces[f].no;
        assert!((no.z - 1.0).abs() < 1e-12);
        assert!((m.faces[f].area - 1.0).abs() < 1e-12);
        for v in m.verts.indices() {
            assert!((m.verts[v].no.z - 1.0).abs() < 1e-12);
        }
    }
}
