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

//! One connected component of the UV mesh.

use crate::math::{Aabb2, Vec2};
use crate::mesh::Mesh;

/// A disjoint set of UV-mesh vertices, produced by the wrangler's flood
/// fill. Positions live in the UV mesh itself (`co.x`, `co.y`); the island
/// only carries membership and cached extents.
#[derive(Debug, Clone)]
pub struct UvIsland {
    pub verts: Vec<usize>,
    pub bounds: Aabb2,
    /// Any corner in the island carries `UvFlags::PIN`.
    pub has_pins: bool,
    /// Any corner in the island carries `UvFlags::SELECT`.
    pub has_sel_loops: bool,
}

impl UvIsland {
    pub fn new(verts: Vec<usize>) -> Self {
        Self {
            verts,
            bounds: Aabb2::empty(),
            has_pins: false,
            has_sel_loops: false,
        }
    }

    #[inline]
    fn pos(uvm: &Mesh, v: usize) -> Vec2 {
        let co = uvm.verts[v].co;
        Vec2::new(co.x, co.y)
    }

    pub fn update_bounds(&mut self, uvm: &Mesh) {
        let mut b = Aabb2::empty();
        for &v in &self.verts {
            b.grow(&Self::pos(uvm, v));
        }
        self.bounds = b;
    }

    /// Bounding-box area the island would have after rotating by `angle`
    /// about its current center; does not move anything.
    pub fn rotated_bounds_area(&self, uvm: &Mesh, angle: f64) -> f64 {
        let c = self.bounds.center();
        let mut b = Aabb2::empty();
        for &v in &self.verts {
            let p = (Self::pos(uvm, v) - c).rotated(angle) + c;
            b.grow(&p);
        }
        b.area()
    }

    /// Rotate the island in place about its bounds center.
    pub fn rotate(&mut self, uvm: &mut Mesh, angle: f64) {
        let c = self.bounds.center();
        for &v in &self.verts {
            let p = (Self::pos(uvm, v) - c).rotated(angle) + c;
            uvm.verts[v].co.x = p.x;
            uvm.verts[v].co.y = p.y;
        }
        self.update_bounds(uvm);
    }

    /// Uniformly scale and translate the island so it fits inside `rect`,
    /// anchored at the rect's min corner and inset by `margin`.
    pub fn place_into(&mut self, uvm: &mut Mesh, rect: &Aabb2, margin: f64) {
        let size = self.bounds.size();
        let avail = rect.size() - Vec2::new(2.0 * margin, 2.0 * margin);
        if size.x <= 0.0 && size.y <= 0.0 {
            // Point island: park it at the rect corner.
            for &v in &self.verts {
                uvm.verts[v].co.x = rect.min.x + margin;
                uvm.verts[v].co.y = rect.min.y + margin;
            }
            self.update_bounds(uvm);
            return;
        }
        let sx = if size.x > 0.0 { avail.x / size.x } else { f64::INFINITY };
        let sy = if size.y > 0.0 { avail.y / size.y } else { f64::INFINITY };
        let s = sx.min(sy).max(0.0);
        let org = self.bounds.min;
        for &v in &self.verts {
            let p = (Self::pos(uvm, v) - org) * s + rect.min + Vec2::new(margin, margin);
            uvm.verts[v].co.x = p.x;
            uvm.verts[v].co.y = p.y;
        }
        self.update_bounds(uvm);
    }

    /// Like `place_into`, but targets a bounding-box area of `target_area`
    /// instead of filling the rect; the scale is still capped so the island
    /// never escapes `rect`.
    pub fn place_scaled(&mut self, uvm: &mut Mesh, rect: &Aabb2, margin: f64, target_area: f64) {
        let size = self.bounds.size();
        let area = self.bounds.area();
        if area <= 0.0 {
            self.place_into(uvm, rect, margin);
            return;
        }
        let avail = rect.size() - Vec2::new(2.0 * margin, 2.0 * margin);
        let mut s = (target_area.max(0.0) / area).sqrt();
        if size.x > 0.0 {
            s = s.min(avail.x / size.x);
        }
        if size.y > 0.0 {
            s = s.min(avail.y / size.y);
        }
        let s = s.max(0.0);
        let org = self.bounds.min;
        for &v in &self.verts {
            let p = (Self::pos(uvm, v) - org) * s + rect.min + Vec2::new(margin, margin);
            uvm.verts[v].co.x = p.x;
            uvm.verts[v].co.y = p.y;
        }
        self.update_bounds(uvm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn island_with(points: &[(f64, f64)]) -> (Mesh, UvIsland) {
        let mut uvm = Mesh::new();
        let verts: Vec<usize> = points
            .iter()
            .map(|&(x, y)| uvm.make_vertex(Vec3::new(x, y, 0.0), None))
            .collect();
        let mut isl = UvIsland::new(verts);
        isl.update_bounds(&uvm);
        (uvm, isl)
    }

    #[test]
    fn place_into_respects_rect() {
        let (mut uvm, mut isl) = island_with(&[(3.0, 3.0), (7.0, 3.0), (7.0, 5.0)]);
        let rect = Aabb2::new(Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.5));
        isl.place_into(&mut uvm, &rect, 0.001);
        assert!(isl.bounds.contained_in(&rect, 1e-9));
    }

    #[test]
    fn rotation_search_prefers_axis_alignment() {
        // A thin diagonal strip has a smaller AABB once rotated by 45 deg.
        let (uvm, isl) = island_with(&[(0.0, 0.0), (1.0, 1.0), (1.1, 0.9)]);
        let straight = isl.rotated_bounds_area(&uvm, 0.0);
        let rotated = isl.rotated_bounds_area(&uvm, std::f64::consts::FRAC_PI_4);
        assert!(rotated < straight);
    }
}
