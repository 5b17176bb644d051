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

//! UV island builder: merges face corners into a UV mesh, flood-fills
//! islands, and packs them into the unit square.

use ahash::{AHashMap, AHashSet};
use rand::Rng;

use crate::error::MeshError;
use crate::math::{Aabb2, Vec2, Vec3};
use crate::mesh::customdata::{CustomDataType, CustomDataValue, UvSample};
use crate::mesh::element::{ElemFlags, UvFlags};
use crate::mesh::Mesh;
use crate::uv::island::UvIsland;
use crate::uv::UvSnapshot;

/// Gap kept between a packed island and its partition cell.
pub const PACK_MARGIN: f64 = 0.001;
/// Recursion cap for the partition packer.
const PACK_DEPTH: usize = 10;
/// Rotation samples searched over `[0, PI/2)` per island.
const PACK_ANGLES: usize = 16;

/// Read one corner's UV sample, tolerating a drifted attribute array.
pub(crate) fn loop_uv(mesh: &Mesh, uv_layer: usize, l: usize) -> UvSample {
    match mesh.loops[l].cd.get(uv_layer) {
        Some(CustomDataValue::Uv(s)) => *s,
        _ => {
            log::warn!("uv: loop {} missing uv sample in layer {}", l, uv_layer);
            UvSample::default()
        }
    }
}

/// Serialized wrangler state, rebuildable as long as every referenced
/// element eid still resolves and the snapshot key matches.
#[derive(Debug, Clone)]
pub struct WranglerState {
    snapshot: UvSnapshot,
    uv_layer: usize,
    face_eids: Vec<i64>,
    /// Per UV vertex: position, member loop eids, pin and selection marks.
    verts: Vec<(Vec2, Vec<i64>, bool, bool)>,
}

/// Builds and owns the transient UV mesh for a working set of faces.
///
/// UV-mesh vertex positions carry the coordinates; `finish` scatters them
/// back onto the loops' UV layer.
#[derive(Debug, Clone)]
pub struct UvWrangler {
    pub uvmesh: Mesh,
    pub faces: Vec<usize>,
    pub uv_layer: usize,
    pub islands: Vec<UvIsland>,

    loop_vert: AHashMap<usize, usize>,
    vert_loops: AHashMap<usize, Vec<usize>>,
    pinned: AHashSet<usize>,
    selected: AHashSet<usize>,
    corners: AHashSet<usize>,
    island_of: AHashMap<usize, usize>,
}

impl UvWrangler {
    pub fn new(mesh: &Mesh, faces: Vec<usize>, uv_layer_name: &str) -> Result<Self, MeshError> {
        let uv_layer = mesh
            .loops
            .layer_index(uv_layer_name)
            .ok_or_else(|| MeshError::MissingLayer(uv_layer_name.to_string()))?;
        if mesh.loops.layers[uv_layer].dtype != CustomDataType::Uv {
            return Err(MeshError::InvalidRequest("uv layer has a non-uv type"));
        }
        if faces.is_empty() {
            log::warn!("uv wrangler: empty face set; builders will be no-ops");
        }
        Ok(Self {
            uvmesh: Mesh::new(),
            faces,
            uv_layer,
            islands: Vec::new(),
            loop_vert: AHashMap::new(),
            vert_loops: AHashMap::new(),
            pinned: AHashSet::new(),
            selected: AHashSet::new(),
            corners: AHashSet::new(),
            island_of: AHashMap::new(),
        })
    }

    fn clear(&mut self) {
        self.uvmesh = Mesh::new();
        self.islands.clear();
        self.loop_vert.clear();
        self.vert_loops.clear();
        self.pinned.clear();
        self.selected.clear();
        self.corners.clear();
        self.island_of.clear();
    }

    #[inline]
    fn pos(&self, v: usize) -> Vec2 {
        let co = self.uvmesh.verts[v].co;
        Vec2::new(co.x, co.y)
    }

    fn attach(&mut self, l: usize, v: usize, flag: UvFlags) {
        self.loop_vert.insert(l, v);
        self.vert_loops.entry(v).or_default().push(l);
        if flag.contains(UvFlags::PIN) {
            self.pinned.insert(v);
        }
        if flag.contains(UvFlags::SELECT) {
            self.selected.insert(v);
        }
    }

    /// Merge corners by UV proximity. Each corner is compared against the
    /// *running average* position of nearby clusters through a uniform
    /// grid, so merge order affects the final averaged position; this is a
    /// deliberate approximation, not exact clustering.
    pub fn build_topology(&mut self, mesh: &Mesh, snap_threshold: f64) {
        self.clear();
        let snap = snap_threshold.max(1e-12);
        let cell = snap;
        let key = |p: Vec2| ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64);

        let mut grid: AHashMap<(i64, i64), Vec<usize>> = AHashMap::new();
        let mut counts: AHashMap<usize, f64> = AHashMap::new();

        for f in self.faces.clone() {
            if !mesh.faces.is_alive(f) {
                log::warn!("uv wrangler: face {} in working set is dead; skipping", f);
                continue;
            }
            for l in mesh.face_loops(f) {
                let s = loop_uv(mesh, self.uv_layer, l);
                let p = s.uv;
                let (kx, ky) = key(p);

                let mut found = None;
                'search: for dx in -1..=1 {
                    for dy in -1..=1 {
                        if let Some(cands) = grid.get(&(kx + dx, ky + dy)) {
                            for &uvv in cands {
                                if self.pos(uvv).distance_to(&p) <= snap {
                                    found = Some(uvv);
                                    break 'search;
                                }
                            }
                        }
                    }
                }

                let uvv = match found {
                    Some(uvv) => {
                        let n = counts[&uvv];
                        let avg = (self.pos(uvv) * n + p) / (n + 1.0);
                        self.uvmesh.verts[uvv].co = Vec3::new(avg.x, avg.y, 0.0);
                        counts.insert(uvv, n + 1.0);
                        uvv
                    }
                    None => {
                        let v = self.uvmesh.make_vertex(Vec3::new(p.x, p.y, 0.0), None);
                        grid.entry((kx, ky)).or_default().push(v);
                        counts.insert(v, 1.0);
                        v
                    }
                };
                self.attach(l, uvv, s.flag);
            }
        }

        self.build_uv_edges(mesh);
    }

    /// Seam-respecting builder: corners sharing a mesh vertex get one UV
    /// vertex per *wedge*, the set of corners reachable around the vertex
    /// without crossing a seam or boundary edge. Coincident UVs across a
    /// seam still split.
    pub fn build_topology_seam(&mut self, mesh: &Mesh) {
        self.clear();
        let face_set: AHashSet<usize> = self.faces.iter().copied().collect();
        let mut visited: AHashSet<usize> = AHashSet::new();

        for f in self.faces.clone() {
            if !mesh.faces.is_alive(f) {
                continue;
            }
            for l0 in mesh.face_loops(f) {
                if visited.contains(&l0) {
                    continue;
                }
                let v = mesh.loops[l0].v;
                let mut wedge = Vec::new();
                let mut stack = vec![l0];
                visited.insert(l0);
                while let Some(l) = stack.pop() {
                    wedge.push(l);
                    let e_out = mesh.loops[l].e;
                    let e_in = mesh.loops[mesh.loops[l].prev].e;
                    for e in [e_out, e_in] {
                        if mesh.edges[e].flag.contains(ElemFlags::SEAM)
                            || mesh.is_boundary_edge(e)
                        {
                            continue;
                        }
                        for l2 in mesh.edge_loops(e) {
                            let corner = if mesh.loops[l2].v == v {
                                l2
                            } else {
                                let n = mesh.loops[l2].next;
                                if mesh.loops[n].v == v { n } else { continue }
                            };
                            if !face_set.contains(&mesh.loops[corner].f) {
                                continue;
                            }
                            if visited.insert(corner) {
                                stack.push(corner);
                            }
                        }
                    }
                }

                let mut avg = Vec2::ZERO;
                for &l in &wedge {
                    avg += loop_uv(mesh, self.uv_layer, l).uv;
                }
                avg = avg / wedge.len() as f64;
                let uvv = self.uvmesh.make_vertex(Vec3::new(avg.x, avg.y, 0.0), None);
                for &l in &wedge {
                    let s = loop_uv(mesh, self.uv_layer, l);
                    self.attach(l, uvv, s.flag);
                }
            }
        }

        self.build_uv_edges(mesh);
    }

    /// Mirror original loop adjacency into UV-mesh edges.
    fn build_uv_edges(&mut self, mesh: &Mesh) {
        let pairs: Vec<(usize, usize)> = self
            .loop_vert
            .iter()
            .filter_map(|(&l, &a)| {
                let b = *self.loop_vert.get(&mesh.loops[l].next)?;
                (a != b).then_some((a, b))
            })
            .collect();
        for (a, b) in pairs {
            if let Err(err) = self.uvmesh.ensure_edge(a, b, None) {
                log::warn!("uv wrangler: cannot mirror edge: {}", err);
            }
        }
    }

    /// Flood-fill the UV mesh into islands and tag corner vertices (those
    /// incident to a seam or boundary edge of the original mesh).
    pub fn build_islands(&mut self, mesh: &Mesh) {
        self.islands.clear();
        self.island_of.clear();
        self.corners.clear();

        let mut visited: AHashSet<usize> = AHashSet::new();
        for v0 in self.uvmesh.verts.indices() {
            if !visited.insert(v0) {
                continue;
            }
            let mut verts = Vec::new();
            let mut stack = vec![v0];
            while let Some(v) = stack.pop() {
                verts.push(v);
                for e in self.uvmesh.vert_edges(v) {
                    let o = self.uvmesh.edges[e].other_vert(v);
                    if visited.insert(o) {
                        stack.push(o);
                    }
                }
            }

            let idx = self.islands.len();
            let mut isl = UvIsland::new(verts);
            isl.update_bounds(&self.uvmesh);
            isl.has_pins = isl.verts.iter().any(|v| self.pinned.contains(v));
            isl.has_sel_loops = isl.verts.iter().any(|v| self.selected.contains(v));
            for &v in &isl.verts {
                self.island_of.insert(v, idx);
            }
            self.islands.push(isl);
        }

        for (&l, &uvv) in &self.loop_vert {
            let e_out = mesh.loops[l].e;
            let e_in = mesh.loops[mesh.loops[l].prev].e;
            for e in [e_out, e_in] {
                if mesh.edges[e].flag.contains(ElemFlags::SEAM) || mesh.is_boundary_edge(e) {
                    self.corners.insert(uvv);
                }
            }
        }
    }

    /// Pack islands into the unit square: a 16-angle rotation search per
    /// island to shrink its bounding box, then a recursive binary partition
    /// of the square, placing the best-area-fit island (perturbed to avoid
    /// adversarial orderings) in each cell.
    pub fn pack_islands(&mut self, ignore_pinned: bool, only_sel_touched: bool) {
        let mut pending: Vec<usize> = (0..self.islands.len())
            .filter(|&i| {
                let isl = &self.islands[i];
                !isl.verts.is_empty()
                    && !(ignore_pinned && isl.has_pins)
                    && !(only_sel_touched && !isl.has_sel_loops)
            })
            .collect();
        if pending.is_empty() {
            return;
        }

        for &i in &pending {
            let mut best_angle = 0.0;
            let mut best_area = self.islands[i].bounds.area();
            for k in 1..PACK_ANGLES {
                let angle = k as f64 / PACK_ANGLES as f64 * std::f64::consts::FRAC_PI_2;
                let area = self.islands[i].rotated_bounds_area(&self.uvmesh, angle);
                if area < best_area {
                    best_area = area;
                    best_angle = angle;
                }
            }
            if best_angle != 0.0 {
                self.islands[i].rotate(&mut self.uvmesh, best_angle);
            }
        }

        let mut rng = rand::rng();
        let root = Aabb2::new(Vec2::ZERO, Vec2::new(1.0, 1.0));
        self.pack_recursive(root, &mut pending, 0, &mut rng);
    }

    fn pack_recursive(
        &mut self,
        rect: Aabb2,
        pending: &mut Vec<usize>,
        depth: usize,
        rng: &mut impl Rng,
    ) {
        if pending.is_empty() {
            return;
        }
        if !rect.is_valid() || rect.area() <= 1e-12 || depth >= PACK_DEPTH {
            // Out of room or depth: stack whatever is left into one cell.
            let cell = if rect.is_valid() && rect.area() > 1e-12 {
                rect
            } else {
                Aabb2::new(Vec2::ZERO, Vec2::new(1.0, 1.0))
            };
            for i in pending.drain(..) {
                self.islands[i].place_into(&mut self.uvmesh, &cell, PACK_MARGIN);
            }
            return;
        }

        let total: f64 = pending
            .iter()
            .map(|&i| self.islands[i].bounds.area().max(1e-12))
            .sum();
        let cell_area = rect.area();

        let mut best_k = 0;
        let mut best_score = f64::INFINITY;
        for (k, &i) in pending.iter().enumerate() {
            let share = self.islands[i].bounds.area().max(1e-12) / total;
            let noise = 1.0 + rng.random_range(-0.05..0.05);
            let score = (share * noise - cell_area).abs();
            if score < best_score {
                best_score = score;
                best_k = k;
            }
        }
        let idx = pending.swap_remove(best_k);

        let share = self.islands[idx].bounds.area().max(1e-12) / total;
        let target_area = if pending.is_empty() {
            cell_area
        } else {
            cell_area * share.min(1.0)
        };
        self.islands[idx].place_scaled(&mut self.uvmesh, &rect, PACK_MARGIN, target_area);

        let placed = self.islands[idx].bounds;
        let pw = (placed.size().x + 2.0 * PACK_MARGIN).min(rect.size().x);
        let ph = (placed.size().y + 2.0 * PACK_MARGIN).min(rect.size().y);
        let rem_x = rect.size().x - pw;
        let rem_y = rect.size().y - ph;

        let (r1, r2) = if rem_x >= rem_y {
            (
                Aabb2::new(Vec2::new(rect.min.x + pw, rect.min.y), rect.max),
                Aabb2::new(
                    Vec2::new(rect.min.x, rect.min.y + ph),
                    Vec2::new(rect.min.x + pw, rect.max.y),
                ),
            )
        } else {
            (
                Aabb2::new(Vec2::new(rect.min.x, rect.min.y + ph), rect.max),
                Aabb2::new(
                    Vec2::new(rect.min.x + pw, rect.min.y),
                    Vec2::new(rect.max.x, rect.min.y + ph),
                ),
            )
        };
        self.pack_recursive(r1, pending, depth + 1, rng);
        self.pack_recursive(r2, pending, depth + 1, rng);
    }

    /// Scatter UV-mesh positions back onto every member corner's UV sample,
    /// preserving per-corner flags.
    pub fn finish(&self, mesh: &mut Mesh) {
        for (&uvv, loops) in &self.vert_loops {
            let p = self.pos(uvv);
            for &l in loops {
                if !mesh.loops.is_alive(l) {
                    log::warn!("uv wrangler: loop {} died before finish", l);
                    continue;
                }
                match mesh.loops[l].cd.get_mut(self.uv_layer) {
                    Some(CustomDataValue::Uv(s)) => s.uv = p,
                    _ => log::warn!("uv wrangler: loop {} lost its uv sample", l),
                }
            }
        }
        mesh.regen_uv_editor();
    }

    // --- persistence across frames ----------------------------------------

    pub fn save(&self, mesh: &Mesh) -> WranglerState {
        let verts = self
            .uvmesh
            .verts
            .indices()
            .into_iter()
            .map(|v| {
                let loops = self
                    .vert_loops
                    .get(&v)
                    .map(|ls| ls.iter().map(|&l| mesh.loops[l].eid).collect())
                    .unwrap_or_default();
                (self.pos(v), loops, self.pinned.contains(&v), self.selected.contains(&v))
            })
            .collect();
        WranglerState {
            snapshot: UvSnapshot::capture(mesh, self.uv_layer, &self.faces),
            uv_layer: self.uv_layer,
            face_eids: self.faces.iter().map(|&f| mesh.faces[f].eid).collect(),
            verts,
        }
    }

    /// Rebuild a wrangler from saved state. Returns `None` (forcing the
    /// caller to build from scratch) when any face or loop eid no longer
    /// resolves or the UV/seam snapshot has drifted.
    pub fn restore(mesh: &Mesh, state: &WranglerState) -> Option<UvWrangler> {
        let mut faces = Vec::with_capacity(state.face_eids.len());
        for &eid in &state.face_eids {
            faces.push(mesh.faces.lookup(eid)?);
        }
        if UvSnapshot::capture(mesh, state.uv_layer, &faces) != state.snapshot {
            return None;
        }

        let mut w = UvWrangler {
            uvmesh: Mesh::new(),
            faces,
            uv_layer: state.uv_layer,
            islands: Vec::new(),
            loop_vert: AHashMap::new(),
            vert_loops: AHashMap::new(),
            pinned: AHashSet::new(),
            selected: AHashSet::new(),
            corners: AHashSet::new(),
            island_of: AHashMap::new(),
        };
        for (p, loop_eids, pinned, selected) in &state.verts {
            let v = w.uvmesh.make_vertex(Vec3::new(p.x, p.y, 0.0), None);
            for &leid in loop_eids {
                let l = mesh.loops.lookup(leid)?;
                w.loop_vert.insert(l, v);
                w.vert_loops.entry(v).or_default().push(l);
            }
            if *pinned {
                w.pinned.insert(v);
            }
            if *selected {
                w.selected.insert(v);
            }
        }
        w.build_uv_edges(mesh);
        w.build_islands(mesh);
        Some(w)
    }

    // --- solver-facing queries ---------------------------------------------

    #[inline]
    pub fn uv_vert_of_loop(&self, l: usize) -> Option<usize> {
        self.loop_vert.get(&l).copied()
    }

    pub fn loops_of_vert(&self, v: usize) -> &[usize] {
        self.vert_loops.get(&v).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn is_pinned(&self, v: usize) -> bool {
        self.pinned.contains(&v)
    }

    #[inline]
    pub fn is_corner(&self, v: usize) -> bool {
        self.corners.contains(&v)
    }

    #[inline]
    pub fn island_of(&self, v: usize) -> Option<usize> {
        self.island_of.get(&v).copied()
    }

    #[inline]
    pub fn vert_uv(&self, v: usize) -> Vec2 {
        self.pos(v)
    }

    pub fn set_vert_uv(&mut self, v: usize, p: Vec2) {
        self.uvmesh.verts[v].co.x = p.x;
        self.uvmesh.verts[v].co.y = p.y;
    }
}
