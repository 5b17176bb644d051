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

//! Mesh ownership and the cycle-maintenance primitives every topology
//! operation is built from.
//!
//! Two circular structures carry all adjacency:
//! - the *disk* cycle: per endpoint, the edges incident to a vertex
//!   (`Edge::v1_next` …), entered through `Vertex::e`;
//! - the *radial* cycle: the loops of all faces sharing an edge
//!   (`Loop::radial_next` …), entered through `Edge::l`.
//!
//! Every circular walk carries an iteration cap; blowing the cap means
//! corrupted topology, which is logged and broken out of, never hung on.

use smallvec::smallvec;

use crate::error::MeshError;
use crate::math::Vec3;
use crate::mesh::element::{
    Edge, ElemType, Face, Loop, LoopList, MeshFeatures, NONE, RecalcFlags, Vertex,
};
use crate::mesh::elist::ElementList;
use crate::mesh::tessellate::LoopTri;

/// Cap on radial-cycle walks (faces per edge).
pub(crate) const RADIAL_CAP: usize = 1_000;
/// Cap on disk-cycle walks (edges per vertex).
pub(crate) const DISK_CAP: usize = 10_000;
/// Cap on loop-list and boundary walks.
pub(crate) const WALK_CAP: usize = 100_000;

/// Observer notified of element creation and destruction; the hook higher
/// undo/history layers attach through. Not a control-flow dependency.
pub trait LogContext {
    fn on_create(&mut self, etype: ElemType, slot: usize, eid: i64) {
        let _ = (etype, slot, eid);
    }
    fn on_kill(&mut self, etype: ElemType, slot: usize, eid: i64) {
        let _ = (etype, slot, eid);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshStats {
    pub verts: usize,
    pub edges: usize,
    pub loops: usize,
    pub faces: usize,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub verts: ElementList<Vertex>,
    pub edges: ElementList<Edge>,
    pub loops: ElementList<Loop>,
    pub lists: ElementList<LoopList>,
    pub faces: ElementList<Face>,

    pub features: MeshFeatures,
    pub recalc: RecalcFlags,

    pub(crate) looptris: Vec<LoopTri>,
    pub(crate) tri_ranges: ahash::AHashMap<usize, (usize, usize)>,

    eidgen: i64,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self::with_features(MeshFeatures::MAKE_FACE)
    }

    pub fn with_features(features: MeshFeatures) -> Self {
        Self {
            verts: ElementList::new(),
            edges: ElementList::new(),
            loops: ElementList::new(),
            lists: ElementList::new(),
            faces: ElementList::new(),
            features,
            recalc: RecalcFlags::all(),
            looptris: Vec::new(),
            tri_ranges: ahash::AHashMap::new(),
            eidgen: 0,
        }
    }

    pub(crate) fn next_eid(&mut self) -> i64 {
        let eid = self.eidgen;
        self.eidgen += 1;
        eid
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            verts: self.verts.len(),
            edges: self.edges.len(),
            loops: self.loops.len(),
            faces: self.faces.len(),
        }
    }

    // --- recalc flags ----------------------------------------------------

    pub fn regen_render(&mut self) {
        self.recalc.insert(RecalcFlags::RENDER);
    }

    pub fn regen_tessellation(&mut self) {
        self.recalc.insert(RecalcFlags::TESSELLATE | RecalcFlags::RENDER);
    }

    pub fn regen_uv_editor(&mut self) {
        self.recalc.insert(RecalcFlags::UV_EDITOR);
    }

    pub fn regen_bvh(&mut self) {
        self.recalc.insert(RecalcFlags::BVH);
    }

    pub(crate) fn regen_all(&mut self) {
        self.recalc = RecalcFlags::all();
    }

    /// Poll-and-clear for lazy consumers.
    pub fn take_recalc(&mut self, flags: RecalcFlags) -> bool {
        let hit = self.recalc.intersects(flags);
        self.recalc.remove(flags);
        hit
    }

    // --- disk cycle (edges around a vertex) ------------------------------

    #[inline]
    pub(crate) fn disk_next(&self, e: usize, v: usize) -> usize {
        let ed = &self.edges[e];
        if ed.v1 == v { ed.v1_next } else { ed.v2_next }
    }

    #[inline]
    pub(crate) fn disk_prev(&self, e: usize, v: usize) -> usize {
        let ed = &self.edges[e];
        if ed.v1 == v { ed.v1_prev } else { ed.v2_prev }
    }

    #[inline]
    fn set_disk_next(&mut self, e: usize, v: usize, val: usize) {
        let ed = &mut self.edges[e];
        if ed.v1 == v {
            ed.v1_next = val;
        } else {
            ed.v2_next = val;
        }
    }

    #[inline]
    fn set_disk_prev(&mut self, e: usize, v: usize, val: usize) {
        let ed = &mut self.edges[e];
        if ed.v1 == v {
            ed.v1_prev = val;
        } else {
            ed.v2_prev = val;
        }
    }

    pub(crate) fn disk_insert(&mut self, e: usize, v: usize) {
        debug_assert!(self.edges[e].has_vert(v));
        let first = self.verts[v].e;
        if first == NONE {
            self.verts[v].e = e;
            self.set_disk_next(e, v, e);
            self.set_disk_prev(e, v, e);
        } else {
            let last = self.disk_prev(first, v);
            self.set_disk_next(last, v, e);
            self.set_disk_prev(e, v, last);
            self.set_disk_next(e, v, first);
            self.set_disk_prev(first, v, e);
        }
    }

    pub(crate) fn disk_remove(&mut self, e: usize, v: usize) {
        let next = self.disk_next(e, v);
        let prev = self.disk_prev(e, v);
        if next == e {
            self.verts[v].e = NONE;
        } else {
            self.set_disk_next(prev, v, next);
            self.set_disk_prev(next, v, prev);
            if self.verts[v].e == e {
                self.verts[v].e = next;
            }
        }
        self.set_disk_next(e, v, NONE);
        self.set_disk_prev(e, v, NONE);
    }

    /// Edges incident to `v`, in disk order.
    pub fn vert_edges(&self, v: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let first = self.verts[v].e;
        if first == NONE {
            return out;
        }
        let mut e = first;
        for _ in 0..DISK_CAP {
            out.push(e);
            e = self.disk_next(e, v);
            if e == first || e == NONE {
                return out;
            }
        }
        log::warn!("disk cycle walk at vertex {} exceeded cap; topology corrupt", v);
        out
    }

    /// Valence.
    pub fn vert_edge_count(&self, v: usize) -> usize {
        self.vert_edges(v).len()
    }

    // --- radial cycle (loops around an edge) ------------------------------

    pub(crate) fn radial_insert(&mut self, l: usize) {
        let e = self.loops[l].e;
        let first = self.edges[e].l;
        if first == NONE {
            self.edges[e].l = l;
            self.loops[l].radial_next = l;
            self.loops[l].radial_prev = l;
        } else {
            let last = self.loops[first].radial_prev;
            self.loops[last].radial_next = l;
            self.loops[l].radial_prev = last;
            self.loops[l].radial_next = first;
            self.loops[first].radial_prev = l;
        }
    }

    pub(crate) fn radial_remove(&mut self, l: usize) {
        let e = self.loops[l].e;
        let next = self.loops[l].radial_next;
        let prev = self.loops[l].radial_prev;
        if next == l {
            if e != NONE && self.edges.is_alive(e) {
                self.edges[e].l = NONE;
            }
        } else {
            self.loops[prev].radial_next = next;
            self.loops[next].radial_prev = prev;
            if e != NONE && self.edges.is_alive(e) && self.edges[e].l == l {
                self.edges[e].l = next;
            }
        }
        self.loops[l].radial_next = NONE;
        self.loops[l].radial_prev = NONE;
    }

    /// All loops in `e`'s radial cycle (one per face using the edge).
    pub fn edge_loops(&self, e: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let first = self.edges[e].l;
        if first == NONE {
            return out;
        }
        let mut l = first;
        for _ in 0..RADIAL_CAP {
            out.push(l);
            l = self.loops[l].radial_next;
            if l == first || l == NONE {
                return out;
            }
        }
        log::warn!("radial cycle walk at edge {} exceeded cap; topology corrupt", e);
        out
    }

    /// Radial cycle length; equals the number of faces using the edge.
    pub fn edge_face_count(&self, e: usize) -> usize {
        self.edge_loops(e).len()
    }

    pub fn is_boundary_edge(&self, e: usize) -> bool {
        self.edge_face_count(e) < 2
    }

    pub fn is_wire_edge(&self, e: usize) -> bool {
        self.edges[e].l == NONE
    }

    // --- loop list walks --------------------------------------------------

    /// Loops of one contour, starting at the list's entry loop.
    pub fn list_loops(&self, list: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let first = self.lists[list].l;
        if first == NONE {
            return out;
        }
        let mut l = first;
        for _ in 0..WALK_CAP {
            out.push(l);
            l = self.loops[l].next;
            if l == first || l == NONE {
                return out;
            }
        }
        log::warn!("loop list walk at list {} exceeded cap; topology corrupt", list);
        out
    }

    /// Loops of the face's primary (outer) contour.
    pub fn face_loops(&self, f: usize) -> Vec<usize> {
        match self.faces[f].lists.first() {
            Some(&list) => self.list_loops(list),
            None => Vec::new(),
        }
    }

    /// Loops of all contours, holes included.
    pub fn face_all_loops(&self, f: usize) -> Vec<usize> {
        let lists: Vec<usize> = self.faces[f].lists.iter().copied().collect();
        let mut out = Vec::new();
        for list in lists {
            out.extend(self.list_loops(list));
        }
        out
    }

    pub fn face_verts(&self, f: usize) -> Vec<usize> {
        self.face_loops(f).iter().map(|&l| self.loops[l].v).collect()
    }

    pub fn face_vert_count(&self, f: usize) -> usize {
        match self.faces[f].lists.first() {
            Some(&list) => self.lists[list].length,
            None => 0,
        }
    }

    /// The corner of `f`'s outer contour sitting at vertex `v`, if any.
    pub fn loop_of_vert_in_face(&self, f: usize, v: usize) -> Option<usize> {
        self.face_loops(f).into_iter().find(|&l| self.loops[l].v == v)
    }

    /// Faces incident to `v`, via disk + radial walks.
    pub fn vert_faces(&self, v: usize) -> Vec<usize> {
        let mut seen = ahash::AHashSet::new();
        let mut out = Vec::new();
        for e in self.vert_edges(v) {
            for l in self.edge_loops(e) {
                let f = self.loops[l].f;
                if seen.insert(f) {
                    out.push(f);
                }
            }
        }
        out
    }

    // --- element factories ------------------------------------------------

    pub fn make_vertex(&mut self, co: Vec3, mut lctx: Option<&mut (dyn LogContext + '_)>) -> usize {
        let mut v = Vertex::new(co);
        v.eid = self.next_eid();
        let eid = v.eid;
        let idx = self.verts.push(v).expect("fresh eid must be unique");
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_create(ElemType::Vertex, idx, eid);
        }
        self.regen_tessellation();
        idx
    }

    /// Create an edge between two distinct live vertices. Duplicate-edge
    /// prevention is the caller's job; use `ensure_edge` to reuse. On a
    /// `SINGLE_SHELL` mesh the edge must touch the existing shell.
    pub fn make_edge(
        &mut self,
        v1: usize,
        v2: usize,
        lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<usize, MeshError> {
        if self.features.contains(MeshFeatures::SINGLE_SHELL)
            && !self.edges.is_empty()
            && self.verts.get(v1).is_some_and(|v| v.e == NONE)
            && self.verts.get(v2).is_some_and(|v| v.e == NONE)
        {
            return Err(MeshError::FeatureUnsupported(MeshFeatures::SINGLE_SHELL));
        }
        self.push_edge(v1, v2, lctx)
    }

    /// `make_edge` minus the shell check; `make_face` validates the whole
    /// ring up front, and `validate` repairs must never be feature-gated.
    pub(crate) fn push_edge(
        &mut self,
        v1: usize,
        v2: usize,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<usize, MeshError> {
        if v1 == v2 {
            return Err(MeshError::InvalidRequest("edge endpoints must differ"));
        }
        if !self.verts.is_alive(v1) || !self.verts.is_alive(v2) {
            return Err(MeshError::InvalidRequest("edge endpoint is not alive"));
        }
        let mut e = Edge::new(v1, v2);
        e.eid = self.next_eid();
        let eid = e.eid;
        let idx = self.edges.push(e).expect("fresh eid must be unique");
        self.disk_insert(idx, v1);
        self.disk_insert(idx, v2);
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_create(ElemType::Edge, idx, eid);
        }
        self.regen_tessellation();
        Ok(idx)
    }

    /// Find the unique edge between an unordered vertex pair.
    pub fn get_edge(&self, v1: usize, v2: usize) -> Option<usize> {
        let first = self.verts.get(v1)?.e;
        if first == NONE {
            return None;
        }
        let mut e = first;
        for _ in 0..DISK_CAP {
            if self.edges[e].other_vert(v1) == v2 {
                return Some(e);
            }
            e = self.disk_next(e, v1);
            if e == first || e == NONE {
                return None;
            }
        }
        log::warn!("get_edge: disk walk exceeded cap at vertex {}", v1);
        None
    }

    pub fn ensure_edge(
        &mut self,
        v1: usize,
        v2: usize,
        lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<usize, MeshError> {
        match self.get_edge(v1, v2) {
            Some(e) => Ok(e),
            None => self.make_edge(v1, v2, lctx),
        }
    }

    pub(crate) fn make_loop(&mut self, v: usize, e: usize, f: usize, list: usize) -> usize {
        let mut l = Loop::new(v);
        l.e = e;
        l.f = f;
        l.list = list;
        l.eid = self.next_eid();
        self.loops.push(l).expect("fresh eid must be unique")
    }

    /// Build a face over `verts` in order, reusing existing edges between
    /// consecutive pairs. Requires at least 2 vertices and no consecutive
    /// repeats.
    pub fn make_face(
        &mut self,
        verts: &[usize],
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<usize, MeshError> {
        if !self.features.contains(MeshFeatures::MAKE_FACE)
            || self.features.contains(MeshFeatures::EDGES_ONLY)
        {
            return Err(MeshError::FeatureUnsupported(MeshFeatures::MAKE_FACE));
        }
        if verts.len() < 2 {
            return Err(MeshError::InvalidRequest("face needs at least 2 vertices"));
        }
        let n = verts.len();
        for i in 0..n {
            if !self.verts.is_alive(verts[i]) {
                return Err(MeshError::InvalidRequest("face vertex is not alive"));
            }
            if verts[i] == verts[(i + 1) % n] {
                return Err(MeshError::InvalidRequest("consecutive duplicate face vertex"));
            }
        }
        // A SINGLE_SHELL mesh accepts a new face only if its ring touches
        // the existing shell somewhere.
        if self.features.contains(MeshFeatures::SINGLE_SHELL)
            && !self.edges.is_empty()
            && verts.iter().all(|&v| self.verts[v].e == NONE)
        {
            return Err(MeshError::FeatureUnsupported(MeshFeatures::SINGLE_SHELL));
        }

        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let (a, b) = (verts[i], verts[(i + 1) % n]);
            let e = match self.get_edge(a, b) {
                Some(e) => e,
                None => self.push_edge(a, b, lctx.as_deref_mut())?,
            };
            edges.push(e);
        }

        let mut face = Face::new();
        face.eid = self.next_eid();
        let feid = face.eid;
        let fidx = self.faces.push(face).expect("fresh eid must be unique");

        let mut list = LoopList::new();
        list.eid = self.next_eid();
        list.length = n;
        let lidx = self.lists.push(list).expect("fresh eid must be unique");
        self.faces[fidx].lists = smallvec![lidx];

        let mut loop_idx = Vec::with_capacity(n);
        for i in 0..n {
            loop_idx.push(self.make_loop(verts[i], edges[i], fidx, lidx));
        }
        for i in 0..n {
            let l = loop_idx[i];
            self.loops[l].next = loop_idx[(i + 1) % n];
            self.loops[l].prev = loop_idx[(i + n - 1) % n];
            self.radial_insert(l);
        }
        self.lists[lidx].l = loop_idx[0];

        self.recalc_face(fidx);
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_create(ElemType::Face, fidx, feid);
        }
        self.regen_tessellation();
        Ok(fidx)
    }

    pub fn make_tri(
        &mut self,
        v1: usize,
        v2: usize,
        v3: usize,
        lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<usize, MeshError> {
        if v1 == v2 || v2 == v3 || v1 == v3 {
            return Err(MeshError::InvalidRequest("duplicate vertices in triangle"));
        }
        self.make_face(&[v1, v2, v3], lctx)
    }

    pub fn make_quad(
        &mut self,
        v1: usize,
        v2: usize,
        v3: usize,
        v4: usize,
        lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<usize, MeshError> {
        self.make_face(&[v1, v2, v3, v4], lctx)
    }

    /// Hole contours are represented (`Face::lists` beyond the first) but
    /// not constructible yet.
    pub fn make_hole(&mut self, _f: usize, _verts: &[usize]) -> Result<usize, MeshError> {
        Err(MeshError::InvalidRequest("hole construction is not implemented"))
    }

    // --- destruction (cascading) -----------------------------------------

    pub fn kill_face(&mut self, f: usize, mut lctx: Option<&mut (dyn LogContext + '_)>) {
        let eid = self.faces[f].eid;
        let lists: Vec<usize> = self.faces[f].lists.iter().copied().collect();
        for list in lists {
            for l in self.list_loops(list) {
                self.radial_remove(l);
                let leid = self.loops[l].eid;
                if let Some(ctx) = lctx.as_deref_mut() {
                    ctx.on_kill(ElemType::Loop, l, leid);
                }
                let _ = self.loops.remove(l, false);
            }
            let _ = self.lists.remove(list, false);
        }
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Face, f, eid);
        }
        let _ = self.faces.remove(f, false);
        self.regen_tessellation();
    }

    pub fn kill_edge(&mut self, e: usize, mut lctx: Option<&mut (dyn LogContext + '_)>) {
        // Killing an edge takes its faces with it.
        let mut guard = 0;
        while self.edges[e].l != NONE {
            let f = self.loops[self.edges[e].l].f;
            self.kill_face(f, lctx.as_deref_mut());
            guard += 1;
            if guard > RADIAL_CAP {
                log::warn!("kill_edge: radial cycle did not drain; topology corrupt");
                break;
            }
        }
        let (v1, v2) = (self.edges[e].v1, self.edges[e].v2);
        self.disk_remove(e, v1);
        self.disk_remove(e, v2);
        let eid = self.edges[e].eid;
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Edge, e, eid);
        }
        let _ = self.edges.remove(e, false);
        self.regen_tessellation();
    }

    pub fn kill_vertex(&mut self, v: usize, mut lctx: Option<&mut (dyn LogContext + '_)>) {
        let mut guard = 0;
        while self.verts[v].e != NONE {
            let e = self.verts[v].e;
            self.kill_edge(e, lctx.as_deref_mut());
            guard += 1;
            if guard > DISK_CAP {
                log::warn!("kill_vertex: disk cycle did not drain; topology corrupt");
                break;
            }
        }
        let eid = self.verts[v].eid;
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Vertex, v, eid);
        }
        let _ = self.verts.remove(v, false);
        self.regen_tessellation();
    }

    // --- geometry caches --------------------------------------------------

    /// Recompute centroid, normal and area of one face. The normal is the
    /// normalized sum of per-corner cross products about the centroid, which
    /// stays sane for concave and mildly non-planar polygons.
    pub fn recalc_face(&mut self, f: usize) {
        let loops = self.face_loops(f);
        if loops.is_empty() {
            return;
        }
        let mut cent = Vec3::ZERO;
        for &l in &loops {
            cent += self.verts[self.loops[l].v].co;
        }
        cent = cent / loops.len() as f64;

        let mut no = Vec3::ZERO;
        let mut area = 0.0;
        for i in 0..loops.len() {
            let a = self.verts[self.loops[loops[i]].v].co - cent;
            let b = self.verts[self.loops[loops[(i + 1) % loops.len()]].v].co - cent;
            let c = a.cross(&b);
            no += c;
            area += c.length() * 0.5;
        }
        let face = &mut self.faces[f];
        face.cent = cent;
        face.no = no.normalized();
        face.area = area;
    }

    /// Rewrite all scratch `index` fields in list order.
    pub fn update_indices(&mut self) {
        let mut i = 0u32;
        for (_, v) in self.verts.iter_mut() {
            v.index = i;
            i += 1;
        }
        i = 0;
        for (_, e) in self.edges.iter_mut() {
            e.index = i;
            i += 1;
        }
        i = 0;
        for (_, l) in self.loops.iter_mut() {
            l.index = i;
            i += 1;
        }
        i = 0;
        for (_, f) in self.faces.iter_mut() {
            f.index = i;
            i += 1;
        }
    }

    /// Deep copy preserving eids. Layers flagged TEMPORARY are dropped.
    pub fn copy(&self) -> Mesh {
        use crate::mesh::customdata::LayerFlags;

        let mut out = self.clone();
        macro_rules! strip_temp {
            ($list:expr) => {
                let temp: Vec<usize> = $list
                    .layers
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| l.flags.contains(LayerFlags::TEMPORARY))
                    .map(|(i, _)| i)
                    .rev()
                    .collect();
                for i in temp {
                    let _ = $list.remove_layer(i);
                }
            };
        }
        strip_temp!(out.verts);
        strip_temp!(out.edges);
        strip_temp!(out.loops);
        strip_temp!(out.lists);
        strip_temp!(out.faces);
        out
    }

    /// Compact every arena and remap all cross-references. Invalidates any
    /// slot indices held by the caller.
    pub fn compact(&mut self) {
        let vmap = self.verts.compact();
        let emap = self.edges.compact();
        let lmap = self.loops.compact();
        let llmap = self.lists.compact();
        let fmap = self.faces.compact();

        let remap = |map: &Vec<usize>, idx: usize| if idx == NONE { NONE } else { map[idx] };

        for (_, v) in self.verts.iter_mut() {
            v.e = remap(&emap, v.e);
        }
        for (_, e) in self.edges.iter_mut() {
            e.v1 = remap(&vmap, e.v1);
            e.v2 = remap(&vmap, e.v2);
            e.l = remap(&lmap, e.l);
            e.v1_next = remap(&emap, e.v1_next);
            e.v1_prev = remap(&emap, e.v1_prev);
            e.v2_next = remap(&emap, e.v2_next);
            e.v2_prev = remap(&emap, e.v2_prev);
        }
        for (_, l) in self.loops.iter_mut() {
            l.v = remap(&vmap, l.v);
            l.e = remap(&emap, l.e);
            l.f = remap(&fmap, l.f);
            l.list = remap(&llmap, l.list);
            l.next = remap(&lmap, l.next);
            l.prev = remap(&lmap, l.prev);
            l.radial_next = remap(&lmap, l.radial_next);
            l.radial_prev = remap(&lmap, l.radial_prev);
        }
        for (_, ll) in self.lists.iter_mut() {
            ll.l = remap(&lmap, ll.l);
        }
        for (_, f) in self.faces.iter_mut() {
            for list in f.lists.iter_mut() {
                *list = remap(&llmap, *list);
            }
        }

        self.looptris.clear();
        self.tri_ranges.clear();
        self.regen_all();
    }
}
