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

//! Local topology operators: split, collapse, dissolve, rotate, face split,
//! winding reversal, and the integrity validator.
//!
//! All operators keep the two cycle structures (disk and radial) consistent
//! at every public return point. Invalid *requests* come back as
//! `MeshError`; inconsistencies found mid-operation are logged and repaired
//! where possible rather than propagated.

use ahash::{AHashMap, AHashSet};

use crate::error::MeshError;
use crate::mesh::core::{LogContext, Mesh, WALK_CAP};
use crate::mesh::element::{ElemType, LoopList, NONE};

impl Mesh {
    /// Insert a vertex at parametric position `t` along `e`. Every face
    /// using the edge gains a corner at the new vertex; customdata on the
    /// vertex and the new corners is blended at weights `{1-t, t}`. Wire
    /// edges split too.
    ///
    /// Returns `(new_vertex, new_edge)`, where the new edge spans from the
    /// new vertex to the old `v2`.
    pub fn split_edge(
        &mut self,
        e: usize,
        t: f64,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<(usize, usize), MeshError> {
        if !self.edges.is_alive(e) {
            return Err(MeshError::InvalidRequest("split_edge: edge is not alive"));
        }
        if !(0.0..=1.0).contains(&t) {
            return Err(MeshError::InvalidRequest("split_edge: t outside [0, 1]"));
        }
        let v1 = self.edges[e].v1;
        let v2 = self.edges[e].v2;

        let co = self.verts[v1].co.lerp(&self.verts[v2].co, t);
        let nv = self.make_vertex(co, lctx.as_deref_mut());
        self.verts.customdata_interp(nv, &[v1, v2], &[1.0 - t, t]);

        // Rewire e from (v1, v2) to (v1, nv); ne takes (nv, v2).
        self.disk_remove(e, v2);
        self.edges[e].v2 = nv;
        self.disk_insert(e, nv);
        let ne = self.make_edge(nv, v2, lctx.as_deref_mut())?;
        self.edges.customdata_interp(ne, &[e], &[1.0]);
        self.edges[ne].flag = self.edges[e].flag;

        for l in self.edge_loops(e) {
            let f = self.loops[l].f;
            let list = self.loops[l].list;
            let ln = self.loops[l].next;

            let nl = if self.loops[l].v == v1 {
                // l spans v1 -> nv on e; new corner at nv spans ne.
                let nl = self.make_loop(nv, ne, f, list);
                self.radial_insert(nl);
                self.loops.customdata_interp(nl, &[l, ln], &[1.0 - t, t]);
                nl
            } else {
                debug_assert_eq!(self.loops[l].v, v2, "loop not on split edge");
                // l now spans v2 -> nv, which is ne; new corner at nv keeps e.
                self.radial_remove(l);
                self.loops[l].e = ne;
                self.radial_insert(l);
                let nl = self.make_loop(nv, e, f, list);
                self.radial_insert(nl);
                self.loops.customdata_interp(nl, &[l, ln], &[t, 1.0 - t]);
                nl
            };

            self.loops[nl].next = ln;
            self.loops[nl].prev = l;
            self.loops[l].next = nl;
            self.loops[ln].prev = nl;
            self.lists[list].length += 1;
            self.recalc_face(f);
        }

        self.regen_tessellation();
        Ok((nv, ne))
    }

    /// Merge `e.v2` into `e.v1` at the midpoint. Faces using the edge lose
    /// their corner at `v2`; faces left with fewer than 3 corners are
    /// killed, as are duplicate edges produced by the merge. Returns the
    /// surviving vertex.
    pub fn collapse_edge(
        &mut self,
        e: usize,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<usize, MeshError> {
        if !self.edges.is_alive(e) {
            return Err(MeshError::InvalidRequest("collapse_edge: edge is not alive"));
        }
        let v1 = self.edges[e].v1;
        let v2 = self.edges[e].v2;
        if v1 == v2 {
            return Err(MeshError::InvalidRequest("collapse_edge: degenerate edge"));
        }

        self.verts.customdata_interp(v1, &[v1, v2], &[0.5, 0.5]);
        let mid = self.verts[v1].co.lerp(&self.verts[v2].co, 0.5);
        self.verts[v1].co = mid;

        // 1. Excise the corner at v2 from every face using e.
        for l in self.edge_loops(e) {
            if !self.loops.is_alive(l) {
                continue; // face already killed via an earlier radial entry
            }
            let f = self.loops[l].f;
            let list = self.loops[l].list;

            if self.loops[l].v == v2 {
                // l is the corner at v2; its predecessor already ends at v1
                // once the merge is done.
                self.radial_remove(l);
                let dp = self.loops[l].prev;
                let dn = self.loops[l].next;
                self.loops[dp].next = dn;
                self.loops[dn].prev = dp;
                if self.lists[list].l == l {
                    self.lists[list].l = dn;
                }
                let _ = self.loops.remove(l, false);
            } else {
                debug_assert_eq!(self.loops[l].v, v1, "loop not on collapsed edge");
                // The corner at v2 is l.next; l inherits its outgoing edge.
                let d = self.loops[l].next;
                let e2 = self.loops[d].e;
                self.radial_remove(d);
                self.radial_remove(l);
                self.loops[l].e = e2;
                self.radial_insert(l);
                let dn = self.loops[d].next;
                self.loops[l].next = dn;
                self.loops[dn].prev = l;
                if self.lists[list].l == d {
                    self.lists[list].l = l;
                }
                let _ = self.loops.remove(d, false);
            }

            self.lists[list].length -= 1;
            if self.lists[list].length < 3 {
                self.kill_face(f, lctx.as_deref_mut());
            } else {
                self.recalc_face(f);
            }
        }

        // 2. Drop e itself.
        if self.edges[e].l != NONE {
            log::warn!("collapse_edge: radial cycle not drained; repairing");
            self.edges[e].l = NONE;
        }
        self.disk_remove(e, v1);
        self.disk_remove(e, v2);
        let eeid = self.edges[e].eid;
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Edge, e, eeid);
        }
        let _ = self.edges.remove(e, false);

        // 3. Re-point surviving corners at v2.
        for e2 in self.vert_edges(v2) {
            for l in self.edge_loops(e2) {
                if self.loops[l].v == v2 {
                    self.loops[l].v = v1;
                }
            }
        }

        // 4. Re-point v2's remaining edges, merging or killing duplicates.
        for e2 in self.vert_edges(v2) {
            if !self.edges.is_alive(e2) {
                continue;
            }
            let other = self.edges[e2].other_vert(v2);
            if other == v1 {
                // A second v1-v2 edge becomes a self-edge; it and its faces go.
                self.kill_edge(e2, lctx.as_deref_mut());
                continue;
            }
            if let Some(dup) = self.get_edge(v1, other) {
                for l in self.edge_loops(e2) {
                    self.radial_remove(l);
                    self.loops[l].e = dup;
                    self.radial_insert(l);
                }
                self.disk_remove(e2, v2);
                self.disk_remove(e2, other);
                let eid2 = self.edges[e2].eid;
                if let Some(ctx) = lctx.as_deref_mut() {
                    ctx.on_kill(ElemType::Edge, e2, eid2);
                }
                let _ = self.edges.remove(e2, false);
            } else {
                self.disk_remove(e2, v2);
                if self.edges[e2].v1 == v2 {
                    self.edges[e2].v1 = v1;
                } else {
                    self.edges[e2].v2 = v1;
                }
                self.disk_insert(e2, v1);
            }
        }

        // 5. v2 is now isolated.
        let veid = self.verts[v2].eid;
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Vertex, v2, veid);
        }
        let _ = self.verts.remove(v2, false);

        self.regen_tessellation();
        Ok(v1)
    }

    /// Remove an edge shared by exactly two face uses, merging the faces.
    /// When both radial loops belong to the same face (an intruding edge
    /// bridging one contour), the contour splits into two loop lists
    /// instead: the second becomes a hole of the face.
    ///
    /// Returns the surviving face, or `None` when the merge would leave
    /// fewer than 3 corners and the geometry was killed instead.
    pub fn dissolve_edge(
        &mut self,
        e: usize,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<Option<usize>, MeshError> {
        if !self.edges.is_alive(e) {
            return Err(MeshError::InvalidRequest("dissolve_edge: edge is not alive"));
        }
        let radial = self.edge_loops(e);
        if radial.len() != 2 {
            return Err(MeshError::InvalidRequest(
                "dissolve_edge: edge must be used by exactly two face corners",
            ));
        }
        let (la, lb) = (radial[0], radial[1]);
        let fa = self.loops[la].f;
        let fb = self.loops[lb].f;

        if fa == fb {
            return self.dissolve_intruding_edge(e, la, lb, lctx);
        }

        let list_a = self.loops[la].list;
        let list_b = self.loops[lb].list;
        let merged_len = self.lists[list_a].length + self.lists[list_b].length - 2;
        if merged_len < 3 {
            self.kill_edge(e, lctx.as_deref_mut());
            return Ok(None);
        }

        let pa = self.loops[la].prev;
        let na = self.loops[la].next;
        let pb = self.loops[lb].prev;
        let nb = self.loops[lb].next;

        // Splice B's contour into A's in place of the shared pair.
        self.loops[pa].next = nb;
        self.loops[nb].prev = pa;
        self.loops[pb].next = na;
        self.loops[na].prev = pb;

        self.radial_remove(la);
        self.radial_remove(lb);
        let _ = self.loops.remove(la, false);
        let _ = self.loops.remove(lb, false);

        self.lists[list_a].l = na;
        self.lists[list_a].length = merged_len;

        // Adopt B's surviving loops.
        let mut l = nb;
        for _ in 0..WALK_CAP {
            if self.loops[l].f != fb {
                break;
            }
            self.loops[l].f = fa;
            self.loops[l].list = list_a;
            l = self.loops[l].next;
        }

        self.kill_edge_record(e, lctx.as_deref_mut());

        let _ = self.lists.remove(list_b, false);
        let fbeid = self.faces[fb].eid;
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Face, fb, fbeid);
        }
        let _ = self.faces.remove(fb, false);

        self.recalc_face(fa);
        self.regen_tessellation();
        Ok(Some(fa))
    }

    /// Intruding-edge variant: `la` and `lb` sit on the same contour.
    fn dissolve_intruding_edge(
        &mut self,
        e: usize,
        la: usize,
        lb: usize,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<Option<usize>, MeshError> {
        let f = self.loops[la].f;
        let list = self.loops[la].list;
        if self.loops[lb].list != list {
            return Err(MeshError::InvalidRequest(
                "dissolve_edge: loops of one face in different lists",
            ));
        }

        let pa = self.loops[la].prev;
        let na = self.loops[la].next;
        let pb = self.loops[lb].prev;
        let nb = self.loops[lb].next;

        self.radial_remove(la);
        self.radial_remove(lb);

        if na == lb || nb == la {
            // Spike: the bridge corners are adjacent; plain excision.
            let (p, n) = if na == lb { (pa, nb) } else { (pb, na) };
            self.loops[p].next = n;
            self.loops[n].prev = p;
            let _ = self.loops.remove(la, false);
            let _ = self.loops.remove(lb, false);
            self.lists[list].length -= 2;
            self.lists[list].l = n;
            self.kill_edge_record(e, lctx.as_deref_mut());
            if self.lists[list].length < 3 {
                self.kill_face(f, lctx.as_deref_mut());
                self.regen_tessellation();
                return Ok(None);
            }
            self.recalc_face(f);
            self.regen_tessellation();
            return Ok(Some(f));
        }

        // Ring 1 keeps the existing list; ring 2 becomes a hole contour.
        self.loops[pb].next = na;
        self.loops[na].prev = pb;
        self.loops[pa].next = nb;
        self.loops[nb].prev = pa;
        let _ = self.loops.remove(la, false);
        let _ = self.loops.remove(lb, false);

        let mut hole = LoopList::new();
        hole.eid = self.next_eid();
        hole.l = nb;
        let hidx = self.lists.push(hole).expect("fresh eid must be unique");
        self.faces[f].lists.push(hidx);

        self.lists[list].l = na;
        self.lists[list].length = self.recount_list(list);
        for l in self.list_loops(hidx) {
            self.loops[l].list = hidx;
        }
        self.lists[hidx].length = self.recount_list(hidx);

        self.kill_edge_record(e, lctx.as_deref_mut());
        self.recalc_face(f);
        self.regen_tessellation();
        Ok(Some(f))
    }

    /// Remove an edge whose radial cycle has already been detached.
    fn kill_edge_record(&mut self, e: usize, mut lctx: Option<&mut (dyn LogContext + '_)>) {
        debug_assert_eq!(self.edges[e].l, NONE, "radial cycle still populated");
        let (v1, v2) = (self.edges[e].v1, self.edges[e].v2);
        self.disk_remove(e, v1);
        self.disk_remove(e, v2);
        let eid = self.edges[e].eid;
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Edge, e, eid);
        }
        let _ = self.edges.remove(e, false);
    }

    fn recount_list(&self, list: usize) -> usize {
        self.list_loops(list).len()
    }

    /// Dissolve a vertex. An interior vertex (every incident edge used by
    /// exactly two faces) merges its whole star into one face, walking the
    /// star boundary to preserve winding. A valence-2 vertex merges its two
    /// edges into one, with or without incident faces.
    ///
    /// Returns the merged face for the interior case.
    pub fn dissolve_vertex(
        &mut self,
        v: usize,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<Option<usize>, MeshError> {
        if !self.verts.is_alive(v) {
            return Err(MeshError::InvalidRequest("dissolve_vertex: vertex is not alive"));
        }
        let edges = self.vert_edges(v);
        if edges.is_empty() {
            self.kill_vertex(v, lctx);
            return Ok(None);
        }
        if edges.len() == 2 {
            return self.dissolve_valence2(v, edges[0], edges[1], lctx).map(|_| None);
        }

        let faces = self.vert_faces(v);
        if faces.len() != edges.len()
            || edges.iter().any(|&e| self.edge_face_count(e) != 2)
        {
            return Err(MeshError::InvalidRequest(
                "dissolve_vertex: vertex is not interior",
            ));
        }

        // Walk the star boundary, face by face, to get the merged contour.
        let start_f = faces[0];
        let mut boundary = Vec::new();
        let mut f = start_f;
        for _ in 0..WALK_CAP {
            let lv = self
                .loop_of_vert_in_face(f, v)
                .ok_or(MeshError::InvalidRequest("dissolve_vertex: star walk failed"))?;
            let stop = self.loops[lv].prev;
            let mut l = self.loops[lv].next;
            while l != stop {
                boundary.push(self.loops[l].v);
                l = self.loops[l].next;
            }
            // Cross the incoming edge to the neighbouring face of the star.
            let partner = self.loops[stop].radial_next;
            f = self.loops[partner].f;
            if f == start_f {
                break;
            }
        }

        let saved_cd = self.faces[start_f].cd.clone();
        let saved_flag = self.faces[start_f].flag;
        self.kill_vertex(v, lctx.as_deref_mut());

        let nf = self.make_face(&boundary, lctx)?;
        self.faces[nf].cd = saved_cd;
        self.faces[nf].flag = saved_flag;
        self.recalc_face(nf);
        Ok(Some(nf))
    }

    /// Merge the two edges of a valence-2 vertex into one, excising the
    /// vertex's corner from every incident face.
    fn dissolve_valence2(
        &mut self,
        v: usize,
        e1: usize,
        e2: usize,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<(), MeshError> {
        let a = self.edges[e1].other_vert(v);
        let b = self.edges[e2].other_vert(v);
        if a == b {
            return Err(MeshError::InvalidRequest(
                "dissolve_vertex: valence-2 vertex closes a 2-cycle",
            ));
        }
        if self.get_edge(a, b).is_some() {
            return Err(MeshError::InvalidRequest(
                "dissolve_vertex: merged edge already exists",
            ));
        }

        // Excise the corner at v from each incident face.
        for f in self.vert_faces(v) {
            if !self.faces.is_alive(f) {
                continue;
            }
            let lv = match self.loop_of_vert_in_face(f, v) {
                Some(l) => l,
                None => continue,
            };
            let list = self.loops[lv].list;
            self.radial_remove(lv);
            let p = self.loops[lv].prev;
            let n = self.loops[lv].next;
            self.loops[p].next = n;
            self.loops[n].prev = p;
            if self.lists[list].l == lv {
                self.lists[list].l = n;
            }
            let _ = self.loops.remove(lv, false);
            self.lists[list].length -= 1;
            if self.lists[list].length < 3 {
                self.kill_face(f, lctx.as_deref_mut());
            } else {
                self.recalc_face(f);
            }
        }

        // Remaining loops on e2 move to e1, which is rewired to span a-b.
        for l in self.edge_loops(e2) {
            self.radial_remove(l);
            self.loops[l].e = e1;
            self.radial_insert(l);
        }
        self.edges.customdata_interp(e1, &[e1, e2], &[0.5, 0.5]);

        self.disk_remove(e1, v);
        if self.edges[e1].v1 == v {
            self.edges[e1].v1 = b;
        } else {
            self.edges[e1].v2 = b;
        }
        self.disk_insert(e1, b);

        self.disk_remove(e2, v);
        self.disk_remove(e2, b);
        let e2eid = self.edges[e2].eid;
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Edge, e2, e2eid);
        }
        let _ = self.edges.remove(e2, false);

        let veid = self.verts[v].eid;
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_kill(ElemType::Vertex, v, veid);
        }
        let _ = self.verts.remove(v, false);

        self.regen_tessellation();
        Ok(())
    }

    /// Edge flip: dissolve `e`, then re-split the merged face along the
    /// diagonal one corner over (direction chosen by `ccw`). The new edge
    /// inherits the old edge's eid and customdata.
    pub fn rotate_edge(
        &mut self,
        e: usize,
        ccw: bool,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<usize, MeshError> {
        if !self.edges.is_alive(e) {
            return Err(MeshError::InvalidRequest("rotate_edge: edge is not alive"));
        }
        let radial = self.edge_loops(e);
        if radial.len() != 2 {
            return Err(MeshError::InvalidRequest(
                "rotate_edge: edge must join exactly two faces",
            ));
        }
        let (la, lb) = (radial[0], radial[1]);
        if self.loops[la].f == self.loops[lb].f {
            return Err(MeshError::InvalidRequest("rotate_edge: edge intrudes one face"));
        }

        let pick = |m: &Mesh, l: usize| {
            if ccw {
                m.loops[m.loops[l].prev].v
            } else {
                m.loops[m.loops[m.loops[l].next].next].v
            }
        };
        let va = pick(self, la);
        let vb = pick(self, lb);
        if va == vb {
            return Err(MeshError::InvalidRequest("rotate_edge: degenerate rotation"));
        }

        let saved_eid = self.edges[e].eid;
        let saved_cd = self.edges[e].cd.clone();
        let saved_flag = self.edges[e].flag;

        let f = self
            .dissolve_edge(e, lctx.as_deref_mut())?
            .ok_or(MeshError::InvalidRequest("rotate_edge: faces degenerated"))?;

        let l1 = self
            .loop_of_vert_in_face(f, va)
            .ok_or(MeshError::InvalidRequest("rotate_edge: corner lost in merge"))?;
        let l2 = self
            .loop_of_vert_in_face(f, vb)
            .ok_or(MeshError::InvalidRequest("rotate_edge: corner lost in merge"))?;

        let (_nf, ne) = self.split_face(f, l1, l2, lctx)?;
        self.edges.set_eid(ne, saved_eid)?;
        self.edges[ne].cd = saved_cd;
        self.edges[ne].flag = saved_flag;
        Ok(ne)
    }

    /// Split a face along the chord between two of its corners, producing a
    /// new edge and a new face. The original face keeps the side starting
    /// at `l1`; holes stay with the original face.
    pub fn split_face(
        &mut self,
        f: usize,
        l1: usize,
        l2: usize,
        mut lctx: Option<&mut (dyn LogContext + '_)>,
    ) -> Result<(usize, usize), MeshError> {
        if !self.faces.is_alive(f) {
            return Err(MeshError::InvalidRequest("split_face: face is not alive"));
        }
        if l1 == l2 {
            return Err(MeshError::InvalidRequest("split_face: corners are identical"));
        }
        if self.loops[l1].f != f || self.loops[l2].f != f {
            return Err(MeshError::InvalidRequest("split_face: corner not on face"));
        }
        let list_f = *self
            .faces[f]
            .lists
            .first()
            .ok_or(MeshError::InvalidRequest("split_face: face has no contour"))?;
        if self.loops[l1].list != list_f || self.loops[l2].list != list_f {
            return Err(MeshError::InvalidRequest(
                "split_face: corners must be on the outer contour",
            ));
        }
        if self.loops[l1].next == l2
            || self.loops[l1].prev == l2
        {
            return Err(MeshError::InvalidRequest("split_face: corners are adjacent"));
        }

        let v1 = self.loops[l1].v;
        let v2 = self.loops[l2].v;
        let ne = self.ensure_edge(v1, v2, lctx.as_deref_mut())?;

        let p1 = self.loops[l1].prev;
        let p2 = self.loops[l2].prev;

        // New face and contour for the l2 side.
        let mut g = crate::mesh::element::Face::new();
        g.eid = self.next_eid();
        g.cd = self.faces[f].cd.clone();
        g.flag = self.faces[f].flag;
        let geid = g.eid;
        let gidx = self.faces.push(g).expect("fresh eid must be unique");

        let mut list_g = LoopList::new();
        list_g.eid = self.next_eid();
        let lg = self.lists.push(list_g).expect("fresh eid must be unique");
        self.faces[gidx].lists = smallvec::smallvec![lg];

        // Original face: l1 .. p2, closed by a corner at v2 over ne.
        let nl_f = self.make_loop(v2, ne, f, list_f);
        self.loops[p2].next = nl_f;
        self.loops[nl_f].prev = p2;
        self.loops[nl_f].next = l1;
        self.loops[l1].prev = nl_f;
        self.radial_insert(nl_f);
        self.loops.customdata_interp(nl_f, &[l2], &[1.0]);

        // New face: l2 .. p1, closed by a corner at v1 over ne.
        let nl_g = self.make_loop(v1, ne, gidx, lg);
        self.loops[p1].next = nl_g;
        self.loops[nl_g].prev = p1;
        self.loops[nl_g].next = l2;
        self.loops[l2].prev = nl_g;
        self.radial_insert(nl_g);
        self.loops.customdata_interp(nl_g, &[l1], &[1.0]);

        self.lists[list_f].l = l1;
        self.lists[lg].l = l2;
        for l in self.list_loops(lg) {
            self.loops[l].f = gidx;
            self.loops[l].list = lg;
        }
        self.lists[list_f].length = self.recount_list(list_f);
        self.lists[lg].length = self.recount_list(lg);

        self.recalc_face(f);
        self.recalc_face(gidx);
        if let Some(ctx) = lctx.as_deref_mut() {
            ctx.on_create(ElemType::Face, gidx, geid);
        }
        self.regen_tessellation();
        Ok((gidx, ne))
    }

    /// Flip the winding of every contour of `f` and negate its normal.
    /// Loop edges and radial links are rebuilt to match the new direction.
    pub fn reverse_winding(&mut self, f: usize) -> Result<(), MeshError> {
        if !self.faces.is_alive(f) {
            return Err(MeshError::InvalidRequest("reverse_winding: face is not alive"));
        }
        let lists: Vec<usize> = self.faces[f].lists.iter().copied().collect();
        for list in lists {
            let loops = self.list_loops(list);
            // After reversal, each corner spans to its old predecessor,
            // so it takes the predecessor's edge.
            let new_edges: Vec<usize> =
                loops.iter().map(|&l| self.loops[self.loops[l].prev].e).collect();
            for &l in &loops {
                self.radial_remove(l);
            }
            for (i, &l) in loops.iter().enumerate() {
                let old_next = self.loops[l].next;
                let old_prev = self.loops[l].prev;
                self.loops[l].next = old_prev;
                self.loops[l].prev = old_next;
                self.loops[l].e = new_edges[i];
            }
            for &l in &loops {
                self.radial_insert(l);
            }
        }
        self.faces[f].no = -self.faces[f].no;
        self.regen_tessellation();
        Ok(())
    }

    /// Integrity pass: detects duplicate edges for one vertex pair, stale
    /// loop->edge links, radial cycles out of sync with the loops that
    /// claim the edge, broken disk cycles, and loop-list length drift.
    /// Repairs what it finds and returns whether the mesh was already
    /// valid.
    pub fn validate(&mut self, mut lctx: Option<&mut (dyn LogContext + '_)>) -> bool {
        let mut valid = true;

        // Loop -> edge links must span (l.v, l.next.v).
        for l in self.loops.indices() {
            if !self.loops.is_alive(l) {
                continue;
            }
            let nv = self.loops[self.loops[l].next].v;
            let lv = self.loops[l].v;
            let le = self.loops[l].e;
            let ok = self.edges.is_alive(le)
                && self.edges[le].has_vert(lv)
                && self.edges[le].other_vert(lv) == nv;
            if !ok {
                valid = false;
                log::warn!("validate: loop {} has stale edge link; repairing", l);
                match self.get_edge(lv, nv) {
                    Some(e) => self.loops[l].e = e,
                    None => match self.push_edge(lv, nv, lctx.as_deref_mut()) {
                        Ok(e) => self.loops[l].e = e,
                        Err(err) => {
                            log::warn!("validate: cannot repair loop {}: {}", l, err);
                        }
                    },
                }
            }
        }

        // Duplicate edges over one unordered vertex pair.
        let mut seen: AHashMap<(usize, usize), usize> = AHashMap::new();
        for e in self.edges.indices() {
            if !self.edges.is_alive(e) {
                continue;
            }
            let (a, b) = (self.edges[e].v1, self.edges[e].v2);
            let key = (a.min(b), a.max(b));
            match seen.get(&key) {
                None => {
                    seen.insert(key, e);
                }
                Some(&first) => {
                    valid = false;
                    log::warn!("validate: duplicate edge {} over {:?}; merging into {}", e, key, first);
                    for l in self.edge_loops(e) {
                        self.radial_remove(l);
                        self.loops[l].e = first;
                        self.radial_insert(l);
                    }
                    self.edges[e].l = NONE;
                    self.kill_edge_record(e, lctx.as_deref_mut());
                }
            }
        }

        // Radial cycles must contain exactly the loops claiming the edge.
        let mut by_edge: AHashMap<usize, AHashSet<usize>> = AHashMap::new();
        for (l, lp) in self.loops.iter() {
            if lp.e != NONE {
                by_edge.entry(lp.e).or_default().insert(l);
            }
        }
        let mut radial_broken = false;
        for e in self.edges.indices() {
            let walked: AHashSet<usize> = self.edge_loops(e).into_iter().collect();
            let expected = by_edge.remove(&e).unwrap_or_default();
            if walked != expected {
                radial_broken = true;
                break;
            }
        }
        if radial_broken || !by_edge.is_empty() {
            valid = false;
            log::warn!("validate: radial cycles out of sync; rebuilding");
            for e in self.edges.indices() {
                self.edges[e].l = NONE;
            }
            for l in self.loops.indices() {
                self.loops[l].radial_next = NONE;
                self.loops[l].radial_prev = NONE;
            }
            for l in self.loops.indices() {
                let e = self.loops[l].e;
                if e != NONE && self.edges.is_alive(e) {
                    self.radial_insert(l);
                }
            }
        }

        // Disk cycles: every edge must be reachable from both endpoints.
        let mut disk_broken = false;
        'disks: for e in self.edges.indices() {
            for v in [self.edges[e].v1, self.edges[e].v2] {
                if !self.verts.is_alive(v) || !self.vert_edges(v).contains(&e) {
                    disk_broken = true;
                    break 'disks;
                }
            }
        }
        if disk_broken {
            valid = false;
            log::warn!("validate: disk cycles out of sync; rebuilding");
            for v in self.verts.indices() {
                self.verts[v].e = NONE;
            }
            for e in self.edges.indices() {
                self.edges[e].v1_next = NONE;
                self.edges[e].v1_prev = NONE;
                self.edges[e].v2_next = NONE;
                self.edges[e].v2_prev = NONE;
            }
            for e in self.edges.indices() {
                let (v1, v2) = (self.edges[e].v1, self.edges[e].v2);
                self.disk_insert(e, v1);
                self.disk_insert(e, v2);
            }
        }

        // Loop-list lengths; degenerate outer contours kill the face.
        for f in self.faces.indices() {
            if !self.faces.is_alive(f) {
                continue;
            }
            let lists: Vec<usize> = self.faces[f].lists.iter().copied().collect();
            let mut dead = false;
            for (i, list) in lists.iter().enumerate() {
                let actual = self.recount_list(*list);
                if self.lists[*list].length != actual {
                    valid = false;
                    log::warn!("validate: list {} length drift; recounting", list);
                    self.lists[*list].length = actual;
                }
                if i == 0 && actual < 3 {
                    valid = false;
                    log::warn!("validate: face {} outer contour degenerate; killing", f);
                    dead = true;
                }
            }
            if dead {
                self.kill_face(f, lctx.as_deref_mut());
            }
        }

        if !valid {
            self.regen_tessellation();
        }
        valid
    }
}
