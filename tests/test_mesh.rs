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

use loopy::math::Vec3;
use loopy::mesh::{ElemType, LogContext, Mesh, MeshFeatures, RecalcFlags};
use loopy::MeshError;

fn quad() -> (Mesh, [usize; 4], usize) {
    let mut m = Mesh::new();
    let a = m.make_vertex(Vec3::new(0.0, 0.0, 0.0), None);
    let b = m.make_vertex(Vec3::new(1.0, 0.0, 0.0), None);
    let c = m.make_vertex(Vec3::new(1.0, 1.0, 0.0), None);
    let d = m.make_vertex(Vec3::new(0.0, 1.0, 0.0), None);
    let f = m.make_quad(a, b, c, d, None).unwrap();
    (m, [a, b, c, d], f)
}

#[test]
fn quad_element_counts() {
    let (m, _, f) = quad();
    let s = m.stats();
    assert_eq!(s.verts, 4);
    assert_eq!(s.edges, 4);
    assert_eq!(s.loops, 4);
    assert_eq!(s.faces, 1);
    assert_eq!(m.face_vert_count(f), 4);
    for e in m.edges.indices() {
        assert!(m.is_boundary_edge(e));
        assert!(!m.is_wire_edge(e));
    }
}

#[test]
fn ensure_edge_reuses() {
    let (mut m, [a, b, _, _], _) = quad();
    let e = m.get_edge(a, b).unwrap();
    assert_eq!(m.get_edge(b, a), Some(e)); // unordered
    assert_eq!(m.ensure_edge(a, b, None).unwrap(), e);
    assert_eq!(m.stats().edges, 4);
}

#[test]
fn make_face_rejects_bad_input() {
    let mut m = Mesh::new();
    let a = m.make_vertex(Vec3::ZERO, None);
    let b = m.make_vertex(Vec3::new(1.0, 0.0, 0.0), None);
    assert!(matches!(
        m.make_face(&[a], None),
        Err(MeshError::InvalidRequest(_))
    ));
    assert!(matches!(
        m.make_face(&[a, a, b], None),
        Err(MeshError::InvalidRequest(_))
    ));
    assert!(matches!(
        m.make_tri(a, b, a, None),
        Err(MeshError::InvalidRequest(_))
    ));
}

#[test]
fn edges_only_mesh_refuses_faces() {
    let mut m = Mesh::with_features(MeshFeatures::EDGES_ONLY);
    let a = m.make_vertex(Vec3::ZERO, None);
    let b = m.make_vertex(Vec3::new(1.0, 0.0, 0.0), None);
    let c = m.make_vertex(Vec3::new(0.0, 1.0, 0.0), None);
    m.make_edge(a, b, None).unwrap();
    assert!(matches!(
        m.make_tri(a, b, c, None),
        Err(MeshError::FeatureUnsupported(_))
    ));
}

#[test]
fn eids_are_stable_and_never_recycled() {
    let (mut m, [a, _, _, _], _) = quad();
    let a_eid = m.verts[a].eid;
    assert_eq!(m.verts.lookup(a_eid), Some(a));

    m.kill_vertex(a, None);
    assert_eq!(m.verts.lookup(a_eid), None);
    assert!(m.verts.iter().all(|(_, v)| v.eid != a_eid));

    // The slot is recycled, the eid is not.
    let n = m.make_vertex(Vec3::ZERO, None);
    assert_eq!(n, a);
    assert_ne!(m.verts[n].eid, a_eid);
}

#[test]
fn kill_face_keeps_edges_and_verts() {
    let (mut m, _, f) = quad();
    m.kill_face(f, None);
    let s = m.stats();
    assert_eq!(s.faces, 0);
    assert_eq!(s.loops, 0);
    assert_eq!(s.edges, 4);
    assert_eq!(s.verts, 4);
    for e in m.edges.indices() {
        assert!(m.is_wire_edge(e));
    }
}

#[test]
fn kill_vertex_cascades() {
    let (mut m, [a, _, _, _], _) = quad();
    m.kill_vertex(a, None);
    let s = m.stats();
    assert_eq!(s.verts, 3);
    assert_eq!(s.faces, 0);
    assert_eq!(s.edges, 2); // the two edges not touching `a` survive
    assert!(m.validate(None));
}

#[test]
fn wire_edges_and_valence() {
    let mut m = Mesh::new();
    let a = m.make_vertex(Vec3::ZERO, None);
    let b = m.make_vertex(Vec3::new(1.0, 0.0, 0.0), None);
    let c = m.make_vertex(Vec3::new(2.0, 0.0, 0.0), None);
    let e1 = m.make_edge(a, b, None).unwrap();
    let e2 = m.make_edge(b, c, None).unwrap();
    assert!(m.is_wire_edge(e1));
    assert_eq!(m.vert_edge_count(b), 2);
    assert_eq!(m.vert_edges(b), vec![e1, e2]);
    assert_eq!(m.edge_face_count(e1), 0);
}

#[test]
fn compact_remaps_everything() {
    let (mut m, [a, b, c, d], f) = quad();
    // A second face so something survives the kill.
    let e2 = m.make_vertex(Vec3::new(2.0, 0.0, 0.0), None);
    let f2 = m.make_vertex(Vec3::new(2.0, 1.0, 0.0), None);
    m.make_quad(b, e2, f2, c, None).unwrap();
    m.kill_face(f, None);
    m.kill_vertex(a, None);
    m.kill_vertex(d, None);

    let eids_before: Vec<i64> = m.verts.iter().map(|(_, v)| v.eid).collect();
    m.compact();
    let eids_after: Vec<i64> = m.verts.iter().map(|(_, v)| v.eid).collect();
    assert_eq!(eids_before, eids_after);
    assert_eq!(m.stats().verts, 4);
    assert_eq!(m.stats().faces, 1);
    assert!(m.validate(None));
    // Dense after compaction: no tombstones left.
    assert_eq!(m.verts.slot_count(), m.stats().verts);
}

#[test]
fn update_indices_is_dense_and_ordered() {
    let (mut m, [a, _, _, _], _) = quad();
    m.kill_vertex(a, None);
    m.update_indices();
    let idx: Vec<u32> = m.verts.iter().map(|(_, v)| v.index).collect();
    assert_eq!(idx, vec![0, 1, 2]);
}

#[test]
fn make_hole_is_stubbed() {
    let (mut m, [a, b, _, _], f) = quad();
    assert!(m.make_hole(f, &[a, b]).is_err());
}

#[test]
fn recalc_flags_are_set_and_polled() {
    let (mut m, _, _) = quad();
    assert!(m.take_recalc(RecalcFlags::TESSELLATE));
    assert!(!m.take_recalc(RecalcFlags::TESSELLATE));
    m.make_vertex(Vec3::ZERO, None);
    assert!(m.take_recalc(RecalcFlags::TESSELLATE));
}

#[test]
fn single_shell_mesh_rejects_disconnected_geometry() {
    let mut m = Mesh::with_features(MeshFeatures::MAKE_FACE | MeshFeatures::SINGLE_SHELL);
    let a = m.make_vertex(Vec3::ZERO, None);
    let b = m.make_vertex(Vec3::new(1.0, 0.0, 0.0), None);
    let c = m.make_vertex(Vec3::new(1.0, 1.0, 0.0), None);
    m.make_tri(a, b, c, None).unwrap();

    // Neither a face nor a wire edge may start a second shell.
    let d = m.make_vertex(Vec3::new(5.0, 0.0, 0.0), None);
    let e = m.make_vertex(Vec3::new(6.0, 0.0, 0.0), None);
    let g = m.make_vertex(Vec3::new(6.0, 1.0, 0.0), None);
    assert!(matches!(
        m.make_tri(d, e, g, None),
        Err(MeshError::FeatureUnsupported(f)) if f == MeshFeatures::SINGLE_SHELL
    ));
    assert!(matches!(
        m.make_edge(d, e, None),
        Err(MeshError::FeatureUnsupported(f)) if f == MeshFeatures::SINGLE_SHELL
    ));

    // Touching the shell anywhere is enough, even through fresh vertices.
    m.make_tri(a, d, e, None).unwrap();
    m.make_edge(e, g, None).unwrap();
}

#[derive(Default)]
struct OpLog {
    created: Vec<(ElemType, i64)>,
    killed: Vec<(ElemType, i64)>,
}

impl LogContext for OpLog {
    fn on_create(&mut self, etype: ElemType, _slot: usize, eid: i64) {
        self.created.push((etype, eid));
    }
    fn on_kill(&mut self, etype: ElemType, _slot: usize, eid: i64) {
        self.killed.push((etype, eid));
    }
}

#[test]
fn one_log_context_serves_many_operations() {
    // A single logger reborrowed across a whole editing session, the way
    // an undo recorder holds it.
    let mut m = Mesh::new();
    let mut log = OpLog::default();
    let mut lctx: Option<&mut dyn LogContext> = Some(&mut log);

    let a = m.make_vertex(Vec3::ZERO, lctx.as_deref_mut());
    let b = m.make_vertex(Vec3::new(1.0, 0.0, 0.0), lctx.as_deref_mut());
    let c = m.make_vertex(Vec3::new(0.0, 1.0, 0.0), lctx.as_deref_mut());
    let f = m.make_tri(a, b, c, lctx.as_deref_mut()).unwrap();
    m.kill_face(f, lctx.as_deref_mut());
    drop(lctx);

    let verts = log.created.iter().filter(|(t, _)| *t == ElemType::Vertex).count();
    assert_eq!(verts, 3);
    assert!(log.created.iter().any(|(t, _)| *t == ElemType::Face));
    assert!(log.killed.iter().any(|(t, _)| *t == ElemType::Face));
}
