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

use loopy::math::{Aabb2, Vec2, Vec3};
use loopy::mesh::{
    CustomDataType, CustomDataValue, ElemFlags, LayerFlags, Mesh, UvFlags, UvSample,
};
use loopy::uv::UvWrangler;

/// 3x3 vertex grid (2x2 quads) in the z=0 plane, with a `"uv"` layer whose
/// corner samples start out at the vertex xy coordinates.
fn grid() -> (Mesh, Vec<Vec<usize>>, Vec<usize>) {
    let mut m = Mesh::new();
    let mut vs = vec![vec![0usize; 3]; 3];
    for y in 0..3 {
        for x in 0..3 {
            vs[y][x] = m.make_vertex(Vec3::new(x as f64, y as f64, 0.0), None);
        }
    }
    let mut faces = Vec::new();
    for y in 0..2 {
        for x in 0..2 {
            let f = m
                .make_quad(vs[y][x], vs[y][x + 1], vs[y + 1][x + 1], vs[y + 1][x], None)
                .unwrap();
            faces.push(f);
        }
    }
    let layer = m.loops.add_layer("uv", CustomDataType::Uv, LayerFlags::empty());
    for &f in &faces {
        for l in m.face_loops(f) {
            let co = m.verts[m.loops[l].v].co;
            *m.loops[l].cd.get_mut(layer).unwrap() = CustomDataValue::Uv(UvSample {
                uv: Vec2::new(co.x, co.y),
                flag: UvFlags::empty(),
            });
        }
    }
    (m, vs, faces)
}

fn seam_middle_column(m: &mut Mesh, vs: &[Vec<usize>]) {
    for y in 0..2 {
        let e = m.get_edge(vs[y][1], vs[y + 1][1]).unwrap();
        m.edges[e].flag.insert(ElemFlags::SEAM);
    }
}

fn loop_sample(m: &Mesh, l: usize) -> UvSample {
    let layer = m.loops.layer_index("uv").unwrap();
    match m.loops[l].cd.get(layer) {
        Some(CustomDataValue::Uv(s)) => *s,
        other => panic!("not a uv sample: {:?}", other),
    }
}

#[test]
fn missing_or_mistyped_layer_is_rejected() {
    let (mut m, _, faces) = grid();
    assert!(UvWrangler::new(&m, faces.clone(), "nope").is_err());
    m.loops.add_layer("bad", CustomDataType::Float, LayerFlags::empty());
    assert!(UvWrangler::new(&m, faces, "bad").is_err());
}

#[test]
fn proximity_merge_welds_shared_corners() {
    let (m, _, faces) = grid();
    let mut w = UvWrangler::new(&m, faces, "uv").unwrap();
    w.build_topology(&m, 1e-6);
    // 16 corners collapse onto the 9 grid positions.
    assert_eq!(w.uvmesh.stats().verts, 9);

    w.build_islands(&m);
    assert_eq!(w.islands.len(), 1);
    assert_eq!(w.islands[0].verts.len(), 9);
}

#[test]
fn seam_builder_splits_wedges() {
    let (mut m, vs, faces) = grid();
    seam_middle_column(&mut m, &vs);
    let mut w = UvWrangler::new(&m, faces, "uv").unwrap();
    w.build_topology_seam(&m);
    // The three middle-column vertices each get two wedges.
    assert_eq!(w.uvmesh.stats().verts, 12);

    w.build_islands(&m);
    assert_eq!(w.islands.len(), 2);
    for isl in &w.islands {
        assert_eq!(isl.verts.len(), 6);
    }

    // Both wedges at the grid center are seam corners.
    let center = vs[1][1];
    let faces_at_center: Vec<usize> = m.vert_faces(center);
    assert_eq!(faces_at_center.len(), 4);
    for f in faces_at_center {
        let l = m.loop_of_vert_in_face(f, center).unwrap();
        let uvv = w.uv_vert_of_loop(l).unwrap();
        assert!(w.is_corner(uvv));
    }
}

#[test]
fn seamless_mesh_is_one_island_even_with_wedges() {
    let (m, _, faces) = grid();
    let mut w = UvWrangler::new(&m, faces, "uv").unwrap();
    w.build_topology_seam(&m);
    w.build_islands(&m);
    assert_eq!(w.uvmesh.stats().verts, 9);
    assert_eq!(w.islands.len(), 1);
}

#[test]
fn pack_islands_stays_inside_unit_square() {
    let (mut m, vs, faces) = grid();
    seam_middle_column(&mut m, &vs);
    let mut w = UvWrangler::new(&m, faces, "uv").unwrap();
    w.build_topology_seam(&m);
    w.build_islands(&m);
    w.pack_islands(false, false);

    let unit = Aabb2::new(Vec2::ZERO, Vec2::new(1.0, 1.0));
    for isl in &w.islands {
        assert!(isl.bounds.is_valid());
        assert!(isl.bounds.area() > 0.0);
        assert!(isl.bounds.contained_in(&unit, 1e-6));
    }

    // The partition keeps placed islands disjoint, not just contained.
    for i in 0..w.islands.len() {
        for j in i + 1..w.islands.len() {
            assert!(
                !w.islands[i].bounds.overlaps(&w.islands[j].bounds, 0.0),
                "islands {} and {} overlap",
                i,
                j
            );
        }
    }
}

#[test]
fn finish_scatters_positions_and_keeps_flags() {
    let (mut m, vs, faces) = grid();
    let layer = m.loops.layer_index("uv").unwrap();
    let f0 = faces[0];
    let l0 = m.loop_of_vert_in_face(f0, vs[0][0]).unwrap();
    if let Some(CustomDataValue::Uv(s)) = m.loops[l0].cd.get_mut(layer) {
        s.flag = UvFlags::PIN;
    }

    let mut w = UvWrangler::new(&m, faces, "uv").unwrap();
    w.build_topology(&m, 1e-6);
    let uvv = w.uv_vert_of_loop(l0).unwrap();
    assert!(w.is_pinned(uvv));

    w.set_vert_uv(uvv, Vec2::new(0.25, 0.75));
    w.finish(&mut m);

    let s = loop_sample(&m, l0);
    assert!((s.uv.x - 0.25).abs() < 1e-12);
    assert!((s.uv.y - 0.75).abs() < 1e-12);
    assert!(s.flag.contains(UvFlags::PIN));
}

#[test]
fn restore_matches_then_rejects_drift() {
    let (mut m, vs, faces) = grid();
    let mut w = UvWrangler::new(&m, faces, "uv").unwrap();
    w.build_topology(&m, 1e-6);
    w.build_islands(&m);
    let state = w.save(&m);

    let restored = UvWrangler::restore(&m, &state).unwrap();
    assert_eq!(restored.uvmesh.stats().verts, w.uvmesh.stats().verts);
    assert_eq!(restored.islands.len(), w.islands.len());

    // A drifted corner UV invalidates the snapshot.
    let layer = m.loops.layer_index("uv").unwrap();
    let l0 = m.lists[m.faces[restored.faces[0]].lists[0]].l;
    if let Some(CustomDataValue::Uv(s)) = m.loops[l0].cd.get_mut(layer) {
        s.uv.x += 0.5;
    }
    assert!(UvWrangler::restore(&m, &state).is_none());

    // Putting it back revalidates.
    if let Some(CustomDataValue::Uv(s)) = m.loops[l0].cd.get_mut(layer) {
        s.uv.x -= 0.5;
    }
    assert!(UvWrangler::restore(&m, &state).is_some());

    // So does a seam edit.
    let e = m.get_edge(vs[0][0], vs[0][1]).unwrap();
    m.edges[e].flag.insert(ElemFlags::SEAM);
    assert!(UvWrangler::restore(&m, &state).is_none());
}
