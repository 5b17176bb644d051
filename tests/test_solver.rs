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

use loopy::math::{Vec2, Vec3};
use loopy::mesh::{CustomDataType, CustomDataValue, LayerFlags, Mesh, UvFlags, UvSample};
use loopy::uv::UnwrapSolver;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 3x3 vertex grid (2x2 quads) with the center vertex raised by `peak`;
/// the `"uv"` layer starts at the vertex xy coordinates. With `peak > 0`
/// the flattened UVs cannot satisfy every 3D angle exactly ("tent").
fn sheet(peak: f64) -> (Mesh, Vec<Vec<usize>>, Vec<usize>) {
    let mut m = Mesh::new();
    let mut vs = vec![vec![0usize; 3]; 3];
    for y in 0..3 {
        for x in 0..3 {
            let z = if x == 1 && y == 1 { peak } else { 0.0 };
            vs[y][x] = m.make_vertex(Vec3::new(x as f64, y as f64, z), None);
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

fn tent() -> (Mesh, Vec<Vec<usize>>, Vec<usize>) {
    sheet(0.6)
}

fn all_finite(solver: &UnwrapSolver) -> bool {
    solver
        .wrangler
        .uvmesh
        .verts
        .indices()
        .into_iter()
        .all(|v| solver.wrangler.vert_uv(v).is_finite())
}

#[test]
fn start_builds_one_island_for_a_seamless_sheet() {
    let (mut m, _, faces) = tent();
    let mut solver = UnwrapSolver::new(&m, faces, "uv", false, false).unwrap();
    solver.start(&mut m);
    assert_eq!(solver.wrangler.islands.len(), 1);
    assert_eq!(solver.wrangler.uvmesh.stats().verts, 9);
    assert!(all_finite(&solver));
    assert!(solver.residual() > 0.0);
}

#[test]
fn relaxation_reduces_the_angle_residual() {
    let (mut m, _, faces) = tent();
    let mut solver = UnwrapSolver::new(&m, faces, "uv", false, false).unwrap();
    solver.start(&mut m);

    let r0 = solver.residual();
    solver.solve(50, UnwrapSolver::DEFAULT_GK);
    let r1 = solver.residual();

    // Momentum makes single iterations non-monotone, but fifty of them
    // should not make the tent worse.
    assert!(r1 <= r0 * 1.05 + 1e-9, "residual {} -> {}", r0, r1);
    assert!(all_finite(&solver));
}

#[test]
fn already_flat_sheet_stays_at_its_minimum() {
    // A planar sheet whose UVs already match its geometry starts at zero
    // angle error; neither the sweeps nor the smoothing pass may push it
    // away from that solution.
    let (mut m, _, faces) = sheet(0.0);
    let mut solver = UnwrapSolver::new(&m, faces, "uv", false, false).unwrap();
    solver.start(&mut m);

    let r0 = solver.residual();
    assert!(r0 < 1e-9, "flat sheet starts at residual {}", r0);
    solver.solve(50, UnwrapSolver::DEFAULT_GK);
    let r1 = solver.residual();
    assert!(r1 < 1e-6, "residual {} -> {}", r0, r1);
}

#[test]
fn distorted_seed_recovers_across_checkpoints() {
    let (mut m, _, faces) = sheet(0.0);
    let mut solver = UnwrapSolver::new(&m, faces, "uv", false, false).unwrap();
    solver.start(&mut m);

    // Jitter every UV vertex off the solved configuration.
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for v in solver.wrangler.uvmesh.verts.indices() {
        let p = solver.wrangler.vert_uv(v);
        let d = Vec2::new(rng.random_range(-0.1..0.1), rng.random_range(-0.1..0.1));
        solver.wrangler.set_vert_uv(v, p + d);
    }

    let mut checkpoints = vec![solver.residual()];
    assert!(checkpoints[0] > 0.1);
    for _ in 0..10 {
        solver.solve(10, UnwrapSolver::DEFAULT_GK);
        checkpoints.push(solver.residual());
    }
    for w in checkpoints.windows(2) {
        assert!(w[1] <= w[0] * 1.05 + 1e-9, "residual went {} -> {}", w[0], w[1]);
    }
    let first = checkpoints[0];
    let last = *checkpoints.last().unwrap();
    assert!(last < first * 0.5, "residual {} -> {}", first, last);
    assert!(all_finite(&solver));
}

#[test]
fn mirrored_preserved_islands_keep_their_orientation() {
    // preserve_islands skips re-projection, so a mirrored seed layout must
    // be taken as-is: its angle targets follow the UV winding instead of
    // flipping the island through itself.
    let (mut m, _, faces) = sheet(0.0);
    let layer = m.loops.layer_index("uv").unwrap();
    for &f in &faces {
        for l in m.face_loops(f) {
            if let Some(CustomDataValue::Uv(s)) = m.loops[l].cd.get_mut(layer) {
                s.uv.x = -s.uv.x;
            }
        }
    }

    let mut solver = UnwrapSolver::new(&m, faces, "uv", true, false).unwrap();
    solver.start(&mut m);
    let r0 = solver.residual();
    assert!(r0 < 1e-9, "mirrored flat sheet starts at residual {}", r0);
    solver.solve(20, UnwrapSolver::DEFAULT_GK);
    assert!(solver.residual() < 1e-6);
    assert!(all_finite(&solver));
}

#[test]
fn pinned_corners_never_move() {
    let (mut m, vs, faces) = tent();
    let layer = m.loops.layer_index("uv").unwrap();
    let f0 = faces[0];
    let l0 = m.loop_of_vert_in_face(f0, vs[0][0]).unwrap();
    if let Some(CustomDataValue::Uv(s)) = m.loops[l0].cd.get_mut(layer) {
        s.flag = UvFlags::PIN;
    }

    let mut solver = UnwrapSolver::new(&m, faces, "uv", false, false).unwrap();
    solver.start(&mut m);

    let uvv = solver.wrangler.uv_vert_of_loop(l0).unwrap();
    assert!(solver.wrangler.is_pinned(uvv));
    let before = solver.wrangler.vert_uv(uvv);
    solver.solve(25, UnwrapSolver::DEFAULT_GK);
    let after = solver.wrangler.vert_uv(uvv);
    assert_eq!(before.x, after.x);
    assert_eq!(before.y, after.y);
}

#[test]
fn nan_poison_is_scrubbed() {
    let (mut m, _, faces) = tent();
    let mut solver = UnwrapSolver::new(&m, faces, "uv", false, false).unwrap();
    solver.start(&mut m);

    let v = solver.wrangler.uvmesh.verts.indices()[0];
    solver.wrangler.set_vert_uv(v, Vec2::new(f64::NAN, f64::INFINITY));
    solver.step(UnwrapSolver::DEFAULT_GK);
    assert!(all_finite(&solver));
}

#[test]
fn finish_writes_packed_uvs_back() {
    let (mut m, _, faces) = tent();
    let layer = m.loops.layer_index("uv").unwrap();
    let mut solver = UnwrapSolver::new(&m, faces.clone(), "uv", false, false).unwrap();
    solver.start(&mut m);
    solver.solve(10, UnwrapSolver::DEFAULT_GK);
    solver.finish(&mut m);

    for &f in &faces {
        for l in m.face_loops(f) {
            match m.loops[l].cd.get(layer) {
                Some(CustomDataValue::Uv(s)) => {
                    assert!(s.uv.is_finite());
                    assert!(s.uv.x >= -1e-6 && s.uv.x <= 1.0 + 1e-6);
                    assert!(s.uv.y >= -1e-6 && s.uv.y <= 1.0 + 1e-6);
                }
                other => panic!("not a uv sample: {:?}", other),
            }
        }
    }
}

#[test]
fn saved_state_is_reused_until_the_mesh_drifts() {
    let (mut m, vs, faces) = tent();
    let mut solver = UnwrapSolver::new(&m, faces.clone(), "uv", false, false).unwrap();
    solver.start(&mut m);
    solver.solve(5, UnwrapSolver::DEFAULT_GK);
    let state = solver.save(&m);
    let verts_before = solver.wrangler.uvmesh.stats().verts;

    // Unchanged mesh: the snapshot matches and the solver is rebuilt from
    // the saved UV mesh instead of from scratch.
    let reused =
        UnwrapSolver::restore_or_rebuild(&mut m, faces.clone(), "uv", Some(&state), false, false)
            .unwrap();
    assert_eq!(reused.wrangler.uvmesh.stats().verts, verts_before);

    // Topology drift: restore falls back to a fresh start() and still
    // yields a working solver.
    let e = m.get_edge(vs[0][0], vs[0][1]).unwrap();
    m.split_edge(e, 0.5, None).unwrap();
    let faces2: Vec<usize> = m.faces.indices();
    let rebuilt =
        UnwrapSolver::restore_or_rebuild(&mut m, faces2, "uv", Some(&state), false, false).unwrap();
    assert!(rebuilt.wrangler.uvmesh.stats().verts > 0);
    assert!(all_finite(&rebuilt));
}
