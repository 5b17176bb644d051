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

//! Incremental unwrap solver: angle and area constraints relaxed by
//! momentum-damped Gauss-Seidel sweeps over each island.
//!
//! The solver is time-sliced: each `solve` call does a bounded amount of
//! work (a wall-clock budget of ~400 ms) and returns; callers keep calling
//! it from their frame loop and stop when satisfied.

use std::time::{Duration, Instant};

use ahash::{AHashMap, AHashSet};
use rand::Rng;

use crate::error::MeshError;
use crate::math::{Vec2, Vec3};
use crate::mesh::Mesh;
use crate::uv::wrangler::{UvWrangler, WranglerState};

/// Fold an angle difference into `(-PI, PI]`.
fn wrap_angle(mut x: f64) -> f64 {
    while x > std::f64::consts::PI {
        x -= std::f64::consts::TAU;
    }
    while x <= -std::f64::consts::PI {
        x += std::f64::consts::TAU;
    }
    x
}

/// Keeps the UV angle at corner `a` (between the rays to `b` and `c`)
/// near the corner's 3D interior angle, signed by triangle winding.
#[derive(Debug, Clone, Copy)]
struct AngleConstraint {
    a: usize,
    b: usize,
    c: usize,
    target: f64,
}

/// Keeps a triangle's signed UV area near its share of the island's area.
#[derive(Debug, Clone, Copy)]
struct AreaConstraint {
    verts: [usize; 3],
    target: f64,
}

#[derive(Debug, Clone, Default)]
struct IslandSystem {
    angles: Vec<AngleConstraint>,
    areas: Vec<AreaConstraint>,
}

/// Serialized solver identity; reusable across frames while the working
/// set and mode flags are unchanged and the wrangler state still resolves.
#[derive(Debug, Clone)]
pub struct SolverState {
    face_count: usize,
    preserve_islands: bool,
    sel_loops_only: bool,
    wrangler: WranglerState,
}

#[derive(Debug, Clone)]
pub struct UnwrapSolver {
    pub wrangler: UvWrangler,
    pub preserve_islands: bool,
    pub sel_loops_only: bool,

    systems: Vec<IslandSystem>,
    vel: AHashMap<usize, Vec2>,
    tri_count: usize,
    tick: usize,
}

impl UnwrapSolver {
    pub const DEFAULT_GK: f64 = 0.75;
    const MOMENTUM: f64 = 0.95;
    const TIME_BUDGET: Duration = Duration::from_millis(400);
    const PIN_SMOOTH_WEIGHT: f64 = 10_000.0;
    const CORNER_SMOOTH_WEIGHT: f64 = 2.0;
    const SMOOTH_BLEND: f64 = 0.1;
    /// Mean angle error (radians) at which the smoothing blend has decayed
    /// to half strength.
    const SMOOTH_FALLOFF: f64 = 0.05;
    /// Islands smaller than this skip the smoothing pass.
    const MIN_SMOOTH_ISLAND: usize = 5;

    pub fn new(
        mesh: &Mesh,
        faces: Vec<usize>,
        uv_layer_name: &str,
        preserve_islands: bool,
        sel_loops_only: bool,
    ) -> Result<Self, MeshError> {
        Ok(Self {
            wrangler: UvWrangler::new(mesh, faces, uv_layer_name)?,
            preserve_islands,
            sel_loops_only,
            systems: Vec::new(),
            vel: AHashMap::new(),
            tri_count: 0,
            tick: 0,
        })
    }

    /// Build topology and islands, give pinless islands a cheap initial
    /// flattening (projection onto the average face normal plane), pack,
    /// and assemble the constraint systems.
    pub fn start(&mut self, mesh: &mut Mesh) {
        self.wrangler.build_topology_seam(mesh);
        self.wrangler.build_islands(mesh);
        if !self.preserve_islands {
            self.project_islands(mesh);
            self.wrangler.pack_islands(true, self.sel_loops_only);
        }
        self.build_solver(mesh, true);
    }

    /// Flatten each pinless island by projecting its 3D geometry onto the
    /// plane of the island's average face normal.
    fn project_islands(&mut self, mesh: &Mesh) {
        for i in 0..self.wrangler.islands.len() {
            if self.wrangler.islands[i].has_pins {
                continue;
            }
            let verts = self.wrangler.islands[i].verts.clone();

            let mut faces: AHashSet<usize> = AHashSet::new();
            for &v in &verts {
                for &l in self.wrangler.loops_of_vert(v) {
                    faces.insert(mesh.loops[l].f);
                }
            }
            let mut n = Vec3::ZERO;
            for &f in &faces {
                n += mesh.faces[f].no;
            }
            let mut n = n.normalized();
            if n == Vec3::ZERO {
                n = Vec3::new(0.0, 0.0, 1.0);
            }
            let t1 = n.orthogonal();
            let t2 = n.cross(&t1).normalized();

            for &v in &verts {
                let loops = self.wrangler.loops_of_vert(v);
                if loops.is_empty() {
                    continue;
                }
                let mut p = Vec3::ZERO;
                for &l in loops {
                    p += mesh.verts[mesh.loops[l].v].co;
                }
                p = p / loops.len() as f64;
                self.wrangler.set_vert_uv(v, Vec2::new(p.dot(&t1), p.dot(&t2)));
            }
            self.wrangler.islands[i].update_bounds(&self.wrangler.uvmesh);
        }
    }

    /// One angle constraint per triangle corner (target: the corner's true
    /// 3D angle) and, when `include_area`, one area constraint per triangle
    /// (target: the triangle's share of the island's 3D area, expressed in
    /// the island's current UV area).
    pub fn build_solver(&mut self, mesh: &mut Mesh, include_area: bool) {
        let n_islands = self.wrangler.islands.len();
        self.systems = vec![IslandSystem::default(); n_islands];
        self.vel.clear();
        self.tri_count = 0;

        let face_set: AHashSet<usize> = self.wrangler.faces.iter().copied().collect();
        let tris: Vec<crate::mesh::LoopTri> = mesh.looptris().to_vec();

        // (island, uv verts, 3d corners, 3d area, uv winding sign)
        let mut records: Vec<(usize, [usize; 3], [Vec3; 3], f64, f64)> = Vec::new();
        let mut area3 = vec![0.0_f64; n_islands];
        let mut area_uv = vec![0.0_f64; n_islands];

        for tri in tris {
            if !face_set.contains(&tri.f) {
                continue;
            }
            let mut uvv = [0usize; 3];
            let mut ok = true;
            for (k, &l) in tri.l.iter().enumerate() {
                match self.wrangler.uv_vert_of_loop(l) {
                    Some(v) => uvv[k] = v,
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                continue;
            }
            let isl = match self.wrangler.island_of(uvv[0]) {
                Some(i)
                    if self.wrangler.island_of(uvv[1]) == Some(i)
                        && self.wrangler.island_of(uvv[2]) == Some(i) =>
                {
                    i
                }
                _ => {
                    log::warn!("unwrap: triangle straddles islands; skipping");
                    continue;
                }
            };

            let p: [Vec3; 3] = [
                mesh.verts[mesh.loops[tri.l[0]].v].co,
                mesh.verts[mesh.loops[tri.l[1]].v].co,
                mesh.verts[mesh.loops[tri.l[2]].v].co,
            ];
            let a3 = (p[1] - p[0]).cross(&(p[2] - p[0])).length() * 0.5;

            let q: Vec<Vec2> = uvv.iter().map(|&v| self.wrangler.vert_uv(v)).collect();
            let wind = (q[1] - q[0]).cross(&(q[2] - q[0]));
            let auv = (wind * 0.5).abs();
            // Mirrored islands (possible when pins or preserve_islands skip
            // re-projection) keep their orientation; the targets take the
            // triangle's current UV winding rather than flipping it through
            // itself.
            let sign = if wind < 0.0 { -1.0 } else { 1.0 };

            area3[isl] += a3;
            area_uv[isl] += auv;
            records.push((isl, uvv, p, a3, sign));
        }

        for (isl, uvv, p, a3, sign) in records {
            let sys = &mut self.systems[isl];
            for k in 0..3 {
                let (a, b, c) = (uvv[k], uvv[(k + 1) % 3], uvv[(k + 2) % 3]);
                let db = p[(k + 1) % 3] - p[k];
                let dc = p[(k + 2) % 3] - p[k];
                let denom = db.length() * dc.length();
                if denom < 1e-30 {
                    continue; // degenerate corner; nothing to target
                }
                let target = sign * (db.dot(&dc) / denom).clamp(-1.0, 1.0).acos();
                sys.angles.push(AngleConstraint { a, b, c, target });
            }
            if include_area && area3[isl] > 1e-30 {
                sys.areas.push(AreaConstraint {
                    verts: uvv,
                    target: a3 / area3[isl] * area_uv[isl],
                });
            }
            self.tri_count += 1;
        }
    }

    fn sweeps(&self) -> usize {
        match self.tri_count {
            n if n > 5000 => 1,
            n if n > 1000 => 2,
            _ => 4,
        }
    }

    /// Advance the relaxation by up to `count` iterations, bounded by the
    /// wall-clock budget. `gk` is the constraint gain (default 0.75).
    pub fn solve(&mut self, count: usize, gk: f64) {
        let start = Instant::now();
        let sweeps = self.sweeps();
        for i in 0..count {
            if i > 0 && start.elapsed() >= Self::TIME_BUDGET {
                log::debug!("unwrap: time budget hit after {} iterations", i);
                break;
            }
            self.iterate(sweeps, gk);
        }
    }

    /// A single iteration; convenience for frame loops driving the solver
    /// one tick at a time.
    pub fn step(&mut self, gk: f64) {
        let sweeps = self.sweeps();
        self.iterate(sweeps, gk);
    }

    fn iterate(&mut self, sweeps: usize, gk: f64) {
        let verts = self.wrangler.uvmesh.verts.indices();
        let mut prev: AHashMap<usize, Vec2> = AHashMap::with_capacity(verts.len());
        for &v in &verts {
            prev.insert(v, self.wrangler.vert_uv(v));
        }

        // Momentum from the previous iteration, damped.
        for &v in &verts {
            if self.wrangler.is_pinned(v) {
                continue;
            }
            if let Some(&d) = self.vel.get(&v) {
                let p = self.wrangler.vert_uv(v) + d * Self::MOMENTUM;
                self.wrangler.set_vert_uv(v, p);
            }
        }

        for _ in 0..sweeps {
            for si in 0..self.systems.len() {
                let angles = std::mem::take(&mut self.systems[si].angles);
                for c in &angles {
                    self.apply_angle(c, gk);
                }
                self.systems[si].angles = angles;

                let areas = std::mem::take(&mut self.systems[si].areas);
                for c in &areas {
                    self.apply_area(c, gk);
                }
                self.systems[si].areas = areas;
            }
        }

        self.tick += 1;
        if self.tick % 4 == 0 {
            self.smooth();
        }
        self.nan_guard();

        for &v in &verts {
            let d = self.wrangler.vert_uv(v) - prev[&v];
            self.vel.insert(v, d);
        }
    }

    /// Projection step for one corner angle. All three vertices move along
    /// the angle's position gradient, scaled so one application at `gk = 1`
    /// removes the error exactly; constraints sharing vertices then compose
    /// instead of fighting a fixed corner.
    fn apply_angle(&mut self, c: &AngleConstraint, gk: f64) {
        let pa = self.wrangler.vert_uv(c.a);
        let pb = self.wrangler.vert_uv(c.b);
        let pc = self.wrangler.vert_uv(c.c);
        let db = pb - pa;
        let dc = pc - pa;
        let lb2 = db.dot(&db);
        let lc2 = dc.dot(&dc);
        if lb2 < 1e-24 || lc2 < 1e-24 {
            return;
        }
        let cur = db.cross(&dc).atan2(db.dot(&dc));
        let err = wrap_angle(cur - c.target);
        if err == 0.0 {
            return;
        }

        // d(angle)/d(position) per vertex; the angle is the atan2 bearing
        // of dc minus that of db.
        let gb = Vec2::new(db.y, -db.x) / lb2;
        let gc = Vec2::new(-dc.y, dc.x) / lc2;
        let ga = -(gb + gc);

        let free_a = !self.wrangler.is_pinned(c.a);
        let free_b = !self.wrangler.is_pinned(c.b);
        let free_c = !self.wrangler.is_pinned(c.c);
        let mut denom = 0.0;
        if free_a {
            denom += ga.dot(&ga);
        }
        if free_b {
            denom += gb.dot(&gb);
        }
        if free_c {
            denom += gc.dot(&gc);
        }
        if denom < 1e-30 {
            return;
        }

        let s = gk * err / denom;
        if free_a {
            self.wrangler.set_vert_uv(c.a, pa - ga * s);
        }
        if free_b {
            self.wrangler.set_vert_uv(c.b, pb - gb * s);
        }
        if free_c {
            self.wrangler.set_vert_uv(c.c, pc - gc * s);
        }
    }

    fn apply_area(&mut self, c: &AreaConstraint, gk: f64) {
        let p: Vec<Vec2> = c.verts.iter().map(|&v| self.wrangler.vert_uv(v)).collect();
        let area = (p[1] - p[0]).cross(&(p[2] - p[0])) * 0.5;
        if !area.is_finite() {
            return;
        }
        let s_full = (c.target.abs() / area.abs().max(1e-12)).sqrt();
        let s = 1.0 + gk * 0.25 * (s_full - 1.0);
        let cent = (p[0] + p[1] + p[2]) / 3.0;
        for (k, &v) in c.verts.iter().enumerate() {
            if self.wrangler.is_pinned(v) {
                continue;
            }
            self.wrangler.set_vert_uv(v, cent + (p[k] - cent) * s);
        }
    }

    /// Laplacian pass pulling each free vertex toward the weighted average
    /// of its neighbors; pinned neighbors weigh so much they effectively
    /// clamp adjacent vertices, seam/boundary corners weigh a little more
    /// than interior ones.
    ///
    /// The blend decays with the island's mean angle error, so a satisfied
    /// island is left alone instead of being smoothed away from its
    /// solution.
    fn smooth(&mut self) {
        for i in 0..self.wrangler.islands.len() {
            if self.wrangler.islands[i].verts.len() < Self::MIN_SMOOTH_ISLAND {
                continue;
            }
            let angles = match self.systems.get(i) {
                Some(sys) if !sys.angles.is_empty() => &sys.angles,
                _ => continue,
            };
            let mut err = 0.0;
            for c in angles {
                err += self.angle_error(c).abs();
            }
            let mean = err / angles.len() as f64;
            let blend = Self::SMOOTH_BLEND * (mean / (mean + Self::SMOOTH_FALLOFF));
            if blend < 1e-12 {
                continue;
            }
            let verts = self.wrangler.islands[i].verts.clone();
            for v in verts {
                if self.wrangler.is_pinned(v) {
                    continue;
                }
                let mut acc = Vec2::ZERO;
                let mut wsum = 0.0;
                for e in self.wrangler.uvmesh.vert_edges(v) {
                    let o = self.wrangler.uvmesh.edges[e].other_vert(v);
                    let w = if self.wrangler.is_pinned(o) {
                        Self::PIN_SMOOTH_WEIGHT
                    } else if self.wrangler.is_corner(o) {
                        Self::CORNER_SMOOTH_WEIGHT
                    } else {
                        1.0
                    };
                    acc += self.wrangler.vert_uv(o) * w;
                    wsum += w;
                }
                if wsum <= 0.0 {
                    continue;
                }
                let target = acc / wsum;
                let p = self.wrangler.vert_uv(v).lerp(&target, blend);
                self.wrangler.set_vert_uv(v, p);
            }
        }
    }

    /// Degenerate triangles or runaway constraints can produce NaN; replace
    /// poisoned coordinates with small random placeholders instead of
    /// letting them spread through the sweeps.
    fn nan_guard(&mut self) {
        let mut rng = rand::rng();
        let mut poisoned = 0usize;
        for v in self.wrangler.uvmesh.verts.indices() {
            if !self.wrangler.vert_uv(v).is_finite() {
                poisoned += 1;
                let p = Vec2::new(rng.random_range(-0.5..0.5), rng.random_range(-0.5..0.5));
                self.wrangler.set_vert_uv(v, p);
                self.vel.insert(v, Vec2::ZERO);
            }
        }
        if poisoned > 0 {
            log::warn!("unwrap: replaced {} non-finite uv coordinates", poisoned);
        }
        self.vel.retain(|_, d| d.is_finite());
    }

    /// Wrapped angle error of one constraint at the current positions.
    fn angle_error(&self, c: &AngleConstraint) -> f64 {
        let pa = self.wrangler.vert_uv(c.a);
        let db = self.wrangler.vert_uv(c.b) - pa;
        let dc = self.wrangler.vert_uv(c.c) - pa;
        if db.length() < 1e-12 || dc.length() < 1e-12 {
            return 0.0;
        }
        let cur = db.cross(&dc).atan2(db.dot(&dc));
        wrap_angle(cur - c.target)
    }

    /// Total absolute angle-constraint error; a cheap convergence gauge.
    pub fn residual(&self) -> f64 {
        let mut sum = 0.0;
        for sys in &self.systems {
            for c in &sys.angles {
                sum += self.angle_error(c).abs();
            }
        }
        sum
    }

    /// Re-pack (unless islands are preserved) and scatter results back to
    /// the mesh's UV layer.
    pub fn finish(&mut self, mesh: &mut Mesh) {
        if !self.preserve_islands {
            for i in 0..self.wrangler.islands.len() {
                self.wrangler.islands[i].update_bounds(&self.wrangler.uvmesh);
            }
            self.wrangler.pack_islands(true, self.sel_loops_only);
        }
        self.wrangler.finish(mesh);
    }

    // --- persistence across frames ----------------------------------------

    pub fn save(&self, mesh: &Mesh) -> SolverState {
        SolverState {
            face_count: self.wrangler.faces.len(),
            preserve_islands: self.preserve_islands,
            sel_loops_only: self.sel_loops_only,
            wrangler: self.wrangler.save(mesh),
        }
    }

    /// Reuse saved state when the working-set size, mode flags, and the
    /// wrangler's eid/UV/seam snapshot all still match; otherwise build a
    /// fresh solver and run `start`.
    pub fn restore_or_rebuild(
        mesh: &mut Mesh,
        faces: Vec<usize>,
        uv_layer_name: &str,
        state: Option<&SolverState>,
        preserve_islands: bool,
        sel_loops_only: bool,
    ) -> Result<UnwrapSolver, MeshError> {
        if let Some(st) = state {
            if st.face_count == faces.len()
                && st.preserve_islands == preserve_islands
                && st.sel_loops_only == sel_loops_only
            {
                if let Some(w) = UvWrangler::restore(mesh, &st.wrangler) {
                    let mut solver = UnwrapSolver {
                        wrangler: w,
                        preserve_islands,
                        sel_loops_only,
                        systems: Vec::new(),
                        vel: AHashMap::new(),
                        tri_count: 0,
                        tick: 0,
                    };
                    solver.build_solver(mesh, true);
                    return Ok(solver);
                }
            }
            log::debug!("unwrap: saved solver state unusable; rebuilding");
        }
        let mut solver = Self::new(mesh, faces, uv_layer_name, preserve_islands, sel_loops_only)?;
        solver.start(mesh);
        Ok(solver)
    }
}
