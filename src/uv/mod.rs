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

//! UV editing layer: island building, packing, and the unwrap solver.
//!
//! The UV mesh is a second [`Mesh`](crate::mesh::Mesh) whose vertex
//! positions are `(u, v, 0)`; it is transient and rebuilt whenever the
//! snapshot key below stops matching.

pub mod island;
pub mod solver;
pub mod wrangler;

pub use island::UvIsland;
pub use solver::UnwrapSolver;
pub use wrangler::UvWrangler;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::mesh::customdata::CustomDataValue;
use crate::mesh::element::ElemFlags;
use crate::mesh::{Mesh, MeshStats};

/// Cache key deciding whether saved wrangler/solver state is still usable:
/// element counts, a hash of the working faces' corner UVs, and a hash of
/// the seam configuration. Any drift forces a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UvSnapshot {
    pub counts: MeshStats,
    pub uv_hash: u64,
    pub seam_hash: u64,
}

impl UvSnapshot {
    pub fn capture(mesh: &Mesh, uv_layer: usize, faces: &[usize]) -> Self {
        let mut uvh = DefaultHasher::new();
        for &f in faces {
            if !mesh.faces.is_alive(f) {
                continue;
            }
            mesh.faces[f].eid.hash(&mut uvh);
            for l in mesh.face_loops(f) {
                mesh.loops[l].eid.hash(&mut uvh);
                if let Some(CustomDataValue::Uv(s)) = mesh.loops[l].cd.get(uv_layer) {
                    s.uv.x.to_bits().hash(&mut uvh);
                    s.uv.y.to_bits().hash(&mut uvh);
                }
            }
        }

        let mut sh = DefaultHasher::new();
        for (_, e) in mesh.edges.iter() {
            if e.flag.contains(ElemFlags::SEAM) {
                e.eid.hash(&mut sh);
            }
        }

        Self {
            counts: mesh.stats(),
            uv_hash: uvh.finish(),
            seam_hash: sh.finish(),
        }
    }
}
