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

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::math::Vec3;
use crate::mesh::customdata::CustomData;

/// Null slot index. Links use arena indices, never references.
pub const NONE: usize = usize::MAX;

/// Element id of a freed slot.
pub const EID_FREED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElemType {
    Vertex,
    Edge,
    Loop,
    LoopList,
    Face,
}

bitflags! {
    /// Per-element flag bits shared by all element types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ElemFlags: u32 {
        const SELECT = 1 << 0;
        const HIDE   = 1 << 1;
        /// Edges only: forces a UV-space cut.
        const SEAM   = 1 << 2;
        /// Faces only: flat shading, corners take the face normal.
        const FLAT   = 1 << 3;
        /// Scratch bit for traversals; not preserved across operations.
        const TAG    = 1 << 4;
    }
}

bitflags! {
    /// Per-corner UV flags, stored inside the UV customdata sample.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UvFlags: u32 {
        const PIN    = 1 << 0;
        const SELECT = 1 << 1;
    }
}

bitflags! {
    /// Mutation categories a mesh opts into at construction time.
    /// Operations outside the mask fail with `MeshError::FeatureUnsupported`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MeshFeatures: u32 {
        const MAKE_FACE    = 1 << 0;
        /// Wire/curve meshes: edges only, no faces.
        const EDGES_ONLY   = 1 << 1;
        /// Reject edges/faces that would start a second disconnected shell.
        const SINGLE_SHELL = 1 << 2;
    }
}

bitflags! {
    /// Lazily polled "something changed" bits for downstream consumers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RecalcFlags: u32 {
        const RENDER     = 1 << 0;
        const TESSELLATE = 1 << 1;
        const UV_EDITOR  = 1 << 2;
        const BVH        = 1 << 3;
    }
}

impl Default for MeshFeatures {
    fn default() -> Self {
        MeshFeatures::MAKE_FACE
    }
}

/// Common per-element record surface. `eid` is the stable identifier;
/// `index` is scratch state recomputed by `Mesh::update_indices`.
pub trait Element {
    const TYPE: ElemType;

    fn eid(&self) -> i64;
    fn set_eid(&mut self, eid: i64);
    fn flag(&self) -> ElemFlags;
    fn flag_mut(&mut self) -> &mut ElemFlags;
    fn cd(&self) -> &CustomData;
    fn cd_mut(&mut self) -> &mut CustomData;

    #[inline]
    fn is_alive(&self) -> bool {
        self.eid() >= 0
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub eid: i64,
    pub flag: ElemFlags,
    pub index: u32,
    pub co: Vec3,
    pub no: Vec3,
    /// Entry into this vertex's disk cycle; NONE when isolated.
    pub e: usize,
    pub cd: CustomData,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub eid: i64,
    pub flag: ElemFlags,
    pub index: u32,
    pub v1: usize,
    pub v2: usize,
    /// Entry into the radial cycle of loops sharing this edge; NONE if wire.
    pub l: usize,
    // Disk cycle links: circular list of edges around each endpoint.
    pub v1_next: usize,
    pub v1_prev: usize,
    pub v2_next: usize,
    pub v2_prev: usize,
    pub cd: CustomData,
}

#[derive(Debug, Clone)]
pub struct Loop {
    pub eid: i64,
    pub flag: ElemFlags,
    pub index: u32,
    pub v: usize,
    /// Edge spanned from `v` to `next.v`.
    pub e: usize,
    pub f: usize,
    pub list: usize,
    pub next: usize,
    pub prev: usize,
    pub radial_next: usize,
    pub radial_prev: usize,
    pub cd: CustomData,
}

/// One closed contour of a face. The first list of a face is the outer
/// boundary; any further lists are holes.
#[derive(Debug, Clone)]
pub struct LoopList {
    pub eid: i64,
    pub flag: ElemFlags,
    pub l: usize,
    pub length: usize,
    pub cd: CustomData,
}

#[derive(Debug, Clone)]
pub struct Face {
    pub eid: i64,
    pub flag: ElemFlags,
    pub index: u32,
    pub lists: SmallVec<[usize; 1]>,
    pub cent: Vec3,
    pub no: Vec3,
    /// Scratch, accumulated from the tessellation.
    pub area: f64,
    pub cd: CustomData,
}

macro_rules! impl_element {
    ($ty:ident, $etype:expr) => {
        impl Element for $ty {
            const TYPE: ElemType = $etype;

            #[inline]
            fn eid(&self) -> i64 {
                self.eid
            }
            #[inline]
            fn set_eid(&mut self, eid: i64) {
                self.eid = eid;
            }
            #[inline]
            fn flag(&self) -> ElemFlags {
                self.flag
            }
            #[inline]
            fn flag_mut(&mut self) -> &mut ElemFlags {
                &mut self.flag
            }
            #[inline]
            fn cd(&self) -> &CustomData {
                &self.cd
            }
            #[inline]
            fn cd_mut(&mut self) -> &mut CustomData {
                &mut self.cd
            }
        }
    };
}

impl_element!(Vertex, ElemType::Vertex);
impl_element!(Edge, ElemType::Edge);
impl_element!(Loop, ElemType::Loop);
impl_element!(LoopList, ElemType::LoopList);
impl_element!(Face, ElemType::Face);

impl Vertex {
    pub fn new(co: Vec3) -> Self {
        Self {
            eid: EID_FREED,
            flag: ElemFlags::empty(),
            index: 0,
            co,
            no: Vec3::ZERO,
            e: NONE,
            cd: CustomData::default(),
        }
    }
}

impl Edge {
    pub fn new(v1: usize, v2: usize) -> Self {
        Self {
            eid: EID_FREED,
            flag: ElemFlags::empty(),
            index: 0,
            v1,
            v2,
            l: NONE,
            v1_next: NONE,
            v1_prev: NONE,
            v2_next: NONE,
            v2_prev: NONE,
            cd: CustomData::default(),
        }
    }

    /// The endpoint that is not `v`. Panics only on corrupted topology.
    #[inline]
    pub fn other_vert(&self, v: usize) -> usize {
        if self.v1 == v {
            self.v2
        } else {
            debug_assert_eq!(self.v2, v, "vertex not on edge");
            self.v1
        }
    }

    #[inline]
    pub fn has_vert(&self, v: usize) -> bool {
        self.v1 == v || self.v2 == v
    }
}

impl Loop {
    pub fn new(v: usize) -> Self {
        Self {
            eid: EID_FREED,
            flag: ElemFlags::empty(),
            index: 0,
            v,
            e: NONE,
            f: NONE,
            list: NONE,
            next: NONE,
            prev: NONE,
            radial_next: NONE,
            radial_prev: NONE,
            cd: CustomData::default(),
        }
    }
}

impl LoopList {
    pub fn new() -> Self {
        Self {
            eid: EID_FREED,
            flag: ElemFlags::empty(),
            l: NONE,
            length: 0,
            cd: CustomData::default(),
        }
    }
}

impl Default for LoopList {
    fn default() -> Self {
        Self::new()
    }
}

impl Face {
    pub fn new() -> Self {
        Self {
            eid: EID_FREED,
            flag: ElemFlags::empty(),
            index: 0,
            lists: SmallVec::new(),
            cent: Vec3::ZERO,
            no: Vec3::ZERO,
            area: 0.0,
            cd: CustomData::default(),
        }
    }
}

impl Default for Face {
    fn default() -> Self {
        Self::new()
    }
}
