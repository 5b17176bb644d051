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

use thiserror::Error;

use crate::mesh::element::MeshFeatures;

/// Caller-facing failures of the mutation API.
///
/// Defensive self-repair (customdata padding, orphaned-loop pruning,
/// NaN recovery in the solver) never surfaces here; those paths log a
/// warning and continue.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh feature {0:?} is not enabled on this mesh")]
    FeatureUnsupported(MeshFeatures),

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("element id {0} was already freed")]
    ElementFreed(i64),

    #[error("slot {0} holds no live element")]
    SlotFreed(usize),

    #[error("an element with id {0} is already present")]
    DuplicateEid(i64),

    #[error("customdata layer \"{0}\" not found")]
    MissingLayer(String),
}
