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

//! Per-element attribute layers.
//!
//! A layer declares a name, a closed value type and interpolation flags;
//! every live element of the owning list carries one value per layer, in
//! layer order. The registry is a closed tagged variant: no runtime type
//! registration, just `CustomDataType` and its `CustomDataValue` twins.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::math::{Vec2, Vec3};
use crate::mesh::element::UvFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomDataType {
    Float,
    Int,
    Vec2,
    Vec3,
    Uv,
    Color,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LayerFlags: u32 {
        /// Dropped by `Mesh::copy` and not expected to persist.
        const TEMPORARY          = 1 << 0;
        /// Never interpolated; new elements keep the default value.
        const NO_INTERP          = 1 << 1;
        /// Copied verbatim from the first source instead of blended.
        const NO_INTERP_COPY_ONLY = 1 << 2;
    }
}

#[derive(Debug, Clone)]
pub struct CustomDataLayer {
    pub name: String,
    pub dtype: CustomDataType,
    pub flags: LayerFlags,
}

/// One UV sample on a face corner. The pin/select bits travel with the
/// coordinate so they survive interpolation and copies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvSample {
    pub uv: Vec2,
    pub flag: UvFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomDataValue {
    Float(f64),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Uv(UvSample),
    Color([f64; 4]),
}

impl CustomDataType {
    pub fn default_value(&self) -> CustomDataValue {
        match self {
            CustomDataType::Float => CustomDataValue::Float(0.0),
            CustomDataType::Int => CustomDataValue::Int(0),
            CustomDataType::Vec2 => CustomDataValue::Vec2(Vec2::ZERO),
            CustomDataType::Vec3 => CustomDataValue::Vec3(Vec3::ZERO),
            CustomDataType::Uv => CustomDataValue::Uv(UvSample::default()),
            CustomDataType::Color => CustomDataValue::Color([0.0; 4]),
        }
    }
}

impl CustomDataValue {
    pub fn dtype(&self) -> CustomDataType {
        match self {
            CustomDataValue::Float(_) => CustomDataType::Float,
            CustomDataValue::Int(_) => CustomDataType::Int,
            CustomDataValue::Vec2(_) => CustomDataType::Vec2,
            CustomDataValue::Vec3(_) => CustomDataType::Vec3,
            CustomDataValue::Uv(_) => CustomDataType::Uv,
            CustomDataValue::Color(_) => CustomDataType::Color,
        }
    }

    pub fn clear(&mut self) {
        *self = self.dtype().default_value();
    }

    pub fn copy_to(&self, dest: &mut CustomDataValue) {
        *dest = self.clone();
    }

    /// Weighted blend of `sources` into a fresh value. Sources whose type
    /// does not match the expected layer type are skipped with a warning
    /// (self-healing; see `ElementList::fix_customdata`). Int layers round
    /// to nearest; the Uv flag bits are taken from the first source.
    pub fn interp(
        dtype: CustomDataType,
        sources: &[&CustomDataValue],
        weights: &[f64],
    ) -> CustomDataValue {
        debug_assert_eq!(sources.len(), weights.len());

        match dtype {
            CustomDataType::Float => {
                let mut acc = 0.0;
                for (s, &w) in sources.iter().zip(weights) {
                    if let CustomDataValue::Float(v) = s {
                        acc += v * w;
                    } else {
                        log::warn!("customdata interp: expected Float, got {:?}", s.dtype());
                    }
                }
                CustomDataValue::Float(acc)
            }
            CustomDataType::Int => {
                let mut acc = 0.0;
                for (s, &w) in sources.iter().zip(weights) {
                    if let CustomDataValue::Int(v) = s {
                        acc += *v as f64 * w;
                    } else {
                        log::warn!("customdata interp: expected Int, got {:?}", s.dtype());
                    }
                }
                CustomDataValue::Int(acc.round() as i32)
            }
            CustomDataType::Vec2 => {
                let mut acc = Vec2::ZERO;
                for (s, &w) in sources.iter().zip(weights) {
                    if let CustomDataValue::Vec2(v) = s {
                        acc += *v * w;
                    } else {
                        log::warn!("customdata interp: expected Vec2, got {:?}", s.dtype());
                    }
                }
                CustomDataValue::Vec2(acc)
            }
            CustomDataType::Vec3 => {
                let mut acc = Vec3::ZERO;
                for (s, &w) in sources.iter().zip(weights) {
                    if let CustomDataValue::Vec3(v) = s {
                        acc += *v * w;
                    } else {
                        log::warn!("customdata interp: expected Vec3, got {:?}", s.dtype());
                    }
                }
                CustomDataValue::Vec3(acc)
            }
            CustomDataType::Uv => {
                let mut acc = Vec2::ZERO;
                let mut flag = UvFlags::empty();
                let mut first = true;
                for (s, &w) in sources.iter().zip(weights) {
                    if let CustomDataValue::Uv(v) = s {
                        acc += v.uv * w;
                        if first {
                            flag = v.flag;
                            first = false;
                        }
                    } else {
                        log::warn!("customdata interp: expected Uv, got {:?}", s.dtype());
                    }
                }
                CustomDataValue::Uv(UvSample { uv: acc, flag })
            }
            CustomDataType::Color => {
                let mut acc = [0.0; 4];
                for (s, &w) in sources.iter().zip(weights) {
                    if let CustomDataValue::Color(v) = s {
                        for i in 0..4 {
                            acc[i] += v[i] * w;
                        }
                    } else {
                        log::warn!("customdata interp: expected Color, got {:?}", s.dtype());
                    }
                }
                CustomDataValue::Color(acc)
            }
        }
    }
}

/// The attribute values of one element, indexed identically to the owning
/// list's layer table.
#[derive(Debug, Clone, Default)]
pub struct CustomData(pub SmallVec<[CustomDataValue; 2]>);

impl CustomData {
    pub fn from_layers(layers: &[CustomDataLayer]) -> Self {
        CustomData(layers.iter().map(|l| l.dtype.default_value()).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn get(&self, layer: usize) -> Option<&CustomDataValue> {
        self.0.get(layer)
    }

    #[inline]
    pub fn get_mut(&mut self, layer: usize) -> Option<&mut CustomDataValue> {
        self.0.get_mut(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interp_uv_keeps_first_flag() {
        let a = CustomDataValue::Uv(UvSample {
            uv: Vec2::new(0.0, 0.0),
            flag: UvFlags::PIN,
        });
        let b = CustomDataValue::Uv(UvSample {
            uv: Vec2::new(1.0, 1.0),
            flag: UvFlags::empty(),
        });
        let out = CustomDataValue::interp(CustomDataType::Uv, &[&a, &b], &[0.25, 0.75]);
        match out {
            CustomDataValue::Uv(s) => {
                assert!((s.uv.x - 0.75).abs() < 1e-12);
                assert!(s.flag.contains(UvFlags::PIN));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn interp_int_rounds() {
        let a = CustomDataValue::Int(1);
        let b = CustomDataValue::Int(2);
        let out = CustomDataValue::interp(CustomDataType::Int, &[&a, &b], &[0.4, 0.6]);
        assert_eq!(out, CustomDataValue::Int(2));
    }
}
