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

use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

/// 2D vector, used for UV coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

/// 3D vector, used for positions and normals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product of the two embedded vectors.
    #[inline]
    pub fn cross(&self, other: &Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn distance_to(&self, other: &Vec2) -> f64 {
        (*other - *self).length()
    }

    #[inline]
    pub fn lerp(&self, other: &Vec2, t: f64) -> Vec2 {
        *self + (*other - *self) * t
    }

    /// Rotate counter-clockwise by `angle` radians about the origin.
    #[inline]
    pub fn rotated(&self, angle: f64) -> Vec2 {
        let (s, c) = angle.sin_cos();
        Vec2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn distance_to(&self, other: &Vec3) -> f64 {
        (*other - *self).length()
    }

    /// Returns the zero vector when the length is not usable.
    #[inline]
    pub fn normalized(&self) -> Vec3 {
        let len = self.length();
        if len > 1e-30 && len.is_finite() {
            *self / len
        } else {
            Vec3::ZERO
        }
    }

    #[inline]
    pub fn lerp(&self, other: &Vec3, t: f64) -> Vec3 {
        *self + (*other - *self) * t
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Any unit vector orthogonal to `self` (assumed non-zero).
    pub fn orthogonal(&self) -> Vec3 {
        let axis = if self.x.abs() < 0.5 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        self.cross(&axis).normalized()
    }
}

macro_rules! impl_vec_ops {
    ($ty:ident { $($c:ident),+ }) => {
        impl Add for $ty {
            type Output = $ty;
            #[inline]
            fn add(self, o: $ty) -> $ty { $ty { $($c: self.$c + o.$c),+ } }
        }
        impl Sub for $ty {
            type Output = $ty;
            #[inline]
            fn sub(self, o: $ty) -> $ty { $ty { $($c: self.$c - o.$c),+ } }
        }
        impl Neg for $ty {
            type Output = $ty;
            #[inline]
            fn neg(self) -> $ty { $ty { $($c: -self.$c),+ } }
        }
        impl Mul<f64> for $ty {
            type Output = $ty;
            #[inline]
            fn mul(self, s: f64) -> $ty { $ty { $($c: self.$c * s),+ } }
        }
        impl Div<f64> for $ty {
            type Output = $ty;
            #[inline]
            fn div(self, s: f64) -> $ty { $ty { $($c: self.$c / s),+ } }
        }
        impl AddAssign for $ty {
            #[inline]
            fn add_assign(&mut self, o: $ty) { $(self.$c += o.$c;)+ }
        }
        impl SubAssign for $ty {
            #[inline]
            fn sub_assign(&mut self, o: $ty) { $(self.$c -= o.$c;)+ }
        }
    };
}

impl_vec_ops!(Vec2 { x, y });
impl_vec_ops!(Vec3 { x, y, z });

impl Index<usize> for Vec3 {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index out of range: {}", i),
        }
    }
}

impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vec3 index out of range: {}", i),
        }
    }
}

/// 2D axis-aligned bounding box over UV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb2 {
    /// An empty box; growing it with any point makes it valid.
    pub fn empty() -> Self {
        Self {
            min: Vec2::new(f64::INFINITY, f64::INFINITY),
            max: Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn grow(&mut self, p: &Vec2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn area(&self) -> f64 {
        let s = self.size();
        if s.x < 0.0 || s.y < 0.0 { 0.0 } else { s.x * s.y }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// True if `other` overlaps `self` with more than `margin` of play.
    pub fn overlaps(&self, other: &Aabb2, margin: f64) -> bool {
        self.min.x < other.max.x - margin
            && other.min.x < self.max.x - margin
            && self.min.y < other.max.y - margin
            && other.min.y < self.max.y - margin
    }

    /// True if `self` lies inside `other`, allowing `margin` of slack.
    pub fn contained_in(&self, other: &Aabb2, margin: f64) -> bool {
        self.min.x >= other.min.x - margin
            && self.min.y >= other.min.y - margin
            && self.max.x <= other.max.x + margin
            && self.max.y <= other.max.y + margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_is_right_handed() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn rotation_quarter_turn() {
        let v = Vec2::new(1.0, 0.0).rotated(std::f64::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn aabb_grow_and_overlap() {
        let mut a = Aabb2::empty();
        a.grow(&Vec2::new(0.0, 0.0));
        a.grow(&Vec2::new(1.0, 2.0));
        assert_eq!(a.size(), Vec2::new(1.0, 2.0));
        let b = Aabb2::new(Vec2::new(0.5, 0.5), Vec2::new(2.0, 2.0));
        assert!(a.overlaps(&b, 0.0));
        let c = Aabb2::new(Vec2::new(1.5, 0.0), Vec2::new(2.0, 1.0));
        assert!(!a.overlaps(&c, 0.0));
    }
}
