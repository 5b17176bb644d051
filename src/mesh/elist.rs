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

//! Typed element arenas.
//!
//! Slots are recycled through a free-list; a freed slot keeps its record in
//! place with `eid == -1` (a tombstone) until `compact()` runs, so iteration
//! during mutation stays well-defined: iterators hold a bare cursor, skip
//! tombstones, and never observe a moved element.

use std::ops::{Index, IndexMut};

use ahash::{AHashMap, AHashSet};

use crate::error::MeshError;
use crate::mesh::customdata::{CustomData, CustomDataLayer, CustomDataType, CustomDataValue, LayerFlags};
use crate::mesh::element::{EID_FREED, ElemFlags, Element, NONE};

#[derive(Debug, Clone)]
pub struct ElementList<T: Element> {
    items: Vec<T>,
    free: Vec<usize>,
    live: usize,
    eidmap: AHashMap<i64, usize>,
    pub layers: Vec<CustomDataLayer>,
    sel_order: Vec<usize>,
    sel_set: AHashSet<usize>,
    pub active: usize,
    pub highlight: usize,
}

impl<T: Element> Default for ElementList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> ElementList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            free: Vec::new(),
            live: 0,
            eidmap: AHashMap::new(),
            layers: Vec::new(),
            sel_order: Vec::new(),
            sel_set: AHashSet::new(),
            active: NONE,
            highlight: NONE,
        }
    }

    /// Number of live elements (tombstones excluded).
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Upper bound over slot indices, tombstones included.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_alive(&self, idx: usize) -> bool {
        idx < self.items.len() && self.items[idx].eid() >= 0
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx).filter(|e| e.eid() >= 0)
    }

    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.items.get_mut(idx).filter(|e| e.eid() >= 0)
    }

    pub fn lookup(&self, eid: i64) -> Option<usize> {
        self.eidmap.get(&eid).copied()
    }

    /// Insert `elem` (with its eid already assigned), reusing a freed slot
    /// when one is available. Fails on a duplicate live eid.
    pub fn push(&mut self, mut elem: T) -> Result<usize, MeshError> {
        let eid = elem.eid();
        if eid < 0 {
            return Err(MeshError::ElementFreed(eid));
        }
        if self.eidmap.contains_key(&eid) {
            return Err(MeshError::DuplicateEid(eid));
        }

        // New elements pick up one default value per active layer.
        if elem.cd().len() != self.layers.len() {
            *elem.cd_mut() = CustomData::from_layers(&self.layers);
        }

        let idx = match self.free.pop() {
            Some(slot) => {
                self.items[slot] = elem;
                slot
            }
            None => {
                self.items.push(elem);
                self.items.len() - 1
            }
        };
        self.eidmap.insert(eid, idx);
        self.live += 1;
        Ok(idx)
    }

    /// Free the slot. Double-free is a hard error unless `no_error`, which
    /// degrades to a warning.
    pub fn remove(&mut self, idx: usize, no_error: bool) -> Result<(), MeshError> {
        if idx >= self.items.len() || self.items[idx].eid() < 0 {
            if no_error {
                log::warn!("element list: removing already-freed slot {}", idx);
                return Ok(());
            }
            return Err(MeshError::SlotFreed(idx));
        }

        if self.sel_set.remove(&idx) {
            self.sel_order.retain(|&s| s != idx);
        }
        if self.active == idx {
            self.active = NONE;
        }
        if self.highlight == idx {
            self.highlight = NONE;
        }

        let eid = self.items[idx].eid();
        self.eidmap.remove(&eid);
        self.items[idx].set_eid(EID_FREED);
        self.free.push(idx);
        self.live -= 1;
        Ok(())
    }

    /// Rebind a live element to a new eid (used by eid-preserving rebuilds
    /// such as `rotate_edge`).
    pub fn set_eid(&mut self, idx: usize, eid: i64) -> Result<(), MeshError> {
        if !self.is_alive(idx) {
            return Err(MeshError::ElementFreed(eid));
        }
        if self.eidmap.contains_key(&eid) {
            return Err(MeshError::DuplicateEid(eid));
        }
        let old = self.items[idx].eid();
        self.eidmap.remove(&old);
        self.items[idx].set_eid(eid);
        self.eidmap.insert(eid, idx);
        Ok(())
    }

    /// Iterate live elements. The iterator holds only an index cursor, so
    /// nested iteration is fine; structural mutation mid-iteration requires
    /// going through `indices()` instead (the borrow checker enforces this).
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, e)| e.eid() >= 0)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.items
            .iter_mut()
            .enumerate()
            .filter(|(_, e)| e.eid() >= 0)
    }

    /// Snapshot of the live slot indices; safe to hold across mutation of
    /// the list (freed slots are skipped by `is_alive` checks downstream).
    pub fn indices(&self) -> Vec<usize> {
        self.iter().map(|(i, _)| i).collect()
    }

    // --- selection -------------------------------------------------------

    pub fn set_select(&mut self, idx: usize, select: bool) {
        if !self.is_alive(idx) {
            return;
        }
        if select {
            if self.sel_set.insert(idx) {
                self.sel_order.push(idx);
            }
            self.items[idx].flag_mut().insert(ElemFlags::SELECT);
        } else {
            if self.sel_set.remove(&idx) {
                self.sel_order.retain(|&s| s != idx);
            }
            self.items[idx].flag_mut().remove(ElemFlags::SELECT);
        }
    }

    #[inline]
    pub fn is_selected(&self, idx: usize) -> bool {
        self.sel_set.contains(&idx)
    }

    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.sel_order.iter().copied()
    }

    /// Selected elements that are not hidden.
    pub fn selected_editable(&self) -> impl Iterator<Item = usize> + '_ {
        self.sel_order
            .iter()
            .copied()
            .filter(|&i| self.is_alive(i) && !self.items[i].flag().contains(ElemFlags::HIDE))
    }

    pub fn select_all(&mut self) {
        for i in 0..self.items.len() {
            if self.items[i].eid() >= 0 {
                self.set_select(i, true);
            }
        }
    }

    pub fn select_none(&mut self) {
        let all: Vec<usize> = self.sel_order.clone();
        for i in all {
            self.set_select(i, false);
        }
    }

    pub fn set_active(&mut self, idx: usize) {
        self.active = if self.is_alive(idx) { idx } else { NONE };
    }

    pub fn set_highlight(&mut self, idx: usize) {
        self.highlight = if self.is_alive(idx) { idx } else { NONE };
    }

    // --- customdata layers ----------------------------------------------

    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layer_index(name).is_some()
    }

    /// Add a layer and push a fresh default value onto every live element.
    pub fn add_layer(&mut self, name: &str, dtype: CustomDataType, flags: LayerFlags) -> usize {
        self.layers.push(CustomDataLayer {
            name: name.to_string(),
            dtype,
            flags,
        });
        let default = dtype.default_value();
        for e in self.items.iter_mut() {
            if e.eid() >= 0 {
                e.cd_mut().0.push(default.clone());
            }
        }
        self.layers.len() - 1
    }

    /// Get-or-add by name. An existing layer with a mismatched type is a
    /// hard error.
    pub fn ensure_layer(
        &mut self,
        name: &str,
        dtype: CustomDataType,
        flags: LayerFlags,
    ) -> Result<usize, MeshError> {
        if let Some(idx) = self.layer_index(name) {
            if self.layers[idx].dtype != dtype {
                return Err(MeshError::InvalidRequest("layer exists with a different type"));
            }
            return Ok(idx);
        }
        Ok(self.add_layer(name, dtype, flags))
    }

    pub fn remove_layer(&mut self, layer: usize) -> Result<(), MeshError> {
        if layer >= self.layers.len() {
            return Err(MeshError::InvalidRequest("layer index out of range"));
        }
        self.layers.remove(layer);
        for e in self.items.iter_mut() {
            if e.eid() >= 0 {
                let cd = e.cd_mut();
                if layer < cd.0.len() {
                    cd.0.remove(layer);
                }
            }
        }
        // Elements whose arrays had drifted are healed rather than crashed on.
        self.fix_customdata();
        Ok(())
    }

    /// Self-healing pass: pad or truncate each element's attribute array to
    /// match the layer table, and coerce wrong-typed values to defaults.
    pub fn fix_customdata(&mut self) {
        let mut fixed = 0usize;
        for e in self.items.iter_mut() {
            if e.eid() < 0 {
                continue;
            }
            let cd = e.cd_mut();
            if cd.0.len() != self.layers.len() {
                fixed += 1;
                cd.0.truncate(self.layers.len());
                while cd.0.len() < self.layers.len() {
                    cd.0.push(self.layers[cd.0.len()].dtype.default_value());
                }
            }
            for (i, layer) in self.layers.iter().enumerate() {
                if cd.0[i].dtype() != layer.dtype {
                    fixed += 1;
                    cd.0[i] = layer.dtype.default_value();
                }
            }
        }
        if fixed > 0 {
            log::warn!("fix_customdata: repaired {} drifted attribute slots", fixed);
        }
    }

    /// Copy or weight-blend every active layer from `sources` into `dest`.
    /// `NO_INTERP` layers are left alone; `NO_INTERP_COPY_ONLY` layers take
    /// the first source verbatim.
    pub fn customdata_interp(&mut self, dest: usize, sources: &[usize], weights: &[f64]) {
        if sources.is_empty() || !self.is_alive(dest) {
            return;
        }
        debug_assert_eq!(sources.len(), weights.len());

        for layer in 0..self.layers.len() {
            let flags = self.layers[layer].flags;
            if flags.contains(LayerFlags::NO_INTERP) {
                continue;
            }

            let value = if flags.contains(LayerFlags::NO_INTERP_COPY_ONLY) {
                match self.get(sources[0]).and_then(|s| s.cd().get(layer)) {
                    Some(v) => v.clone(),
                    None => continue,
                }
            } else {
                let vals: Vec<CustomDataValue> = sources
                    .iter()
                    .filter_map(|&s| self.get(s).and_then(|e| e.cd().get(layer)).cloned())
                    .collect();
                if vals.len() != sources.len() {
                    log::warn!("customdata_interp: source attribute missing; repairing");
                    self.fix_customdata();
                    continue;
                }
                let refs: Vec<&CustomDataValue> = vals.iter().collect();
                CustomDataValue::interp(self.layers[layer].dtype, &refs, weights)
            };

            match self.items[dest].cd_mut().get_mut(layer) {
                Some(slot) => *slot = value,
                None => {
                    log::warn!("customdata_interp: dest attribute missing; repairing");
                    self.fix_customdata();
                }
            }
        }
    }

    /// Rebuild the arena densely. Returns `old_slot -> new_slot` (NONE for
    /// tombstones); the caller is responsible for remapping references.
    pub fn compact(&mut self) -> Vec<usize>
    where
        T: Clone,
    {
        let mut map = vec![NONE; self.items.len()];
        let mut packed: Vec<T> = Vec::with_capacity(self.live);
        for (old, e) in self.items.iter().enumerate() {
            if e.eid() >= 0 {
                map[old] = packed.len();
                packed.push(e.clone());
            }
        }

        self.eidmap.clear();
        for (new, e) in packed.iter().enumerate() {
            self.eidmap.insert(e.eid(), new);
        }
        self.sel_order = self
            .sel_order
            .iter()
            .filter_map(|&s| (map[s] != NONE).then(|| map[s]))
            .collect();
        self.sel_set = self.sel_order.iter().copied().collect();
        self.active = if self.active != NONE { map[self.active] } else { NONE };
        self.highlight = if self.highlight != NONE { map[self.highlight] } else { NONE };
        self.items = packed;
        self.free.clear();
        map
    }
}

impl<T: Element> Index<usize> for ElementList<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &T {
        debug_assert!(self.items[idx].eid() >= 0, "indexing freed slot {}", idx);
        &self.items[idx]
    }
}

impl<T: Element> IndexMut<usize> for ElementList<T> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut T {
        debug_assert!(self.items[idx].eid() >= 0, "indexing freed slot {}", idx);
        &mut self.items[idx]
    }
}
