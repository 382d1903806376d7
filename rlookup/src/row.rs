/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use sorting_vector::RSSortingVector;
use value::RSValue;

use crate::{RLookupKey, RLookupKeyFlag};

/// Row data for a lookup key. This abstracts the question of whether the
/// data comes from the document's sorting vector or from a dynamic value
/// produced by prior processing.
///
/// The dynamic values are kept in a vector indexed by [`RLookupKey::dstidx`].
/// [`RLookupRow::wipe`] resets the row data (preserving the allocation) so
/// that it may be refilled.
#[derive(Debug, Default)]
pub struct RLookupRow {
    /// Sorting vector attached to the document.
    sorting_vector: RSSortingVector,

    /// Dynamic values obtained from prior processing.
    values: Vec<Option<RSValue>>,

    /// How many values actually exist in the dynamic array. Note that this
    /// is not the length of the array!
    num: u32,
}

impl RLookupRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the length of the dynamic values vector.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the dynamic values vector is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Readonly access to the dynamic values vector.
    pub fn values(&self) -> &[Option<RSValue>] {
        &self.values
    }

    /// Readonly access to the sorting vector.
    pub fn sorting_vector(&self) -> &RSSortingVector {
        &self.sorting_vector
    }

    /// Attach the document's sorting vector to this row.
    pub fn set_sorting_vector(&mut self, sv: RSSortingVector) {
        self.sorting_vector = sv;
    }

    /// How many values actually exist in the dynamic array.
    pub fn num(&self) -> u32 {
        self.num
    }

    /// Write a value to the row. The key must already be registered in the
    /// owning lookup.
    pub fn write_key(&mut self, key: &RLookupKey, val: RSValue) {
        let idx = key.dstidx() as usize;
        if self.values.len() <= idx {
            self.values.resize(idx + 1, None);
        }

        let in_place = &mut self.values[idx];
        if in_place.is_some() {
            self.num -= 1;
        }

        *in_place = Some(val);
        self.num += 1;
    }

    /// Look up the value for `key`: the dynamic array takes precedence;
    /// keys sourced from the sorting vector fall back to their slot there.
    pub fn get_item(&self, key: &RLookupKey) -> Option<&RSValue> {
        if let Some(Some(val)) = self.values.get(key.dstidx() as usize) {
            return Some(val);
        }

        if key.flags().contains(RLookupKeyFlag::SvSrc) {
            return self
                .sorting_vector
                .get(key.svidx() as usize)
                .filter(|v| !v.is_null());
        }

        None
    }

    /// Wipes the row, retaining its memory. This does not free the memory
    /// consumed by the row, but simply resets the row data so that it may
    /// be refilled.
    pub fn wipe(&mut self) {
        for value in self.values.iter_mut() {
            if value.take().is_some() {
                self.num -= 1;
            }
        }
        self.sorting_vector = RSSortingVector::default();
    }
}
