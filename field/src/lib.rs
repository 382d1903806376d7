/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Schema field descriptions shared by the index and the lookup layer.

use std::sync::Arc;

use enumflags2::{BitFlags, bitflags};

/// The index types a field participates in.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, strum::Display)]
pub enum FieldType {
    #[strum(serialize = "TEXT")]
    Fulltext = 0x01,
    #[strum(serialize = "NUMERIC")]
    Numeric = 0x02,
    #[strum(serialize = "TAG")]
    Tag = 0x04,
}

pub type FieldTypes = BitFlags<FieldType>;

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FieldOption {
    /// The field's value is cached in the document's sorting vector.
    Sortable = 0x01,

    /// Sortable but un-normalized: the sorting vector holds the value
    /// exactly as it appears in the document.
    Unf = 0x02,

    /// The field exists for internal consumers only and is skipped when
    /// result rows are serialized.
    Hidden = 0x04,
}

pub type FieldOptions = BitFlags<FieldOption>;

/// A single field of an index schema.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    name: Arc<str>,
    types: FieldTypes,
    options: FieldOptions,
    /// Slot of this field within the per-document sorting vector.
    /// Only present for sortable fields.
    sort_idx: Option<u16>,
}

impl FieldSpec {
    pub fn new(name: impl Into<Arc<str>>, types: impl Into<FieldTypes>) -> Self {
        Self {
            name: name.into(),
            types: types.into(),
            options: FieldOptions::empty(),
            sort_idx: None,
        }
    }

    pub fn with_options(mut self, options: impl Into<FieldOptions>) -> Self {
        self.options |= options.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub const fn types(&self) -> FieldTypes {
        self.types
    }

    pub const fn options(&self) -> FieldOptions {
        self.options
    }

    pub fn is_sortable(&self) -> bool {
        self.options.contains(FieldOption::Sortable)
    }

    pub const fn sort_idx(&self) -> Option<u16> {
        self.sort_idx
    }

    /// Assign the sorting-vector slot. Called by the index when the schema
    /// is finalized; sortable fields get consecutive slots.
    pub fn set_sort_idx(&mut self, idx: u16) {
        debug_assert!(self.is_sortable());
        self.sort_idx = Some(idx);
    }
}
