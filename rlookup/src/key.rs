/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use std::sync::Arc;

use enumflags2::{BitFlags, bitflags, make_bitflags};
use field::{FieldOption, FieldSpec, FieldType};

#[bitflags]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RLookupKeyFlag {
    /// This field is (or assumed to be) part of the document itself.
    /// This is a basic flag for a loaded key.
    DocSrc = 0x01,

    /// This field is part of the index schema.
    SchemaSrc = 0x02,

    /// Check the sorting vector, if necessary, for the value of this key.
    SvSrc = 0x04,

    /// This key was created by the query itself (not in the document).
    QuerySrc = 0x08,

    /// If the key is already present, then overwrite its flags.
    Override = 0x20,

    /// This field is hidden within the document and is only used as a
    /// transient field for another consumer. Don't output this field.
    Hidden = 0x100,

    /// The opposite of [`RLookupKeyFlag::Hidden`]: the field is an explicit
    /// member of a RETURN/LOAD list, so ensure that it gets emitted.
    ExplicitReturn = 0x200,

    /// This key type is numeric.
    Numeric = 0x1000,
}

/// Helper type to represent a set of [`RLookupKeyFlag`]s.
pub type RLookupKeyFlags = BitFlags<RLookupKeyFlag>;

/// Flags that do not persist to the key; they are just options to
/// [`RLookup::get_key_write`](crate::RLookup::get_key_write).
pub const TRANSIENT_FLAGS: RLookupKeyFlags = make_bitflags!(RLookupKeyFlag::{Override});

/// A named typed slot into an [`RLookupRow`](crate::RLookupRow).
///
/// Instead of having to do repeated string comparisons to find the correct
/// value by name, an `RLookupKey` is created once through the
/// [`RLookup`](crate::RLookup), which then allows `O(1)` access within the
/// row. Keys are cheap to clone so plan nodes (e.g. the sort step) can hold
/// onto the ones they care about.
#[derive(Clone, Debug, PartialEq)]
pub struct RLookupKey {
    name: Arc<str>,

    /// Index into the dynamic values array within the associated row.
    dstidx: u16,

    /// If the source for this key is a sorting vector, this is the index
    /// into the `RSSortingVector` within the associated row.
    svidx: u16,

    /// Various flags dictating the behavior of looking up the value of this
    /// key. Most notably, `SvSrc` means the source is a sorting vector and
    /// `Self::svidx` should be used to look up the value.
    flags: RLookupKeyFlags,
}

impl RLookupKey {
    pub(crate) fn new(name: Arc<str>, dstidx: u16, flags: RLookupKeyFlags) -> Self {
        Self {
            name,
            dstidx,
            svidx: 0,
            flags: flags & !TRANSIENT_FLAGS,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub const fn dstidx(&self) -> u16 {
        self.dstidx
    }

    pub const fn svidx(&self) -> u16 {
        self.svidx
    }

    pub const fn flags(&self) -> RLookupKeyFlags {
        self.flags
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(RLookupKeyFlag::Hidden)
    }

    /// Add persistent flags to the key. Transient option flags are
    /// filtered out.
    pub fn add_flags(&mut self, flags: RLookupKeyFlags) {
        self.flags |= flags & !TRANSIENT_FLAGS;
    }

    /// Absorb schema information: source flags, the sorting-vector slot for
    /// sortable fields and the numeric marker.
    pub fn update_from_field_spec(&mut self, fs: &FieldSpec) {
        self.flags |= RLookupKeyFlag::DocSrc | RLookupKeyFlag::SchemaSrc;

        if let Some(sort_idx) = fs.sort_idx()
            && fs.options().contains(FieldOption::Sortable)
        {
            self.flags |= RLookupKeyFlag::SvSrc;
            self.svidx = sort_idx;
        }

        if fs.options().contains(FieldOption::Hidden) {
            self.flags |= RLookupKeyFlag::Hidden;
        }

        if fs.types().contains(FieldType::Numeric) {
            self.flags |= RLookupKeyFlag::Numeric;
        }
    }
}
